//! Domain models for Virtual Address Hub.

pub mod billing;
pub mod destruction;
pub mod forwarding;
pub mod mail_item;
pub mod registered_office;
pub mod response;
pub mod user;
pub mod webhook;

pub use billing::{BillingOverview, BillingProvider, Invoice, InvoiceUpsert};
pub use destruction::{validate_staff_attribution, AttributionError, DestructionLog};
pub use forwarding::{
    resolve_transition, ForwardingAction, ForwardingRequest, ForwardingStatus, TransitionError,
};
pub use mail_item::{MailItem, MailItemStatus};
pub use registered_office::RegisteredOfficeAddress;
pub use response::{ApiResponse, PagedList};
pub use user::{KycStatus, PlanStatus, User};
pub use webhook::{WebhookEventStatus, WebhookProvider};
