//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod destruction_log;
pub mod forwarding_request;
pub mod invoice;
pub mod mail_item;
pub mod user;
pub mod webhook_event;

pub use destruction_log::DestructionLogEntity;
pub use forwarding_request::{ForwardingRequestEntity, ForwardingStatusDb};
pub use invoice::{BillingProviderDb, InvoiceEntity};
pub use mail_item::{MailItemEntity, MailItemStatusDb};
pub use user::{KycStatusDb, PlanStatusDb, SessionEntity, UserEntity};
pub use webhook_event::WebhookEventEntity;
