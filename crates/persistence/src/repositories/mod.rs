//! Repository implementations for database operations.

pub mod destruction_log;
pub mod forwarding_request;
pub mod invoice;
pub mod mail_item;
pub mod user;
pub mod webhook_event;

pub use destruction_log::{DestroyOutcome, DestructionLogRepository, NewDestruction};
pub use forwarding_request::{
    CreateForwardingOutcome, ForwardingRequestRepository, TransitionOutcome,
};
pub use invoice::InvoiceRepository;
pub use mail_item::{InboxCursor, MailItemRepository, NewMailItem};
pub use user::{NewUser, SessionRepository, UserRepository};
pub use webhook_event::{WebhookEventRepository, DEFAULT_PROCESSING_LEASE_SECS};
