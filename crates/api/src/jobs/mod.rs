//! Background job scheduler and job implementations.

mod pool_metrics;
mod scheduler;
mod session_cleanup;
mod webhook_event_cleanup;

pub use pool_metrics::PoolMetricsJob;
pub use scheduler::{Job, JobFrequency, JobScheduler};
pub use session_cleanup::SessionCleanupJob;
pub use webhook_event_cleanup::WebhookEventCleanupJob;
