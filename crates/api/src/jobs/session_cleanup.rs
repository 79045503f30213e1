//! Deletes expired browser sessions.

use persistence::repositories::SessionRepository;
use sqlx::PgPool;
use tracing::info;

use super::scheduler::{Job, JobFrequency};

pub struct SessionCleanupJob {
    pool: PgPool,
}

impl SessionCleanupJob {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Job for SessionCleanupJob {
    fn name(&self) -> &'static str {
        "session_cleanup"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Hourly
    }

    async fn execute(&self) -> Result<(), String> {
        let deleted = SessionRepository::new(self.pool.clone())
            .delete_expired()
            .await
            .map_err(|e| format!("Failed to delete expired sessions: {}", e))?;

        if deleted > 0 {
            info!(deleted = deleted, "Deleted expired sessions");
        }
        Ok(())
    }
}
