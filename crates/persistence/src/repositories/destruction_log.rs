//! Destruction log repository.

use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{DestructionLogEntity, MailItemEntity, MailItemStatusDb};
use crate::metrics::QueryTimer;

/// Attribution recorded with a destruction.
#[derive(Debug, Clone)]
pub struct NewDestruction<'a> {
    pub mail_item_id: Uuid,
    pub staff_name: &'a str,
    pub staff_initials: &'a str,
    pub notes: Option<&'a str>,
    pub recorded_by: Uuid,
}

#[derive(Debug)]
pub enum DestroyOutcome {
    Destroyed(DestructionLogEntity),
    MailItemNotFound,
    /// Already destroyed or forwarded.
    NotOnHand(MailItemStatusDb),
    /// A forwarding request for the item is still open.
    ForwardingOpen,
}

#[derive(Clone)]
pub struct DestructionLogRepository {
    pool: PgPool,
}

impl DestructionLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Writes the log row and marks the item destroyed in one transaction.
    /// Attribution must already have been validated.
    pub async fn destroy(&self, entry: NewDestruction<'_>) -> Result<DestroyOutcome, sqlx::Error> {
        let timer = QueryTimer::new("destroy_mail_item");
        let mut tx = self.pool.begin().await?;

        let item = sqlx::query_as::<_, MailItemEntity>(
            "SELECT * FROM mail_items WHERE id = $1 FOR UPDATE",
        )
        .bind(entry.mail_item_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(item) = item else {
            tx.rollback().await?;
            timer.record();
            return Ok(DestroyOutcome::MailItemNotFound);
        };
        if item.status != MailItemStatusDb::Received {
            tx.rollback().await?;
            timer.record();
            return Ok(DestroyOutcome::NotOnHand(item.status));
        }

        let (open,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM forwarding_requests
                WHERE mail_item_id = $1 AND status NOT IN ('delivered', 'cancelled')
            )
            "#,
        )
        .bind(item.id)
        .fetch_one(&mut *tx)
        .await?;
        if open {
            tx.rollback().await?;
            timer.record();
            return Ok(DestroyOutcome::ForwardingOpen);
        }

        let log = sqlx::query_as::<_, DestructionLogEntity>(
            r#"
            INSERT INTO destruction_logs (
                mail_item_id, user_id, staff_name, staff_initials, notes, recorded_by
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(item.id)
        .bind(item.user_id)
        .bind(entry.staff_name.trim())
        .bind(entry.staff_initials.trim().to_uppercase())
        .bind(entry.notes)
        .bind(entry.recorded_by)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE mail_items SET status = 'destroyed', updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(item.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(DestroyOutcome::Destroyed(log))
    }

    /// Newest first.
    pub async fn list(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<DestructionLogEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_destruction_logs");
        let result = sqlx::query_as::<_, DestructionLogEntity>(
            r#"
            SELECT * FROM destruction_logs
            ORDER BY destroyed_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_destruction_logs");
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM destruction_logs")
            .fetch_one(&self.pool)
            .await?;
        timer.record();
        Ok(count.0)
    }
}
