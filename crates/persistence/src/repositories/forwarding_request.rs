//! Forwarding request repository.
//!
//! Status changes go through [`ForwardingRequestRepository::apply_transition`],
//! which only writes when the row is still in the status the caller read.

use sqlx::PgPool;
use uuid::Uuid;

use domain::models::forwarding::DispatchDetails;

use crate::entities::{ForwardingRequestEntity, ForwardingStatusDb, MailItemStatusDb};
use crate::metrics::QueryTimer;

/// Result of asking to forward a mail item.
#[derive(Debug)]
pub enum CreateForwardingOutcome {
    Created(ForwardingRequestEntity),
    /// No such item, or it belongs to someone else.
    MailItemNotFound,
    /// The item has already left the mailroom.
    MailItemUnavailable(MailItemStatusDb),
}

/// Result of a guarded status update.
#[derive(Debug)]
pub enum TransitionOutcome {
    Applied(ForwardingRequestEntity),
    /// The row was no longer in the expected status when the update ran.
    Stale,
}

#[derive(Clone)]
pub struct ForwardingRequestRepository {
    pool: PgPool,
}

impl ForwardingRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a request for a mail item the customer owns.
    ///
    /// A second open request for the same item is refused by the
    /// `idx_forwarding_one_open_per_item` partial unique index and surfaces as
    /// a unique violation.
    pub async fn create(
        &self,
        user_id: Uuid,
        mail_item_id: Uuid,
        to_name: &str,
        address: &str,
    ) -> Result<CreateForwardingOutcome, sqlx::Error> {
        let timer = QueryTimer::new("create_forwarding_request");
        let mut tx = self.pool.begin().await?;

        let item: Option<(MailItemStatusDb,)> = sqlx::query_as(
            r#"
            SELECT status FROM mail_items
            WHERE id = $1 AND user_id = $2
            FOR UPDATE
            "#,
        )
        .bind(mail_item_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match item {
            None => CreateForwardingOutcome::MailItemNotFound,
            Some((status,)) if status != MailItemStatusDb::Received => {
                CreateForwardingOutcome::MailItemUnavailable(status)
            }
            Some(_) => {
                let request = sqlx::query_as::<_, ForwardingRequestEntity>(
                    r#"
                    INSERT INTO forwarding_requests (mail_item_id, user_id, to_name, address)
                    VALUES ($1, $2, $3, $4)
                    RETURNING *
                    "#,
                )
                .bind(mail_item_id)
                .bind(user_id)
                .bind(to_name.trim())
                .bind(address.trim())
                .fetch_one(&mut *tx)
                .await?;
                CreateForwardingOutcome::Created(request)
            }
        };

        tx.commit().await?;
        timer.record();
        Ok(outcome)
    }

    pub async fn find_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<ForwardingRequestEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_forwarding_request_by_id");
        let result = sqlx::query_as::<_, ForwardingRequestEntity>(
            "SELECT * FROM forwarding_requests WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_for_user(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ForwardingRequestEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_forwarding_request_for_user");
        let result = sqlx::query_as::<_, ForwardingRequestEntity>(
            "SELECT * FROM forwarding_requests WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn list_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ForwardingRequestEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_forwarding_requests_for_user");
        let result = sqlx::query_as::<_, ForwardingRequestEntity>(
            r#"
            SELECT * FROM forwarding_requests
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Admin queue, oldest first so staff work it in arrival order.
    pub async fn list(
        &self,
        status: Option<ForwardingStatusDb>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ForwardingRequestEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_forwarding_requests");
        let result = sqlx::query_as::<_, ForwardingRequestEntity>(
            r#"
            SELECT * FROM forwarding_requests
            WHERE $1::forwarding_status IS NULL OR status = $1
            ORDER BY created_at ASC, id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn count(&self, status: Option<ForwardingStatusDb>) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_forwarding_requests");
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM forwarding_requests
            WHERE $1::forwarding_status IS NULL OR status = $1
            "#,
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;
        timer.record();
        Ok(count.0)
    }

    /// Moves a request from `expected` to `to`, stamping the matching
    /// `*_at` column. Dispatch details only overwrite the fields supplied.
    /// On reaching `Dispatched` the mail item becomes `forwarded` in the
    /// same transaction.
    pub async fn apply_transition(
        &self,
        id: Uuid,
        expected: ForwardingStatusDb,
        to: ForwardingStatusDb,
        details: Option<&DispatchDetails>,
    ) -> Result<TransitionOutcome, sqlx::Error> {
        let timer = QueryTimer::new("apply_forwarding_transition");

        // Column names come from a closed set, never from input.
        let stamp = match to.timestamp_column() {
            Some(column) => format!("{} = NOW(),", column),
            None => String::new(),
        };
        let sql = format!(
            r#"
            UPDATE forwarding_requests SET
                status = $3,
                {stamp}
                courier = COALESCE($4, courier),
                tracking_number = COALESCE($5, tracking_number),
                admin_notes = COALESCE($6, admin_notes),
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
            stamp = stamp
        );

        let details = details.cloned().unwrap_or_default();
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, ForwardingRequestEntity>(&sql)
            .bind(id)
            .bind(expected)
            .bind(to)
            .bind(details.courier)
            .bind(details.tracking_number)
            .bind(details.admin_notes)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(request) = updated else {
            tx.rollback().await?;
            timer.record();
            return Ok(TransitionOutcome::Stale);
        };

        if to == ForwardingStatusDb::Dispatched {
            sqlx::query(
                r#"
                UPDATE mail_items SET status = 'forwarded', updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(request.mail_item_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        timer.record();
        Ok(TransitionOutcome::Applied(request))
    }
}
