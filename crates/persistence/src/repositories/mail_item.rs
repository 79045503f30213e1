//! Mail item repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::MailItemEntity;
use crate::metrics::QueryTimer;

/// Fields for a newly scanned item.
#[derive(Debug, Clone)]
pub struct NewMailItem<'a> {
    pub user_id: Uuid,
    pub sender_name: &'a str,
    pub subject: Option<&'a str>,
    pub tag: Option<&'a str>,
    pub scan_url: Option<&'a str>,
    pub received_at: Option<DateTime<Utc>>,
}

/// Keyset position in the inbox ordering `(received_at DESC, id DESC)`.
pub type InboxCursor = (DateTime<Utc>, Uuid);

#[derive(Clone)]
pub struct MailItemRepository {
    pool: PgPool,
}

impl MailItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, item: NewMailItem<'_>) -> Result<MailItemEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_mail_item");
        let result = sqlx::query_as::<_, MailItemEntity>(
            r#"
            INSERT INTO mail_items (user_id, sender_name, subject, tag, scan_url, received_at)
            VALUES ($1, $2, $3, $4, $5, COALESCE($6, NOW()))
            RETURNING *
            "#,
        )
        .bind(item.user_id)
        .bind(item.sender_name.trim())
        .bind(item.subject)
        .bind(item.tag)
        .bind(item.scan_url)
        .bind(item.received_at)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<MailItemEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_mail_item_by_id");
        let result = sqlx::query_as::<_, MailItemEntity>("SELECT * FROM mail_items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Item owned by `user_id`; another customer's item reads as absent.
    pub async fn find_for_user(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<MailItemEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_mail_item_for_user");
        let result = sqlx::query_as::<_, MailItemEntity>(
            "SELECT * FROM mail_items WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// One inbox page strictly after `cursor`.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        cursor: Option<InboxCursor>,
        limit: i64,
        include_archived: bool,
    ) -> Result<Vec<MailItemEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_mail_items_for_user");
        let (cursor_at, cursor_id) = match cursor {
            Some((at, id)) => (Some(at), Some(id)),
            None => (None, None),
        };
        let result = sqlx::query_as::<_, MailItemEntity>(
            r#"
            SELECT * FROM mail_items
            WHERE user_id = $1
              AND ($2 OR archived_at IS NULL)
              AND ($3::timestamptz IS NULL OR (received_at, id) < ($3, $4))
            ORDER BY received_at DESC, id DESC
            LIMIT $5
            "#,
        )
        .bind(user_id)
        .bind(include_archived)
        .bind(cursor_at)
        .bind(cursor_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Customer edits. `tag = Some("")` clears the tag; `archived` toggles
    /// `archived_at` while keeping the original archive time.
    pub async fn update_for_user(
        &self,
        id: Uuid,
        user_id: Uuid,
        tag: Option<&str>,
        is_read: Option<bool>,
        archived: Option<bool>,
    ) -> Result<Option<MailItemEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_mail_item_for_user");
        let result = sqlx::query_as::<_, MailItemEntity>(
            r#"
            UPDATE mail_items SET
                tag = CASE
                    WHEN $3::text IS NULL THEN tag
                    WHEN BTRIM($3) = '' THEN NULL
                    ELSE BTRIM($3)
                END,
                is_read = COALESCE($4, is_read),
                archived_at = CASE
                    WHEN $5::boolean IS NULL THEN archived_at
                    WHEN $5 THEN COALESCE(archived_at, NOW())
                    ELSE NULL
                END,
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(tag)
        .bind(is_read)
        .bind(archived)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }
}
