//! User and session repositories.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{KycStatusDb, PlanStatusDb, SessionEntity, UserEntity};
use crate::metrics::QueryTimer;

/// Fields for a new account.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub company_name: Option<&'a str>,
}

/// Repository for user-related database operations.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new account. A duplicate email (case-insensitive) surfaces as
    /// a unique violation.
    pub async fn create(&self, user: NewUser<'_>) -> Result<UserEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_user");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, company_name)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(user.email.trim())
        .bind(user.password_hash)
        .bind(user.first_name.trim())
        .bind(user.last_name.trim())
        .bind(user.company_name.map(str::trim))
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_by_id");
        let result = sqlx::query_as::<_, UserEntity>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_by_email");
        let result = sqlx::query_as::<_, UserEntity>(
            "SELECT * FROM users WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_by_stripe_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_by_stripe_customer");
        let result = sqlx::query_as::<_, UserEntity>(
            "SELECT * FROM users WHERE stripe_customer_id = $1",
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_by_gocardless_mandate_id(
        &self,
        mandate_id: &str,
    ) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_by_gocardless_mandate");
        let result = sqlx::query_as::<_, UserEntity>(
            "SELECT * FROM users WHERE gocardless_mandate_id = $1",
        )
        .bind(mandate_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Admin listing with optional email/name search, newest first.
    pub async fn list(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_users");
        let pattern = search.map(|s| format!("%{}%", s.trim()));
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            SELECT * FROM users
            WHERE $1::text IS NULL
               OR email ILIKE $1
               OR first_name ILIKE $1
               OR last_name ILIKE $1
               OR company_name ILIKE $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn count(&self, search: Option<&str>) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_users");
        let pattern = search.map(|s| format!("%{}%", s.trim()));
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM users
            WHERE $1::text IS NULL
               OR email ILIKE $1
               OR first_name ILIKE $1
               OR last_name ILIKE $1
               OR company_name ILIKE $1
            "#,
        )
        .bind(pattern)
        .fetch_one(&self.pool)
        .await?;
        timer.record();
        Ok(count.0)
    }

    /// Partial admin update. None values are preserved.
    pub async fn admin_update(
        &self,
        id: Uuid,
        plan_status: Option<PlanStatusDb>,
        kyc_status: Option<KycStatusDb>,
        is_admin: Option<bool>,
    ) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("admin_update_user");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            UPDATE users SET
                plan_status = COALESCE($2, plan_status),
                kyc_status = COALESCE($3, kyc_status),
                is_admin = COALESCE($4, is_admin),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(plan_status)
        .bind(kyc_status)
        .bind(is_admin)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Returns the number of rows updated (0 or 1).
    pub async fn set_plan_status(
        &self,
        id: Uuid,
        plan_status: PlanStatusDb,
    ) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("set_user_plan_status");
        let result = sqlx::query(
            "UPDATE users SET plan_status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(plan_status)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected())
    }

    pub async fn set_plan_status_by_mandate(
        &self,
        mandate_id: &str,
        plan_status: PlanStatusDb,
    ) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("set_plan_status_by_mandate");
        let result = sqlx::query(
            r#"
            UPDATE users SET plan_status = $2, updated_at = NOW()
            WHERE gocardless_mandate_id = $1
            "#,
        )
        .bind(mandate_id)
        .bind(plan_status)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected())
    }

    /// Records the Stripe customer on a user found through checkout metadata.
    pub async fn set_stripe_customer_id(
        &self,
        id: Uuid,
        customer_id: &str,
    ) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("set_stripe_customer_id");
        let result = sqlx::query(
            r#"
            UPDATE users SET stripe_customer_id = $2, updated_at = NOW()
            WHERE id = $1 AND stripe_customer_id IS DISTINCT FROM $2
            "#,
        )
        .bind(id)
        .bind(customer_id)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected())
    }

    pub async fn set_kyc_status(
        &self,
        id: Uuid,
        kyc_status: KycStatusDb,
        applicant_id: Option<&str>,
    ) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("set_user_kyc_status");
        let result = sqlx::query(
            r#"
            UPDATE users SET
                kyc_status = $2,
                sumsub_applicant_id = COALESCE($3, sumsub_applicant_id),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(kyc_status)
        .bind(applicant_id)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected())
    }

    /// Flags an address as undeliverable. Keeps the first bounce time.
    pub async fn mark_email_bounced(&self, email: &str) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("mark_email_bounced");
        let result = sqlx::query(
            r#"
            UPDATE users SET
                email_bounced_at = COALESCE(email_bounced_at, NOW()),
                updated_at = NOW()
            WHERE LOWER(email) = LOWER($1)
            "#,
        )
        .bind(email.trim())
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected())
    }
}

/// Repository for browser sessions. Only token hashes are stored.
#[derive(Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<SessionEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_session");
        let result = sqlx::query_as::<_, SessionEntity>(
            r#"
            INSERT INTO sessions (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Resolves an unexpired session to its user and bumps `last_seen_at`.
    pub async fn find_active_user(
        &self,
        token_hash: &str,
    ) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_session_user");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            WITH s AS (
                UPDATE sessions SET last_seen_at = NOW()
                WHERE token_hash = $1 AND expires_at > NOW()
                RETURNING user_id
            )
            SELECT u.* FROM users u JOIN s ON s.user_id = u.id
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn delete_by_token_hash(&self, token_hash: &str) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("delete_session");
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        timer.record();
        Ok(result.rows_affected())
    }

    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("delete_expired_sessions");
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;
        timer.record();
        Ok(result.rows_affected())
    }
}
