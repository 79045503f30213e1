//! Invoice repository. Provider ids make every write idempotent.

use sqlx::PgPool;
use uuid::Uuid;

use domain::models::billing::InvoiceUpsert;

use crate::entities::InvoiceEntity;
use crate::metrics::QueryTimer;

#[derive(Clone)]
pub struct InvoiceRepository {
    pool: PgPool,
}

impl InvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or refresh a Stripe invoice keyed by `stripe_invoice_id`.
    /// `paid_at` is set the first time the invoice is seen as paid.
    pub async fn upsert_stripe(&self, invoice: &InvoiceUpsert) -> Result<InvoiceEntity, sqlx::Error> {
        let timer = QueryTimer::new("upsert_stripe_invoice");
        let result = sqlx::query_as::<_, InvoiceEntity>(
            r#"
            INSERT INTO invoices (
                user_id, provider, stripe_invoice_id, amount_pence, currency,
                status, period_start, period_end, paid_at
            )
            VALUES (
                $1, 'stripe', $2, $3, $4,
                $5, $6, $7, CASE WHEN $5 = 'paid' THEN NOW() END
            )
            ON CONFLICT (stripe_invoice_id) DO UPDATE SET
                amount_pence = EXCLUDED.amount_pence,
                currency = EXCLUDED.currency,
                status = EXCLUDED.status,
                period_start = COALESCE(EXCLUDED.period_start, invoices.period_start),
                period_end = COALESCE(EXCLUDED.period_end, invoices.period_end),
                paid_at = COALESCE(invoices.paid_at, EXCLUDED.paid_at),
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(invoice.user_id)
        .bind(&invoice.external_id)
        .bind(invoice.amount_pence)
        .bind(invoice.currency.to_lowercase())
        .bind(invoice.status)
        .bind(invoice.period_start)
        .bind(invoice.period_end)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Insert or refresh a GoCardless payment keyed by `gocardless_payment_id`.
    /// Payment events carry no amount, so an existing amount is kept.
    pub async fn upsert_gocardless(
        &self,
        user_id: Uuid,
        payment_id: &str,
        status: &str,
    ) -> Result<InvoiceEntity, sqlx::Error> {
        let timer = QueryTimer::new("upsert_gocardless_invoice");
        let result = sqlx::query_as::<_, InvoiceEntity>(
            r#"
            INSERT INTO invoices (user_id, provider, gocardless_payment_id, status, paid_at)
            VALUES ($1, 'gocardless', $2, $3, CASE WHEN $3 = 'paid' THEN NOW() END)
            ON CONFLICT (gocardless_payment_id) DO UPDATE SET
                status = EXCLUDED.status,
                paid_at = COALESCE(invoices.paid_at, EXCLUDED.paid_at),
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(payment_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<InvoiceEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_invoices_for_user");
        let result = sqlx::query_as::<_, InvoiceEntity>(
            r#"
            SELECT * FROM invoices
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

    pub async fn latest_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<InvoiceEntity>, sqlx::Error> {
        let timer = QueryTimer::new("latest_invoice_for_user");
        let result = sqlx::query_as::<_, InvoiceEntity>(
            r#"
            SELECT * FROM invoices
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }
}
