//! Invoice entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::billing::{BillingProvider, Invoice};

/// Database enum for `invoices.provider`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "billing_provider", rename_all = "lowercase")]
pub enum BillingProviderDb {
    Stripe,
    Gocardless,
}

impl From<BillingProviderDb> for BillingProvider {
    fn from(db: BillingProviderDb) -> Self {
        match db {
            BillingProviderDb::Stripe => BillingProvider::Stripe,
            BillingProviderDb::Gocardless => BillingProvider::Gocardless,
        }
    }
}

/// Database row mapping for the invoices table.
#[derive(Debug, Clone, FromRow)]
pub struct InvoiceEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider: BillingProviderDb,
    pub stripe_invoice_id: Option<String>,
    pub gocardless_payment_id: Option<String>,
    pub amount_pence: i64,
    pub currency: String,
    pub status: String,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<InvoiceEntity> for Invoice {
    fn from(entity: InvoiceEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            provider: entity.provider.into(),
            external_id: entity.stripe_invoice_id.or(entity.gocardless_payment_id),
            amount_pence: entity.amount_pence,
            currency: entity.currency,
            status: entity.status,
            period_start: entity.period_start,
            period_end: entity.period_end,
            paid_at: entity.paid_at,
            created_at: entity.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_id_prefers_provider_column() {
        let now = Utc::now();
        let entity = InvoiceEntity {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            provider: BillingProviderDb::Gocardless,
            stripe_invoice_id: None,
            gocardless_payment_id: Some("PM0001".to_string()),
            amount_pence: 0,
            currency: "gbp".to_string(),
            status: "paid".to_string(),
            period_start: None,
            period_end: None,
            paid_at: Some(now),
            created_at: now,
            updated_at: now,
        };
        let invoice: Invoice = entity.into();
        assert_eq!(invoice.external_id.as_deref(), Some("PM0001"));
        assert_eq!(invoice.provider, BillingProvider::Gocardless);
    }
}
