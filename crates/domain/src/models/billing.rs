//! Invoices and the customer billing overview.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::PlanStatus;

/// Which payment provider raised an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingProvider {
    Stripe,
    Gocardless,
}

impl BillingProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingProvider::Stripe => "stripe",
            BillingProvider::Gocardless => "gocardless",
        }
    }
}

/// Invoice status values stored in `invoices.status`.
pub mod invoice_status {
    pub const DRAFT: &str = "draft";
    pub const OPEN: &str = "open";
    pub const PAID: &str = "paid";
    pub const VOID: &str = "void";
    pub const UNCOLLECTIBLE: &str = "uncollectible";
    pub const FAILED: &str = "failed";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Invoice {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider: BillingProvider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub amount_pence: i64,
    pub currency: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_end: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Values written by a provider webhook into `invoices`.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceUpsert {
    pub user_id: Uuid,
    pub external_id: String,
    pub amount_pence: i64,
    pub currency: String,
    pub status: &'static str,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct BillingOverview {
    pub plan_status: PlanStatus,
    pub has_active_plan: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_invoice: Option<Invoice>,
}

impl BillingOverview {
    pub fn new(plan_status: PlanStatus, latest_invoice: Option<Invoice>) -> Self {
        Self {
            plan_status,
            has_active_plan: plan_status == PlanStatus::Active,
            latest_invoice,
        }
    }
}
