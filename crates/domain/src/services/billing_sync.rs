//! Maps payment provider events onto invoice and plan state changes.

use crate::models::billing::invoice_status;
use crate::models::user::PlanStatus;
use crate::models::webhook::{
    stripe_event_type, GoCardlessEvent, StripeEvent, StripeInvoice, StripeSubscription,
};

/// What a Stripe event asks us to do.
#[derive(Debug, Clone)]
pub enum StripeAction {
    /// Upsert the invoice with the given status and move the owner's plan.
    Invoice {
        invoice: StripeInvoice,
        invoice_status: &'static str,
        plan_status: PlanStatus,
    },
    /// Move the subscriber's plan.
    Subscription {
        subscription: StripeSubscription,
        plan_status: PlanStatus,
    },
    /// Event type we do not act on, or a subscription status with no
    /// plan meaning (e.g. `incomplete`).
    Ignored,
}

/// Stripe subscription status to plan status.
pub fn plan_status_for_subscription(status: &str) -> Option<PlanStatus> {
    match status {
        "active" | "trialing" => Some(PlanStatus::Active),
        "past_due" | "unpaid" => Some(PlanStatus::PastDue),
        "canceled" | "incomplete_expired" => Some(PlanStatus::Cancelled),
        _ => None,
    }
}

/// Decodes the event object for the types we handle.
pub fn classify_stripe_event(event: &StripeEvent) -> Result<StripeAction, serde_json::Error> {
    let object = || event.data.object.clone();

    let action = match event.event_type.as_str() {
        stripe_event_type::INVOICE_PAID => StripeAction::Invoice {
            invoice: serde_json::from_value(object())?,
            invoice_status: invoice_status::PAID,
            plan_status: PlanStatus::Active,
        },
        stripe_event_type::INVOICE_PAYMENT_FAILED => StripeAction::Invoice {
            invoice: serde_json::from_value(object())?,
            invoice_status: invoice_status::FAILED,
            plan_status: PlanStatus::PastDue,
        },
        stripe_event_type::SUBSCRIPTION_UPDATED => {
            let subscription: StripeSubscription = serde_json::from_value(object())?;
            match plan_status_for_subscription(&subscription.status) {
                Some(plan_status) => StripeAction::Subscription {
                    subscription,
                    plan_status,
                },
                None => StripeAction::Ignored,
            }
        }
        stripe_event_type::SUBSCRIPTION_DELETED => StripeAction::Subscription {
            subscription: serde_json::from_value(object())?,
            plan_status: PlanStatus::Cancelled,
        },
        _ => StripeAction::Ignored,
    };
    Ok(action)
}

/// What a single GoCardless event asks us to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoCardlessAction {
    Payment {
        payment_id: String,
        mandate_id: Option<String>,
        invoice_status: &'static str,
        plan_status: PlanStatus,
    },
    MandateLapsed {
        mandate_id: String,
    },
    Ignored,
}

pub fn classify_gocardless_event(event: &GoCardlessEvent) -> GoCardlessAction {
    match (event.resource_type.as_str(), event.action.as_str()) {
        ("payments", "confirmed" | "paid_out") => match &event.links.payment {
            Some(payment_id) => GoCardlessAction::Payment {
                payment_id: payment_id.clone(),
                mandate_id: event.links.mandate.clone(),
                invoice_status: invoice_status::PAID,
                plan_status: PlanStatus::Active,
            },
            None => GoCardlessAction::Ignored,
        },
        ("payments", "failed") => match &event.links.payment {
            Some(payment_id) => GoCardlessAction::Payment {
                payment_id: payment_id.clone(),
                mandate_id: event.links.mandate.clone(),
                invoice_status: invoice_status::FAILED,
                plan_status: PlanStatus::PastDue,
            },
            None => GoCardlessAction::Ignored,
        },
        ("mandates", "cancelled" | "failed" | "expired") => match &event.links.mandate {
            Some(mandate_id) => GoCardlessAction::MandateLapsed {
                mandate_id: mandate_id.clone(),
            },
            None => GoCardlessAction::Ignored,
        },
        _ => GoCardlessAction::Ignored,
    }
}
