//! Payment-provider events as seen by the booking service
//!
//! The HTTP layer verifies and parses the raw webhook; these are the fields
//! the audit log needs.

use serde_json::{json, Value};

/// A completed checkout session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutCompleted {
    pub session_id: Option<String>,
    /// First of customer details, customer email, metadata email.
    pub email: Option<String>,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    pub payment_status: Option<String>,
    pub customer: Option<String>,
}

impl CheckoutCompleted {
    pub(crate) fn metadata(&self) -> Value {
        json!({
            "amount_total": self.amount_total,
            "currency": self.currency,
            "payment_status": self.payment_status,
            "customer": self.customer,
        })
    }
}

/// A succeeded payment intent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentSucceeded {
    pub payment_intent_id: Option<String>,
    /// Receipt email, falling back to metadata email.
    pub email: Option<String>,
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub status: Option<String>,
}

impl PaymentSucceeded {
    pub(crate) fn metadata(&self) -> Value {
        json!({
            "amount": self.amount,
            "currency": self.currency,
            "status": self.status,
            "payment_intent_id": self.payment_intent_id,
        })
    }
}
