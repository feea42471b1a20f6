use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::Cfa;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInitiation {
    pub amount: Cfa,
    /// National number, already normalized.
    pub phone: String,
    /// The payment reference, echoed back by the processor on confirmation.
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiatedPayment {
    pub transaction_id: String,
    /// Where the payer approves the payment, for processors with a hosted checkout page.
    pub payment_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatusReport {
    pub transaction_id: String,
    /// The raw processor status, e.g. `pending`, `success` or `failed`.
    pub status: String,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Payment service unreachable. {0}")]
    Network(String),
    #[error("Payment service returned an error. Status {status}. {message}")]
    Upstream { status: u16, message: String },
    #[error("Payment service returned a malformed response. {0}")]
    MalformedResponse(String),
    #[error("Payment was rejected by the payment service. {0}")]
    Rejected(String),
}

/// A client of an external mobile-money processor.
///
/// Payments are asynchronous: `initiate_payment` only asks the payer to approve the payment. Confirmation arrives
/// later, either pushed by the processor to the webhook or pulled with `check_payment_status`.
#[allow(async_fn_in_trait)]
pub trait PaymentProcessor {
    async fn initiate_payment(&self, request: PaymentInitiation) -> Result<InitiatedPayment, GatewayError>;

    async fn check_payment_status(&self, transaction_id: &str) -> Result<PaymentStatusReport, GatewayError>;
}
