use serde::{Deserialize, Serialize};
use settlement_common::Cfa;

/// ISO 4217 code of the West African CFA franc, as the processor expects it.
pub const ISO_CURRENCY: &str = "XOF";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub amount: Cfa,
    pub currency: String,
    /// National form, without the country prefix.
    pub phone_number: String,
    /// Echoed back by the processor in status reports and callbacks.
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

impl PaymentRequest {
    pub fn new<S: Into<String>>(amount: Cfa, phone_number: S, reference: S) -> Self {
        Self {
            amount,
            currency: ISO_CURRENCY.to_string(),
            phone_number: phone_number.into(),
            reference: reference.into(),
            callback_url: None,
        }
    }

    pub fn with_callback_url(mut self, url: Option<String>) -> Self {
        self.callback_url = url;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub transaction_id: String,
    /// A checkout page for the payer, for processors that confirm on the web rather than via USSD.
    #[serde(default)]
    pub payment_url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusResponse {
    pub transaction_id: String,
    pub status: String,
    #[serde(default)]
    pub reference: Option<String>,
}

/// The body the processor posts to the callback URL.
///
/// Some processors only send the transaction id, others only the merchant reference, so both are optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackPayload {
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    pub status: String,
}
