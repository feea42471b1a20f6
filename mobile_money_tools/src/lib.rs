//! A client for the upstream mobile-money processor (Wave, Orange Money, MTN, Moov).
//!
//! The processor exposes a small JSON API: a payment is initiated against a phone number and a merchant reference,
//! and its status can be polled by transaction id. Confirmations are also pushed to a callback URL, see
//! [`CallbackPayload`].
mod api;
mod config;
mod data_objects;
mod error;

pub use api::{is_valid_transaction_id, MobileMoneyApi};
pub use config::MobileMoneyConfig;
pub use data_objects::{CallbackPayload, PaymentRequest, PaymentResponse, PaymentStatusResponse};
pub use error::MobileMoneyApiError;
