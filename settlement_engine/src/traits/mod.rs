//! # Backend interface contracts
//!
//! This module defines the behaviour that a storage backend must expose in order to be used by the settlement
//! engine, plus the contract for the upstream mobile-money processor.
//!
//! * [`LedgerManagement`] owns profiles, cached wallet balances and the append-only wallet ledger. Every method that
//!   moves money pairs a balance delta with exactly one ledger row inside one database transaction.
//! * [`SettlementDatabase`] is the highest level of behaviour: order creation for a checkout, escrow transitions and
//!   the idempotent confirmation of mobile-money payments.
//! * [`PayoutManagement`] handles seller withdrawals and their admin resolution.
//! * [`PaymentProcessor`] is implemented by clients of the external mobile-money processor.
mod data_objects;
mod ledger_management;
mod payment_processor;
mod payout_management;
mod settlement_database;

pub use data_objects::{ConfirmationResult, DeliveryResult, LedgerUpdate, PayoutResolution, WalletCheckout};
pub use ledger_management::LedgerManagement;
pub use payment_processor::{GatewayError, InitiatedPayment, PaymentInitiation, PaymentProcessor, PaymentStatusReport};
pub use payout_management::PayoutManagement;
pub use settlement_database::{SettlementDatabase, SettlementError};
