//! Settlement Engine
//!
//! The settlement engine is the money-movement core of a multi-role marketplace. It splits multi-seller carts into
//! per-seller orders, computes commission splits, holds seller proceeds in escrow until delivery, reconciles
//! asynchronous mobile-money confirmations against wallets and orders, and manages seller withdrawals.
//!
//! The library is divided into these main sections:
//! 1. Backend contracts ([`mod@traits`]) and their SQLite implementation ([`SqliteDatabase`]). You should never need to
//!    access the database directly. Instead, use the public API. The exception is the data types used in the
//!    database, defined in [`mod@db_types`].
//! 2. The public API (`se_api`). Order splitting, escrow, the payment gateway boundary, wallets and payouts. Each API
//!    takes the backend it needs as a constructor argument.
//! 3. Commission arithmetic ([`mod@commission`]) and small helpers ([`mod@helpers`]) such as phone normalisation and
//!    the payment reference format.
//!
//! The engine also emits events ([`mod@events`]) when an order enters escrow, when a payout is released to a seller and
//! when a payout request is resolved. Hooks can subscribe to them to send notifications.
pub mod commission;
pub mod db_types;
pub mod events;
pub mod helpers;
mod se_api;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

pub use commission::{CommissionRate, DEFAULT_COMMISSION_RATE, PARTNER_COMMISSION_RATE};
pub use se_api::{
    escrow_api::EscrowApi,
    gateway_api::{GatewayAction, GatewayApiError, GatewayRequest, GatewayResponse, PaymentGatewayApi},
    order_flow_api::OrderFlowApi,
    order_objects,
    payout_api::PayoutApi,
    wallet_api::{Reconciliation, WalletApi, WalletSummary},
};
#[cfg(feature = "sqlite")]
pub use sqlite::{db::db_url, SqliteDatabase};
pub use traits::{
    GatewayError,
    LedgerManagement,
    PaymentProcessor,
    PayoutManagement,
    SettlementDatabase,
    SettlementError,
};
