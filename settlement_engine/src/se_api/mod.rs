//! # Settlement engine public API
//!
//! The `se_api` module exposes the programmatic API for the settlement engine. The API is modular, so that clients of
//! the API can pick and choose the functionality they want.
//!
//! * [`order_flow_api`] splits a cart into one order per seller and persists them under a shared payment reference.
//! * [`escrow_api`] drives the escrow lifecycle of an order: manual payment confirmation, delivery and payout.
//! * [`gateway_api`] is the boundary to the mobile-money processor: initiating payments and applying their
//!   confirmations, whether they are pushed (callback) or pulled (verify).
//! * [`wallet_api`] gives access to wallet balances, the settlement ledger and balance reconciliation.
//! * [`payout_api`] handles seller withdrawal requests and their admin resolution.
//!
//! # API usage
//!
//! An API instance is created by supplying a database backend that implements the backend traits the API needs.
//!
//! ```rust,ignore
//! use settlement_engine::{events::EventProducers, EscrowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = EscrowApi::new(db, EventProducers::default());
//! let result = api.mark_delivered(order_id, "seller-42").await?;
//! ```
pub mod escrow_api;
pub mod gateway_api;
pub mod order_flow_api;
pub mod order_objects;
pub mod payout_api;
pub mod wallet_api;
