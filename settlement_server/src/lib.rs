//! # Settlement server
//! This crate hosts the HTTP server for the marketplace settlement engine. It is responsible for:
//! * Taking checkouts and splitting them into per-seller orders.
//! * Starting mobile-money payments, and receiving the processor's signed confirmations on a webhook.
//! * Delivery confirmation, which releases escrowed funds to sellers.
//! * Wallet queries and top-ups.
//! * Seller payout requests and their resolution by admins.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/payments/gateway`: The payment gateway boundary (`initiate` and `verify` actions).
//! * `/webhooks/mobile-money`: Payment status pushes from the processor. Calls must carry an HMAC signature.
//! * `/api/...`: Checkout, orders, wallets, escrow and payouts. The caller is identified by the auth provider's
//!   headers; see [auth](auth/index.html).
pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;

pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
