use serde::{Deserialize, Serialize};

use crate::db_types::{Cfa, Order, PayoutRequest, UserId, WalletTransaction};

/// A ledger row together with the wallet balance that resulted from applying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerUpdate {
    pub transaction: WalletTransaction,
    pub new_balance: Cfa,
}

/// The outcome of an all-or-nothing wallet checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletCheckout {
    pub orders: Vec<Order>,
    pub debit: LedgerUpdate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryResult {
    pub order: Order,
    /// Only present when this call released the escrow. Repeated deliveries return `None`.
    pub payout: Option<LedgerUpdate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfirmationResult {
    /// A wallet top-up was confirmed. `credited` holds the ledger rows that moved from pending to completed by this
    /// call.
    Recharge { user: UserId, credited: Vec<WalletTransaction>, new_balance: Option<Cfa> },
    /// A checkout was confirmed. `paid_orders` holds the orders that moved into escrow because of this call.
    Purchase { paid_orders: Vec<Order> },
    /// The payment was confirmed but the confirmed payments for the reference do not cover what the orders owe. The
    /// orders stay pending.
    Underpaid { reference: String, received: Cfa, owed: Cfa },
}

impl ConfirmationResult {
    /// True when the confirmation had already been processed and nothing changed.
    pub fn is_noop(&self) -> bool {
        match self {
            ConfirmationResult::Recharge { credited, .. } => credited.is_empty(),
            ConfirmationResult::Purchase { paid_orders } => paid_orders.is_empty(),
            ConfirmationResult::Underpaid { .. } => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutResolution {
    pub request: PayoutRequest,
    /// The compensating credit, for rejected requests.
    pub refund: Option<LedgerUpdate>,
}
