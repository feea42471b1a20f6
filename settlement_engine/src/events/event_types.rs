use serde::{Deserialize, Serialize};

use crate::db_types::{Cfa, Order, PayoutRequest, UserId};

/// An order's payment was confirmed and the seller's share is now held in escrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// An order was delivered and its escrow credited to the seller's wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutReleasedEvent {
    pub order: Order,
    pub seller: UserId,
    pub amount: Cfa,
    pub new_balance: Cfa,
}

impl PayoutReleasedEvent {
    pub fn new(order: Order, seller: UserId, amount: Cfa, new_balance: Cfa) -> Self {
        Self { order, seller, amount, new_balance }
    }
}

/// An admin approved or rejected a payout request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutResolvedEvent {
    pub request: PayoutRequest,
    pub admin: UserId,
}

impl PayoutResolvedEvent {
    pub fn new(request: PayoutRequest, admin: UserId) -> Self {
        Self { request, admin }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    OrderPaid(OrderPaidEvent),
    PayoutReleased(PayoutReleasedEvent),
    PayoutResolved(PayoutResolvedEvent),
}
