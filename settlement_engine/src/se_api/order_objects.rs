use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Cfa, NewOrderItem, Order, OrderStatusType, PaymentMethod, PayoutStatus, UserId},
    traits::{InitiatedPayment, LedgerUpdate},
};

/// A line of a buyer's cart, as submitted at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    /// The seller of the product. Items without one are grouped under the unknown seller.
    pub seller_id: Option<UserId>,
    pub quantity: i64,
    /// Unit price.
    pub price: Cfa,
}

impl CartItem {
    pub fn new<S: Into<String>>(product_id: S, seller_id: Option<UserId>, quantity: i64, price: Cfa) -> Self {
        Self { product_id: product_id.into(), seller_id, quantity, price }
    }

    /// `price × quantity`, or `None` if the result does not fit.
    pub fn line_total(&self) -> Option<Cfa> {
        self.price.checked_mul(self.quantity)
    }
}

impl From<CartItem> for NewOrderItem {
    fn from(item: CartItem) -> Self {
        Self { product_id: item.product_id, seller_id: item.seller_id, quantity: item.quantity, price: item.price }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutOptions {
    /// Overrides the initial status, which is otherwise `Paid` for wallet checkouts and `Pending` for mobile money.
    pub status: Option<OrderStatusType>,
    /// The payment reference shared by all the orders. Generated from the buyer id when absent. Supplying the
    /// reference of an earlier checkout retries it.
    pub payment_ref: Option<String>,
}

impl CheckoutOptions {
    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_payment_ref<S: Into<String>>(mut self, payment_ref: S) -> Self {
        self.payment_ref = Some(payment_ref.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutResult {
    pub payment_ref: String,
    pub orders: Vec<Order>,
    /// The buyer debit, for wallet checkouts.
    pub wallet_debit: Option<LedgerUpdate>,
    /// The payment started with the processor, for mobile-money checkouts.
    pub payment: Option<InitiatedPayment>,
}

impl CheckoutResult {
    pub fn total(&self) -> Cfa {
        self.orders.iter().map(|o| o.total_amount).sum()
    }
}

/// The body of a checkout request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub payment_method: PaymentMethod,
    pub items: Vec<CartItem>,
    /// The payer's phone number, required for mobile-money checkouts.
    pub phone: Option<String>,
    #[serde(default)]
    pub payment_ref: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub buyer_id: Option<UserId>,
    pub seller_id: Option<UserId>,
    pub payment_ref: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub status: Option<Vec<OrderStatusType>>,
    pub payout_status: Option<Vec<PayoutStatus>>,
}

impl OrderQueryFilter {
    pub fn with_buyer_id(mut self, buyer_id: UserId) -> Self {
        self.buyer_id = Some(buyer_id);
        self
    }

    pub fn with_seller_id(mut self, seller_id: UserId) -> Self {
        self.seller_id = Some(seller_id);
        self
    }

    pub fn with_payment_ref<S: Into<String>>(mut self, payment_ref: S) -> Self {
        self.payment_ref = Some(payment_ref.into());
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn with_payout_status(mut self, status: PayoutStatus) -> Self {
        self.payout_status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.buyer_id.is_none() &&
            self.seller_id.is_none() &&
            self.payment_ref.is_none() &&
            self.since.is_none() &&
            self.until.is_none() &&
            self.status.as_ref().map(|s| s.is_empty()).unwrap_or(true) &&
            self.payout_status.as_ref().map(|s| s.is_empty()).unwrap_or(true)
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "No filters.")?;
            return Ok(());
        }
        if let Some(buyer_id) = &self.buyer_id {
            write!(f, "buyer_id: {buyer_id}. ")?;
        }
        if let Some(seller_id) = &self.seller_id {
            write!(f, "seller_id: {seller_id}. ")?;
        }
        if let Some(payment_ref) = &self.payment_ref {
            write!(f, "payment_ref: {payment_ref}. ")?;
        }
        if let Some(since) = &self.since {
            write!(f, "since {since}. ")?;
        }
        if let Some(until) = &self.until {
            write!(f, "until {until}. ")?;
        }
        if let Some(statuses) = &self.status {
            let statuses = statuses.iter().map(|s| s.to_string()).collect::<Vec<String>>().join(",");
            write!(f, "statuses: [{statuses}]. ")?;
        }
        if let Some(statuses) = &self.payout_status {
            let statuses = statuses.iter().map(|s| s.to_string()).collect::<Vec<String>>().join(",");
            write!(f, "payout statuses: [{statuses}]. ")?;
        }
        Ok(())
    }
}
