use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
pub use settlement_common::Cfa;
use sqlx::{FromRow, Type};
use thiserror::Error;

use crate::commission::CommissionRate;

/// The seller key used for cart items whose seller could not be resolved.
pub const UNKNOWN_SELLER: &str = "UNKNOWN";

/// Implements `Display`, `FromStr` and an infallible `From<String>` for the status-like enums stored as text.
macro_rules! db_enum {
    ($name:ident, $fallback:ident, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $text),)+
                }
            }
        }

        impl FromStr for $name {
            type Err = ConversionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_uppercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(ConversionError(format!("Invalid {}: {s}", stringify!($name)))),
                }
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                value.parse().unwrap_or_else(|_| {
                    error!(
                        "Invalid {}: {value}. But this conversion cannot fail. Defaulting to {}",
                        stringify!($name),
                        stringify!($fallback)
                    );
                    Self::$fallback
                })
            }
        }
    };
}

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(pub String);

//--------------------------------------        UserId       ---------------------------------------------------------
/// The identifier of a profile, as assigned by the external auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

//--------------------------------------          Role         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Buyer,
    Seller,
    /// A wholesale "centrale d'achat" partner. Partners pay a reduced commission.
    Partner,
    Admin,
    SuperAdmin,
}

db_enum!(Role, Buyer, {
    Buyer => "BUYER",
    Seller => "SELLER",
    Partner => "PARTNER",
    Admin => "ADMIN",
    SuperAdmin => "SUPER_ADMIN",
});

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }

    pub fn can_sell(&self) -> bool {
        matches!(self, Role::Seller | Role::Partner)
    }
}

//--------------------------------------        Profile        ---------------------------------------------------------
/// A wallet owner. `wallet_balance` is a cached running total of the user's ledger.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub role: Role,
    pub wallet_balance: Cfa,
    /// Seller-specific commission override. Validated when it is read, not when it is stored.
    pub commission_rate: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profiles always start with an empty wallet. Money only enters a wallet through the ledger.
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub id: UserId,
    pub role: Role,
    pub commission_rate: Option<f64>,
}

impl NewProfile {
    pub fn new<U: Into<UserId>>(id: U, role: Role) -> Self {
        Self { id: id.into(), role, commission_rate: None }
    }

    pub fn with_commission_rate(mut self, rate: f64) -> Self {
        self.commission_rate = Some(rate);
        self
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatusType {
    /// Awaiting confirmation from the payment processor.
    Pending,
    /// Payment has been received and the seller's share is held in escrow.
    Paid,
    /// The buyer has received the goods. The seller's share has been released.
    Delivered,
}

db_enum!(OrderStatusType, Pending, {
    Pending => "PENDING",
    Paid => "PAID",
    Delivered => "DELIVERED",
});

//--------------------------------------     PayoutStatus      ---------------------------------------------------------
/// The escrow lifecycle of an order. It only ever moves forward: `Pending -> Escrow -> Paid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayoutStatus {
    Pending,
    Escrow,
    Paid,
}

db_enum!(PayoutStatus, Pending, {
    Pending => "PENDING",
    Escrow => "ESCROW",
    Paid => "PAID",
});

//--------------------------------------     PaymentMethod     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Paid from the buyer's marketplace wallet. Settles synchronously.
    Wallet,
    Wave,
    OrangeMoney,
    MtnMoney,
    MoovMoney,
}

db_enum!(PaymentMethod, Wallet, {
    Wallet => "WALLET",
    Wave => "WAVE",
    OrangeMoney => "ORANGE_MONEY",
    MtnMoney => "MTN_MONEY",
    MoovMoney => "MOOV_MONEY",
});

impl PaymentMethod {
    pub fn is_wallet(&self) -> bool {
        matches!(self, PaymentMethod::Wallet)
    }

    pub fn is_mobile_money(&self) -> bool {
        !self.is_wallet()
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
/// One order per (buyer, seller) group of a checkout.
///
/// `seller_amount + commission_amount == total_amount` is fixed when the order is created.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub buyer_id: UserId,
    pub seller_id: Option<UserId>,
    pub total_amount: Cfa,
    pub status: OrderStatusType,
    pub payment_method: PaymentMethod,
    pub payout_status: PayoutStatus,
    pub escrow_amount: Cfa,
    pub seller_amount: Cfa,
    pub commission_amount: Cfa,
    #[sqlx(rename = "commission_ppb")]
    pub commission_rate: CommissionRate,
    pub payment_ref: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_paid(&self) -> bool {
        matches!(self.status, OrderStatusType::Paid | OrderStatusType::Delivered)
    }

    pub fn seller_key(&self) -> &str {
        self.seller_id.as_ref().map(|s| s.as_str()).unwrap_or(UNKNOWN_SELLER)
    }
}

//--------------------------------------       NewOrder        ---------------------------------------------------------
/// A fully priced seller group, ready to be persisted as an [`Order`] with its items.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub buyer_id: UserId,
    /// `None` when the seller of the items could not be resolved.
    pub seller_id: Option<UserId>,
    pub payment_method: PaymentMethod,
    /// Shared by every order created from the same checkout.
    pub payment_ref: String,
    pub status: OrderStatusType,
    pub payout_status: PayoutStatus,
    pub total_amount: Cfa,
    pub commission_rate: CommissionRate,
    pub commission_amount: Cfa,
    pub seller_amount: Cfa,
    pub escrow_amount: Cfa,
    pub items: Vec<NewOrderItem>,
}

impl NewOrder {
    pub fn seller_key(&self) -> &str {
        self.seller_id.as_ref().map(|s| s.as_str()).unwrap_or(UNKNOWN_SELLER)
    }
}

//--------------------------------------       OrderItem       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: String,
    pub seller_id: Option<UserId>,
    pub quantity: i64,
    pub price: Cfa,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: String,
    pub seller_id: Option<UserId>,
    pub quantity: i64,
    pub price: Cfa,
}

impl NewOrderItem {
    /// `price × quantity`, or `None` if the result does not fit.
    pub fn line_total(&self) -> Option<Cfa> {
        self.price.checked_mul(self.quantity)
    }
}

//--------------------------------------   TransactionType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Wallet top-up via mobile money. Credit.
    Recharge,
    /// Wallet checkout. Debit.
    Purchase,
    /// Release of escrowed proceeds to a seller on delivery. Credit.
    Payout,
    /// Seller withdrawal, reserved when requested. Debit.
    PayoutRequest,
    /// Compensating credit for a rejected withdrawal.
    PayoutRefund,
}

db_enum!(TransactionType, Purchase, {
    Recharge => "RECHARGE",
    Purchase => "PURCHASE",
    Payout => "PAYOUT",
    PayoutRequest => "PAYOUT_REQUEST",
    PayoutRefund => "PAYOUT_REFUND",
});

//--------------------------------------  TransactionStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
}

db_enum!(TransactionStatus, Pending, {
    Pending => "PENDING",
    Completed => "COMPLETED",
});

//--------------------------------------  WalletTransaction    ---------------------------------------------------------
/// A row of the append-only settlement ledger. Only `status` ever changes, from `Pending` to `Completed`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: i64,
    pub user_id: UserId,
    pub tx_type: TransactionType,
    /// Signed. Credits are positive, debits negative.
    pub amount: Cfa,
    pub status: TransactionStatus,
    pub reference: String,
    pub meta: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WalletTransaction {
    /// Whether this row is reflected in the cached wallet balance. Debits are applied when they are recorded, credits
    /// only once they complete.
    pub fn is_applied(&self) -> bool {
        self.status == TransactionStatus::Completed || self.amount.is_negative()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWalletTransaction {
    pub user_id: UserId,
    pub tx_type: TransactionType,
    pub amount: Cfa,
    pub status: TransactionStatus,
    pub reference: String,
    pub meta: Option<serde_json::Value>,
}

impl NewWalletTransaction {
    pub fn new<S: Into<String>>(
        user_id: UserId,
        tx_type: TransactionType,
        amount: Cfa,
        status: TransactionStatus,
        reference: S,
    ) -> Self {
        Self { user_id, tx_type, amount, status, reference: reference.into(), meta: None }
    }

    pub fn with_meta(mut self, meta: serde_json::Value) -> Self {
        self.meta = Some(meta);
        self
    }
}

//-------------------------------------- PayoutRequestStatus  ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayoutRequestStatus {
    Pending,
    Completed,
    Rejected,
}

db_enum!(PayoutRequestStatus, Pending, {
    Pending => "PENDING",
    Completed => "COMPLETED",
    Rejected => "REJECTED",
});

//--------------------------------------    PayoutRequest      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PayoutRequest {
    pub id: i64,
    pub seller_id: UserId,
    pub amount: Cfa,
    pub method: PaymentMethod,
    pub phone: String,
    pub status: PayoutRequestStatus,
    /// The admin that approved or rejected the request.
    pub resolved_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPayoutRequest {
    pub seller_id: UserId,
    pub amount: Cfa,
    pub method: PaymentMethod,
    /// Normalized national number.
    pub phone: String,
}

//-------------------------------------- GatewayPaymentStatus ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayPaymentStatus {
    Pending,
    Confirmed,
}

db_enum!(GatewayPaymentStatus, Pending, {
    Pending => "PENDING",
    Confirmed => "CONFIRMED",
});

//--------------------------------------    GatewayPayment     ---------------------------------------------------------
/// A mobile-money payment initiated with the upstream processor.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct GatewayPayment {
    pub id: i64,
    /// The processor's transaction identifier.
    pub transaction_id: String,
    pub reference: String,
    pub amount: Cfa,
    pub phone: String,
    pub status: GatewayPaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGatewayPayment {
    pub transaction_id: String,
    pub reference: String,
    pub amount: Cfa,
    pub phone: String,
}

//--------------------------------------     AuditLogEntry     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: i64,
    pub actor: String,
    pub action: String,
    pub entity: String,
    pub entity_id: String,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditLogEntry {
    pub actor: String,
    pub action: String,
    pub entity: String,
    pub entity_id: String,
    pub detail: Option<String>,
}

impl NewAuditLogEntry {
    pub fn new<A: Display, E: Display>(actor: A, action: &str, entity: &str, entity_id: E) -> Self {
        Self {
            actor: actor.to_string(),
            action: action.to_string(),
            entity: entity.to_string(),
            entity_id: entity_id.to_string(),
            detail: None,
        }
    }

    pub fn with_detail<S: Into<String>>(mut self, detail: S) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
