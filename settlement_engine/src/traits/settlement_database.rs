use thiserror::Error;

use crate::{
    commission::CommissionRate,
    db_types::{
        AuditLogEntry,
        Cfa,
        GatewayPayment,
        NewGatewayPayment,
        NewOrder,
        Order,
        OrderItem,
        PaymentMethod,
        PayoutRequestStatus,
        UserId,
        WalletTransaction,
    },
    helpers::{PaymentReferenceError, PhoneNumberError},
    se_api::order_objects::OrderQueryFilter,
    traits::{ConfirmationResult, DeliveryResult, LedgerManagement, WalletCheckout},
};

/// This trait defines the highest level of behaviour for backends supporting the settlement engine.
///
/// This behaviour includes:
/// * Persisting the seller orders of a checkout, either all at once (wallet) or as independent, retryable units
///   (mobile money).
/// * Idempotent confirmation of mobile-money payments, from either a processor callback or a verify call.
/// * The escrow lifecycle of an order, up to the release of the seller's share on delivery.
#[allow(async_fn_in_trait)]
pub trait SettlementDatabase: Clone + LedgerManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// The commission rate for `seller`: the profile's override if it is a valid rate, else the role default.
    async fn resolve_commission_rate(&self, seller: &UserId) -> Result<CommissionRate, SettlementError> {
        let profile = self.fetch_profile(seller).await?;
        Ok(CommissionRate::for_profile(profile.as_ref()))
    }

    /// Stores one seller group of a checkout, with its items and an audit entry, in a single transaction.
    ///
    /// This call is idempotent on `(payment_ref, seller)`. Returns the order and `true` if it was inserted, or the
    /// existing order and `false`.
    async fn insert_order(&self, order: NewOrder, actor: &str) -> Result<(Order, bool), SettlementError>;

    /// Debits the buyer for the sum of all the orders and stores every order, in one transaction. If the buyer
    /// cannot cover the total, nothing is written.
    ///
    /// A retry with a `payment_ref` that has already been charged does not charge the buyer again.
    async fn wallet_checkout(&self, buyer: &UserId, orders: Vec<NewOrder>) -> Result<WalletCheckout, SettlementError>;

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, SettlementError>;

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, SettlementError>;

    async fn fetch_orders_for_payment_ref(&self, payment_ref: &str) -> Result<Vec<Order>, SettlementError>;

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, SettlementError>;

    /// Manually confirms payment of a single `Pending` order, moving its seller share into escrow.
    async fn mark_order_paid(&self, order_id: i64, actor: &str) -> Result<Order, SettlementError>;

    /// Marks the order as delivered and, unless it has already happened, releases the escrow to the seller's wallet.
    ///
    /// The status change, the payout flag, the wallet credit and the `PAYOUT` ledger row are written in one
    /// transaction. An order that has not been paid cannot be delivered.
    async fn mark_order_delivered(&self, order_id: i64, actor: &str) -> Result<DeliveryResult, SettlementError>;

    /// Sum of the amounts currently held in escrow for `seller`.
    async fn escrow_total_for_seller(&self, seller: &UserId) -> Result<Cfa, SettlementError>;

    /// Records a payment initiated with the processor. Idempotent on the processor's transaction id.
    async fn insert_gateway_payment(&self, payment: NewGatewayPayment) -> Result<GatewayPayment, SettlementError>;

    /// Records a top-up payment for `user` together with its pending `RECHARGE` ledger row, in one transaction. The
    /// ledger row carries the processor's transaction id, which is what the confirmation completes.
    ///
    /// Idempotent on the transaction id. A payment that was already recorded returns `None` for the ledger row.
    async fn insert_recharge_payment(
        &self,
        payment: NewGatewayPayment,
        user: &UserId,
    ) -> Result<(GatewayPayment, Option<WalletTransaction>), SettlementError>;

    async fn fetch_gateway_payment(&self, transaction_id: &str) -> Result<Option<GatewayPayment>, SettlementError>;

    async fn fetch_gateway_payments_for_reference(&self, reference: &str)
        -> Result<Vec<GatewayPayment>, SettlementError>;

    /// Applies the confirmed mobile-money payment recorded as `transaction_id`.
    ///
    /// The payment reference is always the one recorded when the payment was initiated.
    /// * Recharge references complete the pending `RECHARGE` row of this transaction and credit the recorded amount.
    /// * Purchase references move every pending order sharing the reference into escrow, provided the confirmed
    ///   payments for the reference cover the order totals. Otherwise the orders stay pending and
    ///   [`ConfirmationResult::Underpaid`] is returned.
    ///
    /// The payment flips from pending to confirmed in the same transaction. Confirming it again is a no-op.
    async fn confirm_payment(&self, transaction_id: &str) -> Result<ConfirmationResult, SettlementError>;

    async fn fetch_audit_log(&self, entity: &str, entity_id: &str) -> Result<Vec<AuditLogEntry>, SettlementError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), SettlementError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum SettlementError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("Invalid amount: {0}. Amounts must be positive.")]
    InvalidAmount(Cfa),
    #[error("{0}")]
    InvalidPhoneNumber(#[from] PhoneNumberError),
    #[error("The cart is empty.")]
    EmptyCart,
    #[error("Invalid cart item. {0}")]
    InvalidCartItem(String),
    #[error("{0} cannot be used for payouts. Choose a mobile-money method.")]
    InvalidPayoutMethod(PaymentMethod),
    #[error("Insufficient wallet balance for {0}. {1} is required.")]
    InsufficientFunds(UserId, Cfa),
    #[error("The profile {0} does not exist")]
    ProfileNotFound(UserId),
    #[error("The requested order (id {0}) does not exist")]
    OrderNotFound(i64),
    #[error("The requested payout request (id {0}) does not exist")]
    PayoutRequestNotFound(i64),
    #[error("The requested order change is forbidden. {0}")]
    OrderModificationForbidden(String),
    #[error("The requested order change would result in a no-op. {0}")]
    OrderModificationNoOp(String),
    #[error("Payout request {0} has already been resolved ({1})")]
    PayoutRequestAlreadyResolved(i64, PayoutRequestStatus),
    #[error("Order {0} has no resolved seller. Its escrow cannot be released.")]
    SellerNotResolved(i64),
    #[error("{0}")]
    InvalidPaymentReference(#[from] PaymentReferenceError),
    #[error("The requested payment does not exist for transaction {0}")]
    PaymentNotFound(String),
    #[error("Could not generate an unused payment reference for {0}")]
    PaymentReferenceExhausted(UserId),
}

impl SettlementError {
    /// Validation errors are detected before anything is written and are the caller's to fix.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidAmount(_) |
                Self::InvalidPhoneNumber(_) |
                Self::EmptyCart |
                Self::InvalidCartItem(_) |
                Self::InvalidPayoutMethod(_) |
                Self::InsufficientFunds(..) |
                Self::InvalidPaymentReference(_)
        )
    }
}

impl From<sqlx::Error> for SettlementError {
    fn from(e: sqlx::Error) -> Self {
        SettlementError::DatabaseError(e.to_string())
    }
}
