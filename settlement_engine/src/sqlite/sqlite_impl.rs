//! `SqliteDatabase` is the SQLite implementation of a settlement engine backend.
//!
//! It implements all the traits defined in the [`crate::traits`] module. Every operation that moves money runs inside
//! a single sqlx transaction, so a failure at any step leaves the database untouched.
use std::{fmt::Debug, str::FromStr};

use log::*;
use serde_json::json;
use sqlx::SqlitePool;

use super::db::{audit, db_url, gateway_payments, new_pool, orders, payouts, profiles, wallet};
use crate::{
    db_types::{
        AuditLogEntry,
        Cfa,
        GatewayPayment,
        NewAuditLogEntry,
        NewGatewayPayment,
        NewOrder,
        NewPayoutRequest,
        NewProfile,
        NewWalletTransaction,
        Order,
        OrderItem,
        OrderStatusType,
        PayoutRequest,
        PayoutRequestStatus,
        Profile,
        TransactionStatus,
        TransactionType,
        UserId,
        WalletTransaction,
    },
    helpers::PaymentReference,
    se_api::order_objects::OrderQueryFilter,
    traits::{
        ConfirmationResult,
        DeliveryResult,
        LedgerManagement,
        LedgerUpdate,
        PayoutManagement,
        PayoutResolution,
        SettlementDatabase,
        SettlementError,
        WalletCheckout,
    },
};

pub const ORDER_ENTITY: &str = "order";
pub const PAYOUT_REQUEST_ENTITY: &str = "payout_request";

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `SE_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Applies the embedded migrations.
    pub async fn migrate(&self) -> Result<(), SettlementError> {
        sqlx::migrate!("./src/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| SettlementError::DatabaseError(e.to_string()))?;
        info!("🗃️ Database migrations are up to date");
        Ok(())
    }
}

impl LedgerManagement for SqliteDatabase {
    async fn fetch_profile(&self, id: &UserId) -> Result<Option<Profile>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let profile = profiles::fetch_profile(id, &mut conn).await?;
        Ok(profile)
    }

    async fn upsert_profile(&self, profile: NewProfile) -> Result<Profile, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let profile = profiles::upsert_profile(profile, &mut tx).await?;
        tx.commit().await?;
        Ok(profile)
    }

    async fn record_transaction(&self, tx: NewWalletTransaction) -> Result<WalletTransaction, SettlementError> {
        let mut db_tx = self.pool.begin().await?;
        let row = wallet::insert_transaction(tx, &mut db_tx).await?;
        db_tx.commit().await?;
        Ok(row)
    }

    async fn apply_balance_delta(&self, user: &UserId, delta: Cfa) -> Result<Cfa, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let new_balance = if delta.is_negative() {
            profiles::guarded_debit(user, -delta, &mut tx).await?
        } else {
            profiles::credit_balance(user, delta, &mut tx).await?
        };
        tx.commit().await?;
        Ok(new_balance)
    }

    async fn apply_ledger_entry(&self, tx: NewWalletTransaction) -> Result<LedgerUpdate, SettlementError> {
        let mut db_tx = self.pool.begin().await?;
        let user = tx.user_id.clone();
        let amount = tx.amount;
        let new_balance = if amount.is_negative() {
            profiles::guarded_debit(&user, -amount, &mut db_tx).await?
        } else {
            profiles::credit_balance(&user, amount, &mut db_tx).await?
        };
        let transaction = wallet::insert_transaction(tx, &mut db_tx).await?;
        db_tx.commit().await?;
        debug!("🗃️ Ledger entry #{} applied. Balance of {user} is now {new_balance}", transaction.id);
        Ok(LedgerUpdate { transaction, new_balance })
    }

    async fn fetch_transactions_for_user(&self, user: &UserId) -> Result<Vec<WalletTransaction>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let rows = wallet::fetch_transactions_for_user(user, &mut conn).await?;
        Ok(rows)
    }

    async fn fetch_transactions_by_reference(
        &self,
        reference: &str,
    ) -> Result<Vec<WalletTransaction>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let rows = wallet::fetch_transactions_by_reference(reference, &mut conn).await?;
        Ok(rows)
    }

    async fn ledger_balance(&self, user: &UserId) -> Result<Cfa, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let balance = wallet::ledger_balance(user, &mut conn).await?;
        Ok(balance)
    }
}

impl SettlementDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder, actor: &str) -> Result<(Order, bool), SettlementError> {
        let mut tx = self.pool.begin().await?;
        let (order, inserted) = orders::idempotent_insert(order, &mut tx).await?;
        if inserted {
            let entry = NewAuditLogEntry::new(actor, "ORDER_CREATED", ORDER_ENTITY, order.id)
                .with_detail(format!("{} for seller {} [{}]", order.total_amount, order.seller_key(), order.status));
            audit::insert_entry(entry, &mut tx).await?;
        }
        tx.commit().await?;
        Ok((order, inserted))
    }

    async fn wallet_checkout(
        &self,
        buyer: &UserId,
        new_orders: Vec<NewOrder>,
    ) -> Result<WalletCheckout, SettlementError> {
        let payment_ref = match new_orders.first() {
            Some(o) => o.payment_ref.clone(),
            None => return Err(SettlementError::EmptyCart),
        };
        let total = Cfa::checked_sum(new_orders.iter().map(|o| o.total_amount))
            .ok_or_else(|| SettlementError::InvalidCartItem("The cart total is too large".into()))?;
        let mut tx = self.pool.begin().await?;
        let previous = wallet::fetch_transactions_by_reference(&payment_ref, &mut tx)
            .await?
            .into_iter()
            .find(|t| t.tx_type == TransactionType::Purchase && &t.user_id == buyer);
        if let Some(transaction) = previous {
            info!("🗃️ Checkout [{payment_ref}] has already been charged to {buyer}. Returning the existing orders.");
            let existing = orders::fetch_orders_for_payment_ref(&payment_ref, &mut tx).await?;
            let balance = profiles::fetch_profile(buyer, &mut tx)
                .await?
                .map(|p| p.wallet_balance)
                .ok_or_else(|| SettlementError::ProfileNotFound(buyer.clone()))?;
            tx.commit().await?;
            return Ok(WalletCheckout { orders: existing, debit: LedgerUpdate { transaction, new_balance: balance } });
        }
        let new_balance = profiles::guarded_debit(buyer, total, &mut tx).await?;
        let order_count = new_orders.len();
        let purchase = NewWalletTransaction::new(
            buyer.clone(),
            TransactionType::Purchase,
            -total,
            TransactionStatus::Completed,
            payment_ref.as_str(),
        )
        .with_meta(json!({ "orders": order_count }));
        let transaction = wallet::insert_transaction(purchase, &mut tx).await?;
        let mut saved = Vec::with_capacity(order_count);
        for order in new_orders {
            let (order, inserted) = orders::idempotent_insert(order, &mut tx).await?;
            if inserted {
                let entry = NewAuditLogEntry::new(buyer, "ORDER_CREATED", ORDER_ENTITY, order.id)
                    .with_detail(format!("{} for seller {} [WALLET]", order.total_amount, order.seller_key()));
                audit::insert_entry(entry, &mut tx).await?;
            }
            saved.push(order);
        }
        tx.commit().await?;
        debug!("🗃️ Wallet checkout [{payment_ref}] of {total} committed. {} orders created", saved.len());
        Ok(WalletCheckout { orders: saved, debit: LedgerUpdate { transaction, new_balance } })
    }

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let items = orders::fetch_order_items(order_id, &mut conn).await?;
        Ok(items)
    }

    async fn fetch_orders_for_payment_ref(&self, payment_ref: &str) -> Result<Vec<Order>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let result = orders::fetch_orders_for_payment_ref(payment_ref, &mut conn).await?;
        Ok(result)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let result = orders::search_orders(query, &mut conn).await?;
        Ok(result)
    }

    async fn mark_order_paid(&self, order_id: i64, actor: &str) -> Result<Order, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let existing =
            orders::fetch_order(order_id, &mut tx).await?.ok_or(SettlementError::OrderNotFound(order_id))?;
        let order = match orders::secure_escrow_for_order(order_id, &mut tx).await? {
            Some(o) => o,
            None => {
                return Err(SettlementError::OrderModificationNoOp(format!(
                    "Order {order_id} is {} and its payout is {}. It is not awaiting payment.",
                    existing.status, existing.payout_status
                )))
            },
        };
        let entry = NewAuditLogEntry::new(actor, "ORDER_PAID", ORDER_ENTITY, order_id)
            .with_detail(format!("{} held in escrow", order.escrow_amount));
        audit::insert_entry(entry, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order #{order_id} manually marked as paid by {actor}");
        Ok(order)
    }

    async fn mark_order_delivered(&self, order_id: i64, actor: &str) -> Result<DeliveryResult, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let existing =
            orders::fetch_order(order_id, &mut tx).await?.ok_or(SettlementError::OrderNotFound(order_id))?;
        if existing.status == OrderStatusType::Pending {
            return Err(SettlementError::OrderModificationForbidden(format!(
                "Order {order_id} has not been paid and cannot be delivered"
            )));
        }
        let order = orders::mark_delivered(order_id, &mut tx).await?.ok_or_else(|| {
            SettlementError::OrderModificationForbidden(format!("Order {order_id} cannot be delivered"))
        })?;
        let released = match orders::release_escrow(order_id, &mut tx).await? {
            Some(o) => o,
            None => {
                tx.commit().await?;
                debug!("🗃️ Order #{order_id} delivered again. Its payout was already released.");
                return Ok(DeliveryResult { order, payout: None });
            },
        };
        let Some(seller) = released.seller_id.clone() else {
            error!(
                "🗃️ Order #{order_id} has no resolved seller. {} stays in escrow until the order is corrected.",
                existing.seller_amount
            );
            return Err(SettlementError::SellerNotResolved(order_id));
        };
        let amount = released.seller_amount;
        let new_balance = match profiles::credit_balance(&seller, amount, &mut tx).await {
            Ok(b) => b,
            Err(e) => {
                error!(
                    "🗃️ Could not credit {amount} to {seller} for order #{order_id}. The delivery is rolled back. {e}"
                );
                return Err(e);
            },
        };
        let payout = NewWalletTransaction::new(
            seller.clone(),
            TransactionType::Payout,
            amount,
            TransactionStatus::Completed,
            order_id.to_string(),
        )
        .with_meta(json!({ "order_id": order_id, "payment_ref": released.payment_ref }));
        let transaction = wallet::insert_transaction(payout, &mut tx).await?;
        let entry = NewAuditLogEntry::new(actor, "ESCROW_RELEASED", ORDER_ENTITY, order_id)
            .with_detail(format!("{amount} paid out to {seller}"));
        audit::insert_entry(entry, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Order #{order_id} delivered. {amount} released to {seller}");
        Ok(DeliveryResult { order: released, payout: Some(LedgerUpdate { transaction, new_balance }) })
    }

    async fn escrow_total_for_seller(&self, seller: &UserId) -> Result<Cfa, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let total = orders::escrow_total_for_seller(seller, &mut conn).await?;
        Ok(total)
    }

    async fn insert_gateway_payment(&self, payment: NewGatewayPayment) -> Result<GatewayPayment, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let (payment, _inserted) = gateway_payments::idempotent_insert(payment, &mut tx).await?;
        tx.commit().await?;
        Ok(payment)
    }

    async fn insert_recharge_payment(
        &self,
        payment: NewGatewayPayment,
        user: &UserId,
    ) -> Result<(GatewayPayment, Option<WalletTransaction>), SettlementError> {
        let mut tx = self.pool.begin().await?;
        let (payment, inserted) = gateway_payments::idempotent_insert(payment, &mut tx).await?;
        if !inserted {
            tx.commit().await?;
            return Ok((payment, None));
        }
        let pending = NewWalletTransaction::new(
            user.clone(),
            TransactionType::Recharge,
            payment.amount,
            TransactionStatus::Pending,
            payment.reference.as_str(),
        )
        .with_meta(json!({ "transaction_id": payment.transaction_id }));
        let row = wallet::insert_transaction(pending, &mut tx).await?;
        tx.commit().await?;
        Ok((payment, Some(row)))
    }

    async fn fetch_gateway_payment(&self, transaction_id: &str) -> Result<Option<GatewayPayment>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let payment = gateway_payments::fetch_by_transaction_id(transaction_id, &mut conn).await?;
        Ok(payment)
    }

    async fn fetch_gateway_payments_for_reference(
        &self,
        reference: &str,
    ) -> Result<Vec<GatewayPayment>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let payments = gateway_payments::fetch_for_reference(reference, &mut conn).await?;
        Ok(payments)
    }

    async fn confirm_payment(&self, transaction_id: &str) -> Result<ConfirmationResult, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let recorded = gateway_payments::fetch_by_transaction_id(transaction_id, &mut tx)
            .await?
            .ok_or_else(|| SettlementError::PaymentNotFound(transaction_id.to_string()))?;
        let reference = PaymentReference::from_str(&recorded.reference)?;
        let Some(payment) = gateway_payments::confirm(transaction_id, &mut tx).await? else {
            tx.commit().await?;
            trace!("🗃️ Gateway payment {transaction_id} was already confirmed");
            return Ok(already_confirmed(&reference));
        };
        let result = if reference.is_recharge() {
            confirm_recharge(&payment, &reference, &mut tx).await?
        } else {
            confirm_purchase(&payment, &mut tx).await?
        };
        tx.commit().await?;
        Ok(result)
    }

    async fn fetch_audit_log(&self, entity: &str, entity_id: &str) -> Result<Vec<AuditLogEntry>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let entries = audit::fetch_entries(entity, entity_id, &mut conn).await?;
        Ok(entries)
    }

    async fn close(&mut self) -> Result<(), SettlementError> {
        self.pool.close().await;
        Ok(())
    }
}

impl PayoutManagement for SqliteDatabase {
    async fn create_payout_request(
        &self,
        request: NewPayoutRequest,
    ) -> Result<(PayoutRequest, LedgerUpdate), SettlementError> {
        let mut tx = self.pool.begin().await?;
        let seller = request.seller_id.clone();
        let new_balance = profiles::guarded_debit(&seller, request.amount, &mut tx).await?;
        let request = payouts::insert_payout_request(request, &mut tx).await?;
        let ledger_row = NewWalletTransaction::new(
            seller.clone(),
            TransactionType::PayoutRequest,
            -request.amount,
            TransactionStatus::Pending,
            request.id.to_string(),
        )
        .with_meta(json!({ "method": request.method, "phone": request.phone }));
        let transaction = wallet::insert_transaction(ledger_row, &mut tx).await?;
        let entry = NewAuditLogEntry::new(&seller, "PAYOUT_REQUESTED", PAYOUT_REQUEST_ENTITY, request.id)
            .with_detail(format!("{} via {}", request.amount, request.method));
        audit::insert_entry(entry, &mut tx).await?;
        tx.commit().await?;
        Ok((request, LedgerUpdate { transaction, new_balance }))
    }

    async fn approve_payout_request(&self, id: i64, admin: &UserId) -> Result<PayoutResolution, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let request = resolve(id, PayoutRequestStatus::Completed, admin, &mut tx).await?;
        wallet::complete_pending(&id.to_string(), TransactionType::PayoutRequest, &mut tx).await?;
        let entry = NewAuditLogEntry::new(admin, "PAYOUT_APPROVED", PAYOUT_REQUEST_ENTITY, id)
            .with_detail(format!("{} to {}", request.amount, request.seller_id));
        audit::insert_entry(entry, &mut tx).await?;
        tx.commit().await?;
        Ok(PayoutResolution { request, refund: None })
    }

    async fn reject_payout_request(&self, id: i64, admin: &UserId) -> Result<PayoutResolution, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let request = resolve(id, PayoutRequestStatus::Rejected, admin, &mut tx).await?;
        wallet::complete_pending(&id.to_string(), TransactionType::PayoutRequest, &mut tx).await?;
        let new_balance = profiles::credit_balance(&request.seller_id, request.amount, &mut tx).await?;
        let refund = NewWalletTransaction::new(
            request.seller_id.clone(),
            TransactionType::PayoutRefund,
            request.amount,
            TransactionStatus::Completed,
            id.to_string(),
        );
        let transaction = wallet::insert_transaction(refund, &mut tx).await?;
        let entry = NewAuditLogEntry::new(admin, "PAYOUT_REJECTED", PAYOUT_REQUEST_ENTITY, id)
            .with_detail(format!("{} refunded to {}", request.amount, request.seller_id));
        audit::insert_entry(entry, &mut tx).await?;
        tx.commit().await?;
        Ok(PayoutResolution { request, refund: Some(LedgerUpdate { transaction, new_balance }) })
    }

    async fn fetch_payout_request(&self, id: i64) -> Result<Option<PayoutRequest>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let request = payouts::fetch_payout_request(id, &mut conn).await?;
        Ok(request)
    }

    async fn fetch_payout_requests(
        &self,
        status: Option<PayoutRequestStatus>,
    ) -> Result<Vec<PayoutRequest>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let requests = payouts::fetch_payout_requests(status, &mut conn).await?;
        Ok(requests)
    }

    async fn fetch_payout_requests_for_seller(&self, seller: &UserId) -> Result<Vec<PayoutRequest>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let requests = payouts::fetch_payout_requests_for_seller(seller, &mut conn).await?;
        Ok(requests)
    }
}

/// Resolves a pending payout request, distinguishing a missing request from one that was already resolved.
async fn resolve(
    id: i64,
    status: PayoutRequestStatus,
    admin: &UserId,
    conn: &mut sqlx::SqliteConnection,
) -> Result<PayoutRequest, SettlementError> {
    match payouts::resolve_payout_request(id, status, admin, conn).await? {
        Some(request) => Ok(request),
        None => match payouts::fetch_payout_request(id, conn).await? {
            Some(existing) => Err(SettlementError::PayoutRequestAlreadyResolved(id, existing.status)),
            None => Err(SettlementError::PayoutRequestNotFound(id)),
        },
    }
}

fn already_confirmed(reference: &PaymentReference) -> ConfirmationResult {
    if reference.is_recharge() {
        ConfirmationResult::Recharge { user: reference.owner.clone(), credited: vec![], new_balance: None }
    } else {
        ConfirmationResult::Purchase { paid_orders: vec![] }
    }
}

/// Completes the top-up row of this transaction and credits the recorded amount. A top-up that was initiated without
/// a pending ledger row gets a completed one here.
async fn confirm_recharge(
    payment: &GatewayPayment,
    reference: &PaymentReference,
    conn: &mut sqlx::SqliteConnection,
) -> Result<ConfirmationResult, SettlementError> {
    let row = match wallet::complete_recharge(&payment.reference, &payment.transaction_id, conn).await? {
        Some(row) => row,
        None => {
            let completed = NewWalletTransaction::new(
                reference.owner.clone(),
                TransactionType::Recharge,
                payment.amount,
                TransactionStatus::Completed,
                payment.reference.as_str(),
            )
            .with_meta(json!({ "transaction_id": payment.transaction_id }));
            wallet::insert_transaction(completed, conn).await?
        },
    };
    let new_balance = profiles::credit_balance(&row.user_id, payment.amount, conn).await?;
    debug!("🗃️ Recharge #{} of {} credited to {} ({})", row.id, payment.amount, row.user_id, payment.transaction_id);
    Ok(ConfirmationResult::Recharge { user: row.user_id.clone(), credited: vec![row], new_balance: Some(new_balance) })
}

/// Moves the orders of the reference into escrow once the confirmed payments cover their totals.
async fn confirm_purchase(
    payment: &GatewayPayment,
    conn: &mut sqlx::SqliteConnection,
) -> Result<ConfirmationResult, SettlementError> {
    let reference = payment.reference.as_str();
    let checkout = orders::fetch_orders_for_payment_ref(reference, conn).await?;
    let owed = Cfa::checked_sum(checkout.iter().map(|o| o.total_amount))
        .ok_or_else(|| SettlementError::DatabaseError(format!("The order totals for [{reference}] overflow")))?;
    let received = gateway_payments::confirmed_total(reference, conn).await?;
    if received < owed {
        warn!(
            "🗃️ Payment {} for [{reference}] is confirmed but only {received} of the {owed} owed has been received. \
             The orders stay pending.",
            payment.transaction_id
        );
        return Ok(ConfirmationResult::Underpaid { reference: reference.to_string(), received, owed });
    }
    let paid_orders = orders::secure_escrow_for_reference(reference, conn).await?;
    for order in &paid_orders {
        let entry = NewAuditLogEntry::new("gateway", "ORDER_PAID", ORDER_ENTITY, order.id)
            .with_detail(format!("{} held in escrow [{reference}]", order.escrow_amount));
        audit::insert_entry(entry, conn).await?;
    }
    trace!("🗃️ {received} received for [{reference}]. {} orders moved into escrow", paid_orders.len());
    Ok(ConfirmationResult::Purchase { paid_orders })
}
