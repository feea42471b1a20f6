use chrono::{TimeZone, Utc};
use mockall::mock;
use settlement_engine::{
    db_types::{
        AuditLogEntry,
        Cfa,
        GatewayPayment,
        GatewayPaymentStatus,
        NewGatewayPayment,
        NewOrder,
        NewPayoutRequest,
        NewProfile,
        NewWalletTransaction,
        Order,
        OrderItem,
        OrderStatusType,
        PaymentMethod,
        PayoutRequest,
        PayoutRequestStatus,
        PayoutStatus,
        Profile,
        Role,
        TransactionStatus,
        TransactionType,
        UserId,
        WalletTransaction,
    },
    order_objects::OrderQueryFilter,
    traits::{
        ConfirmationResult,
        DeliveryResult,
        GatewayError,
        InitiatedPayment,
        LedgerManagement,
        LedgerUpdate,
        PaymentInitiation,
        PaymentProcessor,
        PaymentStatusReport,
        PayoutManagement,
        PayoutResolution,
        SettlementDatabase,
        SettlementError,
        WalletCheckout,
    },
    CommissionRate,
};

mock! {
    pub Backend {}
    impl Clone for Backend {
        fn clone(&self) -> Self;
    }
    impl LedgerManagement for Backend {
        async fn fetch_profile(&self, id: &UserId) -> Result<Option<Profile>, SettlementError>;
        async fn upsert_profile(&self, profile: NewProfile) -> Result<Profile, SettlementError>;
        async fn record_transaction(&self, tx: NewWalletTransaction) -> Result<WalletTransaction, SettlementError>;
        async fn apply_balance_delta(&self, user: &UserId, delta: Cfa) -> Result<Cfa, SettlementError>;
        async fn apply_ledger_entry(&self, tx: NewWalletTransaction) -> Result<LedgerUpdate, SettlementError>;
        async fn fetch_transactions_for_user(&self, user: &UserId) -> Result<Vec<WalletTransaction>, SettlementError>;
        async fn fetch_transactions_by_reference(&self, reference: &str) -> Result<Vec<WalletTransaction>, SettlementError>;
        async fn ledger_balance(&self, user: &UserId) -> Result<Cfa, SettlementError>;
    }
    impl SettlementDatabase for Backend {
        fn url(&self) -> &str;
        async fn insert_order(&self, order: NewOrder, actor: &str) -> Result<(Order, bool), SettlementError>;
        async fn wallet_checkout(&self, buyer: &UserId, orders: Vec<NewOrder>) -> Result<WalletCheckout, SettlementError>;
        async fn fetch_order(&self, id: i64) -> Result<Option<Order>, SettlementError>;
        async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, SettlementError>;
        async fn fetch_orders_for_payment_ref(&self, payment_ref: &str) -> Result<Vec<Order>, SettlementError>;
        async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, SettlementError>;
        async fn mark_order_paid(&self, order_id: i64, actor: &str) -> Result<Order, SettlementError>;
        async fn mark_order_delivered(&self, order_id: i64, actor: &str) -> Result<DeliveryResult, SettlementError>;
        async fn escrow_total_for_seller(&self, seller: &UserId) -> Result<Cfa, SettlementError>;
        async fn insert_gateway_payment(&self, payment: NewGatewayPayment) -> Result<GatewayPayment, SettlementError>;
        async fn insert_recharge_payment(&self, payment: NewGatewayPayment, user: &UserId) -> Result<(GatewayPayment, Option<WalletTransaction>), SettlementError>;
        async fn fetch_gateway_payment(&self, transaction_id: &str) -> Result<Option<GatewayPayment>, SettlementError>;
        async fn fetch_gateway_payments_for_reference(&self, reference: &str) -> Result<Vec<GatewayPayment>, SettlementError>;
        async fn confirm_payment(&self, transaction_id: &str) -> Result<ConfirmationResult, SettlementError>;
        async fn fetch_audit_log(&self, entity: &str, entity_id: &str) -> Result<Vec<AuditLogEntry>, SettlementError>;
    }
    impl PayoutManagement for Backend {
        async fn create_payout_request(&self, request: NewPayoutRequest) -> Result<(PayoutRequest, LedgerUpdate), SettlementError>;
        async fn approve_payout_request(&self, id: i64, admin: &UserId) -> Result<PayoutResolution, SettlementError>;
        async fn reject_payout_request(&self, id: i64, admin: &UserId) -> Result<PayoutResolution, SettlementError>;
        async fn fetch_payout_request(&self, id: i64) -> Result<Option<PayoutRequest>, SettlementError>;
        async fn fetch_payout_requests(&self, status: Option<PayoutRequestStatus>) -> Result<Vec<PayoutRequest>, SettlementError>;
        async fn fetch_payout_requests_for_seller(&self, seller: &UserId) -> Result<Vec<PayoutRequest>, SettlementError>;
    }
}

mock! {
    pub Processor {}
    impl PaymentProcessor for Processor {
        async fn initiate_payment(&self, request: PaymentInitiation) -> Result<InitiatedPayment, GatewayError>;
        async fn check_payment_status(&self, transaction_id: &str) -> Result<PaymentStatusReport, GatewayError>;
    }
}

fn timestamp() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 12, 9, 30, 0).unwrap()
}

/// A paid 15,000 FCFA order from `buyer`, with 13,200 FCFA held in escrow for `seller`.
pub fn paid_order(id: i64, buyer: &str, seller: &str) -> Order {
    Order {
        id,
        buyer_id: UserId::from(buyer),
        seller_id: Some(UserId::from(seller)),
        total_amount: Cfa::from(15_000),
        status: OrderStatusType::Paid,
        payment_method: PaymentMethod::Wallet,
        payout_status: PayoutStatus::Escrow,
        escrow_amount: Cfa::from(13_200),
        seller_amount: Cfa::from(13_200),
        commission_amount: Cfa::from(1_800),
        commission_rate: CommissionRate::default(),
        payment_ref: format!("PAY-{buyer}-1710235800000"),
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}

/// The order a backend would store for `order`.
pub fn stored_order(id: i64, order: NewOrder) -> Order {
    Order {
        id,
        buyer_id: order.buyer_id,
        seller_id: order.seller_id,
        total_amount: order.total_amount,
        status: order.status,
        payment_method: order.payment_method,
        payout_status: order.payout_status,
        escrow_amount: order.escrow_amount,
        seller_amount: order.seller_amount,
        commission_amount: order.commission_amount,
        commission_rate: order.commission_rate,
        payment_ref: order.payment_ref,
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}

pub fn profile(id: &str, role: Role, balance: i64) -> Profile {
    Profile {
        id: UserId::from(id),
        role,
        wallet_balance: Cfa::from(balance),
        commission_rate: None,
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}

pub fn ledger_row(id: i64, user: &str, tx_type: TransactionType, amount: i64, reference: &str) -> WalletTransaction {
    WalletTransaction {
        id,
        user_id: UserId::from(user),
        tx_type,
        amount: Cfa::from(amount),
        status: TransactionStatus::Completed,
        reference: reference.to_string(),
        meta: None,
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}

pub fn payout_request(id: i64, seller: &str, amount: i64, status: PayoutRequestStatus) -> PayoutRequest {
    PayoutRequest {
        id,
        seller_id: UserId::from(seller),
        amount: Cfa::from(amount),
        method: PaymentMethod::OrangeMoney,
        phone: "0701020304".to_string(),
        status,
        resolved_by: None,
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}

/// A payment stored as the processor's `transaction_id` for `reference`.
pub fn gateway_payment(transaction_id: &str, reference: &str, amount: i64, status: GatewayPaymentStatus) -> GatewayPayment {
    GatewayPayment {
        id: 1,
        transaction_id: transaction_id.to_string(),
        reference: reference.to_string(),
        amount: Cfa::from(amount),
        phone: "0701020304".to_string(),
        status,
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}
