use actix_web::{http::StatusCode, web, web::ServiceConfig};
use serde_json::json;
use settlement_engine::{
    db_types::{Cfa, GatewayPaymentStatus, Role, TransactionStatus, TransactionType},
    events::EventProducers,
    traits::{GatewayError, InitiatedPayment, LedgerUpdate, PaymentStatusReport, WalletCheckout},
    OrderFlowApi,
    PaymentGatewayApi,
};

use super::{
    helpers::{json, post_request},
    mocks::{gateway_payment, ledger_row, profile, stored_order, MockBackend, MockProcessor},
};
use crate::routes::{CheckoutRoute, PaymentGatewayRoute, WalletRechargeRoute};

const UNREACHABLE_PHONE: &str = "0700000000";
const RECORDED_REFERENCE: &str = "PAY-alice-1710235800000";

fn cart() -> serde_json::Value {
    json!([
        {"product_id": "pagne-01", "seller_id": "bob", "quantity": 1, "price": 10000},
        {"product_id": "attieke-02", "seller_id": "bob", "quantity": 2, "price": 2500}
    ])
}

#[actix_web::test]
async fn mobile_money_checkout_starts_the_payment() {
    let _ = env_logger::try_init().ok();
    let body = json!({"payment_method": "ORANGE_MONEY", "items": cart(), "phone": "+225 07 01 02 03 04"});
    let (status, body) =
        post_request(Some(("alice", Role::Buyer)), "/checkout", body, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    let orders = body["orders"].as_array().expect("orders");
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["total_amount"], 15_000);
    assert_eq!(orders[0]["commission_amount"], 1_800);
    assert_eq!(orders[0]["status"], "PENDING");
    assert_eq!(orders[0]["escrow_amount"], 0);
    assert_eq!(body["payment"]["transaction_id"], "mm-tx-1");
    assert!(body["payment_ref"].as_str().unwrap().starts_with("PAY-alice-"));
    assert!(body["wallet_debit"].is_null());
}

#[actix_web::test]
async fn mobile_money_checkout_needs_a_valid_phone() {
    let _ = env_logger::try_init().ok();
    let body = json!({"payment_method": "WAVE", "items": cart()});
    let (status, body) =
        post_request(Some(("alice", Role::Buyer)), "/checkout", body, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("A phone number is required"));
    let body = json!({"payment_method": "WAVE", "items": cart(), "phone": "12"});
    let (status, _) =
        post_request(Some(("alice", Role::Buyer)), "/checkout", body, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn processor_outage_keeps_the_orders_for_a_retry() {
    let _ = env_logger::try_init().ok();
    let body = json!({"payment_method": "MTN_MONEY", "items": cart(), "phone": UNREACHABLE_PHONE});
    let (status, body) =
        post_request(Some(("alice", Role::Buyer)), "/checkout", body, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let error = json(&body)["error"].as_str().unwrap().to_string();
    assert!(error.contains("PAY-alice-"), "{error}");
    assert!(error.contains("unreachable"), "{error}");
}

#[actix_web::test]
async fn wallet_checkout_debits_the_buyer() {
    let _ = env_logger::try_init().ok();
    let body = json!({"payment_method": "WALLET", "items": cart()});
    let (status, body) =
        post_request(Some(("alice", Role::Buyer)), "/checkout", body, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["orders"][0]["status"], "PAID");
    assert_eq!(body["orders"][0]["escrow_amount"], 13_200);
    assert_eq!(body["wallet_debit"]["new_balance"], 5_000);
    assert!(body["payment"].is_null());
}

#[actix_web::test]
async fn empty_carts_are_rejected() {
    let _ = env_logger::try_init().ok();
    let body = json!({"payment_method": "WALLET", "items": []});
    let (status, body) =
        post_request(Some(("alice", Role::Buyer)), "/checkout", body, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("The cart is empty"));
}

#[actix_web::test]
async fn gateway_boundary_refuses_unsigned_callbacks() {
    let _ = env_logger::try_init().ok();
    let body = json!({"action": "callback", "reference": "PAY-alice-1710235800000", "status": "success"});
    let (status, body) = post_request(None, "/payments/gateway", body, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Callbacks must be sent to the payment webhook");
}

#[actix_web::test]
async fn gateway_boundary_reports_missing_fields() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        post_request(None, "/payments/gateway", json!({"action": "initiate"}), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), json!({"success": false, "message": "Missing field: amount"}));
}

#[actix_web::test]
async fn gateway_boundary_initiates_and_verifies() {
    let _ = env_logger::try_init().ok();
    let body = json!({
        "action": "initiate",
        "amount": 15000,
        "phoneNumber": "07 01 02 03 04",
        "orderId": "PAY-alice-1710235800000"
    });
    let (_, body) = post_request(None, "/payments/gateway", body, configure).await.expect("Request failed");
    let body = json(&body);
    assert_eq!(body["success"], true);
    assert_eq!(body["transactionId"], "mm-tx-1");
    assert_eq!(body["paymentUrl"], "https://pay.example/mm-tx-1");
    let body = json!({"action": "verify", "transactionId": "mm-tx-1"});
    let (_, body) = post_request(None, "/payments/gateway", body, configure).await.expect("Request failed");
    let body = json(&body);
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["message"], "Payment not confirmed yet");
}

#[actix_web::test]
async fn gateway_boundary_refuses_a_foreign_reference() {
    let _ = env_logger::try_init().ok();
    let body = json!({"action": "verify", "transactionId": "mm-tx-1", "orderId": "PAY-mallory-1710235800000"});
    let (status, body) = post_request(None, "/payments/gateway", body, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["success"], false);
    let message = body["message"].as_str().unwrap();
    assert!(message.contains(RECORDED_REFERENCE), "{message}");
    let body = json!({"action": "verify", "transactionId": "mm-tx-9"});
    let (_, body) = post_request(None, "/payments/gateway", body, configure).await.expect("Request failed");
    assert_eq!(json(&body), json!({"success": false, "message": "No payment is known for transaction mm-tx-9"}));
}

#[actix_web::test]
async fn recharge_starts_a_top_up() {
    let _ = env_logger::try_init().ok();
    let body = json!({"amount": 5000, "phoneNumber": "0701020304"});
    let (status, body) =
        post_request(Some(("alice", Role::Buyer)), "/wallet/recharge", body, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["success"], true);
    assert!(body["reference"].as_str().unwrap().starts_with("TOPUP-alice-"));
}

#[actix_web::test]
async fn recharge_needs_a_profile() {
    let _ = env_logger::try_init().ok();
    let body = json!({"amount": 5000, "phoneNumber": "0701020304"});
    let (status, body) =
        post_request(Some(("zed", Role::Buyer)), "/wallet/recharge", body, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["success"], false);
}

fn configure(cfg: &mut ServiceConfig) {
    let producers = EventProducers::default();
    let orders_api = OrderFlowApi::new(backend(), producers.clone());
    let gateway_api = PaymentGatewayApi::new(backend(), processor(), producers);
    cfg.service(CheckoutRoute::<MockBackend, MockProcessor>::new())
        .service(PaymentGatewayRoute::<MockBackend, MockProcessor>::new())
        .service(WalletRechargeRoute::<MockBackend, MockProcessor>::new())
        .app_data(web::Data::new(orders_api))
        .app_data(web::Data::new(gateway_api));
}

fn backend() -> MockBackend {
    let mut backend = MockBackend::new();
    backend.expect_fetch_profile().returning(|id| match id.as_str() {
        "alice" => Ok(Some(profile("alice", Role::Buyer, 20_000))),
        _ => Ok(None),
    });
    backend.expect_insert_order().returning(|order, _| Ok((stored_order(1, order), true)));
    backend.expect_wallet_checkout().returning(|buyer, orders| {
        let total: Cfa = orders.iter().map(|o| o.total_amount).sum();
        let orders = orders.into_iter().enumerate().map(|(i, o)| stored_order(i as i64 + 1, o)).collect::<Vec<_>>();
        let reference = orders[0].payment_ref.clone();
        let transaction = ledger_row(1, buyer.as_str(), TransactionType::Purchase, -total.value(), &reference);
        let debit = LedgerUpdate { transaction, new_balance: Cfa::from(20_000) - total };
        Ok(WalletCheckout { orders, debit })
    });
    backend.expect_fetch_orders_for_payment_ref().returning(|_| Ok(vec![]));
    backend.expect_insert_gateway_payment().returning(|p| {
        Ok(gateway_payment(&p.transaction_id, &p.reference, p.amount.value(), GatewayPaymentStatus::Pending))
    });
    backend.expect_fetch_gateway_payment().returning(|txid| match txid {
        "mm-tx-1" => Ok(Some(gateway_payment(txid, RECORDED_REFERENCE, 15_000, GatewayPaymentStatus::Pending))),
        _ => Ok(None),
    });
    backend.expect_fetch_gateway_payments_for_reference().returning(|_| Ok(vec![]));
    backend.expect_fetch_transactions_by_reference().returning(|_| Ok(vec![]));
    backend.expect_insert_recharge_payment().returning(|p, user| {
        let mut row = ledger_row(2, user.as_str(), TransactionType::Recharge, p.amount.value(), &p.reference);
        row.status = TransactionStatus::Pending;
        let payment = gateway_payment(&p.transaction_id, &p.reference, p.amount.value(), GatewayPaymentStatus::Pending);
        Ok((payment, Some(row)))
    });
    backend
}

fn processor() -> MockProcessor {
    let mut processor = MockProcessor::new();
    processor.expect_initiate_payment().returning(|req| {
        if req.phone == UNREACHABLE_PHONE {
            return Err(GatewayError::Network("timed out".into()));
        }
        Ok(InitiatedPayment {
            transaction_id: "mm-tx-1".into(),
            payment_url: Some("https://pay.example/mm-tx-1".into()),
        })
    });
    processor.expect_check_payment_status().returning(|txid| {
        Ok(PaymentStatusReport { transaction_id: txid.to_string(), status: "PENDING".into(), reference: None })
    });
    processor
}
