use actix_web::{http::StatusCode, web, web::ServiceConfig};
use mockall::predicate::eq;
use serde_json::json;
use settlement_engine::{
    db_types::{Cfa, PayoutRequestStatus, Role, TransactionType},
    events::EventProducers,
    traits::{LedgerUpdate, PayoutResolution, SettlementError},
    PayoutApi,
};

use super::{
    helpers::{get_request, json, post_request},
    mocks::{ledger_row, payout_request, MockBackend},
};
use crate::routes::{ApprovePayoutRoute, PendingPayoutsRoute, RejectPayoutRoute, RequestPayoutRoute};

#[actix_web::test]
async fn seller_requests_a_payout() {
    let _ = env_logger::try_init().ok();
    let body = json!({"amount": 5000, "method": "ORANGE_MONEY", "phoneNumber": "+225 07 01 02 03 04"});
    let (status, body) =
        post_request(Some(("bob", Role::Seller)), "/payouts", body, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["request"]["status"], "PENDING");
    assert_eq!(body["request"]["amount"], 5000);
    assert_eq!(body["new_balance"], 8200);
}

#[actix_web::test]
async fn payout_larger_than_the_balance() {
    let _ = env_logger::try_init().ok();
    let body = json!({"amount": 50000, "method": "WAVE", "phoneNumber": "0701020304"});
    let (status, body) =
        post_request(Some(("bob", Role::Partner)), "/payouts", body, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Insufficient wallet balance"));
}

#[actix_web::test]
async fn payouts_go_to_mobile_money_only() {
    let _ = env_logger::try_init().ok();
    let body = json!({"amount": 5000, "method": "WALLET", "phoneNumber": "0701020304"});
    let (status, _) =
        post_request(Some(("bob", Role::Seller)), "/payouts", body, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body = json!({"amount": 0, "method": "WAVE", "phoneNumber": "0701020304"});
    let (status, _) =
        post_request(Some(("bob", Role::Seller)), "/payouts", body, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn buyers_cannot_request_payouts() {
    let _ = env_logger::try_init().ok();
    let body = json!({"amount": 5000, "method": "WAVE", "phoneNumber": "0701020304"});
    let err = post_request(Some(("alice", Role::Buyer)), "/payouts", body, configure)
        .await
        .expect_err("Buyers should be turned away");
    assert_eq!(err, "Insufficient permissions.");
}

#[actix_web::test]
async fn admin_sees_the_pending_queue() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        get_request(Some(("root", Role::Admin)), "/payouts/pending", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    let requests = body.as_array().expect("array");
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|r| r["status"] == "PENDING"));
    let err = get_request(Some(("bob", Role::Seller)), "/payouts/pending", configure)
        .await
        .expect_err("Sellers should be turned away");
    assert_eq!(err, "Insufficient permissions.");
}

#[actix_web::test]
async fn admin_approves_a_payout() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request(Some(("root", Role::Admin)), "/payouts/1/approve", json!({}), configure)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["request"]["status"], "COMPLETED");
    assert_eq!(body["request"]["resolved_by"], "root");
    assert!(body["refund"].is_null());
}

#[actix_web::test]
async fn admin_rejects_a_payout() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request(Some(("root", Role::Admin)), "/payouts/1/reject", json!({}), configure)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["request"]["status"], "REJECTED");
    assert_eq!(body["refund"]["transaction"]["tx_type"], "PAYOUT_REFUND");
    assert_eq!(body["refund"]["new_balance"], 13_200);
}

#[actix_web::test]
async fn resolved_requests_cannot_be_resolved_again() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request(Some(("root", Role::Admin)), "/payouts/2/reject", json!({}), configure)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("already been resolved"));
    let (status, _) = post_request(Some(("root", Role::Admin)), "/payouts/3/approve", json!({}), configure)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn sellers_cannot_approve_their_own_payouts() {
    let _ = env_logger::try_init().ok();
    let err = post_request(Some(("bob", Role::Seller)), "/payouts/1/approve", json!({}), configure)
        .await
        .expect_err("Sellers should be turned away");
    assert_eq!(err, "Insufficient permissions.");
}

fn configure(cfg: &mut ServiceConfig) {
    let payout_api = PayoutApi::new(backend(), EventProducers::default());
    cfg.service(PendingPayoutsRoute::<MockBackend>::new())
        .service(RequestPayoutRoute::<MockBackend>::new())
        .service(ApprovePayoutRoute::<MockBackend>::new())
        .service(RejectPayoutRoute::<MockBackend>::new())
        .app_data(web::Data::new(payout_api));
}

fn backend() -> MockBackend {
    let mut backend = MockBackend::new();
    backend.expect_create_payout_request().returning(|req| {
        if req.amount > Cfa::from(13_200) {
            return Err(SettlementError::InsufficientFunds(req.seller_id, req.amount));
        }
        let request = payout_request(1, req.seller_id.as_str(), req.amount.value(), PayoutRequestStatus::Pending);
        let transaction =
            ledger_row(7, req.seller_id.as_str(), TransactionType::PayoutRequest, -req.amount.value(), "1");
        Ok((request, LedgerUpdate { transaction, new_balance: Cfa::from(13_200) - req.amount }))
    });
    backend.expect_fetch_payout_requests().with(eq(Some(PayoutRequestStatus::Pending))).returning(|_| {
        Ok(vec![
            payout_request(1, "bob", 5_000, PayoutRequestStatus::Pending),
            payout_request(4, "dan", 2_500, PayoutRequestStatus::Pending),
        ])
    });
    backend.expect_approve_payout_request().returning(|id, admin| match id {
        1 => {
            let mut request = payout_request(id, "bob", 5_000, PayoutRequestStatus::Completed);
            request.resolved_by = Some(admin.clone());
            Ok(PayoutResolution { request, refund: None })
        },
        _ => Err(SettlementError::PayoutRequestNotFound(id)),
    });
    backend.expect_reject_payout_request().returning(|id, admin| match id {
        1 => {
            let mut request = payout_request(id, "bob", 5_000, PayoutRequestStatus::Rejected);
            request.resolved_by = Some(admin.clone());
            let transaction = ledger_row(8, "bob", TransactionType::PayoutRefund, 5_000, "1");
            Ok(PayoutResolution { request, refund: Some(LedgerUpdate { transaction, new_balance: Cfa::from(13_200) }) })
        },
        _ => Err(SettlementError::PayoutRequestAlreadyResolved(id, PayoutRequestStatus::Completed)),
    });
    backend
}

