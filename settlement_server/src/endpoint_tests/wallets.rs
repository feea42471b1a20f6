use actix_web::{http::StatusCode, web, web::ServiceConfig};
use settlement_engine::{
    db_types::{Cfa, Role, TransactionType},
    events::EventProducers,
    EscrowApi,
    WalletApi,
};

use super::{
    helpers::{get_request, json},
    mocks::{ledger_row, profile, MockBackend},
};
use crate::routes::{SellerEscrowRoute, WalletRoute};

#[actix_web::test]
async fn owner_reads_their_wallet() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        get_request(Some(("bob", Role::Seller)), "/wallet/bob", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["user"], "bob");
    assert_eq!(body["balance"], 13_200);
    assert_eq!(body["transactions"].as_array().unwrap().len(), 1);
    assert_eq!(body["reconciliation"]["is_consistent"], true);
    assert_eq!(body["reconciliation"]["ledger_balance"], 13_200);
}

#[actix_web::test]
async fn drift_between_balance_and_ledger_is_reported() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        get_request(Some(("root", Role::Admin)), "/wallet/carol", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["reconciliation"]["is_consistent"], false);
    assert_eq!(body["reconciliation"]["cached_balance"], 1_000);
    assert_eq!(body["reconciliation"]["ledger_balance"], 0);
}

#[actix_web::test]
async fn wallets_are_private() {
    let _ = env_logger::try_init().ok();
    let (status, _) =
        get_request(Some(("alice", Role::Buyer)), "/wallet/bob", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = get_request(Some(("root", Role::Admin)), "/wallet/zed", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn seller_reads_their_escrow() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        get_request(Some(("bob", Role::Seller)), "/sellers/bob/escrow", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["seller_id"], "bob");
    assert_eq!(body["escrow_total"], 26_400);
    let (status, _) =
        get_request(Some(("carol", Role::Seller)), "/sellers/bob/escrow", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::FORBIDDEN);
}

fn configure(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_fetch_profile().returning(|id| match id.as_str() {
        "bob" => Ok(Some(profile("bob", Role::Seller, 13_200))),
        "carol" => Ok(Some(profile("carol", Role::Seller, 1_000))),
        _ => Ok(None),
    });
    backend.expect_fetch_transactions_for_user().returning(|id| match id.as_str() {
        "bob" => Ok(vec![ledger_row(1, "bob", TransactionType::Payout, 13_200, "1")]),
        _ => Ok(vec![]),
    });
    backend.expect_ledger_balance().returning(|id| match id.as_str() {
        "bob" => Ok(Cfa::from(13_200)),
        _ => Ok(Cfa::default()),
    });
    let mut escrow_backend = MockBackend::new();
    escrow_backend.expect_escrow_total_for_seller().returning(|_| Ok(Cfa::from(26_400)));
    let wallet_api = WalletApi::new(backend);
    let escrow_api = EscrowApi::new(escrow_backend, EventProducers::default());
    cfg.service(WalletRoute::<MockBackend>::new())
        .service(SellerEscrowRoute::<MockBackend>::new())
        .app_data(web::Data::new(wallet_api))
        .app_data(web::Data::new(escrow_api));
}
