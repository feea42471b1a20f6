use actix_web::{
    body::MessageBody,
    http::{header::ContentType, StatusCode},
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use settlement_common::Secret;
use settlement_engine::{
    db_types::{Cfa, GatewayPaymentStatus},
    events::EventProducers,
    traits::ConfirmationResult,
    PaymentGatewayApi,
};

use super::{
    helpers::json,
    mocks::{gateway_payment, paid_order, MockBackend, MockProcessor},
};
use crate::{
    helpers::calculate_hmac,
    middleware::HmacMiddlewareFactory,
    routes::MobileMoneyWebhookRoute,
    server::MOBILE_MONEY_SIGNATURE_HEADER,
};

const WEBHOOK_SECRET: &str = "webhook-secret";
const RECORDED_REFERENCE: &str = "PAY-alice-1710235800000";
const CONFIRMED: &str = r#"{"transactionId":"mm-tx-1","reference":"PAY-alice-1710235800000","status":"SUCCESS"}"#;

async fn send(body: &str, signature: Option<String>) -> Result<(StatusCode, String), String> {
    let mut req = TestRequest::post()
        .uri("/webhooks/mobile-money")
        .insert_header(ContentType::json())
        .set_payload(body.to_string());
    if let Some(signature) = signature {
        req = req.insert_header((MOBILE_MONEY_SIGNATURE_HEADER, signature));
    }
    let service = test::init_service(App::new().configure(configure)).await;
    let (_, res) = test::try_call_service(&service, req.to_request()).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok((status, body))
}

#[actix_web::test]
async fn signed_confirmation_is_applied() {
    let _ = env_logger::try_init().ok();
    let signature = calculate_hmac(WEBHOOK_SECRET, CONFIRMED.as_bytes());
    let (status, body) = send(CONFIRMED, Some(signature)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "1 orders paid");
    assert_eq!(body["status"], "success");
}

#[actix_web::test]
async fn confirmation_for_another_reference_is_refused() {
    let _ = env_logger::try_init().ok();
    let payload = r#"{"transactionId":"mm-tx-1","reference":"PAY-mallory-1710235800000","status":"SUCCESS"}"#;
    let signature = calculate_hmac(WEBHOOK_SECRET, payload.as_bytes());
    let (status, body) = send(payload, Some(signature)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("PAY-mallory-1710235800000"));
}

#[actix_web::test]
async fn short_payments_leave_the_orders_pending() {
    let _ = env_logger::try_init().ok();
    let payload = r#"{"transactionId":"mm-tx-short","status":"SUCCESS"}"#;
    let signature = calculate_hmac(WEBHOOK_SECRET, payload.as_bytes());
    let (status, body) = send(payload, Some(signature)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "underpaid");
    assert!(body["message"].as_str().unwrap().contains("does not cover"));
}

#[actix_web::test]
async fn unconfirmed_statuses_change_nothing() {
    let _ = env_logger::try_init().ok();
    let payload = r#"{"transactionId":"mm-tx-1","status":"FAILED"}"#;
    let signature = calculate_hmac(WEBHOOK_SECRET, payload.as_bytes());
    let (status, body) = send(payload, Some(signature)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["message"], "Payment not confirmed yet");
    assert_eq!(body["status"], "failed");
}

#[actix_web::test]
async fn unsigned_calls_are_refused() {
    let _ = env_logger::try_init().ok();
    let err = send(CONFIRMED, None).await.expect_err("Unsigned calls must fail");
    assert_eq!(err, "No HMAC signature found.");
}

#[actix_web::test]
async fn forged_signatures_are_refused() {
    let _ = env_logger::try_init().ok();
    let signature = calculate_hmac("guessed-secret", CONFIRMED.as_bytes());
    let err = send(CONFIRMED, Some(signature)).await.expect_err("Forged calls must fail");
    assert_eq!(err, "Invalid HMAC signature.");
    let tampered = CONFIRMED.replace("mm-tx-1", "mm-tx-2");
    let signature = calculate_hmac(WEBHOOK_SECRET, CONFIRMED.as_bytes());
    let err = send(&tampered, Some(signature)).await.expect_err("Tampered calls must fail");
    assert_eq!(err, "Invalid HMAC signature.");
}

fn configure(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_fetch_gateway_payment().returning(|txid| match txid {
        "mm-tx-1" => Ok(Some(gateway_payment(txid, RECORDED_REFERENCE, 15_000, GatewayPaymentStatus::Pending))),
        "mm-tx-short" => Ok(Some(gateway_payment(txid, "PAY-carol-1710235800000", 5_000, GatewayPaymentStatus::Pending))),
        _ => Ok(None),
    });
    backend.expect_confirm_payment().returning(|txid| match txid {
        "mm-tx-short" => Ok(ConfirmationResult::Underpaid {
            reference: "PAY-carol-1710235800000".into(),
            received: Cfa::from(5_000),
            owed: Cfa::from(15_000),
        }),
        _ => Ok(ConfirmationResult::Purchase { paid_orders: vec![paid_order(1, "alice", "bob")] }),
    });
    // Webhook calls never poll the processor
    let processor = MockProcessor::new();
    let gateway_api = PaymentGatewayApi::new(backend, processor, EventProducers::default());
    let hmac = HmacMiddlewareFactory::new(MOBILE_MONEY_SIGNATURE_HEADER, Secret::new(WEBHOOK_SECRET.to_string()), true);
    cfg.service(
        web::scope("/webhooks").wrap(hmac).service(MobileMoneyWebhookRoute::<MockBackend, MockProcessor>::new()),
    )
    .app_data(web::Data::new(gateway_api));
}
