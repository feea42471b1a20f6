use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use settlement_engine::{
    events::EventProducers,
    EscrowApi,
    OrderFlowApi,
    PaymentGatewayApi,
    PayoutApi,
    SqliteDatabase,
    WalletApi,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    integrations::{mobile_money::MobileMoneyProcessor, notifications::create_notification_handlers},
    middleware::HmacMiddlewareFactory,
    routes::{
        health,
        ApprovePayoutRoute,
        CheckoutRoute,
        MobileMoneyWebhookRoute,
        OrderByIdRoute,
        OrderDeliveredRoute,
        OrderPaidRoute,
        PaymentGatewayRoute,
        PendingPayoutsRoute,
        RejectPayoutRoute,
        RequestPayoutRoute,
        SellerEscrowRoute,
        WalletRechargeRoute,
        WalletRoute,
    },
};

pub const MOBILE_MONEY_SIGNATURE_HEADER: &str = "X-Mobile-Money-Signature";

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.db_max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let processor = MobileMoneyProcessor::new(config.mobile_money.api.clone())
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = create_notification_handlers(config.event_buffer_size);
    let producers = handlers.producers();
    actix_web::rt::spawn(handlers.start_handlers());
    info!("📬️ Notification hooks are running");
    let srv = create_server_instance(config, db, processor, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    processor: MobileMoneyProcessor,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone());
        let escrow_api = EscrowApi::new(db.clone(), producers.clone());
        let wallet_api = WalletApi::new(db.clone());
        let payout_api = PayoutApi::new(db.clone(), producers.clone()).with_country_code(config.country_code.as_str());
        let gateway_api = PaymentGatewayApi::new(db.clone(), processor.clone(), producers.clone())
            .with_country_code(config.country_code.as_str());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("se::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(escrow_api))
            .app_data(web::Data::new(wallet_api))
            .app_data(web::Data::new(payout_api))
            .app_data(web::Data::new(gateway_api));
        let api_scope = web::scope("/api")
            .service(CheckoutRoute::<SqliteDatabase, MobileMoneyProcessor>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(OrderDeliveredRoute::<SqliteDatabase>::new())
            .service(OrderPaidRoute::<SqliteDatabase>::new())
            .service(WalletRechargeRoute::<SqliteDatabase, MobileMoneyProcessor>::new())
            .service(WalletRoute::<SqliteDatabase>::new())
            .service(SellerEscrowRoute::<SqliteDatabase>::new())
            .service(PendingPayoutsRoute::<SqliteDatabase>::new())
            .service(RequestPayoutRoute::<SqliteDatabase>::new())
            .service(ApprovePayoutRoute::<SqliteDatabase>::new())
            .service(RejectPayoutRoute::<SqliteDatabase>::new());
        let hmac_middleware = HmacMiddlewareFactory::new(
            MOBILE_MONEY_SIGNATURE_HEADER,
            config.mobile_money.webhook_secret.clone(),
            config.mobile_money.hmac_checks,
        );
        let webhook_scope = web::scope("/webhooks")
            .wrap(hmac_middleware)
            .service(MobileMoneyWebhookRoute::<SqliteDatabase, MobileMoneyProcessor>::new());
        app.service(health)
            .service(PaymentGatewayRoute::<SqliteDatabase, MobileMoneyProcessor>::new())
            .service(webhook_scope)
            .service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
