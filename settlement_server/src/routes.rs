//! HTTP handlers of the settlement server.
//!
//! Each handler is declared through [`route!`], which mounts it on its path and limits it to the roles listed. The
//! handlers only unpack the request, check who is asking and hand over to the engine APIs held in the app data.
//!
//! Database and processor calls are awaited. A handler must never block its actix worker thread, or a slow mobile-money
//! processor would hold up every other request queued on that worker.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use mobile_money_tools::CallbackPayload;
use serde_json::json;
use settlement_engine::{
    db_types::{Role, UserId},
    helpers::normalize_phone,
    order_objects::{CheckoutOptions, CheckoutRequest},
    traits::{InitiatedPayment, LedgerManagement, PaymentProcessor, PayoutManagement, SettlementDatabase},
    EscrowApi,
    GatewayAction,
    GatewayRequest,
    GatewayResponse,
    OrderFlowApi,
    PaymentGatewayApi,
    PayoutApi,
    WalletApi,
};

use crate::{
    auth::AuthUser,
    data_objects::{EscrowTotal, PayoutRequestBody, RechargeRequest, WalletOverview},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal requires [$($roles:expr),*]) => {
        paste::paste! { pub struct [<$name:camel Route>];}
        paste::paste! {
                impl [<$name:camel Route>] {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name)
                        .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:expr),*])  => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Gateway  ----------------------------------------------------
route!(payment_gateway => Post "/payments/gateway" impl SettlementDatabase, PaymentProcessor);
/// The payment gateway boundary.
///
/// Clients post `{action: "initiate" | "verify", ...}` and always get a `200 OK` with a `{success, ...}` body; failures
/// are reported in the body. Processor callbacks are only accepted on the signed webhook route, since this route is
/// not authenticated.
pub async fn payment_gateway<B, P>(
    body: web::Json<GatewayRequest>,
    api: web::Data<PaymentGatewayApi<B, P>>,
) -> HttpResponse
where
    B: SettlementDatabase,
    P: PaymentProcessor,
{
    let request = body.into_inner();
    trace!("💻️ Gateway request: {request:?}");
    if request.action == GatewayAction::Callback {
        debug!("💻️ Refusing an unsigned payment callback");
        return HttpResponse::Ok().json(GatewayResponse::failure("Callbacks must be sent to the payment webhook"));
    }
    let response = api.handle(request).await;
    HttpResponse::Ok().json(response)
}

route!(mobile_money_webhook => Post "/mobile-money" impl SettlementDatabase, PaymentProcessor);
/// Receives payment status pushes from the mobile-money processor. The scope that hosts this route checks the HMAC
/// signature of the body.
pub async fn mobile_money_webhook<B, P>(
    body: web::Json<CallbackPayload>,
    api: web::Data<PaymentGatewayApi<B, P>>,
) -> HttpResponse
where
    B: SettlementDatabase,
    P: PaymentProcessor,
{
    let CallbackPayload { transaction_id, reference, status } = body.into_inner();
    info!("💻️ Payment webhook for {transaction_id:?} [{reference:?}]: {status}");
    let response = api.callback(transaction_id.as_deref(), reference.as_deref(), &status).await;
    HttpResponse::Ok().json(response)
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(checkout => Post "/checkout" impl SettlementDatabase, PaymentProcessor);
/// Splits the caller's cart into one order per seller.
///
/// Wallet checkouts are paid immediately. For mobile-money checkouts the orders are created as pending and a payment
/// is started with the processor for the cart total. If the processor cannot be reached, the orders are kept and the
/// response is a `502` carrying the payment reference, so that the checkout can be retried with it.
pub async fn checkout<B, P>(
    user: AuthUser,
    body: web::Json<CheckoutRequest>,
    orders_api: web::Data<OrderFlowApi<B>>,
    gateway: web::Data<PaymentGatewayApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase,
    P: PaymentProcessor,
{
    let CheckoutRequest { payment_method, items, phone, payment_ref } = body.into_inner();
    debug!("💻️ Checkout for {} with {payment_method}. {} items", user.id, items.len());
    let phone = if payment_method.is_wallet() {
        None
    } else {
        let phone = phone.ok_or_else(|| {
            ServerError::InvalidRequestBody(format!("A phone number is required to pay with {payment_method}"))
        })?;
        Some(normalize_phone(&phone, gateway.country_code()).map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?)
    };
    let options = CheckoutOptions { status: None, payment_ref };
    let mut result = orders_api.split_and_create_orders(&user.id, payment_method, items, options).await?;
    if let Some(phone) = phone {
        let response = gateway.initiate(result.total(), &phone, &result.payment_ref).await;
        if !response.success {
            let message = response.message.unwrap_or_default();
            warn!("💻️ Payment for [{}] could not be started. {message}", result.payment_ref);
            return Err(ServerError::PaymentInitiationFailed { payment_ref: result.payment_ref, message });
        }
        result.payment = Some(InitiatedPayment {
            transaction_id: response.transaction_id.unwrap_or_default(),
            payment_url: response.payment_url,
        });
    }
    Ok(HttpResponse::Ok().json(result))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(order_by_id => Get "/orders/{id}" impl SettlementDatabase);
/// Buyers and sellers can read their own orders. Admins can read any order.
pub async fn order_by_id<B: SettlementDatabase>(
    user: AuthUser,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ GET order {id} for {}", user.id);
    let order = api.fetch_order(id).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Order {id}")))?;
    let is_party = order.buyer_id == user.id || order.seller_id.as_ref() == Some(&user.id);
    if !(is_party || user.is_admin()) {
        return Err(ServerError::InsufficientPermissions(format!("Order {id} belongs to someone else")));
    }
    let items = api.fetch_order_items(id).await?;
    Ok(HttpResponse::Ok().json(json!({ "order": order, "items": items })))
}

route!(order_delivered => Post "/orders/{id}/delivered" impl SettlementDatabase where requires [Role::Seller, Role::Partner, Role::Admin]);
/// Confirms delivery of an order and releases its escrow to the seller. Only the order's seller or an admin may do
/// this.
pub async fn order_delivered<B: SettlementDatabase>(
    user: AuthUser,
    path: web::Path<i64>,
    orders_api: web::Data<OrderFlowApi<B>>,
    escrow_api: web::Data<EscrowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    info!("💻️ Delivery of order {id} confirmed by {}", user.id);
    let order = orders_api.fetch_order(id).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Order {id}")))?;
    if !(user.is_admin() || order.seller_id.as_ref() == Some(&user.id)) {
        return Err(ServerError::InsufficientPermissions(format!("Only the seller of order {id} can confirm delivery")));
    }
    let result = escrow_api.mark_delivered(id, &user.id).await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(order_paid => Post "/orders/{id}/paid" impl SettlementDatabase where requires [Role::Admin]);
/// Manual payment confirmation of a pending order.
pub async fn order_paid<B: SettlementDatabase>(
    user: AuthUser,
    path: web::Path<i64>,
    api: web::Data<EscrowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    info!("💻️ Order {id} marked as paid by {}", user.id);
    let order = api.mark_paid(id, &user.id).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Wallets  ----------------------------------------------------
route!(wallet => Get "/wallet/{user_id}" impl LedgerManagement);
/// The wallet balance of a user, its ledger and whether the two agree.
pub async fn wallet<B: LedgerManagement>(
    user: AuthUser,
    path: web::Path<UserId>,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let owner = path.into_inner();
    if !user.can_access(&owner) {
        return Err(ServerError::InsufficientPermissions(format!("Cannot read the wallet of {owner}")));
    }
    debug!("💻️ GET wallet for {owner}");
    let summary = api.wallet_summary(&owner).await?;
    let reconciliation = api.reconcile(&owner).await?;
    Ok(HttpResponse::Ok().json(WalletOverview { summary, reconciliation }))
}

route!(wallet_recharge => Post "/wallet/recharge" impl SettlementDatabase, PaymentProcessor);
/// Starts a top-up of the caller's wallet. The wallet is credited once the processor confirms the payment.
pub async fn wallet_recharge<B, P>(
    user: AuthUser,
    body: web::Json<RechargeRequest>,
    api: web::Data<PaymentGatewayApi<B, P>>,
) -> HttpResponse
where
    B: SettlementDatabase,
    P: PaymentProcessor,
{
    let RechargeRequest { amount, phone_number } = body.into_inner();
    info!("💻️ Recharge of {amount} requested by {}", user.id);
    let response = api.initiate_recharge(&user.id, amount, &phone_number).await;
    if response.success {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::BadRequest().json(response)
    }
}

route!(seller_escrow => Get "/sellers/{id}/escrow" impl SettlementDatabase);
pub async fn seller_escrow<B: SettlementDatabase>(
    user: AuthUser,
    path: web::Path<UserId>,
    api: web::Data<EscrowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let seller = path.into_inner();
    if !user.can_access(&seller) {
        return Err(ServerError::InsufficientPermissions(format!("Cannot read the escrow of {seller}")));
    }
    let escrow_total = api.escrow_total(&seller).await?;
    Ok(HttpResponse::Ok().json(EscrowTotal { seller_id: seller.to_string(), escrow_total }))
}

//----------------------------------------------   Payouts  ----------------------------------------------------
route!(request_payout => Post "/payouts" impl PayoutManagement where requires [Role::Seller, Role::Partner]);
/// A seller asks to withdraw part of their wallet balance. The amount is debited straight away.
pub async fn request_payout<B: PayoutManagement>(
    user: AuthUser,
    body: web::Json<PayoutRequestBody>,
    api: web::Data<PayoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let PayoutRequestBody { amount, method, phone_number } = body.into_inner();
    info!("💻️ Payout of {amount} to {method} requested by {}", user.id);
    let (request, update) = api.request_payout(&user.id, amount, method, &phone_number).await?;
    Ok(HttpResponse::Ok().json(json!({ "request": request, "new_balance": update.new_balance })))
}

route!(pending_payouts => Get "/payouts/pending" impl PayoutManagement where requires [Role::Admin]);
pub async fn pending_payouts<B: PayoutManagement>(api: web::Data<PayoutApi<B>>) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET pending payouts");
    let requests = api.pending_payout_requests().await?;
    Ok(HttpResponse::Ok().json(requests))
}

route!(approve_payout => Post "/payouts/{id}/approve" impl PayoutManagement where requires [Role::Admin]);
pub async fn approve_payout<B: PayoutManagement>(
    user: AuthUser,
    path: web::Path<i64>,
    api: web::Data<PayoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    info!("💻️ Payout request {id} approved by {}", user.id);
    let resolution = api.approve(id, &user.id).await?;
    Ok(HttpResponse::Ok().json(resolution))
}

route!(reject_payout => Post "/payouts/{id}/reject" impl PayoutManagement where requires [Role::Admin]);
pub async fn reject_payout<B: PayoutManagement>(
    user: AuthUser,
    path: web::Path<i64>,
    api: web::Data<PayoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    info!("💻️ Payout request {id} rejected by {}", user.id);
    let resolution = api.reject(id, &user.id).await?;
    Ok(HttpResponse::Ok().json(resolution))
}
