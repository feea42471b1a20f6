//! Webhook signature middleware.
//!
//! The mobile-money processor signs each webhook body with HMAC-SHA256, keyed with `SE_MOBILE_MONEY_WEBHOOK_SECRET`,
//! and sends the base64 signature in the `X-Mobile-Money-Signature` header. Only the webhook scope is wrapped, since a
//! confirmed payment moves money into escrow or a wallet.
//!
//! The body has to be buffered to be checked, and is put back on the request for the handler once the signature
//! matches.
use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::{ErrorBadRequest, ErrorForbidden},
    web,
    Error,
};
use futures::future::LocalBoxFuture;
use log::{trace, warn};
use settlement_common::Secret;

use crate::helpers::signature_matches;

/// What the middleware checks. Shared by every service instance that actix creates for the scope.
struct SignatureCheck {
    header: String,
    secret: Secret<String>,
    /// Switched off in local setups where the processor sandbox does not sign its calls.
    enabled: bool,
}

impl SignatureCheck {
    fn verify(&self, req: &ServiceRequest, body: &[u8]) -> Result<(), Error> {
        if self.secret.is_empty() {
            warn!("🔐️ Webhook call refused. No webhook secret is configured.");
            return Err(ErrorForbidden("Webhook signatures cannot be verified."));
        }
        let Some(signature) = req.headers().get(&self.header) else {
            warn!("🔐️ Webhook call to {} refused. It carries no {} header.", req.path(), self.header);
            return Err(ErrorForbidden("No HMAC signature found."));
        };
        let signature = signature.to_str().unwrap_or_default();
        if signature_matches(self.secret.reveal(), body, signature) {
            Ok(())
        } else {
            warn!("🔐️ Webhook call to {} refused. The signature does not match the body.", req.path());
            Err(ErrorForbidden("Invalid HMAC signature."))
        }
    }
}

pub struct HmacMiddlewareFactory {
    check: Rc<SignatureCheck>,
}

impl HmacMiddlewareFactory {
    pub fn new(header: &str, secret: Secret<String>, enabled: bool) -> Self {
        Self { check: Rc::new(SignatureCheck { header: header.to_string(), secret, enabled }) }
    }
}

impl<S, B> Transform<S, ServiceRequest> for HmacMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = HmacMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(HmacMiddlewareService { check: Rc::clone(&self.check), service: Rc::new(service) }))
    }
}

pub struct HmacMiddlewareService<S> {
    check: Rc<SignatureCheck>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for HmacMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let check = Rc::clone(&self.check);
        let service = Rc::clone(&self.service);
        Box::pin(async move {
            if !check.enabled {
                trace!("🔐️ Signature checks are off. Passing {} through.", req.path());
                return service.call(req).await;
            }
            let body = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("🔐️ Could not read the webhook body. {e:?}");
                ErrorBadRequest("Failed to extract request data.")
            })?;
            check.verify(&req, &body)?;
            trace!("🔐️ Webhook signature verified for {}", req.path());
            req.set_payload(replay(body));
            service.call(req).await
        })
    }
}

/// Turns the buffered body back into a payload the handler can read.
fn replay(body: web::Bytes) -> Payload {
    let (_, mut payload) = h1::Payload::create(true);
    payload.unread_data(body);
    Payload::from(payload)
}
