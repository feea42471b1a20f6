//! The boundary between the marketplace and the mobile-money processor.
//!
//! Payments are asynchronous. [`PaymentGatewayApi::initiate`] asks the processor to collect a payment, and the
//! confirmation arrives later, either pushed by the processor ([`PaymentGatewayApi::callback`]) or pulled by a client
//! ([`PaymentGatewayApi::verify`]). Both paths end in the same idempotent confirmation, so a payment confirmed twice
//! is only applied once.
//!
//! A confirmation always applies to the reference recorded when the payment was initiated. Requests naming another
//! reference for the same transaction are refused, and a purchase is only paid once the confirmed amounts cover what
//! its orders owe.
//!
//! None of the methods here return an error. Every failure is reported as `{success: false, message}`.
use std::{fmt::Debug, str::FromStr};

use log::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    db_types::{Cfa, GatewayPayment, GatewayPaymentStatus, NewGatewayPayment, UserId},
    events::{EventProducers, OrderPaidEvent},
    helpers::{is_confirmed_status, normalize_phone, PaymentReference, DEFAULT_COUNTRY_CODE},
    traits::{
        ConfirmationResult,
        GatewayError,
        InitiatedPayment,
        PaymentInitiation,
        PaymentProcessor,
        SettlementDatabase,
        SettlementError,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayAction {
    Initiate,
    Verify,
    Callback,
}

/// A request to the gateway boundary.
///
/// `orderId` and `reference` both carry the payment reference. `orderId` is what checkout clients send, `reference`
/// is what the processor echoes back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayRequest {
    pub action: GatewayAction,
    #[serde(default)]
    pub amount: Option<Cfa>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl GatewayRequest {
    fn payment_reference(&self) -> Option<&str> {
        self.order_id.as_deref().or(self.reference.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl GatewayResponse {
    pub fn failure<S: Into<String>>(message: S) -> Self {
        Self { success: false, message: Some(message.into()), ..Default::default() }
    }

    pub fn ok() -> Self {
        Self { success: true, ..Default::default() }
    }

    pub fn with_message<S: Into<String>>(mut self, message: S) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_status<S: Into<String>>(mut self, status: S) -> Self {
        self.status = Some(status.into());
        self
    }
}

#[derive(Debug, Clone, Error)]
pub enum GatewayApiError {
    #[error("{0}")]
    Settlement(#[from] SettlementError),
    #[error("{0}")]
    Gateway(#[from] GatewayError),
    #[error("Missing field: {0}")]
    MissingField(&'static str),
    #[error("No payment is known for transaction {0}")]
    UnknownTransaction(String),
    #[error("No payment is known for reference {0}")]
    UnknownReference(String),
    #[error("Transaction {transaction_id} was initiated for {recorded}, not {supplied}")]
    ReferenceMismatch { transaction_id: String, recorded: String, supplied: String },
    #[error("Reference {0} has several pending payments. A transactionId is required.")]
    AmbiguousReference(String),
}

impl From<GatewayApiError> for GatewayResponse {
    fn from(e: GatewayApiError) -> Self {
        GatewayResponse::failure(e.to_string())
    }
}

pub struct PaymentGatewayApi<B, P> {
    db: B,
    processor: P,
    producers: EventProducers,
    country_code: String,
}

impl<B, P> Debug for PaymentGatewayApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentGatewayApi (+{})", self.country_code)
    }
}

impl<B, P> PaymentGatewayApi<B, P> {
    pub fn new(db: B, processor: P, producers: EventProducers) -> Self {
        Self { db, processor, producers, country_code: DEFAULT_COUNTRY_CODE.to_string() }
    }

    pub fn with_country_code<S: Into<String>>(mut self, country_code: S) -> Self {
        self.country_code = country_code.into();
        self
    }

    /// The country code used to normalise phone numbers.
    pub fn country_code(&self) -> &str {
        &self.country_code
    }
}

impl<B, P> PaymentGatewayApi<B, P>
where
    B: SettlementDatabase,
    P: PaymentProcessor,
{
    /// Dispatches a boundary request on its `action`.
    pub async fn handle(&self, request: GatewayRequest) -> GatewayResponse {
        match request.action {
            GatewayAction::Initiate => {
                let Some(amount) = request.amount else {
                    return GatewayApiError::MissingField("amount").into();
                };
                let Some(phone) = request.phone_number.as_deref() else {
                    return GatewayApiError::MissingField("phoneNumber").into();
                };
                let Some(reference) = request.payment_reference() else {
                    return GatewayApiError::MissingField("orderId").into();
                };
                self.initiate(amount, phone, reference).await
            },
            GatewayAction::Verify => {
                let Some(transaction_id) = request.transaction_id.as_deref() else {
                    return GatewayApiError::MissingField("transactionId").into();
                };
                self.verify(transaction_id, request.payment_reference()).await
            },
            GatewayAction::Callback => {
                let Some(status) = request.status.as_deref() else {
                    return GatewayApiError::MissingField("status").into();
                };
                self.callback(request.transaction_id.as_deref(), request.payment_reference(), status).await
            },
        }
    }

    /// Asks the processor to collect `amount` from `phone` for the payment reference.
    ///
    /// The payment is recorded locally only once the processor has accepted it.
    pub async fn initiate(&self, amount: Cfa, phone: &str, reference: &str) -> GatewayResponse {
        match self.try_initiate(amount, phone, reference).await {
            Ok(response) => response,
            Err(e) => {
                warn!("💸️ Could not initiate payment for [{reference}]. {e}");
                e.into()
            },
        }
    }

    /// Polls the processor for the status of a transaction and applies the confirmation if it has succeeded.
    pub async fn verify(&self, transaction_id: &str, reference: Option<&str>) -> GatewayResponse {
        match self.try_verify(transaction_id, reference).await {
            Ok(response) => response,
            Err(e) => {
                warn!("💸️ Could not verify transaction {transaction_id}. {e}");
                e.into()
            },
        }
    }

    /// Applies a status pushed by the processor. Either the transaction id or the reference must identify the
    /// payment. A reference alone is enough only while it has a single pending payment.
    pub async fn callback(
        &self,
        transaction_id: Option<&str>,
        reference: Option<&str>,
        status: &str,
    ) -> GatewayResponse {
        match self.try_callback(transaction_id, reference, status).await {
            Ok(response) => response,
            Err(e) => {
                warn!("💸️ Could not process callback for {transaction_id:?} [{reference:?}]. {e}");
                e.into()
            },
        }
    }

    /// Starts a wallet top-up. A `TOPUP-` reference is created for the user and the wallet is credited when the
    /// payment is confirmed.
    pub async fn initiate_recharge(&self, user: &UserId, amount: Cfa, phone: &str) -> GatewayResponse {
        match self.try_initiate_recharge(user, amount, phone).await {
            Ok(response) => response,
            Err(e) => {
                warn!("💸️ Could not start a recharge of {amount} for {user}. {e}");
                e.into()
            },
        }
    }

    async fn try_initiate(
        &self,
        amount: Cfa,
        phone: &str,
        reference: &str,
    ) -> Result<GatewayResponse, GatewayApiError> {
        let (payment, initiated) = self.request_payment(amount, phone, reference).await?;
        let payment = self.db.insert_gateway_payment(payment).await?;
        Ok(initiated_response(initiated, &payment.reference))
    }

    /// Validates the request and asks the processor to collect the payment. Nothing is written.
    async fn request_payment(
        &self,
        amount: Cfa,
        phone: &str,
        reference: &str,
    ) -> Result<(NewGatewayPayment, InitiatedPayment), GatewayApiError> {
        if !amount.is_positive() {
            return Err(SettlementError::InvalidAmount(amount).into());
        }
        let phone = normalize_phone(phone, &self.country_code).map_err(SettlementError::from)?;
        let reference = PaymentReference::from_str(reference).map_err(SettlementError::from)?.to_string();
        let request = PaymentInitiation { amount, phone: phone.clone(), reference: reference.clone() };
        let initiated = self.processor.initiate_payment(request).await?;
        debug!("💸️ Payment of {amount} for [{reference}] initiated as {}", initiated.transaction_id);
        let payment = NewGatewayPayment { transaction_id: initiated.transaction_id.clone(), reference, amount, phone };
        Ok((payment, initiated))
    }

    async fn try_verify(
        &self,
        transaction_id: &str,
        reference: Option<&str>,
    ) -> Result<GatewayResponse, GatewayApiError> {
        let payment = self.recorded_payment(transaction_id, reference).await?;
        let report = self.processor.check_payment_status(transaction_id).await?;
        trace!("💸️ Processor reports {transaction_id} as '{}'", report.status);
        check_reference(&payment, report.reference.as_deref())?;
        self.apply_status(&payment, &report.status).await
    }

    async fn try_callback(
        &self,
        transaction_id: Option<&str>,
        reference: Option<&str>,
        status: &str,
    ) -> Result<GatewayResponse, GatewayApiError> {
        let payment = match transaction_id {
            Some(txid) => self.recorded_payment(txid, reference).await?,
            None => {
                let reference = reference.ok_or(GatewayApiError::MissingField("reference"))?;
                let reference = PaymentReference::from_str(reference).map_err(SettlementError::from)?.to_string();
                let payments = self.db.fetch_gateway_payments_for_reference(&reference).await?;
                if payments.is_empty() {
                    return Err(GatewayApiError::UnknownReference(reference));
                }
                let mut pending = payments.into_iter().filter(|p| p.status == GatewayPaymentStatus::Pending);
                match (pending.next(), pending.next()) {
                    (Some(payment), None) => payment,
                    (Some(_), Some(_)) => return Err(GatewayApiError::AmbiguousReference(reference)),
                    (None, _) if is_confirmed_status(status) => {
                        debug!("💸️ Every payment for [{reference}] was already applied");
                        return Ok(GatewayResponse::ok().with_message(ALREADY_PROCESSED));
                    },
                    (None, _) => return Ok(unconfirmed(status)),
                }
            },
        };
        self.apply_status(&payment, status).await
    }

    async fn try_initiate_recharge(
        &self,
        user: &UserId,
        amount: Cfa,
        phone: &str,
    ) -> Result<GatewayResponse, GatewayApiError> {
        if !amount.is_positive() {
            return Err(SettlementError::InvalidAmount(amount).into());
        }
        if self.db.fetch_profile(user).await?.is_none() {
            return Err(SettlementError::ProfileNotFound(user.clone()).into());
        }
        let reference = self.unused_recharge_reference(user).await?;
        let (payment, initiated) = self.request_payment(amount, phone, &reference).await?;
        let (payment, pending) = self.db.insert_recharge_payment(payment, user).await?;
        if let Some(tx) = pending {
            info!(
                "💸️ Recharge #{} of {amount} for {user} awaiting confirmation of {} [{reference}]",
                tx.id, payment.transaction_id
            );
        }
        Ok(initiated_response(initiated, &reference))
    }

    /// A fresh top-up reference that no payment or ledger row uses yet.
    async fn unused_recharge_reference(&self, user: &UserId) -> Result<String, GatewayApiError> {
        for _ in 0..MAX_REFERENCE_ATTEMPTS {
            let reference = PaymentReference::recharge(user).to_string();
            let in_use = !self.db.fetch_gateway_payments_for_reference(&reference).await?.is_empty() ||
                !self.db.fetch_transactions_by_reference(&reference).await?.is_empty();
            if !in_use {
                return Ok(reference);
            }
            debug!("💸️ Recharge reference [{reference}] is already in use. Generating another.");
        }
        Err(SettlementError::PaymentReferenceExhausted(user.clone()).into())
    }

    /// The payment recorded for `transaction_id`. A reference supplied by the caller must match the recorded one.
    async fn recorded_payment(
        &self,
        transaction_id: &str,
        reference: Option<&str>,
    ) -> Result<GatewayPayment, GatewayApiError> {
        let payment = self
            .db
            .fetch_gateway_payment(transaction_id)
            .await?
            .ok_or_else(|| GatewayApiError::UnknownTransaction(transaction_id.to_string()))?;
        check_reference(&payment, reference)?;
        Ok(payment)
    }

    /// Applies `status` to a recorded payment.
    async fn apply_status(&self, payment: &GatewayPayment, status: &str) -> Result<GatewayResponse, GatewayApiError> {
        let transaction_id = payment.transaction_id.as_str();
        if !is_confirmed_status(status) {
            debug!("💸️ Transaction {transaction_id} is '{status}'. Nothing to apply yet.");
            return Ok(unconfirmed(status));
        }
        let status = status.trim().to_lowercase();
        let result = self.db.confirm_payment(transaction_id).await?;
        let reference = payment.reference.as_str();
        if result.is_noop() {
            debug!("💸️ Payment {transaction_id} [{reference}] was already applied");
            return Ok(GatewayResponse::ok().with_message(ALREADY_PROCESSED).with_status(status));
        }
        let response = match result {
            ConfirmationResult::Recharge { user, credited, new_balance } => {
                let total: Cfa = credited.iter().map(|t| t.amount).sum();
                info!("💸️ Recharge [{reference}] confirmed. {total} credited to {user}. Balance: {new_balance:?}");
                GatewayResponse::ok().with_message(format!("Wallet credited with {total}")).with_status(status)
            },
            ConfirmationResult::Purchase { paid_orders } => {
                info!("💸️ Payment [{reference}] confirmed. {} orders moved into escrow", paid_orders.len());
                let count = paid_orders.len();
                for order in paid_orders {
                    self.producers.publish_order_paid(OrderPaidEvent::new(order)).await;
                }
                GatewayResponse::ok().with_message(format!("{count} orders paid")).with_status(status)
            },
            ConfirmationResult::Underpaid { reference, received, owed } => {
                warn!("💸️ [{reference}] is underpaid. {received} received against {owed} owed.");
                GatewayResponse::ok()
                    .with_message(format!("Payment received but {received} does not cover the {owed} owed"))
                    .with_status(UNDERPAID)
            },
        };
        Ok(response)
    }
}

const ALREADY_PROCESSED: &str = "Payment already processed";
const UNDERPAID: &str = "underpaid";
const MAX_REFERENCE_ATTEMPTS: usize = 5;

fn check_reference(payment: &GatewayPayment, supplied: Option<&str>) -> Result<(), GatewayApiError> {
    match supplied.map(str::trim) {
        Some(r) if r != payment.reference => {
            warn!("💸️ Transaction {} is for [{}] but [{r}] was supplied", payment.transaction_id, payment.reference);
            Err(GatewayApiError::ReferenceMismatch {
                transaction_id: payment.transaction_id.clone(),
                recorded: payment.reference.clone(),
                supplied: r.to_string(),
            })
        },
        _ => Ok(()),
    }
}

fn initiated_response(initiated: InitiatedPayment, reference: &str) -> GatewayResponse {
    GatewayResponse {
        success: true,
        message: None,
        transaction_id: Some(initiated.transaction_id),
        payment_url: initiated.payment_url,
        status: Some("pending".to_string()),
        reference: Some(reference.to_string()),
    }
}

fn unconfirmed(status: &str) -> GatewayResponse {
    GatewayResponse::ok().with_status(status.trim().to_lowercase()).with_message("Payment not confirmed yet")
}
