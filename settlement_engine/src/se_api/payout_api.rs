use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Cfa, NewPayoutRequest, PaymentMethod, PayoutRequest, PayoutRequestStatus, UserId},
    events::{EventProducers, PayoutResolvedEvent},
    helpers::{normalize_phone, DEFAULT_COUNTRY_CODE},
    traits::{LedgerUpdate, PayoutManagement, PayoutResolution, SettlementError},
};

/// Seller withdrawals to a mobile-money account.
///
/// The amount leaves the seller's wallet as soon as the request is made, so it cannot be spent twice. An admin then
/// approves the request (after sending the money) or rejects it, which refunds the wallet.
pub struct PayoutApi<B> {
    db: B,
    producers: EventProducers,
    country_code: String,
}

impl<B> Debug for PayoutApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PayoutApi (+{})", self.country_code)
    }
}

impl<B> PayoutApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, country_code: DEFAULT_COUNTRY_CODE.to_string() }
    }

    pub fn with_country_code<S: Into<String>>(mut self, country_code: S) -> Self {
        self.country_code = country_code.into();
        self
    }
}

impl<B> PayoutApi<B>
where B: PayoutManagement
{
    /// Validates and stores a withdrawal request, debiting the seller's wallet.
    ///
    /// Fails without writing anything if the amount is not positive, the phone number is malformed, the method is
    /// not a mobile-money method, or the balance does not cover the amount.
    pub async fn request_payout(
        &self,
        seller: &UserId,
        amount: Cfa,
        method: PaymentMethod,
        phone: &str,
    ) -> Result<(PayoutRequest, LedgerUpdate), SettlementError> {
        if !amount.is_positive() {
            return Err(SettlementError::InvalidAmount(amount));
        }
        if !method.is_mobile_money() {
            return Err(SettlementError::InvalidPayoutMethod(method));
        }
        let phone = normalize_phone(phone, &self.country_code)?;
        let request = NewPayoutRequest { seller_id: seller.clone(), amount, method, phone };
        let (request, update) = self.db.create_payout_request(request).await?;
        info!(
            "📤️ Payout request #{} of {amount} created for {seller}. Balance is now {}",
            request.id, update.new_balance
        );
        Ok((request, update))
    }

    pub async fn approve(&self, id: i64, admin: &UserId) -> Result<PayoutResolution, SettlementError> {
        let resolution = self.db.approve_payout_request(id, admin).await?;
        info!("📤️ Payout request #{id} approved by {admin}");
        self.call_payout_resolved_hook(&resolution, admin).await;
        Ok(resolution)
    }

    pub async fn reject(&self, id: i64, admin: &UserId) -> Result<PayoutResolution, SettlementError> {
        let resolution = self.db.reject_payout_request(id, admin).await?;
        info!(
            "📤️ Payout request #{id} rejected by {admin}. {} refunded to {}",
            resolution.request.amount, resolution.request.seller_id
        );
        self.call_payout_resolved_hook(&resolution, admin).await;
        Ok(resolution)
    }

    pub async fn fetch_request(&self, id: i64) -> Result<PayoutRequest, SettlementError> {
        self.db.fetch_payout_request(id).await?.ok_or(SettlementError::PayoutRequestNotFound(id))
    }

    /// The admin queue: every request still awaiting a decision, oldest first.
    pub async fn pending_payout_requests(&self) -> Result<Vec<PayoutRequest>, SettlementError> {
        self.db.fetch_payout_requests(Some(PayoutRequestStatus::Pending)).await
    }

    pub async fn requests_for_seller(&self, seller: &UserId) -> Result<Vec<PayoutRequest>, SettlementError> {
        self.db.fetch_payout_requests_for_seller(seller).await
    }

    async fn call_payout_resolved_hook(&self, resolution: &PayoutResolution, admin: &UserId) {
        let event = PayoutResolvedEvent::new(resolution.request.clone(), admin.clone());
        self.producers.publish_payout_resolved(event).await;
    }
}
