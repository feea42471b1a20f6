use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Cfa, Order, UserId},
    events::{EventProducers, OrderPaidEvent, PayoutReleasedEvent},
    traits::{DeliveryResult, SettlementDatabase, SettlementError},
};

/// The escrow lifecycle of an order.
///
/// Payout status only moves forward, `PENDING -> ESCROW -> PAID`. The seller's share enters escrow when the order is
/// paid and is credited to the seller's wallet, exactly once, when the order is delivered.
pub struct EscrowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for EscrowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EscrowApi")
    }
}

impl<B> EscrowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> EscrowApi<B>
where B: SettlementDatabase
{
    /// Manually confirms payment of an order that is awaiting payment.
    pub async fn mark_paid(&self, order_id: i64, actor: &UserId) -> Result<Order, SettlementError> {
        let order = self.db.mark_order_paid(order_id, actor.as_str()).await?;
        info!("🔄️ Order #{order_id} marked as paid by {actor}. {} held in escrow.", order.escrow_amount);
        self.producers.publish_order_paid(OrderPaidEvent::new(order.clone())).await;
        Ok(order)
    }

    /// Confirms delivery of an order and releases its escrow to the seller.
    ///
    /// Calling this again for a delivered order is harmless: the order is returned and no money moves. An order that
    /// has not been paid yet cannot be delivered.
    pub async fn mark_delivered(&self, order_id: i64, actor: &UserId) -> Result<DeliveryResult, SettlementError> {
        let result = self.db.mark_order_delivered(order_id, actor.as_str()).await.map_err(|e| {
            if matches!(e, SettlementError::SellerNotResolved(_) | SettlementError::DatabaseError(_)) {
                error!("🔄️ Delivery of order #{order_id} failed. Its escrow has not been released. {e}");
            }
            e
        })?;
        match &result.payout {
            Some(update) => {
                let seller = update.transaction.user_id.clone();
                let amount = update.transaction.amount;
                debug!("🔄️ Order #{order_id} delivered by {actor}. {amount} released to {seller}.");
                let event = PayoutReleasedEvent::new(result.order.clone(), seller, amount, update.new_balance);
                self.producers.publish_payout_released(event).await;
            },
            None => debug!("🔄️ Order #{order_id} was already paid out. Nothing to release."),
        }
        Ok(result)
    }

    /// The amount currently held in escrow for the seller, across all their paid but undelivered orders.
    pub async fn escrow_total(&self, seller: &UserId) -> Result<Cfa, SettlementError> {
        self.db.escrow_total_for_seller(seller).await
    }
}
