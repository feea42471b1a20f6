//! Event hooks that announce settlement events.
//!
//! Payment confirmations, escrow releases and payout decisions are all reported to the log. Further notification
//! channels (SMS, push) subscribe to the same events.
use futures::future::BoxFuture;
use log::*;
use settlement_engine::events::{
    EventHandlers,
    EventHooks,
    OrderPaidEvent,
    PayoutReleasedEvent,
    PayoutResolvedEvent,
};

pub fn create_notification_handlers(buffer_size: usize) -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks.on_order_paid(|ev: OrderPaidEvent| -> BoxFuture<'static, ()> {
        let order = ev.order;
        Box::pin(async move {
            info!(
                "📬️ Order #{} [{}] is paid. {} held in escrow for {}.",
                order.id,
                order.payment_ref,
                order.escrow_amount,
                order.seller_key()
            );
        })
    });
    hooks.on_payout_released(|ev: PayoutReleasedEvent| -> BoxFuture<'static, ()> {
        Box::pin(async move {
            info!(
                "📬️ Order #{} was delivered. {} released to {}, whose balance is now {}.",
                ev.order.id, ev.amount, ev.seller, ev.new_balance
            );
        })
    });
    hooks.on_payout_resolved(|ev: PayoutResolvedEvent| -> BoxFuture<'static, ()> {
        Box::pin(async move {
            info!(
                "📬️ Payout request #{} of {} for {} is now {} (by {}).",
                ev.request.id, ev.request.amount, ev.request.seller_id, ev.request.status, ev.admin
            );
        })
    });
    EventHandlers::new(buffer_size, hooks)
}
