use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, OrderPaidEvent, PayoutReleasedEvent, PayoutResolvedEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_paid_producer: Vec<EventProducer<OrderPaidEvent>>,
    pub payout_released_producer: Vec<EventProducer<PayoutReleasedEvent>>,
    pub payout_resolved_producer: Vec<EventProducer<PayoutResolvedEvent>>,
}

impl EventProducers {
    pub async fn publish_order_paid(&self, event: OrderPaidEvent) {
        for producer in &self.order_paid_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_payout_released(&self, event: PayoutReleasedEvent) {
        for producer in &self.payout_released_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_payout_resolved(&self, event: PayoutResolvedEvent) {
        for producer in &self.payout_resolved_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_order_paid: Option<EventHandler<OrderPaidEvent>>,
    pub on_payout_released: Option<EventHandler<PayoutReleasedEvent>>,
    pub on_payout_resolved: Option<EventHandler<PayoutResolvedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_paid = hooks.on_order_paid.map(|f| EventHandler::new(buffer_size, f));
        let on_payout_released = hooks.on_payout_released.map(|f| EventHandler::new(buffer_size, f));
        let on_payout_resolved = hooks.on_payout_resolved.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_paid, on_payout_released, on_payout_resolved }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_paid {
            result.order_paid_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_payout_released {
            result.payout_released_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_payout_resolved {
            result.payout_resolved_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_paid {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_payout_released {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_payout_resolved {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_paid: Option<Handler<OrderPaidEvent>>,
    pub on_payout_released: Option<Handler<PayoutReleasedEvent>>,
    pub on_payout_resolved: Option<Handler<PayoutResolvedEvent>>,
}

impl EventHooks {
    pub fn on_order_paid<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderPaidEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_paid = Some(Arc::new(f));
        self
    }

    pub fn on_payout_released<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PayoutReleasedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_payout_released = Some(Arc::new(f));
        self
    }

    pub fn on_payout_resolved<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PayoutResolvedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_payout_resolved = Some(Arc::new(f));
        self
    }
}
