//! Fan-in channel that runs a hook for every settlement event.
//!
//! An [`EventHandler`] owns the receiving end of a bounded channel. Each engine API that emits events holds an
//! [`EventProducer`] for it. Every event received is handed to the async hook on its own task, so a slow notification
//! never delays the next one. Hooks only see the event itself, not the engine state.
//!
//! The handler runs until the last producer is dropped, then waits for the hooks still in flight before returning.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{sync::mpsc, task::JoinSet};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    listener: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, listener) = mpsc::channel(buffer_size);
        Self { listener, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    /// Dispatches events until every producer is gone.
    pub async fn start_handler(self) {
        let Self { mut listener, sender, handler } = self;
        // From here on only the producers keep the channel open
        drop(sender);
        debug!("📬️ Event hook started");
        let mut in_flight = JoinSet::new();
        loop {
            tokio::select! {
                event = listener.recv() => match event {
                    Some(event) => {
                        let hook = Arc::clone(&handler);
                        in_flight.spawn(async move { hook(event).await });
                    },
                    None => break,
                },
                Some(done) = in_flight.join_next(), if !in_flight.is_empty() => report(done),
            }
        }
        if !in_flight.is_empty() {
            debug!("📬️ Producers are gone. Waiting for {} hooks to finish", in_flight.len());
        }
        while let Some(done) = in_flight.join_next().await {
            report(done);
        }
        debug!("📬️ Event hook stopped");
    }
}

fn report(done: Result<(), tokio::task::JoinError>) {
    match done {
        Ok(()) => trace!("📬️ Event hook completed"),
        Err(e) => warn!("📬️ An event hook did not complete. {e}"),
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    /// Queues the event, waiting for room in the channel. An event published after the handler has stopped is
    /// dropped and logged.
    pub async fn publish_event(&self, event: E) {
        if self.sender.send(event).await.is_err() {
            error!("📬️ The event hook has stopped. An event was dropped.");
        }
    }
}
