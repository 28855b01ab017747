use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};

use crate::entities::order::{Model as OrderModel, OrderStatus};
use crate::notifications::NotificationSink;

/// Lifecycle events handed to the notification sink.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    OrderCreated {
        order: OrderModel,
    },
    PaymentConfirmed {
        order: OrderModel,
    },
    PaymentFailed {
        order: OrderModel,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    FulfillmentStatusChanged {
        order: OrderModel,
        old_status: OrderStatus,
        new_status: OrderStatus,
    },
}

impl Event {
    pub fn order(&self) -> &OrderModel {
        match self {
            Event::OrderCreated { order }
            | Event::PaymentConfirmed { order }
            | Event::PaymentFailed { order, .. }
            | Event::FulfillmentStatusChanged { order, .. } => order,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::OrderCreated { .. } => "order_created",
            Event::PaymentConfirmed { .. } => "payment_confirmed",
            Event::PaymentFailed { .. } => "payment_failed",
            Event::FulfillmentStatusChanged { .. } => "fulfillment_status_changed",
        }
    }
}

/// Non-blocking handle onto the notification channel.
///
/// `emit` never waits and never fails the caller: a full or closed channel
/// drops the event with a log line.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Creates a bounded channel and returns both ends.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    pub fn emit(&self, event: Event) {
        let kind = event.kind();
        let order_id = event.order().id;
        match self.sender.try_send(event) {
            Ok(()) => debug!(kind, %order_id, "Event queued"),
            Err(TrySendError::Full(_)) => {
                warn!(kind, %order_id, "Event channel full; notification dropped")
            }
            Err(TrySendError::Closed(_)) => {
                warn!(kind, %order_id, "Event channel closed; notification dropped")
            }
        }
    }
}

/// Drains the channel into `sink` until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, sink: Arc<dyn NotificationSink>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        let kind = event.kind();
        let order_id = event.order().id;
        if let Err(e) = sink.notify(&event).await {
            error!(kind, %order_id, error = %e, "Failed to deliver notification");
        }
    }

    info!("Event processing loop stopped");
}
