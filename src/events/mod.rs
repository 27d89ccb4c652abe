use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the processor is gone.
    /// The business operation that produced the event has already committed.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "Dropping domain event");
        }
    }
}

/// Domain events emitted after a cart or order mutation has committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    CartUpdated {
        cart_id: Uuid,
        user_id: Uuid,
        store_id: Uuid,
    },
    CartRemoved {
        cart_id: Uuid,
        user_id: Uuid,
        store_id: Uuid,
    },
    CartsCleared {
        user_id: Uuid,
        carts_removed: u64,
    },
    CartReconstructed {
        cart_id: Uuid,
        source_order_id: Uuid,
        user_id: Uuid,
    },
    OrderPlaced {
        order_id: Uuid,
        user_id: Uuid,
        store_id: Uuid,
        final_total: Decimal,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    OrderCancelled {
        order_id: Uuid,
        user_id: Uuid,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::CartUpdated { .. } => "cart.updated",
            Event::CartRemoved { .. } => "cart.removed",
            Event::CartsCleared { .. } => "carts.cleared",
            Event::CartReconstructed { .. } => "cart.reconstructed",
            Event::OrderPlaced { .. } => "order.placed",
            Event::OrderStatusChanged { .. } => "order.status_changed",
            Event::OrderCancelled { .. } => "order.cancelled",
        }
    }
}

/// Creates the bounded channel backing an [`EventSender`].
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Drains the event channel until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        let name = event.name();
        match &event {
            Event::OrderPlaced {
                order_id,
                store_id,
                final_total,
                ..
            } => {
                info!(event = name, %order_id, %store_id, %final_total, "order placed");
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(event = name, %order_id, %old_status, %new_status, "order status changed");
            }
            Event::OrderCancelled { order_id, user_id } => {
                info!(event = name, %order_id, %user_id, "order cancelled");
            }
            other => debug!(event = name, payload = ?other, "cart event"),
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_reach_the_receiver_in_order() {
        let (sender, mut rx) = channel(4);
        let order_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        sender
            .send(Event::OrderCancelled { order_id, user_id })
            .await
            .unwrap();
        sender
            .send(Event::CartsCleared {
                user_id,
                carts_removed: 2,
            })
            .await
            .unwrap();

        assert_eq!(
            rx.recv().await,
            Some(Event::OrderCancelled { order_id, user_id })
        );
        assert_eq!(rx.recv().await.map(|e| e.name()), Some("carts.cleared"));
    }

    #[tokio::test]
    async fn send_or_log_tolerates_closed_channel() {
        let (sender, rx) = channel(1);
        drop(rx);
        sender
            .send_or_log(Event::CartsCleared {
                user_id: Uuid::new_v4(),
                carts_removed: 0,
            })
            .await;
        assert!(sender
            .send(Event::CartsCleared {
                user_id: Uuid::new_v4(),
                carts_removed: 0,
            })
            .await
            .is_err());
    }

    #[tokio::test]
    async fn processor_exits_when_senders_drop() {
        let (sender, rx) = channel(2);
        let handle = tokio::spawn(process_events(rx));
        sender
            .send(Event::OrderStatusChanged {
                order_id: Uuid::new_v4(),
                old_status: "taken".into(),
                new_status: "delivering".into(),
            })
            .await
            .unwrap();
        drop(sender);
        handle.await.unwrap();
    }
}
