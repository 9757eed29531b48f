use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
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
}

// Define the various events that can occur in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Appointment events
    AppointmentBooked(Uuid),
    AppointmentUpdated(Uuid),
    AppointmentDeleted(Uuid),
    AppointmentStatusChanged {
        appointment_id: Uuid,
        old_status: String,
        new_status: String,
    },

    // Estimate events
    EstimateAssigned {
        appointment_id: Uuid,
        estimate_number: String,
    },

    // Archival events
    AppointmentArchived {
        appointment_id: Uuid,
        history_id: Uuid,
        reason: String,
    },
    HistoryRecordDeleted(Uuid),

    // Inventory events
    InventoryItemCreated(Uuid),
    InventoryItemDeleted(Uuid),
    StockMoved {
        inventory_id: Uuid,
        movement: String,
        quantity: i32,
        reason: String,
    },

    // Parts events
    PartAssigned {
        appointment_id: Uuid,
        part_id: Uuid,
        from_inventory: bool,
    },
    PartRemoved(Uuid),

    // Feedback and announcement events
    FeedbackSubmitted(Uuid),
    AnnouncementPosted(Uuid),
    AnnouncementRetired(Uuid),

    // Generic event for custom messages
    Generic {
        message: String,
        timestamp: DateTime<Utc>,
        metadata: serde_json::Value,
    },
}

impl Event {
    /// Create a generic event with string data
    pub fn with_data(data: String) -> Self {
        Event::Generic {
            message: data,
            timestamp: Utc::now(),
            metadata: serde_json::Value::Null,
        }
    }
}

/// Drains the event channel and logs each event for the operations trail.
///
/// Delivery is best-effort: senders log-and-continue when the channel is
/// gone, so a wedged consumer never blocks a request handler.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::EstimateAssigned {
                appointment_id,
                estimate_number,
            } => {
                info!(
                    appointment_id = %appointment_id,
                    estimate_number = %estimate_number,
                    "Estimate number assigned"
                );
            }
            Event::AppointmentArchived {
                appointment_id,
                history_id,
                reason,
            } => {
                info!(
                    appointment_id = %appointment_id,
                    history_id = %history_id,
                    reason = %reason,
                    "Appointment archived"
                );
            }
            Event::StockMoved {
                inventory_id,
                movement,
                quantity,
                reason,
            } => {
                info!(
                    inventory_id = %inventory_id,
                    movement = %movement,
                    quantity = %quantity,
                    reason = %reason,
                    "Stock moved"
                );
            }
            other => {
                info!(event = ?other, "Event processed");
            }
        }
    }

    warn!("Event channel closed; event processing loop exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);

        let id = Uuid::new_v4();
        sender
            .send(Event::AppointmentBooked(id))
            .await
            .expect("send should succeed");

        match rx.recv().await {
            Some(Event::AppointmentBooked(received)) => assert_eq!(received, id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_fails_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        let result = sender.send(Event::with_data("orphaned".into())).await;
        assert!(result.is_err());
    }
}
