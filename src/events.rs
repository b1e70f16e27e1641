//! Domain events.
//!
//! State changes publish events onto an mpsc channel; a single consumer loop
//! turns them into structured log lines. Publishing is fire-and-forget and
//! never fails the payment path.

use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub enum Event {
    SessionCreated {
        session_id: String,
        amount: Decimal,
        currency: String,
    },
    PaymentCompleted {
        session_id: String,
        transaction_id: String,
    },
    PaymentFailed {
        session_id: String,
        reason: String,
    },
    SessionCancelled {
        session_id: String,
    },
    SessionsSwept {
        removed: usize,
    },
}

/// Cloneable publishing handle.
#[derive(Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            warn!("Failed to publish event: {}", e);
        }
    }
}

/// Consumer loop; runs until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    while let Some(event) = rx.recv().await {
        match event {
            Event::SessionCreated {
                session_id,
                amount,
                currency,
            } => {
                info!(%session_id, %amount, %currency, "session created");
            }
            Event::PaymentCompleted {
                session_id,
                transaction_id,
            } => {
                info!(%session_id, %transaction_id, "payment completed");
            }
            Event::PaymentFailed { session_id, reason } => {
                warn!(%session_id, %reason, "payment failed");
            }
            Event::SessionCancelled { session_id } => {
                info!(%session_id, "session cancelled");
            }
            Event::SessionsSwept { removed } => {
                info!(removed, "expired sessions swept");
            }
        }
    }
}
