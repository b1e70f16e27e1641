//! Settlement seam.
//!
//! Real acquirer integration is out of scope; the trait keeps the boundary
//! explicit and mockable. Implementations receive the card token, never raw
//! card data.

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::models::PaymentSession;
use crate::tokenization::CardToken;

#[derive(Debug, Error)]
pub enum SettlementError {
    /// The call produced no definitive outcome; the attempt may be retried.
    #[error("settlement transport failure: {0}")]
    Transport(String),
}

/// Definitive answer from the settlement side.
#[derive(Debug, Clone)]
pub enum SettlementOutcome {
    Approved { transaction_id: String },
    Declined { reason: String },
}

#[async_trait]
pub trait SettlementProcessor: Send + Sync {
    async fn settle(
        &self,
        session: &PaymentSession,
        card: &CardToken,
    ) -> Result<SettlementOutcome, SettlementError>;
}

/// Stand-in processor that approves everything, keeping the seam exercised
/// end to end.
pub struct MockSettlementProcessor;

#[async_trait]
impl SettlementProcessor for MockSettlementProcessor {
    async fn settle(
        &self,
        session: &PaymentSession,
        card: &CardToken,
    ) -> Result<SettlementOutcome, SettlementError> {
        debug!(
            session_id = %session.id,
            masked_number = %card.masked_number,
            "simulating settlement approval"
        );
        Ok(SettlementOutcome::Approved {
            transaction_id: Uuid::new_v4().to_string(),
        })
    }
}
