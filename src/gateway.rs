//! Security gateway.
//!
//! The single entry point for payment submissions. Checks run in a fixed
//! order (session, card number, CVV, expiry) and short-circuit on the first
//! failure, so no card data is inspected for a session that cannot proceed.
//! Raw card details are tokenized here; nothing past this module sees them.

use std::sync::Arc;

use tracing::instrument;

use crate::errors::PaymentError;
use crate::metrics;
use crate::models::{CardDetails, CreateSessionRequest, PaymentReceipt, PaymentSession};
use crate::service::SessionService;
use crate::tokenization::CardTokenizer;
use crate::validation::{validate_card_number, validate_cvv, validate_expiry};

pub struct SecurityGateway {
    service: Arc<SessionService>,
    tokenizer: CardTokenizer,
}

impl SecurityGateway {
    pub fn new(service: Arc<SessionService>, tokenizer: CardTokenizer) -> Self {
        Self { service, tokenizer }
    }

    pub async fn create_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<PaymentSession, PaymentError> {
        self.service
            .create_session(request.amount, &request.currency)
            .await
    }

    /// Validates, tokenizes, and settles a payment submission.
    #[instrument(skip(self, card))]
    pub async fn submit_payment(
        &self,
        session_id: &str,
        card: CardDetails,
    ) -> Result<PaymentReceipt, PaymentError> {
        self.service.validate_session(session_id)?;
        screen_card(&card).map_err(|e| {
            metrics::VALIDATION_FAILURES.inc();
            e
        })?;
        let token = self.tokenizer.tokenize(&card)?;
        self.service.initiate_payment(session_id, token).await
    }

    /// Cancels a session the caller could still pay against. Expired or
    /// finalized sessions are rejected with the same errors `submit_payment`
    /// would give.
    #[instrument(skip(self))]
    pub async fn cancel_session(&self, session_id: &str) -> Result<bool, PaymentError> {
        self.service.validate_session(session_id)?;
        self.service.cancel_payment(session_id).await
    }

    pub fn session_snapshot(&self, session_id: &str) -> Result<PaymentSession, PaymentError> {
        self.service.get_session(session_id)
    }
}

fn screen_card(card: &CardDetails) -> Result<(), PaymentError> {
    validate_card_number(&card.card_number)?;
    validate_cvv(&card.cvv, &card.card_number)?;
    validate_expiry(card.expiry_month, card.expiry_year)?;
    Ok(())
}
