//! Session lifecycle manager.
//!
//! Drives sessions from creation through settlement to a terminal status.
//! All mutation goes through the store's atomic operations, and no store
//! lock is ever held across the settlement call.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use crate::config::PolicyConfig;
use crate::errors::PaymentError;
use crate::events::{Event, EventSender};
use crate::metrics;
use crate::models::{PaymentReceipt, PaymentSession, SessionStatus};
use crate::settlement::{SettlementOutcome, SettlementProcessor};
use crate::store::{AttemptOutcome, SessionStore, Transition};
use crate::tokenization::CardToken;
use crate::validation::validate_amount;

pub struct SessionService {
    store: Arc<SessionStore>,
    settlement: Arc<dyn SettlementProcessor>,
    events: EventSender,
    policy: PolicyConfig,
}

impl SessionService {
    pub fn new(
        store: Arc<SessionStore>,
        settlement: Arc<dyn SettlementProcessor>,
        events: EventSender,
        policy: PolicyConfig,
    ) -> Self {
        Self {
            store,
            settlement,
            events,
            policy,
        }
    }

    /// Creates a `Pending` session after the amount and currency clear the
    /// payment policy.
    #[instrument(skip(self))]
    pub async fn create_session(
        &self,
        amount: Decimal,
        currency: &str,
    ) -> Result<PaymentSession, PaymentError> {
        let currency = currency.to_uppercase();
        validate_amount(amount, &currency, &self.policy).map_err(|e| {
            metrics::VALIDATION_FAILURES.inc();
            e
        })?;

        let session = self.store.create(amount, currency);
        metrics::SESSIONS_CREATED.inc();
        self.events
            .send(Event::SessionCreated {
                session_id: session.id.clone(),
                amount: session.amount,
                currency: session.currency.clone(),
            })
            .await;
        info!(session_id = %session.id, "payment session created");
        Ok(session)
    }

    /// Screens a session for processing: it must exist, be unexpired, and
    /// still be `Pending`. Returns the snapshot the checks ran against.
    pub fn validate_session(&self, id: &str) -> Result<PaymentSession, PaymentError> {
        let session = self
            .store
            .get(id)
            .ok_or_else(|| PaymentError::SessionNotFound(id.to_string()))?;
        if session.is_expired_at(Utc::now()) {
            return Err(PaymentError::SessionExpired);
        }
        if session.status != SessionStatus::Pending {
            return Err(PaymentError::SessionAlreadyProcessed);
        }
        Ok(session)
    }

    /// Runs one settlement attempt against the session.
    ///
    /// The attempt is counted before the settlement call; a call that fails
    /// in transport leaves the session `Pending` with the attempt consumed,
    /// which is what bounds retries. Outcomes land through compare-and-set
    /// transitions, so a concurrent finalization can never be overwritten.
    #[instrument(skip(self, card))]
    pub async fn initiate_payment(
        &self,
        id: &str,
        card: CardToken,
    ) -> Result<PaymentReceipt, PaymentError> {
        let session = self.validate_session(id)?;

        match self.store.increment_attempts(id) {
            AttemptOutcome::Counted(attempt) => {
                metrics::PAYMENT_ATTEMPTS.inc();
                debug!(session_id = %id, attempt, "payment attempt started");
            }
            AttemptOutcome::Exhausted => {
                metrics::PAYMENTS_FAILED.inc();
                self.events
                    .send(Event::PaymentFailed {
                        session_id: id.to_string(),
                        reason: "retry budget exhausted".to_string(),
                    })
                    .await;
                warn!(session_id = %id, "retry budget exhausted, session failed");
                return Err(PaymentError::RetriesExceeded);
            }
            AttemptOutcome::Finalized(_) => return Err(PaymentError::SessionAlreadyProcessed),
            AttemptOutcome::Expired => return Err(PaymentError::SessionExpired),
            AttemptOutcome::NotFound => {
                return Err(PaymentError::SessionNotFound(id.to_string()));
            }
        }

        let outcome = self.settlement.settle(&session, &card).await;

        match outcome {
            Ok(SettlementOutcome::Approved { transaction_id }) => {
                match self
                    .store
                    .try_transition(id, SessionStatus::Pending, SessionStatus::Completed)
                {
                    Transition::Applied => {
                        metrics::PAYMENTS_COMPLETED.inc();
                        self.events
                            .send(Event::PaymentCompleted {
                                session_id: id.to_string(),
                                transaction_id: transaction_id.clone(),
                            })
                            .await;
                        info!(session_id = %id, %transaction_id, "payment completed");
                        Ok(PaymentReceipt {
                            session_id: id.to_string(),
                            transaction_id,
                            masked_number: card.masked_number,
                        })
                    }
                    // A concurrent finalization won; this approval is discarded.
                    Transition::Conflict(_) => Err(PaymentError::SessionAlreadyProcessed),
                    Transition::Expired => Err(PaymentError::SessionExpired),
                    Transition::NotFound => Err(PaymentError::SessionNotFound(id.to_string())),
                }
            }
            Ok(SettlementOutcome::Declined { reason }) => {
                match self
                    .store
                    .try_transition(id, SessionStatus::Pending, SessionStatus::Failed)
                {
                    Transition::Applied => {
                        metrics::PAYMENTS_FAILED.inc();
                        self.events
                            .send(Event::PaymentFailed {
                                session_id: id.to_string(),
                                reason: reason.clone(),
                            })
                            .await;
                        warn!(session_id = %id, %reason, "settlement declined");
                        Err(PaymentError::SettlementFailed(reason))
                    }
                    Transition::Conflict(_) => Err(PaymentError::SessionAlreadyProcessed),
                    Transition::Expired => Err(PaymentError::SessionExpired),
                    Transition::NotFound => Err(PaymentError::SessionNotFound(id.to_string())),
                }
            }
            Err(e) => {
                // No definitive outcome: the session stays Pending and the
                // consumed attempt is what bounds further retries.
                warn!(session_id = %id, error = %e, "settlement call failed without an outcome");
                Err(PaymentError::SettlementFailed(e.to_string()))
            }
        }
    }

    /// Best-effort cancellation. `Ok(false)` means a concurrent finalization
    /// won the race.
    #[instrument(skip(self))]
    pub async fn cancel_payment(&self, id: &str) -> Result<bool, PaymentError> {
        match self
            .store
            .try_transition(id, SessionStatus::Pending, SessionStatus::Cancelled)
        {
            Transition::Applied => {
                metrics::SESSIONS_CANCELLED.inc();
                self.events
                    .send(Event::SessionCancelled {
                        session_id: id.to_string(),
                    })
                    .await;
                info!(session_id = %id, "payment session cancelled");
                Ok(true)
            }
            Transition::Conflict(_) => Ok(false),
            Transition::Expired => Err(PaymentError::SessionExpired),
            Transition::NotFound => Err(PaymentError::SessionNotFound(id.to_string())),
        }
    }

    /// Audit snapshot; terminal and expired-but-unswept sessions stay
    /// readable until the sweeper removes them.
    pub fn get_session(&self, id: &str) -> Result<PaymentSession, PaymentError> {
        self.store
            .get(id)
            .ok_or_else(|| PaymentError::SessionNotFound(id.to_string()))
    }
}
