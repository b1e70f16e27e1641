//! Concurrent in-memory session store.
//!
//! The store owns all session mutation. DashMap's per-entry locking makes
//! every operation here atomic with respect to a single session; callers
//! get owned snapshots and never hold a guard across an await point.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::RngCore;
use rust_decimal::Decimal;

use crate::models::{PaymentSession, SessionStatus};

/// Result of a compare-and-set status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// This call performed the transition.
    Applied,
    /// The session was not in the expected status; carries the actual one.
    Conflict(SessionStatus),
    /// The record is past its expiry and may not complete.
    Expired,
    NotFound,
}

/// Result of an atomic attempt-count increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Attempt counted; carries the new count.
    Counted(u32),
    /// Retry budget exhausted; the session has been forced to `Failed`.
    Exhausted,
    /// The session is already terminal.
    Finalized(SessionStatus),
    Expired,
    NotFound,
}

pub struct SessionStore {
    sessions: DashMap<String, PaymentSession>,
    session_ttl: Duration,
    max_retries: u32,
}

impl SessionStore {
    pub fn new(session_ttl: Duration, max_retries: u32) -> Self {
        Self {
            sessions: DashMap::new(),
            session_ttl,
            max_retries,
        }
    }

    /// Mints a fresh `Pending` session and returns its snapshot.
    pub fn create(&self, amount: Decimal, currency: String) -> PaymentSession {
        let now = Utc::now();
        let session = PaymentSession {
            id: mint_session_id(),
            amount,
            currency,
            status: SessionStatus::Pending,
            attempts: 0,
            created_at: now,
            expires_at: now + self.session_ttl,
        };
        self.sessions.insert(session.id.clone(), session.clone());
        session
    }

    /// Owned snapshot; the live record is never exposed mutably.
    pub fn get(&self, id: &str) -> Option<PaymentSession> {
        self.sessions.get(id).map(|session| session.clone())
    }

    /// Compare-and-set on status. The only way any session status changes.
    ///
    /// A transition to `Completed` is refused once the record is past its
    /// expiry, so a session that expired between validation and settlement
    /// can still fail or cancel but never complete.
    pub fn try_transition(&self, id: &str, from: SessionStatus, to: SessionStatus) -> Transition {
        match self.sessions.get_mut(id) {
            Some(mut session) => {
                if session.status != from {
                    Transition::Conflict(session.status)
                } else if to == SessionStatus::Completed && session.is_expired_at(Utc::now()) {
                    Transition::Expired
                } else {
                    session.status = to;
                    Transition::Applied
                }
            }
            None => Transition::NotFound,
        }
    }

    /// Counts a processing attempt. The budget check, the increment, and
    /// the forced failure on exhaustion all happen under one entry guard.
    pub fn increment_attempts(&self, id: &str) -> AttemptOutcome {
        match self.sessions.get_mut(id) {
            Some(mut session) => {
                if session.status != SessionStatus::Pending {
                    AttemptOutcome::Finalized(session.status)
                } else if session.is_expired_at(Utc::now()) {
                    AttemptOutcome::Expired
                } else if session.attempts >= self.max_retries {
                    // Same compare-and-set as try_transition: the status
                    // was verified Pending under this entry guard.
                    session.status = SessionStatus::Failed;
                    AttemptOutcome::Exhausted
                } else {
                    session.attempts += 1;
                    AttemptOutcome::Counted(session.attempts)
                }
            }
            None => AttemptOutcome::NotFound,
        }
    }

    pub fn remove(&self, id: &str) -> bool {
        self.sessions.remove(id).is_some()
    }

    /// Removes every session past its expiry, regardless of status.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired_at(now));
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

fn mint_session_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("ps_{}", hex::encode(bytes))
}
