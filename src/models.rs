use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::Display;

/// Lifecycle state of a payment session.
///
/// `Pending` is the only non-terminal state; a session leaves it at most
/// once, and only through the store's compare-and-set transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Failed | SessionStatus::Cancelled
        )
    }
}

/// A short-lived payment session.
///
/// `amount` and `currency` are fixed at creation; `status` and `attempts`
/// change only through the session store. Instances handed out by the store
/// are owned snapshots, so holding one never blocks or observes later
/// mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSession {
    /// Opaque identifier: `ps_` + 32 hex chars (128 bits of entropy).
    pub id: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: SessionStatus,
    /// Processing attempts consumed so far; never exceeds the retry budget.
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PaymentSession {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Card brands this core recognizes. Brand determines the CVV length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CardBrand {
    Visa,
    Mastercard,
    Discover,
    Amex,
}

impl CardBrand {
    /// Detects the brand from a sanitized (digits-only) card number.
    pub fn detect(digits: &str) -> Option<CardBrand> {
        match digits.chars().next() {
            Some('4') => Some(CardBrand::Visa),
            Some('5') => Some(CardBrand::Mastercard),
            Some('6') => Some(CardBrand::Discover),
            Some('3') if digits.starts_with("34") || digits.starts_with("37") => {
                Some(CardBrand::Amex)
            }
            _ => None,
        }
    }

    pub fn cvv_length(self) -> usize {
        match self {
            CardBrand::Amex => 4,
            _ => 3,
        }
    }
}

/// Inbound card data. Lives only between the request boundary and the
/// tokenizer; the raw number and CVV must never be logged or stored.
#[derive(Clone, Deserialize)]
pub struct CardDetails {
    pub card_number: String,
    pub cvv: String,
    pub expiry_month: u32,
    pub expiry_year: i32,
    pub holder_name: String,
}

impl fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardDetails")
            .field("card_number", &"[redacted]")
            .field("cvv", &"[redacted]")
            .field("expiry_month", &self.expiry_month)
            .field("expiry_year", &self.expiry_year)
            .field("holder_name", &self.holder_name)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub amount: Decimal,
    pub currency: String,
}

/// Result of a finalized payment attempt.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub session_id: String,
    pub transaction_id: String,
    pub masked_number: String,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}
