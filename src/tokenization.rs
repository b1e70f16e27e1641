//! One-way card tokenization.
//!
//! Card data is reduced to a masked number plus a keyed HMAC-SHA256 digest
//! over a canonical record. The digest cannot be reversed into the original
//! number, and the raw PAN and CVV are dropped once the token exists; only
//! the token crosses into settlement.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::errors::PaymentError;
use crate::models::CardDetails;
use crate::validation::sanitize_card_number;

type HmacSha256 = Hmac<Sha256>;

/// Opaque, non-reversible reference to tokenized card data.
#[derive(Debug, Clone)]
pub struct CardToken {
    /// `tok_` + hex HMAC digest. Safe to log and to hand to settlement.
    pub reference: String,
    pub masked_number: String,
    pub tokenized_at: DateTime<Utc>,
}

/// Replaces all but the last 4 digits with `*`.
pub fn mask_card_number(digits: &str) -> String {
    let len = digits.chars().count();
    if len <= 4 {
        return "*".repeat(len);
    }
    let tail: String = digits.chars().skip(len - 4).collect();
    format!("{}{}", "*".repeat(len - 4), tail)
}

/// Tokenizes card data with a server-held secret.
#[derive(Clone)]
pub struct CardTokenizer {
    secret: Arc<String>,
}

impl CardTokenizer {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Arc::new(secret.into()),
        }
    }

    pub fn tokenize(&self, card: &CardDetails) -> Result<CardToken, PaymentError> {
        self.tokenize_at(card, Utc::now())
    }

    /// Tokenizes with an explicit timestamp. The timestamp is part of the
    /// canonical record, so the same card tokenized at different times
    /// yields different references.
    pub fn tokenize_at(
        &self,
        card: &CardDetails,
        tokenized_at: DateTime<Utc>,
    ) -> Result<CardToken, PaymentError> {
        let digits = sanitize_card_number(&card.card_number).ok_or_else(|| {
            PaymentError::ValidationError("Card number must contain only digits".to_string())
        })?;
        let masked_number = mask_card_number(&digits);

        let record = format!(
            "{}|{}|{}|{}|{}",
            masked_number,
            card.expiry_month,
            card.expiry_year,
            card.holder_name.trim(),
            tokenized_at.timestamp()
        );

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| PaymentError::InternalError("tokenizer key rejected".to_string()))?;
        mac.update(record.as_bytes());
        let reference = format!("tok_{}", hex::encode(mac.finalize().into_bytes()));

        Ok(CardToken {
            reference,
            masked_number,
            tokenized_at,
        })
    }
}
