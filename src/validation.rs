//! Pure validators for card data and payment amounts.
//!
//! Every function is synchronous, side-effect free, and returns a typed
//! rejection with a specific reason. Raw card numbers are never echoed back
//! in the reasons.

use chrono::{Datelike, Utc};
use rust_decimal::Decimal;

use crate::config::PolicyConfig;
use crate::errors::PaymentError;
use crate::models::CardBrand;

/// Strips spaces and dashes; yields the bare digit string, or `None` when
/// any other character is present.
pub fn sanitize_card_number(raw: &str) -> Option<String> {
    let mut digits = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            ' ' | '-' => continue,
            c if c.is_ascii_digit() => digits.push(c),
            _ => return None,
        }
    }
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

/// Card number check: digits only (after separator stripping), 13 to 19
/// digits, Luhn checksum.
pub fn validate_card_number(raw: &str) -> Result<(), PaymentError> {
    let digits = sanitize_card_number(raw).ok_or_else(|| {
        PaymentError::ValidationError("Card number must contain only digits".to_string())
    })?;

    if digits.len() < 13 || digits.len() > 19 {
        return Err(PaymentError::ValidationError(
            "Invalid card number length".to_string(),
        ));
    }

    if !luhn_check(&digits) {
        return Err(PaymentError::ValidationError(
            "Invalid card number".to_string(),
        ));
    }

    Ok(())
}

/// CVV check against the brand derived from the card number: 3 digits for
/// Visa/Mastercard/Discover, 4 for Amex. Unrecognized brands are rejected
/// rather than guessed at.
pub fn validate_cvv(cvv: &str, card_number: &str) -> Result<(), PaymentError> {
    let digits = sanitize_card_number(card_number).unwrap_or_default();
    let brand = CardBrand::detect(&digits).ok_or_else(|| {
        PaymentError::ValidationError("Unrecognized card brand".to_string())
    })?;

    let expected = brand.cvv_length();
    if cvv.len() != expected || !cvv.chars().all(|c| c.is_ascii_digit()) {
        return Err(PaymentError::ValidationError(format!(
            "CVV must be {} digits",
            expected
        )));
    }

    Ok(())
}

/// Expiry check with calendar semantics at invocation time: the current
/// month is still valid, anything earlier is not.
pub fn validate_expiry(month: u32, year: i32) -> Result<(), PaymentError> {
    if !(1..=12).contains(&month) {
        return Err(PaymentError::ValidationError(
            "Invalid expiry month".to_string(),
        ));
    }

    let now = Utc::now();
    if year < now.year() || (year == now.year() && month < now.month()) {
        return Err(PaymentError::ValidationError(
            "Card is expired".to_string(),
        ));
    }

    Ok(())
}

/// Amount and currency check against the configured policy.
pub fn validate_amount(
    amount: Decimal,
    currency: &str,
    policy: &PolicyConfig,
) -> Result<(), PaymentError> {
    if amount <= Decimal::ZERO {
        return Err(PaymentError::ValidationError(
            "Amount must be positive".to_string(),
        ));
    }
    if amount < policy.min_amount {
        return Err(PaymentError::ValidationError(format!(
            "Minimum amount is {}",
            policy.min_amount
        )));
    }
    if amount > policy.max_amount {
        return Err(PaymentError::ValidationError(format!(
            "Maximum amount is {}",
            policy.max_amount
        )));
    }
    if !policy.allows_currency(currency) {
        return Err(PaymentError::ValidationError(format!(
            "Currency {} is not supported",
            currency
        )));
    }

    Ok(())
}

fn luhn_check(digits: &str) -> bool {
    let mut sum = 0u32;
    for (i, ch) in digits.chars().rev().enumerate() {
        let d = match ch.to_digit(10) {
            Some(d) => d,
            None => return false,
        };
        let d = if i % 2 == 1 {
            let doubled = d * 2;
            if doubled > 9 {
                doubled - 9
            } else {
                doubled
            }
        } else {
            d
        };
        sum += d;
    }
    sum % 10 == 0
}
