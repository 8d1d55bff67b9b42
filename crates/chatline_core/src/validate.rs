//! Request validation for chat writes.
//!
//! # Responsibility
//! - Normalize (trim) text fields in place.
//! - Reject create/update candidates with a single, ordered failure.
//!
//! # Invariants
//! - Checks run in a fixed order and stop at the first failure.
//! - The phone matcher is deliberately permissive; it accepts many digit
//!   strings that are not real phone numbers.

use crate::envelope::ErrorEnvelope;
use crate::model::chat::Chat;
use once_cell::sync::Lazy;
use regex::Regex;

static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?:\(?(?:00|\+)([1-4][0-9][0-9]|[1-9][0-9]?)\)?)?[-. \\/]?)?((?:\(?[0-9]+\)?[-. \\/]?)*)(?:[-. \\/]?(?:#|ext\.?|extension|x)[-. \\/]?([0-9]+))?$",
    )
    .expect("valid phone regex")
});

pub const REQUIRED_SENDER: &str = "Required Sender";
pub const REQUIRED_RECEIVER: &str = "Required Receiver";
pub const REQUIRED_BODY: &str = "Required Body";
pub const INVALID_SENDER_PHONE: &str = "Invalid Sender Phone Number";
pub const INVALID_RECEIVER_PHONE: &str = "Invalid Receiver Phone Number";
pub const SAME_SENDER_RECEIVER: &str = "Sender and Receiver must different";

/// Which request shape is being validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Full record: sender, receiver and body.
    Create,
    /// Body-only update; other fields are ignored.
    Update,
}

/// Validates `candidate` for `mode`, trimming inspected fields in place.
pub fn validate(mode: ValidationMode, candidate: &mut Chat) -> Result<(), ErrorEnvelope> {
    match mode {
        ValidationMode::Create => validate_create(candidate),
        ValidationMode::Update => validate_update(candidate),
    }
}

/// Returns whether `value` is accepted by the phone matcher.
pub fn is_phone_like(value: &str) -> bool {
    PHONE_RE.is_match(value)
}

fn validate_create(candidate: &mut Chat) -> Result<(), ErrorEnvelope> {
    trim_in_place(&mut candidate.sender);
    trim_in_place(&mut candidate.receiver);
    trim_in_place(&mut candidate.body);

    if candidate.sender.is_empty() {
        return Err(ErrorEnvelope::unprocessable_entity(REQUIRED_SENDER));
    }
    if candidate.receiver.is_empty() {
        return Err(ErrorEnvelope::unprocessable_entity(REQUIRED_RECEIVER));
    }
    if candidate.body.is_empty() {
        return Err(ErrorEnvelope::unprocessable_entity(REQUIRED_BODY));
    }
    if !is_phone_like(&candidate.sender) {
        return Err(ErrorEnvelope::unprocessable_entity(INVALID_SENDER_PHONE));
    }
    if !is_phone_like(&candidate.receiver) {
        return Err(ErrorEnvelope::unprocessable_entity(INVALID_RECEIVER_PHONE));
    }
    if candidate.sender == candidate.receiver {
        return Err(ErrorEnvelope::unprocessable_entity(SAME_SENDER_RECEIVER));
    }
    Ok(())
}

fn validate_update(candidate: &mut Chat) -> Result<(), ErrorEnvelope> {
    trim_in_place(&mut candidate.body);
    if candidate.body.is_empty() {
        return Err(ErrorEnvelope::unprocessable_entity(REQUIRED_BODY));
    }
    Ok(())
}

fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}
