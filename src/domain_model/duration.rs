//! Compact duration strings such as `15m` or `7d`.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DurationError {
    #[error("invalid duration: {0:?}")]
    InvalidDuration(String),
    #[error("invalid duration unit: {0:?}")]
    InvalidUnit(String),
}

/// Parses `<integer><unit>` with unit in `s`, `m`, `h`, `d` (any case) into
/// milliseconds.
pub fn parse_duration(text: &str) -> Result<u64, DurationError> {
    let invalid = || DurationError::InvalidDuration(text.to_string());

    let split = text
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .ok_or_else(invalid)?;
    let (digits, unit) = text.split_at(split);
    if digits.is_empty() || unit.chars().count() != 1 {
        return Err(invalid());
    }
    if !unit.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid());
    }

    let amount: u64 = digits.parse().map_err(|_| invalid())?;
    let multiplier: u64 = match unit.to_ascii_lowercase().as_str() {
        "s" => 1_000,
        "m" => 60 * 1_000,
        "h" => 60 * 60 * 1_000,
        "d" => 24 * 60 * 60 * 1_000,
        other => return Err(DurationError::InvalidUnit(other.to_string())),
    };

    amount.checked_mul(multiplier).ok_or_else(invalid)
}

pub fn parse_std_duration(text: &str) -> Result<Duration, DurationError> {
    parse_duration(text).map(Duration::from_millis)
}
