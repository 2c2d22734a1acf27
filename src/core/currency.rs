//! Currency code handling.

use crate::core::error::RateError;

/// Uppercases a currency code after a format-only check: three ASCII
/// letters. Validation against a canonical currency list is a
/// presentation concern and does not happen here.
pub fn normalize_code(code: &str) -> Result<String, RateError> {
    let trimmed = code.trim();
    if trimmed.len() == 3 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(trimmed.to_ascii_uppercase())
    } else {
        Err(RateError::InvalidCurrency(code.to_string()))
    }
}
