//! HS code normalization.
//!
//! Canonical codes are exactly 10 ASCII digits. Printed nomenclatures lay
//! codes out as `XXXX XX XXX X`, and older sources carry 8-digit HS8 codes;
//! both are folded into the canonical form here. What happens to an 8-digit
//! code is decided by a single [`LegacyCodePolicy`].

use serde::Deserialize;
use thiserror::Error;

/// Number of digits in a canonical national tariff code.
pub const CODE_LEN: usize = 10;

/// Number of digits in a legacy HS8 code.
pub const LEGACY_CODE_LEN: usize = 8;

/// Treatment of 8-digit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegacyCodePolicy {
    /// Right-pad with `00`: an HS8 code is the prefix of its HS10 subheading.
    #[default]
    Pad,
    /// Refuse 8-digit codes outright.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodeError {
    #[error("invalid HS code '{0}': expected 10 digits")]
    Invalid(String),
    #[error("8-digit HS code '{0}' rejected by legacy code policy")]
    Legacy(String),
}

/// Normalize a raw code to 10 digits under `policy`.
pub fn normalize_code(raw: &str, policy: LegacyCodePolicy) -> Result<String, CodeError> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();

    if compact.is_empty() || !compact.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CodeError::Invalid(raw.trim().to_string()));
    }

    match compact.len() {
        CODE_LEN => Ok(compact),
        LEGACY_CODE_LEN => match policy {
            LegacyCodePolicy::Pad => Ok(format!("{}00", compact)),
            LegacyCodePolicy::Reject => Err(CodeError::Legacy(compact)),
        },
        _ => Err(CodeError::Invalid(raw.trim().to_string())),
    }
}
