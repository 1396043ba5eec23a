//! Candidate-line detection for tab-separated tariff dumps.
//!
//! The check is purely syntactic: a line qualifies when, after trimming, it
//! opens with a run of exactly ten ASCII digits. It does not validate that
//! the digits form a real chapter or heading.

use crate::code::CODE_LEN;

/// Prefixes of header and comment lines found in tariff dumps.
const HEADER_PREFIXES: &[&str] = &["HS Code", "TIF TN", "#"];

/// Whether `line` looks like a tariff record.
pub fn is_candidate_line(line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() {
        return false;
    }
    if HEADER_PREFIXES.iter().any(|p| line.starts_with(p)) {
        return false;
    }

    let digits = line.bytes().take_while(|b| b.is_ascii_digit()).count();
    digits == CODE_LEN
}
