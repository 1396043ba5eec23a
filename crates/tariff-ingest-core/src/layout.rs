//! Layout scanner for printed nomenclature dumps.
//!
//! Text extracted from the printed tariff (PDF or a plain-text copy of it)
//! has no columns: a code sits alone on its line, usually as
//! `XXXX XX XXX X`, and its description follows on the next lines until
//! the next code, a running header, or a section marker like `01-`.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::code::{normalize_code, CodeError, LegacyCodePolicy};

/// Running headers and footers of the printed nomenclature.
const HEADER_PREFIXES: &[&str] = &["Ў", "©", "ТИФ", "ТАШҚИ", "МУНДАРИЖА", "ТОВАРЛАРНИ"];

/// A code with the description collected beneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutEntry {
    pub code: String,
    pub description: String,
    /// 1-based line of the code in the scanned text.
    pub line_number: u64,
}

/// A code line that did not normalize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefusedCode {
    pub line_number: u64,
    pub raw_code: String,
    pub error: CodeError,
}

/// A normalized code line that yields no entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassedOver {
    pub line_number: u64,
    pub code: String,
}

/// A repeated code. The entry at `first_line` wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateCode {
    pub line_number: u64,
    pub code: String,
    pub first_line: u64,
}

/// Result of scanning one text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutScan {
    pub entries: Vec<LayoutEntry>,
    pub lines: u64,
    pub rejected_codes: Vec<RefusedCode>,
    pub duplicates: Vec<DuplicateCode>,
    /// Codes with no description beneath them.
    pub undescribed: Vec<PassedOver>,
}

fn code_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:\d{4}\s\d{2}\s\d{3}\s\d|\d{10}|\d{8})$").expect("static regex")
    })
}

fn section_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{2}-").expect("static regex"))
}

fn is_header(line: &str) -> bool {
    HEADER_PREFIXES.iter().any(|p| line.starts_with(p))
}

fn is_code_line(line: &str) -> bool {
    code_line().is_match(line)
}

/// Scan `text` for codes and their descriptions.
pub fn scan_layout(text: &str, policy: LegacyCodePolicy) -> LayoutScan {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let mut scan = LayoutScan {
        lines: lines.len() as u64,
        ..LayoutScan::default()
    };
    let mut first_seen: HashMap<String, u64> = HashMap::new();

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if line.is_empty() || is_header(line) || !is_code_line(line) {
            i += 1;
            continue;
        }

        let line_number = i as u64 + 1;
        let mut desc: Vec<&str> = Vec::new();
        let mut j = i + 1;
        while j < lines.len() {
            let next = lines[j];
            if next.is_empty() {
                j += 1;
                continue;
            }
            if is_code_line(next) || is_header(next) || section_marker().is_match(next) {
                break;
            }
            if !next.starts_with(|c: char| c.is_ascii_digit()) {
                desc.push(next);
            }
            j += 1;
        }

        match normalize_code(line, policy) {
            Ok(code) => {
                let description = desc.join(" ");
                if description.is_empty() {
                    scan.undescribed.push(PassedOver { line_number, code });
                } else if let Some(&first_line) = first_seen.get(&code) {
                    scan.duplicates.push(DuplicateCode {
                        line_number,
                        code,
                        first_line,
                    });
                } else {
                    first_seen.insert(code.clone(), line_number);
                    scan.entries.push(LayoutEntry {
                        code,
                        description,
                        line_number,
                    });
                }
            }
            Err(error) => {
                tracing::debug!(line = line_number, error = %error, "code line refused");
                scan.rejected_codes.push(RefusedCode {
                    line_number,
                    raw_code: line.to_string(),
                    error,
                });
            }
        }

        i = j;
    }

    scan
}
