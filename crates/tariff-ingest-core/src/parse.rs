//! Record parser for tab-separated tariff lines.
//!
//! A candidate line is split on runs of one or more tab characters and
//! mapped onto a [`TariffRecord`] according to the column-count table
//! below. Column access is always bounds-checked; absent optional columns
//! resolve to their documented defaults and are counted as fallbacks.
//!
//! | Columns | Layout | Notes |
//! |---------|--------|-------|
//! | ≥ 10 | [`Layout::Full`] | code, desc ×2, category, subcategory, keywords, duty, VAT, excise, certificates; 10 = confidence, 11 = search frequency (both optional) |
//! | 9 | [`Layout::Reduced`] | no excise column (defaults to 0.00); column 8 holds certificates |
//! | < 9 | rejected | [`RecordError::TooFewColumns`] |
//!
//! Only the line terminator and leading whitespace are stripped before
//! splitting, so a tab-terminated line keeps its empty trailing slot.
//! [`parse_record`] then drops empty trailing slots down to [`MIN_COLUMNS`],
//! so a tab-terminated 9-column line is still [`Layout::Reduced`] while
//! 8 populated columns plus a trailing tab still make 9.

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::code::{normalize_code, CodeError, LegacyCodePolicy};
use crate::models::{RateField, TariffFields, TariffRecord};
use crate::rates::{normalize_rate, FallbackCounts, Placeholders};

/// Fewest columns a line may have and still be parsed.
pub const MIN_COLUMNS: usize = 9;

/// Column count from which the excise column is present.
pub const FULL_COLUMNS: usize = 10;

const COL_CODE: usize = 0;
const COL_DESC_PRIMARY: usize = 1;
const COL_DESC_SECONDARY: usize = 2;
const COL_CATEGORY: usize = 3;
const COL_SUBCATEGORY: usize = 4;
const COL_KEYWORDS: usize = 5;
const COL_DUTY: usize = 6;
const COL_VAT: usize = 7;
const COL_EXCISE: usize = 8;
const COL_CERTS_FULL: usize = 9;
const COL_CERTS_REDUCED: usize = 8;
const COL_CONFIDENCE: usize = 10;
const COL_SEARCH_FREQUENCY: usize = 11;

/// Column layout a line was parsed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Full,
    Reduced,
}

/// Recoverable, per-line parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("line has {found} columns, at least {MIN_COLUMNS} required")]
    TooFewColumns { found: usize },
    #[error(transparent)]
    Code(#[from] CodeError),
    #[error("primary description is empty")]
    MissingDescription,
}

/// Settings shared by every line of a pass.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    pub placeholders: Placeholders,
    pub legacy_codes: LegacyCodePolicy,
}

/// A parsed line: the canonical record plus the optional trailing columns
/// the canonical schema does not store.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecord {
    pub record: TariffRecord,
    pub layout: Layout,
    pub confidence: Option<Decimal>,
    pub search_frequency: Option<u64>,
}

fn tab_runs() -> &'static Regex {
    static TAB_RUNS: OnceLock<Regex> = OnceLock::new();
    TAB_RUNS.get_or_init(|| Regex::new(r"\t+").expect("static regex"))
}

/// Split a raw line into trimmed columns.
pub fn split_columns(line: &str) -> Vec<String> {
    let line = line.trim_end_matches(['\r', '\n']).trim_start();
    tab_runs()
        .split(line)
        .map(|col| col.trim().to_string())
        .collect()
}

/// Parse one candidate line.
pub fn parse_record(
    line: &str,
    options: &ParseOptions,
    counts: &mut FallbackCounts,
) -> Result<ParsedRecord, RecordError> {
    let mut cols = split_columns(line);
    while cols.len() > MIN_COLUMNS && cols.last().is_some_and(|c| c.is_empty()) {
        cols.pop();
    }
    if cols.len() < MIN_COLUMNS {
        return Err(RecordError::TooFewColumns { found: cols.len() });
    }

    let layout = if cols.len() >= FULL_COLUMNS {
        Layout::Full
    } else {
        Layout::Reduced
    };

    let col = |i: usize| cols.get(i).map(String::as_str).unwrap_or("");
    let opt = |i: usize| Some(col(i)).filter(|s| !s.is_empty()).map(str::to_string);

    let code = normalize_code(col(COL_CODE), options.legacy_codes)?;
    let description_primary = col(COL_DESC_PRIMARY);
    if description_primary.is_empty() {
        return Err(RecordError::MissingDescription);
    }

    let p = &options.placeholders;
    let duty_rate = normalize_rate(col(COL_DUTY), RateField::Duty, p, counts);
    let vat_rate = normalize_rate(col(COL_VAT), RateField::Vat, p, counts);

    let (excise_rate, certs_raw) = match layout {
        Layout::Full => (
            normalize_rate(col(COL_EXCISE), RateField::Excise, p, counts),
            col(COL_CERTS_FULL),
        ),
        Layout::Reduced => {
            counts.excise_absent += 1;
            (RateField::Excise.default_value(), col(COL_CERTS_REDUCED))
        }
    };
    let required_certificates = parse_certificates(certs_raw, counts);

    let confidence = cols
        .get(COL_CONFIDENCE)
        .and_then(|s| Decimal::from_str(&s.replace(',', ".")).ok());
    let search_frequency = cols
        .get(COL_SEARCH_FREQUENCY)
        .and_then(|s| s.parse::<u64>().ok());

    Ok(ParsedRecord {
        record: TariffRecord {
            code,
            fields: TariffFields {
                description_primary: description_primary.to_string(),
                description_secondary: opt(COL_DESC_SECONDARY),
                category: opt(COL_CATEGORY),
                subcategory: opt(COL_SUBCATEGORY),
                keywords: opt(COL_KEYWORDS),
                duty_rate,
                vat_rate,
                excise_rate,
                required_certificates,
                sources: Vec::new(),
            },
        },
        layout,
        confidence,
        search_frequency,
    })
}

/// Parse a certificate list cell.
///
/// Only a strict JSON array is interpreted. Anything else that is non-empty
/// (including Python-style `['a']` literals) is kept verbatim as a
/// single-element list.
pub fn parse_certificates(raw: &str, counts: &mut FallbackCounts) -> Vec<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        counts.certificates_defaulted += 1;
        return Vec::new();
    }

    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::Null => None,
                serde_json::Value::String(s) => {
                    let s = s.trim().to_string();
                    (!s.is_empty()).then_some(s)
                }
                other => Some(other.to_string()),
            })
            .collect(),
        _ => {
            counts.certificates_verbatim += 1;
            vec![raw.to_string()]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> (Result<ParsedRecord, RecordError>, FallbackCounts) {
        let mut counts = FallbackCounts::default();
        let r = parse_record(line, &ParseOptions::default(), &mut counts);
        (r, counts)
    }

    #[test]
    fn full_line_maps_every_column() {
        let line = "8471301000\tPersonal computer\tКомпьютер\tElectronics\tComputers\tpc,laptop\t10.00\t12.00\t0.00\t[\"CoC\"]";
        let (r, counts) = parse(line);
        let parsed = r.unwrap();
        let f = &parsed.record.fields;
        assert_eq!(parsed.layout, Layout::Full);
        assert_eq!(parsed.record.code, "8471301000");
        assert_eq!(f.description_primary, "Personal computer");
        assert_eq!(f.description_secondary.as_deref(), Some("Компьютер"));
        assert_eq!(f.category.as_deref(), Some("Electronics"));
        assert_eq!(f.subcategory.as_deref(), Some("Computers"));
        assert_eq!(f.keywords.as_deref(), Some("pc,laptop"));
        assert_eq!(f.duty_rate.to_string(), "10.00");
        assert_eq!(f.vat_rate.to_string(), "12.00");
        assert_eq!(f.excise_rate.to_string(), "0.00");
        assert_eq!(f.required_certificates, vec!["CoC"]);
        assert_eq!(counts.total(), 0);
    }

    #[test]
    fn twelve_columns_carry_extras() {
        let line = "0101210000\tZotli otlar\tЛошади\tHayvonlar\tOtlar\tot\t0\t12\t0\t[]\t0,95\t42";
        let parsed = parse(line).0.unwrap();
        assert_eq!(parsed.confidence.map(|c| c.to_string()).as_deref(), Some("0.95"));
        assert_eq!(parsed.search_frequency, Some(42));
        assert!(parsed.record.fields.required_certificates.is_empty());
    }

    #[test]
    fn tab_runs_collapse() {
        let cols = split_columns("0101210000\t\t\tA\t\tB\r\n");
        assert_eq!(cols, vec!["0101210000", "A", "B"]);
    }

    #[test]
    fn trailing_tab_keeps_empty_slot() {
        let cols = split_columns("0101210000\tA\tB\t");
        assert_eq!(cols, vec!["0101210000", "A", "B", ""]);
    }

    #[test]
    fn nine_columns_use_reduced_layout() {
        let line = "0402100000\tSut kukuni\tСухое молоко\tSut\tKukun\tsut\t10,5\t12\t[\"Veterinariya sertifikati\"]";
        let (r, counts) = parse(line);
        let parsed = r.unwrap();
        assert_eq!(parsed.layout, Layout::Reduced);
        assert_eq!(parsed.record.fields.duty_rate.to_string(), "10.50");
        assert_eq!(parsed.record.fields.excise_rate.to_string(), "0.00");
        assert_eq!(
            parsed.record.fields.required_certificates,
            vec!["Veterinariya sertifikati"]
        );
        assert_eq!(counts.excise_absent, 1);
    }

    #[test]
    fn eight_populated_columns_with_trailing_tab() {
        let line = "0402100000\tSut kukuni\tСухое молоко\tSut\tKukun\tsut\t10\t12\t\n";
        let (r, counts) = parse(line);
        let f = r.unwrap().record.fields;
        assert_eq!(f.excise_rate.to_string(), "0.00");
        assert!(f.required_certificates.is_empty());
        assert_eq!(counts.excise_absent, 1);
        assert_eq!(counts.certificates_defaulted, 1);
    }

    #[test]
    fn tab_terminated_reduced_line_keeps_certificates() {
        let line = "0402100000\tSut kukuni\tСухое молоко\tSut\tKukun\tsut\t10,5\t12\t[\"Vet\"]\t\r\n";
        let (r, counts) = parse(line);
        let parsed = r.unwrap();
        assert_eq!(parsed.layout, Layout::Reduced);
        assert_eq!(parsed.record.fields.excise_rate.to_string(), "0.00");
        assert_eq!(parsed.record.fields.required_certificates, vec!["Vet"]);
        assert_eq!(counts.excise_absent, 1);
        assert_eq!(counts.excise.unparsable, 0);
        assert_eq!(counts.certificates_defaulted, 0);
    }

    #[test]
    fn full_line_with_trailing_tab_stays_full() {
        let line = "8471301000\tPC\t-\t-\t-\t-\t10\t12\t5\t[\"CoC\"]\t";
        let (r, counts) = parse(line);
        let parsed = r.unwrap();
        assert_eq!(parsed.layout, Layout::Full);
        assert_eq!(parsed.record.fields.excise_rate.to_string(), "5.00");
        assert_eq!(parsed.record.fields.required_certificates, vec!["CoC"]);
        assert_eq!(counts.total(), 0);
    }

    #[test]
    fn fewer_than_nine_columns_rejected() {
        let line = "0402100000\tSut kukuni\tСухое молоко\tSut\tKukun\tsut\t10\t12";
        assert_eq!(parse(line).0, Err(RecordError::TooFewColumns { found: 8 }));
        assert_eq!(
            parse("0402100000").0,
            Err(RecordError::TooFewColumns { found: 1 })
        );
    }

    #[test]
    fn placeholder_duty_does_not_error() {
        let line = "2203000100\tPivo\tПиво\tIchimliklar\tPivo\tpivo\tNarxga bog'liq\t12\t0\t[]";
        let (r, counts) = parse(line);
        assert_eq!(r.unwrap().record.fields.duty_rate.to_string(), "0.00");
        assert_eq!(counts.duty.placeholder, 1);
    }

    #[test]
    fn empty_primary_description_rejected() {
        let line = "2203000100\t \tПиво\tIchimliklar\tPivo\tpivo\t0\t12\t0\t[]";
        assert_eq!(parse(line).0, Err(RecordError::MissingDescription));
    }

    #[test]
    fn non_digit_code_column_rejected() {
        let line = "2203000100 x\tPivo\tПиво\tIchimliklar\tPivo\tpivo\t0\t12\t0\t[]";
        assert!(matches!(parse(line).0, Err(RecordError::Code(_))));
    }

    #[test]
    fn empty_optional_text_becomes_none() {
        let line = "2203000100\tPivo\t \t\t\t\t0\t12\t0\t[]";
        // tab runs collapse, so only the whitespace-only secondary survives as a column
        let (r, _) = parse(line);
        assert!(matches!(r, Err(RecordError::TooFewColumns { .. })));

        let line = "2203000100\tPivo\t \t-\t \t \t0\t12\t0\t[]";
        let f = parse(line).0.unwrap().record.fields;
        assert_eq!(f.description_secondary, None);
        assert_eq!(f.category.as_deref(), Some("-"));
        assert_eq!(f.keywords, None);
    }

    #[test]
    fn certificates_strict_json_or_verbatim() {
        let mut counts = FallbackCounts::default();
        assert_eq!(
            parse_certificates(r#"["CoC", "Gigiyenik sertifikat"]"#, &mut counts),
            vec!["CoC", "Gigiyenik sertifikat"]
        );
        assert!(parse_certificates("[]", &mut counts).is_empty());
        assert_eq!(counts.total(), 0);

        assert_eq!(
            parse_certificates("['CoC']", &mut counts),
            vec!["['CoC']"]
        );
        assert_eq!(
            parse_certificates("Veterinariya sertifikati", &mut counts),
            vec!["Veterinariya sertifikati"]
        );
        assert_eq!(counts.certificates_verbatim, 2);

        assert!(parse_certificates("", &mut counts).is_empty());
        assert_eq!(counts.certificates_defaulted, 1);
    }

    #[test]
    fn certificate_array_scalars_are_stringified() {
        let mut counts = FallbackCounts::default();
        assert_eq!(
            parse_certificates(r#"["A", null, 7, " "]"#, &mut counts),
            vec!["A", "7"]
        );
    }
}
