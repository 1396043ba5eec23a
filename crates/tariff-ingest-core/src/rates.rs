//! Rate normalization.
//!
//! Rate columns arrive as locale-formatted strings: decimal commas,
//! trailing percent signs, and descriptive placeholders such as
//! `Narxga bog'liq` ("depends on price") where an ad-valorem rate does not
//! apply. [`normalize_rate`] turns any of these into a non-negative
//! [`Decimal`] with two decimal places and never fails; every departure from
//! a clean parse is recorded in [`FallbackCounts`] for post-run auditing.
//!
//! # Rules
//!
//! 1. Empty input → field default (duty 0.00, VAT 12.00, excise 0.00).
//! 2. Known placeholder → 0.00.
//! 3. Otherwise strip one trailing `%`, replace `,` with `.`, and parse
//!    plain digits with an optional fractional part. Anything else (signs,
//!    exponents, `_` separators) → field default.
//! 4. A value too large to carry two decimal places → field default.
//!
//! The output is rounded to two places, so normalizing an already canonical
//! value returns it unchanged.

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::RateField;

/// Placeholders seen in source dumps in place of a numeric rate.
pub const BUILTIN_PLACEHOLDERS: &[&str] = &[
    "Narxga bog'liq",
    "Maxsus stavka",
    "price-dependent",
    "special rate",
    "depends on price",
];

/// Case- and apostrophe-insensitive set of non-numeric rate placeholders.
#[derive(Debug, Clone)]
pub struct Placeholders {
    folded: Vec<String>,
}

impl Placeholders {
    pub fn builtin() -> Self {
        Self::with_extra(std::iter::empty::<&str>())
    }

    /// Built-in placeholders plus `extra`.
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut folded: Vec<String> = BUILTIN_PLACEHOLDERS.iter().map(|p| fold(p)).collect();
        for p in extra {
            let f = fold(p.as_ref());
            if !f.is_empty() && !folded.contains(&f) {
                folded.push(f);
            }
        }
        Self { folded }
    }

    pub fn matches(&self, raw: &str) -> bool {
        let f = fold(raw);
        self.folded.iter().any(|p| *p == f)
    }
}

impl Default for Placeholders {
    fn default() -> Self {
        Self::builtin()
    }
}

fn fold(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .map(|c| match c {
            '\u{2019}' | '\u{02BB}' | '\u{2018}' | '\u{02BC}' | '`' => '\'',
            other => other,
        })
        .flat_map(char::to_lowercase)
        .collect()
}

/// How a raw rate string was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateOutcome {
    Parsed,
    Defaulted,
    Placeholder,
    Unparsable,
}

/// Fallback counters for one rate column.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateFallbacks {
    pub defaulted: u64,
    pub placeholder: u64,
    pub unparsable: u64,
}

impl RateFallbacks {
    pub fn total(&self) -> u64 {
        self.defaulted + self.placeholder + self.unparsable
    }
}

/// Every silent default taken during a pass.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackCounts {
    pub duty: RateFallbacks,
    pub vat: RateFallbacks,
    pub excise: RateFallbacks,
    /// Lines in the reduced layout, which carry no excise column at all.
    pub excise_absent: u64,
    pub certificates_defaulted: u64,
    /// Non-JSON certificate strings kept as a single-element list.
    pub certificates_verbatim: u64,
}

impl FallbackCounts {
    pub fn rate(&self, field: RateField) -> RateFallbacks {
        match field {
            RateField::Duty => self.duty,
            RateField::Vat => self.vat,
            RateField::Excise => self.excise,
        }
    }

    fn rate_mut(&mut self, field: RateField) -> &mut RateFallbacks {
        match field {
            RateField::Duty => &mut self.duty,
            RateField::Vat => &mut self.vat,
            RateField::Excise => &mut self.excise,
        }
    }

    pub fn record(&mut self, field: RateField, outcome: RateOutcome) {
        let counts = self.rate_mut(field);
        match outcome {
            RateOutcome::Parsed => {}
            RateOutcome::Defaulted => counts.defaulted += 1,
            RateOutcome::Placeholder => counts.placeholder += 1,
            RateOutcome::Unparsable => counts.unparsable += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.duty.total()
            + self.vat.total()
            + self.excise.total()
            + self.excise_absent
            + self.certificates_defaulted
            + self.certificates_verbatim
    }
}

/// Resolve `raw` without recording anything.
pub fn resolve_rate(raw: &str, field: RateField, placeholders: &Placeholders) -> (Decimal, RateOutcome) {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return (field.default_value(), RateOutcome::Defaulted);
    }
    if placeholders.matches(trimmed) {
        return (Decimal::new(0, 2), RateOutcome::Placeholder);
    }

    let numeric = trimmed
        .strip_suffix('%')
        .map(str::trim_end)
        .unwrap_or(trimmed)
        .replace(',', ".");

    if !plain_number().is_match(&numeric) {
        return (field.default_value(), RateOutcome::Unparsable);
    }
    match Decimal::from_str(&numeric).ok().and_then(canonical) {
        Some(value) => (value, RateOutcome::Parsed),
        None => (field.default_value(), RateOutcome::Unparsable),
    }
}

fn plain_number() -> &'static Regex {
    static PLAIN_NUMBER: OnceLock<Regex> = OnceLock::new();
    PLAIN_NUMBER.get_or_init(|| Regex::new(r"^\d+(\.\d+)?$").expect("static regex"))
}

/// Normalize `raw` for `field`, counting any fallback in `counts`.
pub fn normalize_rate(
    raw: &str,
    field: RateField,
    placeholders: &Placeholders,
    counts: &mut FallbackCounts,
) -> Decimal {
    let (value, outcome) = resolve_rate(raw, field, placeholders);
    if outcome == RateOutcome::Unparsable {
        tracing::debug!(field = field.name(), raw, "unparsable rate, using default");
    }
    counts.record(field, outcome);
    value
}

/// Round to two places; `None` when the value has no room for them.
fn canonical(value: Decimal) -> Option<Decimal> {
    let mut v = value.round_dp(2);
    if v.is_zero() {
        v = Decimal::ZERO;
    }
    v.rescale(2);
    (v.scale() == 2).then_some(v)
}
