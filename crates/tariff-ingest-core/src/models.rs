//! Core data models used throughout tariff-ingest.
//!
//! A [`TariffRecord`] is the canonical unit stored per HS code. Everything
//! except the key lives in [`TariffFields`] so that the update path can
//! overwrite the mutable part of a record without touching its code.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Canonical tariff entry keyed by a 10-digit HS code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffRecord {
    pub code: String,
    #[serde(flatten)]
    pub fields: TariffFields,
}

/// The overwritable part of a [`TariffRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffFields {
    pub description_primary: String,
    pub description_secondary: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub keywords: Option<String>,
    pub duty_rate: Decimal,
    pub vat_rate: Decimal,
    pub excise_rate: Decimal,
    pub required_certificates: Vec<String>,
    pub sources: Vec<String>,
}

impl TariffFields {
    /// Fields for a code known only by its description; rates take their
    /// documented defaults.
    pub fn with_description(description_primary: impl Into<String>) -> Self {
        Self {
            description_primary: description_primary.into(),
            description_secondary: None,
            category: None,
            subcategory: None,
            keywords: None,
            duty_rate: RateField::Duty.default_value(),
            vat_rate: RateField::Vat.default_value(),
            excise_rate: RateField::Excise.default_value(),
            required_certificates: Vec::new(),
            sources: Vec::new(),
        }
    }

    /// Append a provenance tag unless it is already recorded.
    ///
    /// Returns `true` when the tag was added.
    pub fn push_source(&mut self, tag: &str) -> bool {
        if self.sources.iter().any(|s| s == tag) {
            return false;
        }
        self.sources.push(tag.to_string());
        true
    }
}

/// The three percentage-rate columns of a tariff record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateField {
    Duty,
    Vat,
    Excise,
}

impl RateField {
    /// Value used when the column is absent, empty, or unparsable.
    pub fn default_value(self) -> Decimal {
        match self {
            RateField::Duty => Decimal::new(0, 2),
            RateField::Vat => Decimal::new(1200, 2),
            RateField::Excise => Decimal::new(0, 2),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RateField::Duty => "duty",
            RateField::Vat => "vat",
            RateField::Excise => "excise",
        }
    }
}

/// How the coordinator treats a code that already exists in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertMode {
    /// Field-level overwrite of descriptions, classification, rates and
    /// certificates. Used by the tab-separated and JSON loaders.
    Overwrite,
    /// Only fill descriptions that are currently empty. Used by the layout
    /// scanner, which knows nothing about rates.
    FillDescriptions,
}
