//! Upsert coordination and the linear ingestion pass.
//!
//! [`Ingestor`] owns the per-run state: a borrowed store handle, the
//! provenance tag stamped on touched records, the [`UpsertMode`], and the
//! running [`IngestSummary`]. Nothing is global; each command builds one
//! ingestor per pass.
//!
//! Failures on a single record are logged with line number and code,
//! counted, and never abort the pass.

use std::fmt::Display;

use anyhow::Result;
use serde::Serialize;

use crate::classify::is_candidate_line;
use crate::models::{TariffRecord, UpsertMode};
use crate::parse::{parse_record, ParseOptions};
use crate::rates::FallbackCounts;
use crate::store::TariffStore;

/// Externally observable result of a pass.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub lines_scanned: u64,
    pub candidates: u64,
    pub created: u64,
    pub updated: u64,
    pub skipped: u64,
    pub errors: u64,
    pub fallbacks: FallbackCounts,
}

/// What happened to one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
    /// Existing record left as is (only in [`UpsertMode::FillDescriptions`]).
    Unchanged,
}

/// Per-run upsert coordinator.
pub struct Ingestor<'a, S: TariffStore + ?Sized> {
    store: &'a S,
    tag: String,
    mode: UpsertMode,
    options: ParseOptions,
    summary: IngestSummary,
}

impl<'a, S: TariffStore + ?Sized> Ingestor<'a, S> {
    pub fn new(store: &'a S, tag: impl Into<String>, mode: UpsertMode, options: ParseOptions) -> Self {
        Self {
            store,
            tag: tag.into(),
            mode,
            options,
            summary: IngestSummary::default(),
        }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn summary(&self) -> &IngestSummary {
        &self.summary
    }

    /// Fallback counters, for callers that normalize fields themselves.
    pub fn fallbacks_mut(&mut self) -> &mut FallbackCounts {
        &mut self.summary.fallbacks
    }

    pub fn count_scanned(&mut self, n: u64) {
        self.summary.lines_scanned += n;
    }

    pub fn count_candidate(&mut self) {
        self.summary.candidates += 1;
    }

    /// Count and log a recoverable per-record failure.
    pub fn record_error(&mut self, line: u64, code: &str, error: &dyn Display) {
        tracing::warn!(line, code, error = %error, "record rejected");
        self.summary.errors += 1;
    }

    /// Count a record deliberately passed over.
    pub fn record_skip(&mut self, line: u64, code: &str, reason: &str) {
        tracing::info!(line, code, reason, "record skipped");
        self.summary.skipped += 1;
    }

    /// Reconcile `record` with the store. Store errors are caught, logged
    /// and counted; `None` is returned in that case.
    pub async fn upsert(&mut self, record: TariffRecord, line: u64) -> Option<UpsertOutcome> {
        let code = record.code.clone();
        match self.apply(record).await {
            Ok(outcome) => {
                match outcome {
                    UpsertOutcome::Created => self.summary.created += 1,
                    UpsertOutcome::Updated => self.summary.updated += 1,
                    UpsertOutcome::Unchanged => self.summary.skipped += 1,
                }
                tracing::debug!(line, code = %code, ?outcome, "upserted");
                Some(outcome)
            }
            Err(e) => {
                tracing::warn!(line, code = %code, error = %e, "upsert failed");
                self.summary.errors += 1;
                None
            }
        }
    }

    async fn apply(&self, mut record: TariffRecord) -> Result<UpsertOutcome> {
        let existing = match self.store.find_by_code(&record.code).await? {
            Some(existing) => existing,
            None => {
                record.fields.push_source(&self.tag);
                self.store.insert(&record).await?;
                return Ok(UpsertOutcome::Created);
            }
        };

        match self.mode {
            UpsertMode::Overwrite => {
                let mut fields = record.fields;
                fields.sources = existing.fields.sources;
                fields.push_source(&self.tag);
                self.store.update(&record.code, &fields).await?;
                Ok(UpsertOutcome::Updated)
            }
            UpsertMode::FillDescriptions => {
                let mut fields = existing.fields;
                let mut changed = false;

                let incoming = record.fields.description_primary.trim();
                if fields.description_primary.trim().is_empty() && !incoming.is_empty() {
                    fields.description_primary = incoming.to_string();
                    changed = true;
                }
                let secondary_empty = fields
                    .description_secondary
                    .as_deref()
                    .map_or(true, |s| s.trim().is_empty());
                if secondary_empty {
                    if let Some(s) = record.fields.description_secondary.filter(|s| !s.trim().is_empty()) {
                        fields.description_secondary = Some(s);
                        changed = true;
                    }
                }

                if !changed {
                    return Ok(UpsertOutcome::Unchanged);
                }
                fields.push_source(&self.tag);
                self.store.update(&record.code, &fields).await?;
                Ok(UpsertOutcome::Updated)
            }
        }
    }

    /// Run the tab-separated pass: classify, parse, normalize, upsert.
    ///
    /// Lines are numbered from 1. `limit` caps the number of candidate
    /// lines processed; `on_progress(scanned, total)` fires every
    /// `progress_every` lines and once at the end.
    pub async fn ingest_lines<'l, I>(
        &mut self,
        lines: I,
        limit: Option<u64>,
        progress_every: u64,
        mut on_progress: impl FnMut(u64, u64),
    ) where
        I: IntoIterator<Item = &'l str>,
        I::IntoIter: ExactSizeIterator,
    {
        let lines = lines.into_iter();
        let total = lines.len() as u64;
        let every = progress_every.max(1);

        for (idx, line) in lines.enumerate() {
            if limit.is_some_and(|lim| self.summary.candidates >= lim) {
                break;
            }
            let line_no = idx as u64 + 1;
            self.summary.lines_scanned += 1;
            if self.summary.lines_scanned % every == 0 {
                on_progress(self.summary.lines_scanned, total);
            }

            if !is_candidate_line(line) {
                continue;
            }
            self.summary.candidates += 1;

            match parse_record(line, &self.options, &mut self.summary.fallbacks) {
                Ok(parsed) => {
                    self.upsert(parsed.record, line_no).await;
                }
                Err(e) => {
                    let code = code_hint(line);
                    self.record_error(line_no, code, &e);
                }
            }
        }

        on_progress(self.summary.lines_scanned, total);
    }

    pub fn finish(self) -> IngestSummary {
        self.summary
    }
}

fn code_hint(line: &str) -> &str {
    let line = line.trim_start();
    let end = line
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(line.len());
    &line[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TariffFields;
    use crate::store::memory::InMemoryStore;

    const PC_LINE: &str = "8471301000\tPersonal computer\tКомпьютер\tElectronics\tComputers\tpc,laptop\t10.00\t12.00\t0.00\t[\"CoC\"]";

    fn sample_source() -> Vec<&'static str> {
        vec![
            "HS Code\tTavsif\tОписание\tKategoriya\tSubkategoriya\tKalit so'zlar\tBoj\tQQS\tAksiz\tSertifikatlar",
            PC_LINE,
            "0101210000\tZotli naslli otlar\tЧистокровные лошади\tTirik hayvonlar\tOtlar\tot,horse\t0\t12\t0\t[\"Veterinariya sertifikati\"]\t0.95\t3",
            "",
            "2203000100\tPivo\tПиво\tIchimliklar\tPivo\tpivo,beer\tNarxga bog'liq\t12,00\t[]",
            "-- page 2 --",
        ]
    }

    fn ingestor<'a>(store: &'a InMemoryStore, tag: &str) -> Ingestor<'a, InMemoryStore> {
        Ingestor::new(store, tag, UpsertMode::Overwrite, ParseOptions::default())
    }

    #[tokio::test]
    async fn end_to_end_pc_line() {
        let store = InMemoryStore::new();
        let mut ing = ingestor(&store, "info.txt@aaaaaaaaaaaa");
        ing.ingest_lines([PC_LINE], None, 100, |_, _| {}).await;
        let summary = ing.finish();
        assert_eq!(summary.created, 1);

        let r = store.find_by_code("8471301000").await.unwrap().unwrap();
        assert_eq!(r.fields.duty_rate.to_string(), "10.00");
        assert_eq!(r.fields.vat_rate.to_string(), "12.00");
        assert_eq!(r.fields.excise_rate.to_string(), "0.00");
        assert_eq!(r.fields.required_certificates, vec!["CoC"]);
        assert_eq!(r.fields.sources, vec!["info.txt@aaaaaaaaaaaa"]);
    }

    #[tokio::test]
    async fn second_run_updates_instead_of_creating() {
        let store = InMemoryStore::new();
        let lines = sample_source();

        let mut first = ingestor(&store, "info.txt@aaaaaaaaaaaa");
        first.ingest_lines(lines.iter().copied(), None, 100, |_, _| {}).await;
        let first = first.finish();
        assert_eq!(first.lines_scanned, 6);
        assert_eq!(first.candidates, 3);
        assert_eq!((first.created, first.updated, first.errors), (3, 0, 0));

        let mut second = ingestor(&store, "info.txt@bbbbbbbbbbbb");
        second.ingest_lines(lines.iter().copied(), None, 100, |_, _| {}).await;
        let second = second.finish();
        assert_eq!((second.created, second.updated, second.errors), (0, 3, 0));
        assert_eq!(store.count().await.unwrap(), 3);

        let r = store.find_by_code("2203000100").await.unwrap().unwrap();
        assert_eq!(
            r.fields.sources,
            vec!["info.txt@aaaaaaaaaaaa", "info.txt@bbbbbbbbbbbb"]
        );
    }

    #[tokio::test]
    async fn short_lines_count_one_error_each_and_continue() {
        let store = InMemoryStore::new();
        let lines = [
            "0101210000\tOtlar\tЛошади\tHayvon\tOt\tot\t0\t12",
            PC_LINE,
            "0102210000\tQoramol",
        ];
        let mut ing = ingestor(&store, "t");
        ing.ingest_lines(lines, None, 100, |_, _| {}).await;
        let s = ing.finish();
        assert_eq!(s.candidates, 3);
        assert_eq!(s.errors, 2);
        assert_eq!(s.created, 1);
    }

    #[tokio::test]
    async fn placeholder_rate_is_not_an_error() {
        let store = InMemoryStore::new();
        let mut ing = ingestor(&store, "t");
        ing.ingest_lines(
            ["2203000100\tPivo\tПиво\tIchimliklar\tPivo\tpivo\tNarxga bog'liq\t12\t0\t[]"],
            None,
            100,
            |_, _| {},
        )
        .await;
        let s = ing.finish();
        assert_eq!(s.errors, 0);
        assert_eq!(s.fallbacks.duty.placeholder, 1);
        let r = store.find_by_code("2203000100").await.unwrap().unwrap();
        assert_eq!(r.fields.duty_rate.to_string(), "0.00");
    }

    #[tokio::test]
    async fn overwrite_replaces_fields_not_merges() {
        let store = InMemoryStore::new();
        let mut ing = ingestor(&store, "a");
        ing.ingest_lines([PC_LINE], None, 100, |_, _| {}).await;
        let mut ing = ingestor(&store, "b");
        ing.ingest_lines(
            ["8471301000\tLaptop\t-\t-\t-\t-\t5\t12\t0\t[]"],
            None,
            100,
            |_, _| {},
        )
        .await;
        let r = store.find_by_code("8471301000").await.unwrap().unwrap();
        assert_eq!(r.fields.description_primary, "Laptop");
        assert_eq!(r.fields.duty_rate.to_string(), "5.00");
        assert!(r.fields.required_certificates.is_empty());
        assert_eq!(r.fields.sources, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn limit_caps_candidates() {
        let store = InMemoryStore::new();
        let lines = sample_source();
        let mut ing = ingestor(&store, "t");
        ing.ingest_lines(lines.iter().copied(), Some(2), 100, |_, _| {}).await;
        let s = ing.finish();
        assert_eq!(s.candidates, 2);
        assert_eq!(s.created, 2);
        assert_eq!(s.lines_scanned, 3);
    }

    #[tokio::test]
    async fn progress_reports_periodically_and_at_end() {
        let store = InMemoryStore::new();
        let lines = sample_source();
        let mut seen = Vec::new();
        let mut ing = ingestor(&store, "t");
        ing.ingest_lines(lines.iter().copied(), None, 4, |n, total| seen.push((n, total)))
            .await;
        assert_eq!(seen, vec![(4, 6), (6, 6)]);
    }

    struct FailingStore;

    #[async_trait::async_trait]
    impl TariffStore for FailingStore {
        async fn find_by_code(&self, _code: &str) -> Result<Option<TariffRecord>> {
            Ok(None)
        }
        async fn insert(&self, record: &TariffRecord) -> Result<TariffRecord> {
            anyhow::bail!("disk full while inserting {}", record.code)
        }
        async fn update(&self, code: &str, _fields: &TariffFields) -> Result<TariffRecord> {
            anyhow::bail!("cannot update {}", code)
        }
        async fn count(&self) -> Result<u64> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn store_failures_are_counted_not_fatal() {
        let store = FailingStore;
        let lines = sample_source();
        let mut ing = Ingestor::new(&store, "t", UpsertMode::Overwrite, ParseOptions::default());
        ing.ingest_lines(lines.iter().copied(), None, 100, |_, _| {}).await;
        let s = ing.finish();
        assert_eq!(s.candidates, 3);
        assert_eq!(s.errors, 3);
        assert_eq!(s.created, 0);
    }

    #[tokio::test]
    async fn fill_descriptions_never_overwrites() {
        let store = InMemoryStore::new();
        let mut existing = TariffFields::with_description("Zotli otlar");
        existing.duty_rate = rust_decimal::Decimal::new(500, 2);
        store
            .insert(&TariffRecord {
                code: "0101210000".to_string(),
                fields: existing,
            })
            .await
            .unwrap();

        let mut ing = Ingestor::new(&store, "scan", UpsertMode::FillDescriptions, ParseOptions::default());
        let mut incoming = TariffFields::with_description("Other text");
        incoming.description_secondary = Some("Лошади".to_string());
        let outcome = ing
            .upsert(
                TariffRecord {
                    code: "0101210000".to_string(),
                    fields: incoming.clone(),
                },
                1,
            )
            .await;
        assert_eq!(outcome, Some(UpsertOutcome::Updated));

        let again = ing
            .upsert(
                TariffRecord {
                    code: "0101210000".to_string(),
                    fields: incoming,
                },
                2,
            )
            .await;
        assert_eq!(again, Some(UpsertOutcome::Unchanged));

        let r = store.find_by_code("0101210000").await.unwrap().unwrap();
        assert_eq!(r.fields.description_primary, "Zotli otlar");
        assert_eq!(r.fields.description_secondary.as_deref(), Some("Лошади"));
        assert_eq!(r.fields.duty_rate.to_string(), "5.00");
        assert_eq!(r.fields.sources, vec!["scan"]);

        let s = ing.finish();
        assert_eq!((s.updated, s.skipped), (1, 1));
    }

    #[test]
    fn code_hint_takes_leading_digits() {
        assert_eq!(code_hint("  0101210000\tx"), "0101210000");
        assert_eq!(code_hint("abc"), "");
    }
}
