//! Layout scan of printed nomenclature dumps (`tifctl scan`).
//!
//! PDFs and their plain-text copies carry only codes and descriptions, no
//! rates. Entries found by the layout scanner are upserted in
//! [`UpsertMode::FillDescriptions`]: unknown codes are created with default
//! rates, and known codes only get descriptions they are missing.

use anyhow::Result;
use std::path::Path;

use tariff_ingest_core::layout::{scan_layout, LayoutScan};
use tariff_ingest_core::models::{TariffFields, TariffRecord, UpsertMode};
use tariff_ingest_core::store::memory::InMemoryStore;
use tariff_ingest_core::store::TariffStore;
use tariff_ingest_core::upsert::{IngestSummary, Ingestor};

use crate::config::Config;
use crate::db;
use crate::extract::{source_text, TextOrigin};
use crate::ingest::{format_summary, record_run, RunKind};
use crate::migrate;
use crate::progress::{IngestProgressEvent, IngestProgressReporter};
use crate::source::read_source;
use crate::sqlite_store::SqliteStore;

pub async fn run_scan(
    config: &Config,
    path: &Path,
    dry_run: bool,
    progress: &dyn IngestProgressReporter,
) -> Result<IngestSummary> {
    let source_name = path.display().to_string();
    progress.report(IngestProgressEvent::Reading {
        source: source_name.clone(),
    });

    let source = read_source(path)?;
    let (text, origin) = source_text(&source)?;
    match origin {
        TextOrigin::Pdf => tracing::info!(source = %source_name, "extracted text from PDF"),
        TextOrigin::Text(enc) => tracing::info!(source = %source_name, encoding = enc.as_str(), "decoded text dump"),
    }

    let layout = scan_layout(&text, config.ingest.legacy_codes);
    progress.report(IngestProgressEvent::Scanning {
        source: source_name.clone(),
        n: layout.lines,
        total: layout.lines,
    });

    let tag = source.provenance_tag(config.ingest.source_tag.as_deref());
    let started_at = chrono::Utc::now().timestamp();

    let summary = if dry_run {
        let store = InMemoryStore::new();
        scan_pass(&store, layout, &tag, config).await
    } else {
        let pool = db::connect(config).await?;
        migrate::apply_schema(&pool).await?;
        let store = SqliteStore::new(pool);
        let summary = scan_pass(&store, layout, &tag, config).await;
        record_run(&store, RunKind::Scan, path, &tag, started_at, &summary).await?;
        store.close().await;
        summary
    };

    print!("{}", format_summary(&format!("scan {}", source_name), &summary, dry_run, &tag));
    Ok(summary)
}

async fn scan_pass<S: TariffStore>(store: &S, layout: LayoutScan, tag: &str, config: &Config) -> IngestSummary {
    let mut ingestor = Ingestor::new(
        store,
        tag,
        UpsertMode::FillDescriptions,
        config.ingest.parse_options(),
    );
    ingestor.count_scanned(layout.lines);

    for refused in &layout.rejected_codes {
        ingestor.count_candidate();
        ingestor.record_error(refused.line_number, &refused.raw_code, &refused.error);
    }
    for missing in &layout.undescribed {
        ingestor.count_candidate();
        ingestor.record_skip(missing.line_number, &missing.code, "no description");
    }
    for dup in &layout.duplicates {
        ingestor.count_candidate();
        let reason = format!("duplicate of line {}", dup.first_line);
        ingestor.record_skip(dup.line_number, &dup.code, &reason);
    }

    for entry in layout.entries {
        ingestor.count_candidate();
        let record = TariffRecord {
            code: entry.code,
            fields: TariffFields::with_description(entry.description),
        };
        ingestor.upsert(record, entry.line_number).await;
    }

    ingestor.finish()
}
