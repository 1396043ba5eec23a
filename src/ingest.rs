//! Tab-separated ingestion and the shared run bookkeeping.
//!
//! Coordinates a full `tifctl load` pass: read and decode the source,
//! classify → parse → normalize → upsert every line, record the run in
//! `ingest_runs`, and print the summary. A missing source file is the only
//! fatal condition once the database is open; bad lines are counted.

use anyhow::Result;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use tariff_ingest_core::models::{RateField, UpsertMode};
use tariff_ingest_core::store::memory::InMemoryStore;
use tariff_ingest_core::store::TariffStore;
use tariff_ingest_core::upsert::{IngestSummary, Ingestor};

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::progress::{IngestProgressEvent, IngestProgressReporter};
use crate::source::read_source;
use crate::sqlite_store::SqliteStore;

/// Options for `tifctl load`.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Source dump; `[ingest].default_file` when `None`.
    pub path: Option<PathBuf>,
    /// Parse against an in-memory store and write nothing.
    pub dry_run: bool,
    /// Maximum number of candidate lines to process.
    pub limit: Option<u64>,
    /// Provenance label overriding `[ingest].source_tag`.
    pub tag: Option<String>,
}

/// Kind of pass, as recorded in `ingest_runs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Tsv,
    Json,
    Scan,
}

impl RunKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunKind::Tsv => "tsv",
            RunKind::Json => "json",
            RunKind::Scan => "scan",
        }
    }
}

pub async fn run_load(
    config: &Config,
    opts: LoadOptions,
    progress: &dyn IngestProgressReporter,
) -> Result<IngestSummary> {
    let path = opts
        .path
        .clone()
        .unwrap_or_else(|| config.ingest.default_file.clone());
    let source_name = path.display().to_string();

    progress.report(IngestProgressEvent::Reading {
        source: source_name.clone(),
    });
    let source = read_source(&path)?;
    let (text, encoding) = source.decode_text();
    let label = opts.tag.as_deref().or(config.ingest.source_tag.as_deref());
    let tag = source.provenance_tag(label);
    tracing::info!(source = %source_name, encoding = encoding.as_str(), tag = %tag, "load started");

    let started_at = chrono::Utc::now().timestamp();

    let summary = if opts.dry_run {
        let store = InMemoryStore::new();
        load_pass(&store, &text, &tag, config, opts.limit, progress, &source_name).await
    } else {
        let pool = db::connect(config).await?;
        migrate::apply_schema(&pool).await?;
        let store = SqliteStore::new(pool);
        let summary = load_pass(&store, &text, &tag, config, opts.limit, progress, &source_name).await;
        record_run(&store, RunKind::Tsv, &path, &tag, started_at, &summary).await?;
        store.close().await;
        summary
    };

    tracing::info!(
        source = %source_name,
        created = summary.created,
        updated = summary.updated,
        errors = summary.errors,
        "load finished"
    );
    print!(
        "{}",
        format_summary(&format!("load {}", source_name), &summary, opts.dry_run, &tag)
    );
    Ok(summary)
}

async fn load_pass<S: TariffStore>(
    store: &S,
    text: &str,
    tag: &str,
    config: &Config,
    limit: Option<u64>,
    progress: &dyn IngestProgressReporter,
    source_name: &str,
) -> IngestSummary {
    let lines: Vec<&str> = text.lines().collect();
    let mut ingestor = Ingestor::new(
        store,
        tag,
        UpsertMode::Overwrite,
        config.ingest.parse_options(),
    );
    ingestor
        .ingest_lines(
            lines.iter().copied(),
            limit,
            config.ingest.progress_every,
            |n, total| {
                progress.report(IngestProgressEvent::Scanning {
                    source: source_name.to_string(),
                    n,
                    total,
                })
            },
        )
        .await;
    ingestor.finish()
}

/// Append a row to `ingest_runs`. Returns the run id.
pub async fn record_run(
    store: &SqliteStore,
    kind: RunKind,
    source_path: &Path,
    tag: &str,
    started_at: i64,
    summary: &IngestSummary,
) -> Result<String> {
    let id = Uuid::new_v4().to_string();
    let finished_at = chrono::Utc::now().timestamp();
    sqlx::query(
        r#"
        INSERT INTO ingest_runs (id, kind, source_path, source_tag, started_at, finished_at,
                                 lines_scanned, candidates, created, updated, skipped, errors)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(kind.as_str())
    .bind(source_path.display().to_string())
    .bind(tag)
    .bind(started_at)
    .bind(finished_at)
    .bind(summary.lines_scanned as i64)
    .bind(summary.candidates as i64)
    .bind(summary.created as i64)
    .bind(summary.updated as i64)
    .bind(summary.skipped as i64)
    .bind(summary.errors as i64)
    .execute(store.pool())
    .await?;
    Ok(id)
}

/// Render the end-of-run summary printed on stdout.
pub fn format_summary(title: &str, s: &IngestSummary, dry_run: bool, tag: &str) -> String {
    let f = &s.fallbacks;
    let mut out = String::new();
    if dry_run {
        out.push_str(&format!("{} (dry-run)\n", title));
    } else {
        out.push_str(&format!("{}\n", title));
    }
    out.push_str(&format!("  lines read: {}\n", s.lines_scanned));
    out.push_str(&format!("  valid candidates: {}\n", s.candidates));
    out.push_str(&format!("  created: {}\n", s.created));
    out.push_str(&format!("  updated: {}\n", s.updated));
    out.push_str(&format!("  skipped: {}\n", s.skipped));
    out.push_str(&format!("  errors: {}\n", s.errors));
    out.push_str("  fallbacks:");
    for field in [RateField::Duty, RateField::Vat, RateField::Excise] {
        let r = f.rate(field);
        out.push_str(&format!(
            " {} {}/{}/{}",
            field.name(),
            r.defaulted,
            r.placeholder,
            r.unparsable
        ));
    }
    out.push_str(" (defaulted/placeholder/unparsable)\n");
    out.push_str(&format!(
        "  certificates: {} defaulted, {} verbatim; excise absent: {}\n",
        f.certificates_defaulted, f.certificates_verbatim, f.excise_absent
    ));
    out.push_str(&format!("  tag: {}\n", tag));
    out.push_str("ok\n");
    out
}
