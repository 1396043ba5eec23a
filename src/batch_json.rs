//! JSON batch import (`tifctl import-json`).
//!
//! Accepts hand-curated batches: a JSON array of objects using either the
//! canonical field names or the older `description_uz` / `description_ru`
//! / `required_certs` names. Rates may be numbers or strings and go through
//! the same normalizer as the tab-separated path. The output of
//! `tifctl export` is a valid batch.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

use tariff_ingest_core::code::normalize_code;
use tariff_ingest_core::models::{RateField, TariffFields, TariffRecord, UpsertMode};
use tariff_ingest_core::parse::parse_certificates;
use tariff_ingest_core::rates::normalize_rate;
use tariff_ingest_core::store::memory::InMemoryStore;
use tariff_ingest_core::store::TariffStore;
use tariff_ingest_core::upsert::{IngestSummary, Ingestor};

use crate::config::Config;
use crate::db;
use crate::ingest::{format_summary, record_run, RunKind};
use crate::migrate;
use crate::source::read_source;
use crate::sqlite_store::SqliteStore;

#[derive(Debug, Deserialize)]
struct BatchItem {
    code: Option<Value>,
    #[serde(alias = "description_uz")]
    description_primary: Option<String>,
    #[serde(alias = "description_ru")]
    description_secondary: Option<String>,
    category: Option<String>,
    subcategory: Option<String>,
    keywords: Option<String>,
    duty_rate: Option<Value>,
    vat_rate: Option<Value>,
    excise_rate: Option<Value>,
    #[serde(alias = "required_certs")]
    required_certificates: Option<Value>,
}

/// Options for `tifctl import-json`.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Lowest code accepted (inclusive); others are skipped.
    pub from: Option<String>,
    /// Highest code accepted (inclusive); others are skipped.
    pub to: Option<String>,
    pub dry_run: bool,
}

pub async fn run_import_json(config: &Config, path: &Path, opts: ImportOptions) -> Result<IngestSummary> {
    let source = read_source(path)?;
    let (text, _) = source.decode_text();
    let doc: Value = serde_json::from_str(&text)
        .with_context(|| format!("Invalid JSON in batch file: {}", path.display()))?;
    let Value::Array(items) = doc else {
        bail!("batch file must contain a JSON array of tariff objects");
    };

    let policy = config.ingest.legacy_codes;
    let from = opts
        .from
        .as_deref()
        .map(|c| normalize_code(c, policy))
        .transpose()
        .context("invalid --from code")?;
    let to = opts
        .to
        .as_deref()
        .map(|c| normalize_code(c, policy))
        .transpose()
        .context("invalid --to code")?;
    let bounds = CodeRange { from, to };

    let tag = source.provenance_tag(config.ingest.source_tag.as_deref());
    let started_at = chrono::Utc::now().timestamp();
    let source_name = path.display().to_string();

    let summary = if opts.dry_run {
        let store = InMemoryStore::new();
        import_pass(&store, items, &tag, config, &bounds).await
    } else {
        let pool = db::connect(config).await?;
        migrate::apply_schema(&pool).await?;
        let store = SqliteStore::new(pool);
        let summary = import_pass(&store, items, &tag, config, &bounds).await;
        record_run(&store, RunKind::Json, path, &tag, started_at, &summary).await?;
        store.close().await;
        summary
    };

    print!(
        "{}",
        format_summary(&format!("import-json {}", source_name), &summary, opts.dry_run, &tag)
    );
    Ok(summary)
}

struct CodeRange {
    from: Option<String>,
    to: Option<String>,
}

impl CodeRange {
    fn contains(&self, code: &str) -> bool {
        self.from.as_deref().map_or(true, |f| code >= f) && self.to.as_deref().map_or(true, |t| code <= t)
    }
}

async fn import_pass<S: TariffStore>(
    store: &S,
    items: Vec<Value>,
    tag: &str,
    config: &Config,
    bounds: &CodeRange,
) -> IngestSummary {
    let mut ingestor = Ingestor::new(store, tag, UpsertMode::Overwrite, config.ingest.parse_options());
    ingestor.count_scanned(items.len() as u64);

    for (idx, raw) in items.into_iter().enumerate() {
        let item_no = idx as u64 + 1;
        ingestor.count_candidate();

        let item: BatchItem = match serde_json::from_value(raw) {
            Ok(item) => item,
            Err(e) => {
                ingestor.record_error(item_no, "", &e);
                continue;
            }
        };

        match item_to_record(item, &mut ingestor) {
            Ok(record) => {
                if !bounds.contains(&record.code) {
                    let code = record.code.clone();
                    ingestor.record_skip(item_no, &code, "outside code range");
                    continue;
                }
                ingestor.upsert(record, item_no).await;
            }
            Err((code, e)) => ingestor.record_error(item_no, &code, &e),
        }
    }

    ingestor.finish()
}

fn scalar_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn item_to_record<S: TariffStore>(
    item: BatchItem,
    ingestor: &mut Ingestor<'_, S>,
) -> std::result::Result<TariffRecord, (String, anyhow::Error)> {
    let raw_code = scalar_text(item.code.as_ref());
    let code = normalize_code(&raw_code, ingestor.options().legacy_codes)
        .map_err(|e| (raw_code.clone(), anyhow::Error::new(e)))?;

    let description_primary = item
        .description_primary
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| (code.clone(), anyhow::anyhow!("missing required field: description_primary")))?;

    let placeholders = ingestor.options().placeholders.clone();
    let counts = ingestor.fallbacks_mut();
    let duty_rate = normalize_rate(&scalar_text(item.duty_rate.as_ref()), RateField::Duty, &placeholders, counts);
    let vat_rate = normalize_rate(&scalar_text(item.vat_rate.as_ref()), RateField::Vat, &placeholders, counts);
    let excise_rate = normalize_rate(
        &scalar_text(item.excise_rate.as_ref()),
        RateField::Excise,
        &placeholders,
        counts,
    );
    let certs_raw = match &item.required_certificates {
        Some(v @ Value::Array(_)) => v.to_string(),
        other => scalar_text(other.as_ref()),
    };
    let required_certificates = parse_certificates(&certs_raw, counts);

    let text = |s: Option<String>| s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

    Ok(TariffRecord {
        code,
        fields: TariffFields {
            description_primary,
            description_secondary: text(item.description_secondary),
            category: text(item.category),
            subcategory: text(item.subcategory),
            keywords: text(item.keywords),
            duty_rate,
            vat_rate,
            excise_rate,
            required_certificates,
            sources: Vec::new(),
        },
    })
}
