//! Record lookup by code (`tifctl get`).

use anyhow::{bail, Result};

use tariff_ingest_core::code::normalize_code;
use tariff_ingest_core::models::TariffRecord;
use tariff_ingest_core::store::TariffStore;

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::sqlite_store::SqliteStore;

/// Look up one record. `raw_code` goes through the legacy code policy, so
/// `84713010` finds `8471301000` under `pad`.
pub async fn get_record(config: &Config, raw_code: &str) -> Result<TariffRecord> {
    let code = normalize_code(raw_code, config.ingest.legacy_codes)?;

    let pool = db::connect(config).await?;
    migrate::apply_schema(&pool).await?;
    let store = SqliteStore::new(pool);
    let found = store.find_by_code(&code).await;
    store.close().await;

    match found? {
        Some(record) => Ok(record),
        None => bail!("code not found: {}", code),
    }
}

pub async fn run_get(config: &Config, raw_code: &str, json: bool) -> Result<()> {
    let record = get_record(config, raw_code).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    let f = &record.fields;
    let opt = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());

    println!("--- {} ---", record.code);
    println!("description:   {}", f.description_primary);
    println!("secondary:     {}", opt(&f.description_secondary));
    println!("category:      {}", opt(&f.category));
    println!("subcategory:   {}", opt(&f.subcategory));
    println!("keywords:      {}", opt(&f.keywords));
    println!("duty:          {}%", f.duty_rate);
    println!("vat:           {}%", f.vat_rate);
    println!("excise:        {}%", f.excise_rate);
    if f.required_certificates.is_empty() {
        println!("certificates:  -");
    } else {
        println!("certificates:");
        for cert in &f.required_certificates {
            println!("  - {}", cert);
        }
    }
    println!("sources:       {}", f.sources.join(", "));

    Ok(())
}
