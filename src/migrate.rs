use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Create the database and every table. Idempotent.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create any missing tables and indexes on an open pool.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    // Rates are canonical decimal text ("12.00"); lists are JSON arrays.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tariff_codes (
            code TEXT PRIMARY KEY CHECK (length(code) = 10),
            description_primary TEXT NOT NULL,
            description_secondary TEXT,
            category TEXT,
            subcategory TEXT,
            keywords TEXT,
            duty_rate TEXT NOT NULL DEFAULT '0.00',
            vat_rate TEXT NOT NULL DEFAULT '12.00',
            excise_rate TEXT NOT NULL DEFAULT '0.00',
            required_certificates TEXT NOT NULL DEFAULT '[]',
            sources TEXT NOT NULL DEFAULT '[]',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ingest_runs (
            id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            source_path TEXT NOT NULL,
            source_tag TEXT NOT NULL,
            started_at INTEGER NOT NULL,
            finished_at INTEGER NOT NULL,
            lines_scanned INTEGER NOT NULL,
            candidates INTEGER NOT NULL,
            created INTEGER NOT NULL,
            updated INTEGER NOT NULL,
            skipped INTEGER NOT NULL,
            errors INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tariff_codes_category ON tariff_codes(category)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_ingest_runs_started_at ON ingest_runs(started_at DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
