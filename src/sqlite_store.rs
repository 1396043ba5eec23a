//! SQLite-backed [`TariffStore`] implementation.
//!
//! Rates are stored as canonical decimal text and lists as JSON text, so
//! every value read back is exactly what was normalized on the way in.

use std::str::FromStr;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use tariff_ingest_core::models::{TariffFields, TariffRecord};
use tariff_ingest_core::store::TariffStore;

const SELECT_COLUMNS: &str = "code, description_primary, description_secondary, category, \
     subcategory, keywords, duty_rate, vat_rate, excise_rate, required_certificates, sources";

/// SQLite implementation of the [`TariffStore`] trait over the
/// `tariff_codes` table.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Every record, ordered by code.
    pub async fn list_all(&self) -> Result<Vec<TariffRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM tariff_codes ORDER BY code",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_record).collect()
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

fn decimal_column(row: &SqliteRow, column: &str) -> Result<Decimal> {
    let raw: String = row.get(column);
    Decimal::from_str(&raw).with_context(|| format!("bad {} value in store: {}", column, raw))
}

fn list_column(row: &SqliteRow, column: &str) -> Result<Vec<String>> {
    let raw: String = row.get(column);
    serde_json::from_str(&raw).with_context(|| format!("bad {} value in store: {}", column, raw))
}

fn row_to_record(row: &SqliteRow) -> Result<TariffRecord> {
    Ok(TariffRecord {
        code: row.get("code"),
        fields: TariffFields {
            description_primary: row.get("description_primary"),
            description_secondary: row.get("description_secondary"),
            category: row.get("category"),
            subcategory: row.get("subcategory"),
            keywords: row.get("keywords"),
            duty_rate: decimal_column(row, "duty_rate")?,
            vat_rate: decimal_column(row, "vat_rate")?,
            excise_rate: decimal_column(row, "excise_rate")?,
            required_certificates: list_column(row, "required_certificates")?,
            sources: list_column(row, "sources")?,
        },
    })
}

#[async_trait]
impl TariffStore for SqliteStore {
    async fn find_by_code(&self, code: &str) -> Result<Option<TariffRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM tariff_codes WHERE code = ?",
            SELECT_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn insert(&self, record: &TariffRecord) -> Result<TariffRecord> {
        let f = &record.fields;
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO tariff_codes (code, description_primary, description_secondary,
                                      category, subcategory, keywords,
                                      duty_rate, vat_rate, excise_rate,
                                      required_certificates, sources,
                                      created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.code)
        .bind(&f.description_primary)
        .bind(&f.description_secondary)
        .bind(&f.category)
        .bind(&f.subcategory)
        .bind(&f.keywords)
        .bind(f.duty_rate.to_string())
        .bind(f.vat_rate.to_string())
        .bind(f.excise_rate.to_string())
        .bind(serde_json::to_string(&f.required_certificates)?)
        .bind(serde_json::to_string(&f.sources)?)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .with_context(|| format!("insert {}", record.code))?;

        Ok(record.clone())
    }

    async fn update(&self, code: &str, fields: &TariffFields) -> Result<TariffRecord> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            UPDATE tariff_codes SET
                description_primary = ?,
                description_secondary = ?,
                category = ?,
                subcategory = ?,
                keywords = ?,
                duty_rate = ?,
                vat_rate = ?,
                excise_rate = ?,
                required_certificates = ?,
                sources = ?,
                updated_at = ?
            WHERE code = ?
            "#,
        )
        .bind(&fields.description_primary)
        .bind(&fields.description_secondary)
        .bind(&fields.category)
        .bind(&fields.subcategory)
        .bind(&fields.keywords)
        .bind(fields.duty_rate.to_string())
        .bind(fields.vat_rate.to_string())
        .bind(fields.excise_rate.to_string())
        .bind(serde_json::to_string(&fields.required_certificates)?)
        .bind(serde_json::to_string(&fields.sources)?)
        .bind(now)
        .bind(code)
        .execute(&self.pool)
        .await
        .with_context(|| format!("update {}", code))?;

        if result.rows_affected() == 0 {
            bail!("code not found: {}", code);
        }

        Ok(TariffRecord {
            code: code.to_string(),
            fields: fields.clone(),
        })
    }

    async fn count(&self) -> Result<u64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tariff_codes")
            .fetch_one(&self.pool)
            .await?;
        Ok(n as u64)
    }
}
