//! Store statistics (`tifctl stats`).
//!
//! A quick look at what is loaded: record count, code range, per-chapter
//! breakdown, and the latest ingest runs with their counts.

use anyhow::Result;
use sqlx::Row;

use crate::config::Config;
use crate::db;
use crate::migrate;

/// Number of recent runs listed.
const RECENT_RUNS: i64 = 5;

struct RunRow {
    kind: String,
    source_tag: String,
    finished_at: i64,
    created: i64,
    updated: i64,
    skipped: i64,
    errors: i64,
}

pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::apply_schema(&pool).await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tariff_codes")
        .fetch_one(&pool)
        .await?;

    let range = sqlx::query("SELECT MIN(code) AS first, MAX(code) AS last FROM tariff_codes")
        .fetch_one(&pool)
        .await?;
    let first: Option<String> = range.get("first");
    let last: Option<String> = range.get("last");

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Tariff store");
    println!("============");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Codes:       {}", total);
    if let (Some(first), Some(last)) = (first, last) {
        println!("  Range:       {} .. {}", first, last);
    }

    let chapter_rows = sqlx::query(
        r#"
        SELECT substr(code, 1, 2) AS chapter, COUNT(*) AS n
        FROM tariff_codes
        GROUP BY chapter
        ORDER BY chapter
        "#,
    )
    .fetch_all(&pool)
    .await?;

    if !chapter_rows.is_empty() {
        println!();
        println!("  By chapter:");
        for row in &chapter_rows {
            let chapter: String = row.get("chapter");
            let n: i64 = row.get("n");
            println!("    {}  {:>6}", chapter, n);
        }
    }

    let run_rows = sqlx::query(
        r#"
        SELECT kind, source_tag, finished_at, created, updated, skipped, errors
        FROM ingest_runs
        ORDER BY started_at DESC, finished_at DESC
        LIMIT ?
        "#,
    )
    .bind(RECENT_RUNS)
    .fetch_all(&pool)
    .await?;

    let runs: Vec<RunRow> = run_rows
        .iter()
        .map(|row| RunRow {
            kind: row.get("kind"),
            source_tag: row.get("source_tag"),
            finished_at: row.get("finished_at"),
            created: row.get("created"),
            updated: row.get("updated"),
            skipped: row.get("skipped"),
            errors: row.get("errors"),
        })
        .collect();

    if !runs.is_empty() {
        println!();
        println!("  Recent runs:");
        println!(
            "  {:<5} {:<32} {:>7} {:>7} {:>7} {:>6}   {}",
            "KIND", "TAG", "CREATED", "UPDATED", "SKIPPED", "ERRORS", "FINISHED"
        );
        println!("  {}", "-".repeat(84));
        for r in &runs {
            println!(
                "  {:<5} {:<32} {:>7} {:>7} {:>7} {:>6}   {}",
                r.kind,
                r.source_tag,
                r.created,
                r.updated,
                r.skipped,
                r.errors,
                format_ts_relative(r.finished_at)
            );
        }
    }

    println!();

    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// "3 hours ago", falling back to an absolute time past a month.
fn format_ts_relative(ts: i64) -> String {
    let delta = chrono::Utc::now().timestamp() - ts;

    if delta < 0 {
        format_ts_iso(ts)
    } else if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
