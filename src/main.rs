//! # Tariff ingest CLI (`tifctl`)
//!
//! ## Usage
//!
//! ```bash
//! tifctl --config ./config/tifctl.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tifctl init` | Create the SQLite database and tables |
//! | `tifctl load [PATH]` | Ingest a tab-separated dump |
//! | `tifctl import-json <PATH>` | Ingest a JSON batch |
//! | `tifctl scan <PATH>` | Fill descriptions from a printed nomenclature (PDF or text) |
//! | `tifctl stats` | Show store statistics and recent runs |
//! | `tifctl get <CODE>` | Show one record |
//! | `tifctl export` | Dump every record as JSON |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use tariff_ingest::batch_json::{self, ImportOptions};
use tariff_ingest::config;
use tariff_ingest::ingest::{self, LoadOptions};
use tariff_ingest::logging;
use tariff_ingest::migrate;
use tariff_ingest::progress::ProgressMode;
use tariff_ingest::{export, get, scan, stats};

const DEFAULT_CONFIG: &str = "./config/tifctl.toml";

/// Batch loader for the HS tariff nomenclature.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. Built-in defaults apply when the default path does not exist.
#[derive(Parser)]
#[command(name = "tifctl", version, about = "Batch loader for the HS tariff nomenclature")]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Progress on stderr: auto (human when stderr is a TTY), off, human, json.
    #[arg(long, global = true, value_enum, default_value = "auto")]
    progress: ProgressMode,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and its tables. Running it
    /// again is safe.
    Init,

    /// Ingest a tab-separated tariff dump.
    Load {
        /// Source file; `[ingest].default_file` when omitted.
        path: Option<PathBuf>,

        /// Parse everything against an in-memory store; write nothing.
        #[arg(long)]
        dry_run: bool,

        /// Stop after this many candidate lines.
        #[arg(long)]
        limit: Option<u64>,

        /// Provenance label (overrides `[ingest].source_tag`).
        #[arg(long)]
        tag: Option<String>,
    },

    /// Ingest a JSON array of tariff objects.
    ImportJson {
        path: PathBuf,

        /// Skip items with a code below this one.
        #[arg(long)]
        from: Option<String>,

        /// Skip items with a code above this one.
        #[arg(long)]
        to: Option<String>,

        #[arg(long)]
        dry_run: bool,
    },

    /// Fill missing descriptions from a printed nomenclature (PDF or text dump).
    ///
    /// Unknown codes are created with default rates; known codes keep
    /// their existing descriptions and rates.
    Scan {
        path: PathBuf,

        #[arg(long)]
        dry_run: bool,
    },

    /// Show record counts, code range and recent runs.
    Stats,

    /// Show one record by HS code.
    Get {
        code: String,

        /// Print the record as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Export every record as a JSON array, ordered by code.
    Export {
        /// Output file (stdout when omitted).
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let is_default = cli.config.as_os_str() == DEFAULT_CONFIG;
    let cfg = config::load_or_default(&cli.config, is_default)?;
    logging::init_logging(&cfg.logging);

    let progress = cli.progress.reporter();

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Load {
            path,
            dry_run,
            limit,
            tag,
        } => {
            let opts = LoadOptions {
                path,
                dry_run,
                limit,
                tag,
            };
            ingest::run_load(&cfg, opts, progress.as_ref()).await?;
        }
        Commands::ImportJson {
            path,
            from,
            to,
            dry_run,
        } => {
            let opts = ImportOptions { from, to, dry_run };
            batch_json::run_import_json(&cfg, &path, opts).await?;
        }
        Commands::Scan { path, dry_run } => {
            scan::run_scan(&cfg, &path, dry_run, progress.as_ref()).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Get { code, json } => {
            get::run_get(&cfg, &code, json).await?;
        }
        Commands::Export { output } => {
            export::run_export(&cfg, output.as_deref()).await?;
        }
    }

    Ok(())
}
