use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use tariff_ingest_core::code::LegacyCodePolicy;
use tariff_ingest_core::parse::ParseOptions;
use tariff_ingest_core::rates::Placeholders;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_file")]
    pub default_file: PathBuf,
    /// Label for provenance tags; the source file name when unset.
    #[serde(default)]
    pub source_tag: Option<String>,
    #[serde(default)]
    pub legacy_codes: LegacyCodePolicy,
    /// Extra non-numeric rate placeholders, on top of the built-in ones.
    #[serde(default)]
    pub placeholders: Vec<String>,
    #[serde(default = "default_progress_every")]
    pub progress_every: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            default_file: default_file(),
            source_tag: None,
            legacy_codes: LegacyCodePolicy::default(),
            placeholders: Vec::new(),
            progress_every: default_progress_every(),
        }
    }
}

fn default_file() -> PathBuf {
    PathBuf::from("info.txt")
}
fn default_progress_every() -> u64 {
    500
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}

fn default_level() -> String {
    "warn".to_string()
}
fn default_format() -> String {
    "text".to_string()
}

impl Config {
    /// Built-in defaults, used when no config file exists.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/tariff.sqlite"),
            },
            ingest: IngestConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl IngestConfig {
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            placeholders: Placeholders::with_extra(&self.placeholders),
            legacy_codes: self.legacy_codes,
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.ingest.progress_every == 0 {
        anyhow::bail!("ingest.progress_every must be > 0");
    }

    match config.logging.format.as_str() {
        "text" | "json" => {}
        other => anyhow::bail!(
            "Unknown logging format: '{}'. Must be text or json.",
            other
        ),
    }

    Ok(config)
}

/// Load `path`, or fall back to [`Config::minimal`] when `path` is the
/// default location and nothing is there.
pub fn load_or_default(path: &Path, is_default_path: bool) -> Result<Config> {
    if is_default_path && !path.exists() {
        return Ok(Config::minimal());
    }
    load_config(path)
}
