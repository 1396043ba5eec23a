//! # Tariff Ingest
//!
//! Batch loader for the national HS tariff nomenclature. Tab-separated
//! dumps, hand-curated JSON batches and printed nomenclatures (PDF or their
//! text copies) are reconciled by HS code into a SQLite store.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────────────────────┐   ┌──────────┐
//! │  Sources   │──▶│ classify ▸ parse ▸ normalize │──▶│  SQLite  │
//! │ TSV/JSON/  │   │        ▸ upsert              │   │ tariff_  │
//! │ PDF        │   │  (tariff-ingest-core)        │   │ codes    │
//! └────────────┘   └──────────────────────────────┘   └────┬─────┘
//!                                                          │
//!                                                     ┌────▼─────┐
//!                                                     │   CLI    │
//!                                                     │ (tifctl) │
//!                                                     └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! tifctl init                        # create database
//! tifctl load info.txt               # tab-separated dump
//! tifctl import-json batch.json      # curated batch
//! tifctl scan tif-tn-2022.pdf        # fill missing descriptions
//! tifctl get 8471301000
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |
//! | [`sqlite_store`] | SQLite `TariffStore` |
//! | [`source`] | Source reading, decoding and provenance tags |
//! | [`extract`] | PDF text extraction |
//! | [`ingest`] | Tab-separated load and run bookkeeping |
//! | [`batch_json`] | JSON batch import |
//! | [`scan`] | Layout scan of printed nomenclatures |
//! | [`stats`], [`get`], [`export`] | Store inspection |
//! | [`progress`], [`logging`] | Progress on stderr, tracing setup |

pub mod batch_json;
pub mod config;
pub mod db;
pub mod export;
pub mod extract;
pub mod get;
pub mod ingest;
pub mod logging;
pub mod migrate;
pub mod progress;
pub mod scan;
pub mod source;
pub mod sqlite_store;
pub mod stats;
