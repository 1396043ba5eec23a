//! # tariff-ingest core
//!
//! Runtime-free logic for tariff-ingest: the tariff record model, the
//! line classifier, record parser and rate normalizer for tab-separated
//! tariff dumps, the layout scanner for printed nomenclatures, the store
//! abstraction, and the upsert coordinator.
//!
//! This crate contains no tokio, sqlx, or filesystem I/O.
//!
//! ```text
//! line ─▶ classify ─▶ parse ─▶ rates ─▶ upsert ─▶ TariffStore
//! ```

pub mod classify;
pub mod code;
pub mod layout;
pub mod models;
pub mod parse;
pub mod rates;
pub mod store;
pub mod upsert;
