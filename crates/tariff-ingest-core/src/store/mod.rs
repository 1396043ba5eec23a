//! Storage abstraction for tariff records.
//!
//! The [`TariffStore`] trait is the whole surface the upsert coordinator
//! needs from persistence. Schema, transactions and indexing belong to the
//! implementation (SQLite in the CLI crate, [`memory::InMemoryStore`] for
//! tests and dry runs).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{TariffFields, TariffRecord};

/// Abstract tariff-record store keyed by HS code.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`find_by_code`](TariffStore::find_by_code) | Look up a record by its unique code |
/// | [`insert`](TariffStore::insert) | Store a record whose code is not yet present |
/// | [`update`](TariffStore::update) | Overwrite the fields of an existing record |
/// | [`count`](TariffStore::count) | Number of stored records |
#[async_trait]
pub trait TariffStore: Send + Sync {
    async fn find_by_code(&self, code: &str) -> Result<Option<TariffRecord>>;

    /// Insert a new record. Fails if the code already exists.
    async fn insert(&self, record: &TariffRecord) -> Result<TariffRecord>;

    /// Replace every field of the record stored under `code`.
    ///
    /// Fails if no such record exists.
    async fn update(&self, code: &str, fields: &TariffFields) -> Result<TariffRecord>;

    async fn count(&self) -> Result<u64>;
}
