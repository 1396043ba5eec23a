//! In-memory [`TariffStore`] implementation for tests and dry runs.
//!
//! Uses a `BTreeMap` behind `std::sync::RwLock`, so iteration is ordered
//! by code like the SQLite export.

use std::collections::BTreeMap;
use std::sync::RwLock;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::models::{TariffFields, TariffRecord};

use super::TariffStore;

/// In-memory store keyed by HS code.
pub struct InMemoryStore {
    records: RwLock<BTreeMap<String, TariffFields>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
        }
    }

    /// All records, ordered by code.
    pub fn snapshot(&self) -> Result<Vec<TariffRecord>> {
        let records = self.records.read().map_err(|_| anyhow!("store lock poisoned"))?;
        Ok(records
            .iter()
            .map(|(code, fields)| TariffRecord {
                code: code.clone(),
                fields: fields.clone(),
            })
            .collect())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TariffStore for InMemoryStore {
    async fn find_by_code(&self, code: &str) -> Result<Option<TariffRecord>> {
        let records = self.records.read().map_err(|_| anyhow!("store lock poisoned"))?;
        Ok(records.get(code).map(|fields| TariffRecord {
            code: code.to_string(),
            fields: fields.clone(),
        }))
    }

    async fn insert(&self, record: &TariffRecord) -> Result<TariffRecord> {
        let mut records = self.records.write().map_err(|_| anyhow!("store lock poisoned"))?;
        if records.contains_key(&record.code) {
            bail!("duplicate code: {}", record.code);
        }
        records.insert(record.code.clone(), record.fields.clone());
        Ok(record.clone())
    }

    async fn update(&self, code: &str, fields: &TariffFields) -> Result<TariffRecord> {
        let mut records = self.records.write().map_err(|_| anyhow!("store lock poisoned"))?;
        let slot = records
            .get_mut(code)
            .ok_or_else(|| anyhow!("code not found: {}", code))?;
        *slot = fields.clone();
        Ok(TariffRecord {
            code: code.to_string(),
            fields: fields.clone(),
        })
    }

    async fn count(&self) -> Result<u64> {
        let records = self.records.read().map_err(|_| anyhow!("store lock poisoned"))?;
        Ok(records.len() as u64)
    }
}
