//! Persisted normalizer state.

use crate::error::StoreError;
use crate::group::GroupId;
use crate::normalizer::Normalizer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

/// Everything needed to resume a normalizer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizerRecord {
    pub dimension: usize,
    pub group_of: Vec<GroupId>,
    pub count: u64,
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

/// Named records, one per observation/goal/action stream.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsStore {
    normalizers: BTreeMap<String, NormalizerRecord>,
}

impl StatsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Saves `normalizer` under its own name, replacing any earlier record.
    pub fn insert(&mut self, normalizer: &Normalizer) {
        self.normalizers
            .insert(normalizer.name().to_owned(), normalizer.save());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&NormalizerRecord> {
        self.normalizers.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.normalizers.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.normalizers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.normalizers.is_empty()
    }

    /// Loads the record stored under `normalizer`'s name, if any.
    /// Returns whether a record was found.
    ///
    /// # Errors
    ///
    /// [`StoreError::Normalizer`] if the record does not fit.
    pub fn restore(&self, normalizer: &mut Normalizer) -> Result<bool, StoreError> {
        let Some(record) = self.normalizers.get(normalizer.name()) else {
            return Ok(false);
        };
        normalizer
            .load(record)
            .map_err(|source| StoreError::Normalizer {
                name: normalizer.name().to_owned(),
                source,
            })?;
        Ok(true)
    }

    /// # Errors
    ///
    /// I/O failures or malformed JSON.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let store: Self = serde_json::from_str(&text)?;
        info!("Read {} normalizer records from {:?}", store.len(), path);
        Ok(store)
    }

    /// # Errors
    ///
    /// I/O failures.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Wrote {} normalizer records to {:?}", self.len(), path);
        Ok(())
    }
}
