//! Serialized artifacts: the result store and accumulator snapshots.
//!
//! Both artifacts are deterministic JSON: struct fields serialize in
//! definition order and variant groups are kept in a sorted map, so two
//! identical states produce byte-identical files.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tc_core::Result;

use crate::assembler::Results;
use crate::correlator::CorrelationPair;

/// Current artifact schema version.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// The on-disk result tree: one [`Results`] group per scaling-variant
/// label, each holding the per-bin `bin_stats` / `same_event` /
/// `mixed_event` / `divided` views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultStore {
    /// Schema version for forward compatibility.
    pub schema_version: String,
    /// Assembled results keyed by variant label.
    pub variants: BTreeMap<String, Results>,
}

impl Default for ResultStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultStore {
    /// Empty store at the current schema version.
    pub fn new() -> Self {
        Self {
            schema_version: SCHEMA_VERSION.into(),
            variants: BTreeMap::new(),
        }
    }

    /// Insert an assembled result tree under its variant label.
    pub fn insert(&mut self, results: Results) {
        self.variants.insert(results.variant.clone(), results);
    }

    /// Look up one variant group.
    pub fn get(&self, variant: &str) -> Option<&Results> {
        self.variants.get(variant)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the store to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Read a store back from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}

/// Serialized accumulator-pair state, the unit of the merge workflow:
/// workers snapshot their pair, a later merge step folds the snapshots and
/// assembles results once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Schema version for forward compatibility.
    pub schema_version: String,
    /// The accumulator pair state.
    pub pair: CorrelationPair,
}

impl Snapshot {
    /// Snapshot the current state of an accumulator pair.
    pub fn of(pair: &CorrelationPair) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.into(),
            pair: pair.clone(),
        }
    }

    /// Recover the accumulator pair.
    pub fn into_pair(self) -> CorrelationPair {
        self.pair
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the snapshot to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Read a snapshot back from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}
