//! `tricorr report`: assemble results from a saved snapshot.

use anyhow::{Context, Result};
use std::path::PathBuf;

use tc_corr::store::ResultStore;
use tc_corr::{Snapshot, assemble};

pub fn cmd_report(snapshot: &PathBuf, output: Option<&PathBuf>, variant: &str) -> Result<()> {
    let pair = Snapshot::load(snapshot)
        .with_context(|| format!("loading {}", snapshot.display()))?
        .into_pair();
    let results = assemble(&pair, variant)?;
    tracing::info!(bins = results.bins.len(), variant, "results assembled");

    let mut store = ResultStore::new();
    store.insert(results);
    crate::write_json(output, &store)
}
