//! `tricorr merge`: fold worker snapshots into one.

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::path::PathBuf;

use tc_corr::Snapshot;

pub fn cmd_merge(snapshots: &[PathBuf], output: &PathBuf) -> Result<()> {
    let (first, rest) = snapshots
        .split_first()
        .context("merge needs at least one snapshot")?;
    let mut base = Snapshot::load(first)
        .with_context(|| format!("loading {}", first.display()))?
        .into_pair();

    let peers = rest
        .par_iter()
        .map(|path| Snapshot::load(path).with_context(|| format!("loading {}", path.display())))
        .collect::<Result<Vec<Snapshot>>>()?;

    let addressing = base.same.registry().addressing();
    for (path, snap) in rest.iter().zip(peers) {
        let pair = snap.into_pair();
        if pair.same.registry().addressing() != addressing {
            tracing::warn!(path = %path.display(), "skipping snapshot with incompatible binning");
            continue;
        }
        base.merge_from([&pair]);
    }

    Snapshot::of(&base).save(output)?;
    tracing::info!(path = %output.display(), count = snapshots.len(), "merged snapshot written");
    Ok(())
}
