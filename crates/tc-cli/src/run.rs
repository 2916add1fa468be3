//! `tricorr run`: event-stream accumulation.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use tc_core::{Candidate, CorrelatorConfig};
use tc_corr::store::ResultStore;
use tc_corr::{CorrelationPair, Correlator, Snapshot, assemble};
use tc_hist::BinEdges;

/// Which accumulator half an event record feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Sample {
    /// A genuine event: all candidates from the same event.
    #[default]
    Same,
    /// An event-mixed combination built by the upstream mixing pool.
    Mixed,
}

/// One line of the JSONL event stream.
#[derive(Debug, Deserialize)]
struct EventRecord {
    /// Event multiplicity or centrality percentile.
    mult: f64,
    /// Reconstructed vertex z position.
    vz: f64,
    #[serde(default)]
    sample: Sample,
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default)]
struct StreamStats {
    accepted: u64,
    out_of_range: u64,
    malformed: u64,
    invalid_candidates: u64,
}

pub fn cmd_run(
    events: &PathBuf,
    config_tokens: &str,
    mult_csv: &str,
    vz_csv: &str,
    snapshot_out: Option<&PathBuf>,
    output: Option<&PathBuf>,
    variant: &str,
) -> Result<()> {
    let config = CorrelatorConfig::from_tokens(config_tokens);
    let mult_edges = parse_edges("multiplicity", mult_csv)?;
    let vz_edges = parse_edges("vertex", vz_csv)?;
    let mut pair = CorrelationPair::new("tricorr", config, mult_edges, vz_edges)?;

    tracing::info!(path = %events.display(), "reading event stream");
    let reader = BufReader::new(File::open(events).with_context(|| format!("opening {}", events.display()))?);
    let mut stats = StreamStats::default();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: EventRecord = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(line = lineno + 1, %err, "skipping malformed event record");
                stats.malformed += 1;
                continue;
            }
        };
        let target = match record.sample {
            Sample::Same => &mut pair.same,
            Sample::Mixed => &mut pair.mixed,
        };
        process_event(target, &record, &mut stats)?;
    }
    tracing::info!(
        events = stats.accepted,
        out_of_range = stats.out_of_range,
        malformed = stats.malformed,
        invalid_candidates = stats.invalid_candidates,
        "stream accumulated"
    );

    if let Some(path) = snapshot_out {
        Snapshot::of(&pair).save(path)?;
        tracing::info!(path = %path.display(), "snapshot written");
    }

    let mut store = ResultStore::new();
    store.insert(assemble(&pair, variant)?);
    crate::write_json(output, &store)
}

/// Feed one event's candidates through the documented accumulator
/// interface: establish the bin context, vet and record every candidate,
/// then run the trigger-nested pair and triplet fills with the product of
/// the efficiency weights.
fn process_event(
    correlator: &mut Correlator,
    record: &EventRecord,
    stats: &mut StreamStats,
) -> Result<()> {
    if correlator.set_mult_vz(record.mult, record.vz).is_err() {
        stats.out_of_range += 1;
        return Ok(());
    }
    let mut triggers: Vec<Candidate> = Vec::new();
    let mut associated: Vec<Candidate> = Vec::new();
    for cand in &record.candidates {
        if !cand.is_valid() {
            stats.invalid_candidates += 1;
            continue;
        }
        if correlator.check_trigger(cand, true)? {
            triggers.push(*cand);
        }
        if correlator.check_associated(cand, true)? {
            associated.push(*cand);
        }
    }
    for t in &triggers {
        correlator.fill_trigger(t)?;
        for (i, a1) in associated.iter().enumerate() {
            correlator.fill_pair(Some(t), Some(a1), t.weight * a1.weight)?;
            for a2 in &associated[i + 1..] {
                correlator.fill_triplet(
                    Some(t),
                    Some(a1),
                    Some(a2),
                    t.weight * a1.weight * a2.weight,
                )?;
                correlator.fill_assoc_pair(Some(a1), Some(a2), a1.weight * a2.weight)?;
            }
        }
    }
    stats.accepted += 1;
    Ok(())
}

fn parse_edges(label: &str, csv: &str) -> Result<BinEdges> {
    let values = csv
        .split(',')
        .map(|tok| {
            tok.trim()
                .parse::<f64>()
                .with_context(|| format!("bad {label} edge '{}'", tok.trim()))
        })
        .collect::<Result<Vec<f64>>>()?;
    BinEdges::new(values).with_context(|| format!("invalid {label} edges '{csv}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_parse_and_validate() {
        let e = parse_edges("multiplicity", "0, 20,40").unwrap();
        assert_eq!(e.as_slice(), &[0.0, 20.0, 40.0]);
        assert!(parse_edges("multiplicity", "0,oops").is_err());
        assert!(parse_edges("multiplicity", "5,1").is_err());
    }

    #[test]
    fn event_records_default_to_same_sample() {
        let record: EventRecord =
            serde_json::from_str(r#"{"mult": 10.0, "vz": 1.0}"#).unwrap();
        assert_eq!(record.sample, Sample::Same);
        assert!(record.candidates.is_empty());

        let record: EventRecord = serde_json::from_str(
            r#"{"mult": 10.0, "vz": 1.0, "sample": "mixed", "candidates": [{"pt": 9.0, "phi": 0.1, "eta": 0.0}]}"#,
        )
        .unwrap();
        assert_eq!(record.sample, Sample::Mixed);
        assert_eq!(record.candidates.len(), 1);
    }
}
