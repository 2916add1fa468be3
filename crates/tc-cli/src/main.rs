//! tricorr CLI

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod merge;
mod report;
mod run;

#[derive(Parser)]
#[command(name = "tricorr")]
#[command(about = "tricorr - triggered multi-particle angular correlation statistics")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Accumulate a JSONL event stream and assemble results
    Run {
        /// Input event stream (JSONL, one event record per line)
        #[arg(short, long)]
        events: PathBuf,

        /// Configuration token stream, e.g. "minTriggerPt=8 triggertype=tracks"
        #[arg(short, long, default_value = "")]
        config: String,

        /// Multiplicity bin edges, comma-separated ascending
        #[arg(long, default_value = "0,20,40,60,80,100")]
        mult_edges: String,

        /// Vertex-z bin edges, comma-separated ascending
        #[arg(long, default_value = "-10,-5,0,5,10", allow_hyphen_values = true)]
        vz_edges: String,

        /// Also write the accumulator snapshot here for a later merge
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Output file for assembled results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Scaling-variant label for the result group
        #[arg(long, default_value = "floor")]
        variant: String,
    },

    /// Fold accumulator snapshots into one
    Merge {
        /// Snapshot files to fold; the first is the base
        #[arg(required = true)]
        snapshots: Vec<PathBuf>,

        /// Output file for the merged snapshot
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Assemble results from an existing snapshot without re-running
    Report {
        /// Accumulator snapshot (from `run --snapshot` or `merge`)
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Output file for assembled results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Scaling-variant label for the result group
        #[arg(long, default_value = "floor")]
        variant: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::Run {
            events,
            config,
            mult_edges,
            vz_edges,
            snapshot,
            output,
            variant,
        } => run::cmd_run(
            &events,
            &config,
            &mult_edges,
            &vz_edges,
            snapshot.as_ref(),
            output.as_ref(),
            &variant,
        ),
        Commands::Merge { snapshots, output } => merge::cmd_merge(&snapshots, &output),
        Commands::Report {
            snapshot,
            output,
            variant,
        } => report::cmd_report(&snapshot, output.as_ref(), &variant),
    }
}

/// Pretty-print a serializable value to `output`, or stdout when absent.
pub(crate) fn write_json(output: Option<&PathBuf>, value: &impl serde::Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => std::fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(())
}
