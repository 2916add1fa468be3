//! # tc-corr
//!
//! Multi-particle angular correlation accumulation with mixed-event
//! normalization.
//!
//! The crate provides:
//! - **Container addressing and the registry** ([`registry`]): typed keys
//!   mapping (quantity kind, multiplicity bin, vertex bin) to exclusive
//!   container slots, with a misfill counter absorbing out-of-range fills.
//! - **The accumulator** ([`correlator`]): per-event bin context, candidate
//!   selection, two- and three-particle fills, and peer merging.
//! - **Result assembly** ([`assembler`]): per-bin projections of the 3-D
//!   correlation, mixed-event peak normalization, and signal/background
//!   division.
//! - **Artifacts** ([`store`]): serializable snapshots of accumulator state
//!   and the final result tree.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod assembler;
pub mod correlator;
pub mod registry;
pub mod store;

pub use assembler::{BinGroup, CorrelationViews, Results, assemble};
pub use correlator::{CorrelationPair, Correlator, EventBins};
pub use registry::{Addressing, BinnedKind, GlobalKind, HistKey, Registry};
pub use store::Snapshot;
