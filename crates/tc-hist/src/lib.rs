//! # tc-hist
//!
//! Binned statistical containers for angular correlation analyses.
//!
//! The crate provides:
//! - **Bin edge tables** ([`BinEdges`]) and histogram axes with
//!   underflow/overflow slots ([`Axis`]).
//! - **Statistical containers** ([`Histogram`]) of dimensionality 1 to 3
//!   with weighted fills, variance tracking, and elementwise arithmetic
//!   (add, divide, scale) with error propagation.
//! - **The projection engine** ([`project`] and the angular rebinnings
//!   [`mean_angle_map`], [`same_side_map`], [`pair_angle_map`]) reducing the
//!   3-D angular-difference distribution to 2-D views.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod axis;
pub mod histogram;
pub mod project;

pub use axis::{Axis, BinEdges};
pub use histogram::{Histogram, StatsMode};
pub use project::{Mode, Plane, mean_angle_map, pair_angle_map, project, same_side_map, wrap_dphi};
