//! # tc-core
//!
//! Shared foundation for the tricorr workspace: the common error type,
//! the particle-candidate input contract, and the analysis configuration
//! with its token-stream parser.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod types;

pub use config::{AngularBinning, CollisionSystem, CorrelatorConfig, TriggerKind};
pub use error::{Error, Result};
pub use types::{Candidate, CandidateKind};
