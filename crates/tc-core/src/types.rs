//! Particle-candidate input contract.
//!
//! Candidates arrive from an external reconstruction framework; the engine
//! only ever borrows them. Kinematics are taken as given: transverse
//! momentum, azimuthal angle (radians, any range, no pre-wrapping assumed),
//! pseudorapidity, a structural kind tag, and a per-candidate
//! efficiency weight used as the fill weight.

use serde::{Deserialize, Serialize};

/// Structural kind of a candidate.
///
/// Replaces run-time type inspection on the candidate object: a neutral
/// two-photon decay candidate is trigger-eligible only when the analysis is
/// configured for it, and is never eligible as an associated particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    /// Reconstructed charged track.
    Track,
    /// Neutral-decay candidate (pi0-like).
    NeutralDecay,
}

/// One particle candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Candidate {
    /// Transverse momentum (GeV/c).
    pub pt: f64,
    /// Azimuthal angle (radians, unwrapped).
    pub phi: f64,
    /// Pseudorapidity.
    pub eta: f64,
    /// Structural kind tag.
    #[serde(default = "CandidateKind::track")]
    pub kind: CandidateKind,
    /// Efficiency correction weight (positive; applied on every fill).
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl CandidateKind {
    fn track() -> Self {
        CandidateKind::Track
    }
}

impl Candidate {
    /// Charged-track candidate with unit efficiency weight.
    pub fn track(pt: f64, phi: f64, eta: f64) -> Self {
        Self { pt, phi, eta, kind: CandidateKind::Track, weight: 1.0 }
    }

    /// Neutral-decay candidate with unit efficiency weight.
    pub fn neutral_decay(pt: f64, phi: f64, eta: f64) -> Self {
        Self { pt, phi, eta, kind: CandidateKind::NeutralDecay, weight: 1.0 }
    }

    /// Same candidate with an explicit efficiency weight.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Whether every field is usable as a fill input: finite kinematics and
    /// a positive, finite weight.
    pub fn is_valid(&self) -> bool {
        self.pt.is_finite()
            && self.phi.is_finite()
            && self.eta.is_finite()
            && self.weight.is_finite()
            && self.weight > 0.0
    }
}
