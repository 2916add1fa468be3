//! Container addressing and the histogram registry.
//!
//! Every statistical container of one accumulator lives in a single
//! pre-sized vector. Slot arithmetic is a pure function of the binning
//! configuration: the global diagnostics come first, then one block of
//! [`KINDS_PER_BIN`] containers per (multiplicity, vertex) bin, and the
//! final slot is the misfill counter that absorbs fills targeting an
//! invalid address.

use std::f64::consts::PI;

use log::warn;
use serde::{Deserialize, Serialize};
use tc_core::{CorrelatorConfig, Error, Result};
use tc_hist::{Axis, BinEdges, Histogram};

/// Number of global (not event-bin-resolved) containers.
pub const GLOBAL_OFFSET: usize = 8;

/// Number of container kinds tracked per (multiplicity, vertex) bin.
pub const KINDS_PER_BIN: usize = 14;

/// Containers kept once per accumulator, independent of the event bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalKind {
    /// Multiplicity vs vertex position of every offered event.
    MultVsVz,
    /// Resolved (multiplicity bin, vertex bin) pairs; invalid resolutions
    /// land in the underflow slots.
    MultBinVsVzBin,
    /// Trigger pt spectrum over all bins.
    TriggerPt,
    /// Trigger azimuth spectrum over all bins.
    TriggerPhi,
    /// Trigger pseudorapidity spectrum over all bins.
    TriggerEta,
    /// Associated pt spectrum over all bins.
    AssociatedPt,
    /// Associated azimuth spectrum over all bins.
    AssociatedPhi,
    /// Associated pseudorapidity spectrum over all bins.
    AssociatedEta,
}

impl GlobalKind {
    const ALL: [GlobalKind; GLOBAL_OFFSET] = [
        GlobalKind::MultVsVz,
        GlobalKind::MultBinVsVzBin,
        GlobalKind::TriggerPt,
        GlobalKind::TriggerPhi,
        GlobalKind::TriggerEta,
        GlobalKind::AssociatedPt,
        GlobalKind::AssociatedPhi,
        GlobalKind::AssociatedEta,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Containers kept once per (multiplicity, vertex) bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinnedKind {
    /// Combined trigger+associated pt spectrum.
    Pt,
    /// Combined azimuth spectrum.
    Phi,
    /// Combined pseudorapidity spectrum.
    Eta,
    /// Trigger pt spectrum.
    TriggerPt,
    /// Trigger azimuth spectrum.
    TriggerPhi,
    /// Trigger pseudorapidity spectrum.
    TriggerEta,
    /// Associated pt spectrum.
    AssociatedPt,
    /// Associated azimuth spectrum.
    AssociatedPhi,
    /// Associated pseudorapidity spectrum.
    AssociatedEta,
    /// Accepted-trigger count (normalization denominator).
    TriggerCount,
    /// Trigger-associated Δφ vs Δη (two-particle view).
    PhiEta,
    /// Associated-pair Δφ vs Δη.
    PhiEtaAssoc,
    /// The 3-D (Δη12, Δφ1, Δφ2) correlation.
    PhiPhiEta,
    /// Once-per-resolved-event counter (addressing QA).
    EventCount,
}

impl BinnedKind {
    /// All kinds in slot order.
    pub const ALL: [BinnedKind; KINDS_PER_BIN] = [
        BinnedKind::Pt,
        BinnedKind::Phi,
        BinnedKind::Eta,
        BinnedKind::TriggerPt,
        BinnedKind::TriggerPhi,
        BinnedKind::TriggerEta,
        BinnedKind::AssociatedPt,
        BinnedKind::AssociatedPhi,
        BinnedKind::AssociatedEta,
        BinnedKind::TriggerCount,
        BinnedKind::PhiEta,
        BinnedKind::PhiEtaAssoc,
        BinnedKind::PhiPhiEta,
        BinnedKind::EventCount,
    ];

    fn index(self) -> usize {
        self as usize
    }

    pub(crate) fn base_name(self) -> &'static str {
        match self {
            BinnedKind::Pt => "pt",
            BinnedKind::Phi => "phi",
            BinnedKind::Eta => "eta",
            BinnedKind::TriggerPt => "trigger_pt",
            BinnedKind::TriggerPhi => "trigger_phi",
            BinnedKind::TriggerEta => "trigger_eta",
            BinnedKind::AssociatedPt => "associated_pt",
            BinnedKind::AssociatedPhi => "associated_phi",
            BinnedKind::AssociatedEta => "associated_eta",
            BinnedKind::TriggerCount => "trigger_count",
            BinnedKind::PhiEta => "dphi_deta",
            BinnedKind::PhiEtaAssoc => "dphi_deta_assoc",
            BinnedKind::PhiPhiEta => "dphi1_dphi2_deta12",
            BinnedKind::EventCount => "event_count",
        }
    }
}

/// Typed address of one container in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistKey {
    /// A global container.
    Global(GlobalKind),
    /// A container of one (multiplicity, vertex) bin.
    Binned {
        /// Container kind within the bin block.
        kind: BinnedKind,
        /// Multiplicity bin index.
        mult_bin: usize,
        /// Vertex bin index.
        vz_bin: usize,
    },
    /// The misfill counter.
    Misfill,
}

/// Pure slot arithmetic for the container registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Addressing {
    /// Number of multiplicity bins.
    pub n_mult: usize,
    /// Number of vertex bins.
    pub n_vz: usize,
}

impl Addressing {
    /// Total number of slots including globals and the misfill counter.
    pub fn total_slots(&self) -> usize {
        GLOBAL_OFFSET + KINDS_PER_BIN * self.n_mult * self.n_vz + 1
    }

    /// Slot of the misfill counter (always the last).
    pub fn misfill_slot(&self) -> usize {
        self.total_slots() - 1
    }

    /// Resolve a key to its slot. `None` for bin indices beyond the
    /// configured counts.
    pub fn slot(&self, key: HistKey) -> Option<usize> {
        match key {
            HistKey::Global(g) => Some(g.index()),
            HistKey::Binned {
                kind,
                mult_bin,
                vz_bin,
            } => {
                if mult_bin >= self.n_mult || vz_bin >= self.n_vz {
                    return None;
                }
                Some(GLOBAL_OFFSET + kind.index() + (mult_bin + vz_bin * self.n_mult) * KINDS_PER_BIN)
            }
            HistKey::Misfill => Some(self.misfill_slot()),
        }
    }
}

/// Exclusive owner of all statistical containers of one accumulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    addressing: Addressing,
    hists: Vec<Histogram>,
}

impl Registry {
    /// Allocate all containers for the given configuration and event
    /// binning.
    pub fn new(
        cfg: &CorrelatorConfig,
        mult_edges: &BinEdges,
        vz_edges: &BinEdges,
    ) -> Result<Self> {
        let addressing = Addressing {
            n_mult: mult_edges.n_bins(),
            n_vz: vz_edges.n_bins(),
        };
        let trigger_cap = cfg.trigger_pt_cap();
        let associated_cap = cfg.associated_pt_cap();
        let (n_eta, n_phi) = cfg.binning.bins();
        let acc = cfg.acceptance_cut;

        let pt_axis = |cap: f64| Axis::uniform(100, 0.0, cap);
        let phi_axis = || Axis::uniform(270, -0.5 * PI, 2.5 * PI);
        let eta_axis = || Axis::uniform(100, -3.0, 3.0);
        let dphi_axis = || Axis::uniform(n_phi, -0.5 * PI, 1.5 * PI);
        let deta_axis = || Axis::uniform(n_eta, -2.0 * acc, 2.0 * acc);

        let mut hists = Vec::with_capacity(addressing.total_slots());
        for kind in GlobalKind::ALL {
            hists.push(match kind {
                GlobalKind::MultVsVz => Histogram::new_2d(
                    "mult_vs_vz",
                    "multiplicity vs vertex position",
                    Axis::uniform(100, mult_edges.low(), mult_edges.high())?,
                    Axis::uniform(100, vz_edges.low(), vz_edges.high())?,
                ),
                GlobalKind::MultBinVsVzBin => Histogram::new_2d(
                    "mult_bin_vs_vz_bin",
                    "resolved multiplicity bin vs vertex bin",
                    Axis::uniform(addressing.n_mult, 0.0, addressing.n_mult as f64)?,
                    Axis::uniform(addressing.n_vz, 0.0, addressing.n_vz as f64)?,
                ),
                GlobalKind::TriggerPt => {
                    Histogram::new_1d("trigger_pt_all", "trigger pT", pt_axis(trigger_cap)?)
                }
                GlobalKind::TriggerPhi => {
                    Histogram::new_1d("trigger_phi_all", "trigger phi", phi_axis()?)
                }
                GlobalKind::TriggerEta => {
                    Histogram::new_1d("trigger_eta_all", "trigger eta", eta_axis()?)
                }
                GlobalKind::AssociatedPt => {
                    Histogram::new_1d("associated_pt_all", "associated pT", pt_axis(trigger_cap)?)
                }
                GlobalKind::AssociatedPhi => {
                    Histogram::new_1d("associated_phi_all", "associated phi", phi_axis()?)
                }
                GlobalKind::AssociatedEta => {
                    Histogram::new_1d("associated_eta_all", "associated eta", eta_axis()?)
                }
            });
        }
        for z in 0..addressing.n_vz {
            for m in 0..addressing.n_mult {
                let suffix = bin_suffix(mult_edges, vz_edges, m, z);
                for kind in BinnedKind::ALL {
                    let name = format!("{}_{suffix}", kind.base_name());
                    hists.push(match kind {
                        BinnedKind::Pt => Histogram::new_1d(
                            &name,
                            "pT of triggers and associated combined",
                            pt_axis(trigger_cap)?,
                        ),
                        BinnedKind::Phi => Histogram::new_1d(
                            &name,
                            "phi of triggers and associated combined",
                            phi_axis()?,
                        ),
                        BinnedKind::Eta => Histogram::new_1d(
                            &name,
                            "eta of triggers and associated combined",
                            eta_axis()?,
                        ),
                        BinnedKind::TriggerPt => {
                            Histogram::new_1d(&name, "trigger pT", pt_axis(trigger_cap)?)
                        }
                        BinnedKind::TriggerPhi => {
                            Histogram::new_1d(&name, "trigger phi", phi_axis()?)
                        }
                        BinnedKind::TriggerEta => {
                            Histogram::new_1d(&name, "trigger eta", eta_axis()?)
                        }
                        BinnedKind::AssociatedPt => {
                            Histogram::new_1d(&name, "associated pT", pt_axis(associated_cap)?)
                        }
                        BinnedKind::AssociatedPhi => {
                            Histogram::new_1d(&name, "associated phi", phi_axis()?)
                        }
                        BinnedKind::AssociatedEta => {
                            Histogram::new_1d(&name, "associated eta", eta_axis()?)
                        }
                        BinnedKind::TriggerCount => Histogram::new_1d(
                            &name,
                            "number of accepted triggers",
                            Axis::uniform(1, 0.0, 1.0)?,
                        ),
                        BinnedKind::PhiEta => Histogram::new_2d(
                            &name,
                            "trigger-associated dPhi vs dEta",
                            deta_axis()?,
                            dphi_axis()?,
                        ),
                        BinnedKind::PhiEtaAssoc => Histogram::new_2d(
                            &name,
                            "associated-pair dPhi vs dEta",
                            deta_axis()?,
                            dphi_axis()?,
                        ),
                        BinnedKind::PhiPhiEta => Histogram::new_3d(
                            &name,
                            "dPhi1 vs dPhi2 vs dEta12",
                            deta_axis()?,
                            dphi_axis()?,
                            dphi_axis()?,
                        ),
                        BinnedKind::EventCount => Histogram::new_1d(
                            &name,
                            "filled once per resolved event",
                            Axis::uniform(1, 0.0, 2.0)?,
                        ),
                    });
                }
            }
        }
        hists.push(Histogram::new_1d(
            "misfill",
            "fills that targeted an invalid address",
            Axis::uniform(1, 0.0, 1.0)?,
        ));
        debug_assert_eq!(hists.len(), addressing.total_slots());
        Ok(Self { addressing, hists })
    }

    /// The slot arithmetic this registry was sized for.
    pub fn addressing(&self) -> Addressing {
        self.addressing
    }

    /// Look up a container. `None` when the key does not resolve.
    pub fn get(&self, key: HistKey) -> Option<&Histogram> {
        self.addressing.slot(key).map(|s| &self.hists[s])
    }

    /// Fill the container at `key`; fills targeting an unresolvable key are
    /// routed to the misfill counter instead.
    pub fn fill(&mut self, key: HistKey, coords: &[f64], weight: f64) -> Result<()> {
        match self.addressing.slot(key) {
            Some(slot) => self.hists[slot].fill(coords, weight),
            None => self.bump_misfill(),
        }
    }

    /// Increment the misfill counter.
    pub fn bump_misfill(&mut self) -> Result<()> {
        let slot = self.addressing.misfill_slot();
        self.hists[slot].fill(&[0.5], 1.0)
    }

    /// Total number of misrouted fills.
    pub fn misfills(&self) -> f64 {
        self.hists[self.addressing.misfill_slot()].integral()
    }

    /// Elementwise merge of a peer registry with identical addressing.
    /// Containers whose name or shape disagrees are skipped with a
    /// warning; the remaining slots still merge.
    pub fn merge(&mut self, other: &Registry) -> Result<()> {
        if self.addressing != other.addressing {
            return Err(Error::ShapeMismatch(format!(
                "registries differ in binning: {}x{} vs {}x{}",
                self.addressing.n_mult,
                self.addressing.n_vz,
                other.addressing.n_mult,
                other.addressing.n_vz
            )));
        }
        for (target, source) in self.hists.iter_mut().zip(&other.hists) {
            if target.name != source.name {
                warn!(
                    "skipping incompatible containers: '{}' vs '{}'",
                    target.name, source.name
                );
                continue;
            }
            if let Err(err) = target.add(source) {
                warn!("skipping container '{}': {err}", target.name);
            }
        }
        Ok(())
    }
}

fn bin_suffix(mult_edges: &BinEdges, vz_edges: &BinEdges, m: usize, z: usize) -> String {
    let me = mult_edges.as_slice();
    let ze = vz_edges.as_slice();
    format!(
        "m{:.2}_{:.2}_z{:.2}_{:.2}",
        me[m],
        me[m + 1],
        ze[z],
        ze[z + 1]
    )
}
