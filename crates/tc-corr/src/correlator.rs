//! The correlation accumulator: per-event context, candidate selection and
//! the fill operations.
//!
//! One [`Correlator`] owns one [`Registry`] and processes one event at a
//! time: callers establish the event context with
//! [`Correlator::set_mult_vz`], vet candidates with
//! [`Correlator::check_trigger`] / [`Correlator::check_associated`], then
//! record angular fills. Accumulators are `Send`; for parallel processing
//! run one per worker and fold them with [`Correlator::merge_from`].

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tc_core::{Candidate, CandidateKind, CorrelatorConfig, Error, Result, TriggerKind};
use tc_hist::{BinEdges, wrap_dphi};

use crate::registry::{BinnedKind, GlobalKind, HistKey, Registry};

/// Below this separation two fill coordinates count as degenerate.
const DEGENERACY_EPS: f64 = 1e-10;

/// Resolved (multiplicity, vertex) bin of the event in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBins {
    /// Multiplicity bin index.
    pub mult_bin: usize,
    /// Vertex bin index.
    pub vz_bin: usize,
}

/// A statistics accumulator for triggered two- and three-particle angular
/// correlations, binned in event multiplicity and vertex position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Correlator {
    name: String,
    config: CorrelatorConfig,
    mult_edges: BinEdges,
    vz_edges: BinEdges,
    registry: Registry,
    #[serde(skip)]
    current: Option<EventBins>,
}

impl Correlator {
    /// Build an accumulator with all containers allocated up front.
    pub fn new(
        name: &str,
        config: CorrelatorConfig,
        mult_edges: BinEdges,
        vz_edges: BinEdges,
    ) -> Result<Self> {
        let registry = Registry::new(&config, &mult_edges, &vz_edges)?;
        debug!(
            "correlator '{name}': trigger {}, associated {}, {} mult x {} vz bins",
            config.trigger_pt_label(),
            config.associated_pt_label(),
            mult_edges.n_bins(),
            vz_edges.n_bins()
        );
        Ok(Self {
            name: name.into(),
            config,
            mult_edges,
            vz_edges,
            registry,
            current: None,
        })
    }

    /// Accumulator name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The configuration this accumulator was built with.
    pub fn config(&self) -> &CorrelatorConfig {
        &self.config
    }

    /// Multiplicity bin edges.
    pub fn mult_edges(&self) -> &BinEdges {
        &self.mult_edges
    }

    /// Vertex bin edges.
    pub fn vz_edges(&self) -> &BinEdges {
        &self.vz_edges
    }

    /// The underlying container registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The event context currently in flight, once resolved.
    pub fn current_bins(&self) -> Option<EventBins> {
        self.current
    }

    /// Establish the event context from the event multiplicity (or
    /// centrality percentile) and vertex z position.
    ///
    /// The multiplicity-vs-vertex diagnostics are recorded for every offered
    /// event, resolvable or not. On successful resolution the per-bin event
    /// count is bumped and subsequent fills address the resolved bin; an
    /// unresolvable event clears the context, bumps the misfill counter and
    /// reports which coordinate fell outside the edges.
    pub fn set_mult_vz(&mut self, mult: f64, vz: f64) -> Result<EventBins> {
        self.registry
            .fill(HistKey::Global(GlobalKind::MultVsVz), &[mult, vz], 1.0)?;
        let m = self.mult_edges.locate(mult);
        let z = self.vz_edges.locate(vz);
        let as_coord = |b: Option<usize>| b.map_or(-1.0, |i| i as f64);
        self.registry.fill(
            HistKey::Global(GlobalKind::MultBinVsVzBin),
            &[as_coord(m), as_coord(z)],
            1.0,
        )?;
        match (m, z) {
            (Some(mult_bin), Some(vz_bin)) => {
                let bins = EventBins { mult_bin, vz_bin };
                self.current = Some(bins);
                self.fill_binned(BinnedKind::EventCount, &[1.0], 1.0)?;
                Ok(bins)
            }
            _ => {
                self.current = None;
                self.registry.bump_misfill()?;
                Err(Error::OutOfRange(format!(
                    "event (mult {mult}, vz {vz}) outside the configured bins"
                )))
            }
        }
    }

    /// Vet a trigger candidate against the configured kind and pt window.
    /// With `record`, an accepted candidate is entered into the trigger and
    /// combined spectra, weighted by its efficiency weight.
    pub fn check_trigger(&mut self, candidate: &Candidate, record: bool) -> Result<bool> {
        if !self.trigger_kind_matches(candidate.kind) {
            return Ok(false);
        }
        if candidate.pt <= self.config.min_trigger_pt {
            return Ok(false);
        }
        if self.config.max_trigger_pt > self.config.min_trigger_pt
            && candidate.pt > self.config.max_trigger_pt
        {
            return Ok(false);
        }
        if record {
            let w = candidate.weight;
            self.fill_binned(BinnedKind::Pt, &[candidate.pt], w)?;
            self.fill_binned(BinnedKind::Phi, &[candidate.phi], w)?;
            self.fill_binned(BinnedKind::Eta, &[candidate.eta], w)?;
            self.fill_binned(BinnedKind::TriggerPt, &[candidate.pt], w)?;
            self.fill_binned(BinnedKind::TriggerPhi, &[candidate.phi], w)?;
            self.fill_binned(BinnedKind::TriggerEta, &[candidate.eta], w)?;
            self.fill_global(GlobalKind::TriggerPt, &[candidate.pt], w)?;
            self.fill_global(GlobalKind::TriggerPhi, &[candidate.phi], w)?;
            self.fill_global(GlobalKind::TriggerEta, &[candidate.eta], w)?;
        }
        Ok(true)
    }

    /// Vet an associated candidate: charged tracks only, independent pt
    /// window. With `record`, accepted candidates enter the associated and
    /// combined spectra.
    pub fn check_associated(&mut self, candidate: &Candidate, record: bool) -> Result<bool> {
        if candidate.kind != CandidateKind::Track {
            return Ok(false);
        }
        if candidate.pt <= self.config.min_associated_pt {
            return Ok(false);
        }
        if self.config.max_associated_pt > self.config.min_associated_pt
            && candidate.pt > self.config.max_associated_pt
        {
            return Ok(false);
        }
        if record {
            let w = candidate.weight;
            self.fill_binned(BinnedKind::Pt, &[candidate.pt], w)?;
            self.fill_binned(BinnedKind::Phi, &[candidate.phi], w)?;
            self.fill_binned(BinnedKind::Eta, &[candidate.eta], w)?;
            self.fill_binned(BinnedKind::AssociatedPt, &[candidate.pt], w)?;
            self.fill_binned(BinnedKind::AssociatedPhi, &[candidate.phi], w)?;
            self.fill_binned(BinnedKind::AssociatedEta, &[candidate.eta], w)?;
            self.fill_global(GlobalKind::AssociatedPt, &[candidate.pt], w)?;
            self.fill_global(GlobalKind::AssociatedPhi, &[candidate.phi], w)?;
            self.fill_global(GlobalKind::AssociatedEta, &[candidate.eta], w)?;
        }
        Ok(true)
    }

    /// Record one trigger + two associated candidates into the 3-D
    /// correlation at (Δη12, Δφ1, Δφ2).
    ///
    /// The trigger must be at least as hard as both associated candidates;
    /// softer triggers are silently skipped. Degenerate combinations where
    /// the two associated candidates coincide in both angles, or where an
    /// associated candidate sits at the trigger pseudorapidity, are skipped
    /// to keep self-correlation artifacts out of the container.
    pub fn fill_triplet(
        &mut self,
        trigger: Option<&Candidate>,
        a1: Option<&Candidate>,
        a2: Option<&Candidate>,
        weight: f64,
    ) -> Result<()> {
        let (Some(t), Some(a1), Some(a2)) = (trigger, a1, a2) else {
            return Err(Error::InvalidArgument(
                "triplet fill needs a trigger and two associated candidates".into(),
            ));
        };
        if t.pt < a1.pt || t.pt < a2.pt {
            return Ok(());
        }
        let dphi1 = wrap_dphi(t.phi - a1.phi);
        let dphi2 = wrap_dphi(t.phi - a2.phi);
        let deta12 = a1.eta - a2.eta;
        if (dphi1 - dphi2).abs() < DEGENERACY_EPS && deta12.abs() < DEGENERACY_EPS {
            return Ok(());
        }
        if (a1.eta - t.eta).abs() < DEGENERACY_EPS || (a2.eta - t.eta).abs() < DEGENERACY_EPS {
            return Ok(());
        }
        self.fill_binned(BinnedKind::PhiPhiEta, &[deta12, dphi1, dphi2], weight)
    }

    /// Record a trigger-associated pair into the 2-D (Δη, Δφ) container.
    /// The trigger must be strictly harder than the associated candidate.
    pub fn fill_pair(
        &mut self,
        trigger: Option<&Candidate>,
        assoc: Option<&Candidate>,
        weight: f64,
    ) -> Result<()> {
        let (Some(t), Some(a)) = (trigger, assoc) else {
            return Err(Error::InvalidArgument(
                "pair fill needs a trigger and an associated candidate".into(),
            ));
        };
        if t.pt <= a.pt {
            return Ok(());
        }
        let dphi = wrap_dphi(t.phi - a.phi);
        let deta = t.eta - a.eta;
        self.fill_binned(BinnedKind::PhiEta, &[deta, dphi], weight)
    }

    /// Record an associated-associated pair into its own (Δη, Δφ)
    /// container, independent of any trigger.
    pub fn fill_assoc_pair(
        &mut self,
        a1: Option<&Candidate>,
        a2: Option<&Candidate>,
        weight: f64,
    ) -> Result<()> {
        let (Some(a1), Some(a2)) = (a1, a2) else {
            return Err(Error::InvalidArgument(
                "associated-pair fill needs two candidates".into(),
            ));
        };
        let dphi = wrap_dphi(a1.phi - a2.phi);
        let deta = a1.eta - a2.eta;
        self.fill_binned(BinnedKind::PhiEtaAssoc, &[deta, dphi], weight)
    }

    /// Count one accepted trigger, weighted by its efficiency weight. Call
    /// once per accepted trigger before the dependent pair/triplet fills;
    /// the count is the normalization denominator downstream.
    pub fn fill_trigger(&mut self, trigger: &Candidate) -> Result<()> {
        self.fill_binned(BinnedKind::TriggerCount, &[0.5], trigger.weight)
    }

    /// Fold peer accumulators into this one. Peers with incompatible
    /// binning are skipped with a warning.
    pub fn merge_from<'a>(&mut self, peers: impl IntoIterator<Item = &'a Correlator>) {
        for peer in peers {
            if let Err(err) = self.registry.merge(&peer.registry) {
                warn!(
                    "correlator '{}': skipping peer '{}': {err}",
                    self.name, peer.name
                );
            }
        }
    }

    fn trigger_kind_matches(&self, kind: CandidateKind) -> bool {
        match self.config.trigger {
            TriggerKind::Tracks => kind == CandidateKind::Track,
            TriggerKind::Pi0 => kind == CandidateKind::NeutralDecay,
        }
    }

    fn fill_binned(&mut self, kind: BinnedKind, coords: &[f64], weight: f64) -> Result<()> {
        match self.current {
            Some(bins) => self.registry.fill(
                HistKey::Binned {
                    kind,
                    mult_bin: bins.mult_bin,
                    vz_bin: bins.vz_bin,
                },
                coords,
                weight,
            ),
            None => self.registry.bump_misfill(),
        }
    }

    fn fill_global(&mut self, kind: GlobalKind, coords: &[f64], weight: f64) -> Result<()> {
        self.registry.fill(HistKey::Global(kind), coords, weight)
    }
}

/// The same-event / mixed-event accumulator pair of one analysis.
///
/// Both halves share configuration and binning by construction; the caller
/// routes genuine events to `same` and event-mixed combinations to `mixed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationPair {
    /// Accumulator fed with same-event combinations.
    pub same: Correlator,
    /// Accumulator fed with mixed-event combinations.
    pub mixed: Correlator,
}

impl CorrelationPair {
    /// Build both accumulators with shared configuration and binning.
    pub fn new(
        name: &str,
        config: CorrelatorConfig,
        mult_edges: BinEdges,
        vz_edges: BinEdges,
    ) -> Result<Self> {
        let mixed = Correlator::new(
            &format!("{name}_mixed"),
            config.clone(),
            mult_edges.clone(),
            vz_edges.clone(),
        )?;
        let same = Correlator::new(&format!("{name}_same"), config, mult_edges, vz_edges)?;
        Ok(Self { same, mixed })
    }

    /// Fold peer pairs into this one, half by half.
    pub fn merge_from<'a>(&mut self, peers: impl IntoIterator<Item = &'a CorrelationPair>) {
        for peer in peers {
            self.same.merge_from([&peer.same]);
            self.mixed.merge_from([&peer.mixed]);
        }
    }
}
