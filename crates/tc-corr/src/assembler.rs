//! Assembly of the accumulated statistics into the final result views.
//!
//! For every (multiplicity, vertex) bin the assembler derives the named 2-D
//! views from the 3-D correlation of both accumulator halves, normalizes the
//! mixed-event views by their peak low-angle cell, and produces the divided
//! (acceptance-corrected, per-trigger) correlation. Totals over all bins are
//! plain sums of the diagnostic spectra.

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};
use tc_core::{Error, Result};
use tc_hist::{Histogram, Mode, Plane, mean_angle_map, pair_angle_map, project, same_side_map};

use crate::correlator::CorrelationPair;
use crate::registry::{BinnedKind, HistKey, Registry};

/// Half-width of the near-side Δη window.
const NEAR_DETA: f64 = 0.4;

/// Outer edge of the mid Δη window; beyond it pairs count as far.
const MID_DETA: f64 = 1.0;

/// The diagnostic spectra cloned into `bin_stats` and summed into totals.
const SPECTRUM_KINDS: [BinnedKind; 9] = [
    BinnedKind::Pt,
    BinnedKind::Phi,
    BinnedKind::Eta,
    BinnedKind::TriggerPt,
    BinnedKind::TriggerPhi,
    BinnedKind::TriggerEta,
    BinnedKind::AssociatedPt,
    BinnedKind::AssociatedPhi,
    BinnedKind::AssociatedEta,
];

/// The named correlation views of one accumulator half in one bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationViews {
    /// Accepted-trigger count (normalization denominator).
    pub trigger_count: Histogram,
    /// The 3-D (Δη12, Δφ1, Δφ2) correlation.
    pub dphi1_dphi2_deta12: Histogram,
    /// (Δφ1, Δφ2) over the full Δη12 range.
    pub dphi1_dphi2: Histogram,
    /// (Δφ1, Δφ2) for |Δη12| ≤ 0.4.
    pub dphi1_dphi2_near: Histogram,
    /// (Δφ1, Δφ2) for 0.4 < |Δη12| ≤ 1.
    pub dphi1_dphi2_mid: Histogram,
    /// (Δφ1, Δφ2) for |Δη12| > 1.
    pub dphi1_dphi2_far: Histogram,
    /// (Δη12, Δφ1) with Δφ2 integrated out.
    pub dphi1_deta: Histogram,
    /// (Δη12, Δφ1) restricted to same-side pairs.
    pub dphi1_deta_same_side: Histogram,
    /// (Δη12, ⟨Δφ⟩) mean-pair-angle view.
    pub mean_dphi_deta: Histogram,
    /// (Δη12, Δφ12) wrapped pair-difference view.
    pub pair_dphi_deta: Histogram,
    /// Direct trigger-associated (Δη, Δφ).
    pub dphi_deta: Histogram,
    /// Associated-pair (Δη, Δφ).
    pub dphi_deta_assoc: Histogram,
}

impl CorrelationViews {
    /// Name of the view whose peak decides whether a mixed-event bin is
    /// usable at all.
    pub const NORMALIZATION_VIEW: &'static str = "dphi1_dphi2";

    fn angular(&self) -> [&Histogram; 11] {
        [
            &self.dphi1_dphi2_deta12,
            &self.dphi1_dphi2,
            &self.dphi1_dphi2_near,
            &self.dphi1_dphi2_mid,
            &self.dphi1_dphi2_far,
            &self.dphi1_deta,
            &self.dphi1_deta_same_side,
            &self.mean_dphi_deta,
            &self.pair_dphi_deta,
            &self.dphi_deta,
            &self.dphi_deta_assoc,
        ]
    }

    fn angular_mut(&mut self) -> [&mut Histogram; 11] {
        [
            &mut self.dphi1_dphi2_deta12,
            &mut self.dphi1_dphi2,
            &mut self.dphi1_dphi2_near,
            &mut self.dphi1_dphi2_mid,
            &mut self.dphi1_dphi2_far,
            &mut self.dphi1_deta,
            &mut self.dphi1_deta_same_side,
            &mut self.mean_dphi_deta,
            &mut self.pair_dphi_deta,
            &mut self.dphi_deta,
            &mut self.dphi_deta_assoc,
        ]
    }

    fn all_mut(&mut self) -> [&mut Histogram; 12] {
        [
            &mut self.trigger_count,
            &mut self.dphi1_dphi2_deta12,
            &mut self.dphi1_dphi2,
            &mut self.dphi1_dphi2_near,
            &mut self.dphi1_dphi2_mid,
            &mut self.dphi1_dphi2_far,
            &mut self.dphi1_deta,
            &mut self.dphi1_deta_same_side,
            &mut self.mean_dphi_deta,
            &mut self.pair_dphi_deta,
            &mut self.dphi_deta,
            &mut self.dphi_deta_assoc,
        ]
    }
}

/// Everything produced for one (multiplicity, vertex) bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinGroup {
    /// Multiplicity bin index.
    pub mult_bin: usize,
    /// Vertex bin index.
    pub vz_bin: usize,
    /// Multiplicity edges of this bin.
    pub mult_range: (f64, f64),
    /// Vertex edges of this bin.
    pub vz_range: (f64, f64),
    /// Raw per-bin diagnostic spectra and the trigger count.
    pub bin_stats: Vec<Histogram>,
    /// Views of the same-event accumulator.
    pub same_event: CorrelationViews,
    /// Views of the mixed-event accumulator after peak normalization.
    pub mixed_event: CorrelationViews,
    /// Raw peak low-angle cell content of every normalized mixed view.
    pub peaks: BTreeMap<String, f64>,
    /// Same / normalized mixed, scaled to per-trigger yield.
    pub divided: CorrelationViews,
}

/// The assembled result tree of one accumulator pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Results {
    /// Scaling-variant label; group name in the result store.
    pub variant: String,
    /// Diagnostic spectra summed over all bins.
    pub totals: Vec<Histogram>,
    /// Per-bin groups, ascending multiplicity then ascending vertex.
    pub bins: Vec<BinGroup>,
}

/// Derive the full result tree from an accumulator pair.
pub fn assemble(pair: &CorrelationPair, variant: &str) -> Result<Results> {
    let addr = pair.same.registry().addressing();
    if pair.mixed.registry().addressing() != addr {
        return Err(Error::ShapeMismatch(
            "same- and mixed-event accumulators differ in binning".into(),
        ));
    }
    let floor = pair.same.config().mixed_norm_floor;
    let mult_edges = pair.same.mult_edges().as_slice();
    let vz_edges = pair.same.vz_edges().as_slice();

    let mut bins = Vec::with_capacity(addr.n_mult * addr.n_vz);
    for m in 0..addr.n_mult {
        for z in 0..addr.n_vz {
            let same_event = bin_views(pair.same.registry(), m, z)?;
            let mut mixed_event = bin_views(pair.mixed.registry(), m, z)?;
            let peaks = normalize_mixed(&mut mixed_event, floor)?;
            let raw_peak = peaks
                .get(CorrelationViews::NORMALIZATION_VIEW)
                .copied()
                .unwrap_or(0.0);
            let divided = divided_views(&same_event, &mixed_event, raw_peak, floor)?;
            bins.push(BinGroup {
                mult_bin: m,
                vz_bin: z,
                mult_range: (mult_edges[m], mult_edges[m + 1]),
                vz_range: (vz_edges[z], vz_edges[z + 1]),
                bin_stats: bin_stats(pair.same.registry(), m, z)?,
                same_event,
                mixed_event,
                peaks,
                divided,
            });
        }
    }
    debug!(
        "assembled {} bins into variant '{variant}'",
        bins.len()
    );
    Ok(Results {
        variant: variant.into(),
        totals: totals(pair.same.registry())?,
        bins,
    })
}

fn bin_hist(reg: &Registry, kind: BinnedKind, mult_bin: usize, vz_bin: usize) -> Result<&Histogram> {
    reg.get(HistKey::Binned {
        kind,
        mult_bin,
        vz_bin,
    })
    .ok_or_else(|| {
        Error::OutOfRange(format!(
            "no containers allocated for bin ({mult_bin}, {vz_bin})"
        ))
    })
}

fn renamed(h: &Histogram, name: &str) -> Histogram {
    let mut out = h.clone();
    out.name = name.into();
    out
}

fn bin_views(reg: &Registry, mult_bin: usize, vz_bin: usize) -> Result<CorrelationViews> {
    let h3 = bin_hist(reg, BinnedKind::PhiPhiEta, mult_bin, vz_bin)?;
    let deta = &h3.axes()[0];
    let n_eta = deta.n_bins();
    let n_phi2 = h3.axes()[2].n_bins();

    let near_first = deta.find_bin(-NEAR_DETA);
    let near_last = deta.find_bin(NEAR_DETA);
    let mid_first = deta.find_bin(-MID_DETA);
    let mid_last = deta.find_bin(MID_DETA);

    let sum = |first: usize, last: usize, name: &str| {
        project(h3, Plane::Phi1Phi2, first, last, Mode::Sum, name)
    };
    let dphi1_dphi2 = sum(1, n_eta, "dphi1_dphi2")?;
    let dphi1_dphi2_near = sum(near_first, near_last, "dphi1_dphi2_near")?;
    let mut dphi1_dphi2_mid = sum(mid_first, near_first.saturating_sub(1), "dphi1_dphi2_mid")?;
    dphi1_dphi2_mid.add(&sum(near_last + 1, mid_last, "dphi1_dphi2_mid")?)?;
    let mut dphi1_dphi2_far = sum(1, mid_first.saturating_sub(1), "dphi1_dphi2_far")?;
    dphi1_dphi2_far.add(&sum(mid_last + 1, n_eta, "dphi1_dphi2_far")?)?;

    Ok(CorrelationViews {
        trigger_count: renamed(
            bin_hist(reg, BinnedKind::TriggerCount, mult_bin, vz_bin)?,
            "trigger_count",
        ),
        dphi1_dphi2_deta12: renamed(h3, "dphi1_dphi2_deta12"),
        dphi1_dphi2,
        dphi1_dphi2_near,
        dphi1_dphi2_mid,
        dphi1_dphi2_far,
        dphi1_deta: project(h3, Plane::EtaPhi1, 1, n_phi2, Mode::Sum, "dphi1_deta")?,
        dphi1_deta_same_side: same_side_map(h3, "dphi1_deta_same_side", Mode::Sum)?,
        mean_dphi_deta: mean_angle_map(h3, "mean_dphi_deta", false)?,
        pair_dphi_deta: pair_angle_map(h3, "pair_dphi_deta")?,
        dphi_deta: renamed(bin_hist(reg, BinnedKind::PhiEta, mult_bin, vz_bin)?, "dphi_deta"),
        dphi_deta_assoc: renamed(
            bin_hist(reg, BinnedKind::PhiEtaAssoc, mult_bin, vz_bin)?,
            "dphi_deta_assoc",
        ),
    })
}

/// Scale every angular view by the inverse of its peak low-angle cell, the
/// cell containing the angular origin. Peaks at or below `floor` zero the
/// view instead. The trigger count stays raw. Returns the raw peak values
/// keyed by view name.
fn normalize_mixed(views: &mut CorrelationViews, floor: f64) -> Result<BTreeMap<String, f64>> {
    let mut peaks = BTreeMap::new();
    for view in views.angular_mut() {
        let origin = vec![0.0; view.n_dims()];
        let peak = view.value_at_coords(&origin)?;
        peaks.insert(view.name.clone(), peak);
        if peak > floor {
            view.scale(1.0 / peak);
        } else {
            view.scale(0.0);
        }
    }
    Ok(peaks)
}

/// `same / normalized_mixed` per view, scaled by the inverse summed trigger
/// count. The trigger-count view divides by the raw mixed count and is not
/// trigger-scaled. Zero triggers or a mixed peak at or below the floor
/// force an all-zero group.
fn divided_views(
    same: &CorrelationViews,
    mixed: &CorrelationViews,
    raw_peak: f64,
    floor: f64,
) -> Result<CorrelationViews> {
    let mut out = same.clone();
    let triggers = same.trigger_count.integral();
    if !(raw_peak > floor) || !(triggers > 0.0) {
        for view in out.all_mut() {
            view.scale(0.0);
        }
        return Ok(out);
    }
    out.trigger_count.divide(&mixed.trigger_count)?;
    let per_trigger = 1.0 / triggers;
    for (view, mixed_view) in out.angular_mut().into_iter().zip(mixed.angular()) {
        view.divide(mixed_view)?;
        view.scale(per_trigger);
    }
    Ok(out)
}

fn bin_stats(reg: &Registry, mult_bin: usize, vz_bin: usize) -> Result<Vec<Histogram>> {
    let mut stats = Vec::with_capacity(SPECTRUM_KINDS.len() + 1);
    for kind in SPECTRUM_KINDS {
        stats.push(bin_hist(reg, kind, mult_bin, vz_bin)?.clone());
    }
    stats.push(bin_hist(reg, BinnedKind::TriggerCount, mult_bin, vz_bin)?.clone());
    Ok(stats)
}

fn totals(reg: &Registry) -> Result<Vec<Histogram>> {
    let addr = reg.addressing();
    let mut out = Vec::with_capacity(SPECTRUM_KINDS.len());
    for kind in SPECTRUM_KINDS {
        let mut total = renamed(bin_hist(reg, kind, 0, 0)?, kind.base_name());
        for z in 0..addr.n_vz {
            for m in 0..addr.n_mult {
                if m == 0 && z == 0 {
                    continue;
                }
                total.add(bin_hist(reg, kind, m, z)?)?;
            }
        }
        out.push(total);
    }
    Ok(out)
}
