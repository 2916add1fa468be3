//! Projections of the 3-D angular-difference distribution to 2-D views.
//!
//! The 3-D container has axes (Δη12, Δφ1, Δφ2). [`project`] integrates one
//! axis over a storage-bin range; the map functions rebin derived pair
//! angles (mean angle, wrapped difference) or apply the same-side selection.

use std::f64::consts::{FRAC_PI_2, PI};

use tc_core::{Error, Result};

use crate::histogram::Histogram;

/// Fold an angle into `[-π/2, 3π/2)` by whole turns. Idempotent.
pub fn wrap_dphi(x: f64) -> f64 {
    (x + FRAC_PI_2).rem_euclid(2.0 * PI) - FRAC_PI_2
}

/// Which axis pair of the 3-D container a projection retains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plane {
    /// Retain (Δη12, Δφ1); integrate over Δφ2.
    EtaPhi1,
    /// Retain (Δη12, Δφ2); integrate over Δφ1.
    EtaPhi2,
    /// Retain (Δφ1, Δφ2); integrate over Δη12.
    Phi1Phi2,
}

/// How integrated slices combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Linear contents, quadrature variance.
    Sum,
    /// Inverse-variance weighted average of the slices; slices with zero
    /// variance contribute a unit weight only.
    Average,
}

fn check_3d(h: &Histogram, what: &str) -> Result<()> {
    if h.n_dims() != 3 {
        return Err(Error::ShapeMismatch(format!(
            "{what} needs a 3-dimensional container, '{}' has {} axes",
            h.name,
            h.n_dims()
        )));
    }
    Ok(())
}

/// Integrate one axis of `h3` over the inclusive storage-bin range
/// `first_bin..=last_bin`, retaining the axis pair selected by `plane`.
///
/// The retained axes are traversed over their full storage range including
/// the flow slots. An empty range (`first_bin > last_bin`) produces an
/// all-zero output.
pub fn project(
    h3: &Histogram,
    plane: Plane,
    first_bin: usize,
    last_bin: usize,
    mode: Mode,
    name: &str,
) -> Result<Histogram> {
    check_3d(h3, "project")?;
    let axes = h3.axes();
    let (ka, kb, ki) = match plane {
        Plane::EtaPhi1 => (0, 1, 2),
        Plane::EtaPhi2 => (0, 2, 1),
        Plane::Phi1Phi2 => (1, 2, 0),
    };
    let mut out = Histogram::new_2d(name, &h3.title, axes[ka].clone(), axes[kb].clone());
    let last = last_bin.min(axes[ki].n_bins() + 1);
    for a in 0..axes[ka].storage_bins() {
        for b in 0..axes[kb].storage_bins() {
            let mut content = 0.0;
            let mut weight = 0.0;
            for i in first_bin..=last {
                let flat = match plane {
                    Plane::EtaPhi1 => h3.flat_3(a, b, i),
                    Plane::EtaPhi2 => h3.flat_3(a, i, b),
                    Plane::Phi1Phi2 => h3.flat_3(i, a, b),
                };
                let (c, v) = h3.cell(flat);
                match mode {
                    Mode::Sum => {
                        content += c;
                        weight += v;
                    }
                    Mode::Average => {
                        if v > 0.0 {
                            content += c / v;
                            weight += 1.0 / v;
                        } else {
                            weight += 1.0;
                        }
                    }
                }
            }
            let (oc, ov) = match mode {
                Mode::Sum => (content, weight),
                Mode::Average if weight > 0.0 => (content / weight, 1.0 / weight),
                Mode::Average => (0.0, 0.0),
            };
            out.set_cell(out.flat_2(a, b), oc, ov);
        }
    }
    out.set_entries(h3.entries());
    Ok(out)
}

/// Δη12 × ⟨Δφ⟩ map: every 3-D cell is rebinned at the wrapped mean pair
/// angle `(Δφ1 + Δφ2)/2`; contents add linearly, variances in quadrature.
///
/// With `same_side_only` only cells whose two angles lie strictly on the
/// same side of π/2 contribute.
pub fn mean_angle_map(h3: &Histogram, name: &str, same_side_only: bool) -> Result<Histogram> {
    check_3d(h3, "mean_angle_map")?;
    let axes = h3.axes();
    let mut out = Histogram::new_2d(name, &h3.title, axes[0].clone(), axes[1].clone());
    let ay_out = out.axes()[1].clone();
    for x in 1..=axes[0].n_bins() {
        for y in 1..=axes[1].n_bins() {
            let phi1 = axes[1].center(y);
            for z in 1..=axes[2].n_bins() {
                let phi2 = axes[2].center(z);
                if same_side_only {
                    let same = (phi1 < FRAC_PI_2 && phi2 < FRAC_PI_2)
                        || (phi1 > FRAC_PI_2 && phi2 > FRAC_PI_2);
                    if !same {
                        continue;
                    }
                }
                let (c, v) = h3.cell(h3.flat_3(x, y, z));
                let yb = ay_out.find_bin(wrap_dphi(0.5 * (phi1 + phi2)));
                out.add_cell(out.flat_2(x, yb), c, v);
            }
        }
    }
    out.set_entries(h3.entries());
    Ok(out)
}

/// Δη12 × Δφ1 map keeping only cells where Δφ1 and Δφ2 are on the same side
/// of π/2 (both below, or both at/above).
pub fn same_side_map(h3: &Histogram, name: &str, mode: Mode) -> Result<Histogram> {
    check_3d(h3, "same_side_map")?;
    let axes = h3.axes();
    let mut out = Histogram::new_2d(name, &h3.title, axes[0].clone(), axes[1].clone());
    for x in 1..=axes[0].n_bins() {
        for y in 1..=axes[1].n_bins() {
            let phi1 = axes[1].center(y);
            let mut content = 0.0;
            let mut weight = 0.0;
            for z in 1..=axes[2].n_bins() {
                let phi2 = axes[2].center(z);
                let same = (phi1 < FRAC_PI_2 && phi2 < FRAC_PI_2)
                    || (phi1 >= FRAC_PI_2 && phi2 >= FRAC_PI_2);
                if !same {
                    continue;
                }
                let (c, v) = h3.cell(h3.flat_3(x, y, z));
                match mode {
                    Mode::Sum => {
                        content += c;
                        weight += v;
                    }
                    Mode::Average => {
                        if v > 0.0 {
                            content += c / v;
                            weight += 1.0 / v;
                        } else {
                            weight += 1.0;
                        }
                    }
                }
            }
            let (oc, ov) = match mode {
                Mode::Sum => (content, weight),
                Mode::Average if weight > 0.0 => (content / weight, 1.0 / weight),
                Mode::Average => (0.0, 0.0),
            };
            out.set_cell(out.flat_2(x, y), oc, ov);
        }
    }
    out.set_entries(h3.entries());
    Ok(out)
}

/// Δη12 × Δφ12 map: every 3-D cell is rebinned at the wrapped pair angle
/// difference `Δφ1 − Δφ2`; contents add linearly, variances in quadrature.
pub fn pair_angle_map(h3: &Histogram, name: &str) -> Result<Histogram> {
    check_3d(h3, "pair_angle_map")?;
    let axes = h3.axes();
    let mut out = Histogram::new_2d(name, &h3.title, axes[0].clone(), axes[1].clone());
    let ay_out = out.axes()[1].clone();
    for x in 1..=axes[0].n_bins() {
        for y in 1..=axes[1].n_bins() {
            let phi1 = axes[1].center(y);
            for z in 1..=axes[2].n_bins() {
                let phi2 = axes[2].center(z);
                let (c, v) = h3.cell(h3.flat_3(x, y, z));
                let yb = ay_out.find_bin(wrap_dphi(phi1 - phi2));
                out.add_cell(out.flat_2(x, yb), c, v);
            }
        }
    }
    out.set_entries(h3.entries());
    Ok(out)
}
