//! Statistical containers of dimensionality 1 to 3.

use serde::{Deserialize, Serialize};
use tc_core::{Error, Result};

use crate::axis::Axis;

/// How a container combines with another in [`Histogram::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsMode {
    /// Contents add linearly, variances in quadrature.
    Sum,
    /// Cells hold weighted-mean estimates; `add` combines cell-wise by
    /// inverse-variance weighting.
    Average,
}

/// A binned statistical container.
///
/// Contents and squared-weight sums are stored flat, first axis fastest,
/// including one underflow and one overflow slot per axis. All binary
/// operations demand exact shape equality and report
/// [`Error::ShapeMismatch`] otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// Container name, used for identity checks when merging.
    pub name: String,
    /// Human-readable description.
    pub title: String,
    /// Combination semantics.
    pub mode: StatsMode,
    axes: Vec<Axis>,
    content: Vec<f64>,
    sumw2: Vec<f64>,
    entries: f64,
}

impl Histogram {
    /// Build a container from 1 to 3 axes.
    pub fn new(name: &str, title: &str, axes: Vec<Axis>, mode: StatsMode) -> Result<Self> {
        if axes.is_empty() || axes.len() > 3 {
            return Err(Error::Validation(format!(
                "container '{name}' needs 1 to 3 axes, got {}",
                axes.len()
            )));
        }
        let len = axes.iter().map(Axis::storage_bins).product();
        Ok(Self {
            name: name.into(),
            title: title.into(),
            mode,
            axes,
            content: vec![0.0; len],
            sumw2: vec![0.0; len],
            entries: 0.0,
        })
    }

    /// 1-D container in sum mode.
    pub fn new_1d(name: &str, title: &str, ax: Axis) -> Self {
        Self::must(name, title, vec![ax])
    }

    /// 2-D container in sum mode.
    pub fn new_2d(name: &str, title: &str, ax: Axis, ay: Axis) -> Self {
        Self::must(name, title, vec![ax, ay])
    }

    /// 3-D container in sum mode.
    pub fn new_3d(name: &str, title: &str, ax: Axis, ay: Axis, az: Axis) -> Self {
        Self::must(name, title, vec![ax, ay, az])
    }

    fn must(name: &str, title: &str, axes: Vec<Axis>) -> Self {
        let len = axes.iter().map(Axis::storage_bins).product();
        Self {
            name: name.into(),
            title: title.into(),
            mode: StatsMode::Sum,
            axes,
            content: vec![0.0; len],
            sumw2: vec![0.0; len],
            entries: 0.0,
        }
    }

    /// Number of axes.
    pub fn n_dims(&self) -> usize {
        self.axes.len()
    }

    /// The axes, in storage order (first axis varies fastest).
    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    /// Number of fill operations recorded.
    pub fn entries(&self) -> f64 {
        self.entries
    }

    /// Weighted fill: `content += w`, `sumw2 += w²` at the cell containing
    /// `coords`. Out-of-range coordinates land in the flow slots.
    pub fn fill(&mut self, coords: &[f64], weight: f64) -> Result<()> {
        let idx = self.coords_to_flat(coords)?;
        self.content[idx] += weight;
        self.sumw2[idx] += weight * weight;
        self.entries += 1.0;
        Ok(())
    }

    /// Record a measurement with its variance into the cell containing
    /// `coords`, replacing the cell with the inverse-variance weighted mean
    /// of the existing estimate and the new value.
    pub fn fill_measured(&mut self, coords: &[f64], value: f64, variance: f64) -> Result<()> {
        if !(variance > 0.0) {
            return Err(Error::InvalidArgument(format!(
                "measurement variance must be positive, got {variance}"
            )));
        }
        let idx = self.coords_to_flat(coords)?;
        let (c, v) = (self.content[idx], self.sumw2[idx]);
        let w_old = avg_weight(c, v);
        let w_new = 1.0 / variance;
        let w = w_old + w_new;
        self.content[idx] = (c * w_old + value * w_new) / w;
        self.sumw2[idx] = 1.0 / w;
        self.entries += 1.0;
        Ok(())
    }

    /// Elementwise combination with `other` according to [`StatsMode`].
    pub fn add(&mut self, other: &Histogram) -> Result<()> {
        self.check_shape(other)?;
        match self.mode {
            StatsMode::Sum => {
                for (c, oc) in self.content.iter_mut().zip(&other.content) {
                    *c += *oc;
                }
                for (v, ov) in self.sumw2.iter_mut().zip(&other.sumw2) {
                    *v += *ov;
                }
            }
            StatsMode::Average => {
                for i in 0..self.content.len() {
                    let (c1, v1) = (self.content[i], self.sumw2[i]);
                    let (c2, v2) = (other.content[i], other.sumw2[i]);
                    let w1 = avg_weight(c1, v1);
                    let w2 = avg_weight(c2, v2);
                    let w = w1 + w2;
                    if w > 0.0 {
                        self.content[i] = (c1 * w1 + c2 * w2) / w;
                        self.sumw2[i] = 1.0 / w;
                    } else {
                        self.content[i] = 0.0;
                        self.sumw2[i] = 0.0;
                    }
                }
            }
        }
        self.entries += other.entries;
        Ok(())
    }

    /// Elementwise ratio with independent-measurement error propagation:
    /// `relErr(a/b)² = relErr(a)² + relErr(b)²`. Cells with a zero numerator
    /// or denominator yield `(0, 0)`.
    pub fn divide(&mut self, other: &Histogram) -> Result<()> {
        self.check_shape(other)?;
        for i in 0..self.content.len() {
            let a = self.content[i];
            let b = other.content[i];
            if a == 0.0 || b == 0.0 {
                self.content[i] = 0.0;
                self.sumw2[i] = 0.0;
                continue;
            }
            let va = self.sumw2[i];
            let vb = other.sumw2[i];
            self.content[i] = a / b;
            self.sumw2[i] = (va * b * b + vb * a * a) / (b * b * b * b);
        }
        Ok(())
    }

    /// Multiply contents by `factor` and variances by `factor²`.
    pub fn scale(&mut self, factor: f64) {
        for c in &mut self.content {
            *c *= factor;
        }
        for v in &mut self.sumw2 {
            *v *= factor * factor;
        }
    }

    /// Sum of in-range cell contents (flow slots excluded).
    pub fn integral(&self) -> f64 {
        self.content
            .iter()
            .enumerate()
            .filter(|(i, _)| self.in_range(*i))
            .map(|(_, c)| *c)
            .sum()
    }

    /// Content of a storage cell.
    pub fn value_at(&self, bins: &[usize]) -> Result<f64> {
        Ok(self.content[self.checked_index(bins)?])
    }

    /// Statistical error of a storage cell (`sqrt(sumw2)`).
    pub fn error_at(&self, bins: &[usize]) -> Result<f64> {
        Ok(self.sumw2[self.checked_index(bins)?].sqrt())
    }

    /// Content of the cell containing `coords`. This is the peak-bin probe
    /// used by mixed-event normalization.
    pub fn value_at_coords(&self, coords: &[f64]) -> Result<f64> {
        Ok(self.content[self.coords_to_flat(coords)?])
    }

    fn check_shape(&self, other: &Histogram) -> Result<()> {
        if self.axes != other.axes || self.mode != other.mode {
            return Err(Error::ShapeMismatch(format!(
                "containers '{}' and '{}' have incompatible shapes",
                self.name, other.name
            )));
        }
        Ok(())
    }

    fn coords_to_flat(&self, coords: &[f64]) -> Result<usize> {
        if coords.len() != self.axes.len() {
            return Err(Error::ShapeMismatch(format!(
                "container '{}' is {}-dimensional, got {} coordinates",
                self.name,
                self.axes.len(),
                coords.len()
            )));
        }
        let mut idx = 0;
        for (ax, &v) in self.axes.iter().zip(coords).rev() {
            idx = idx * ax.storage_bins() + ax.find_bin(v);
        }
        Ok(idx)
    }

    fn checked_index(&self, bins: &[usize]) -> Result<usize> {
        if bins.len() != self.axes.len() {
            return Err(Error::ShapeMismatch(format!(
                "container '{}' is {}-dimensional, got {} bin indices",
                self.name,
                self.axes.len(),
                bins.len()
            )));
        }
        let mut idx = 0;
        for (ax, &b) in self.axes.iter().zip(bins).rev() {
            if b >= ax.storage_bins() {
                return Err(Error::OutOfRange(format!(
                    "storage bin {b} outside axis with {} slots in '{}'",
                    ax.storage_bins(),
                    self.name
                )));
            }
            idx = idx * ax.storage_bins() + b;
        }
        Ok(idx)
    }

    fn in_range(&self, flat: usize) -> bool {
        let mut rem = flat;
        for ax in &self.axes {
            let sb = ax.storage_bins();
            let b = rem % sb;
            rem /= sb;
            if b == 0 || b > ax.n_bins() {
                return false;
            }
        }
        true
    }

    pub(crate) fn flat_2(&self, x: usize, y: usize) -> usize {
        x + self.axes[0].storage_bins() * y
    }

    pub(crate) fn flat_3(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.axes[0].storage_bins() * (y + self.axes[1].storage_bins() * z)
    }

    pub(crate) fn cell(&self, flat: usize) -> (f64, f64) {
        (self.content[flat], self.sumw2[flat])
    }

    pub(crate) fn set_cell(&mut self, flat: usize, content: f64, variance: f64) {
        self.content[flat] = content;
        self.sumw2[flat] = variance;
    }

    pub(crate) fn add_cell(&mut self, flat: usize, content: f64, variance: f64) {
        self.content[flat] += content;
        self.sumw2[flat] += variance;
    }

    pub(crate) fn set_entries(&mut self, entries: f64) {
        self.entries = entries;
    }
}

/// Inverse-variance weight of a cell estimate. Cells with zero variance but
/// nonzero content count with unit weight; empty cells do not count.
fn avg_weight(c: f64, v: f64) -> f64 {
    if v > 0.0 {
        1.0 / v
    } else if c != 0.0 {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn h1(name: &str) -> Histogram {
        Histogram::new_1d(name, "", Axis::uniform(4, 0.0, 4.0).unwrap())
    }

    #[test]
    fn fill_and_query() {
        let mut h = h1("h");
        h.fill(&[0.5], 2.0).unwrap();
        h.fill(&[0.5], 1.0).unwrap();
        h.fill(&[-1.0], 1.0).unwrap();
        h.fill(&[9.0], 1.0).unwrap();
        assert_eq!(h.value_at(&[1]).unwrap(), 3.0);
        assert_relative_eq!(h.error_at(&[1]).unwrap(), 5.0_f64.sqrt());
        assert_eq!(h.value_at(&[0]).unwrap(), 1.0);
        assert_eq!(h.value_at(&[5]).unwrap(), 1.0);
        assert_eq!(h.entries(), 4.0);
        assert_eq!(h.integral(), 3.0);
        assert_eq!(h.value_at_coords(&[0.7]).unwrap(), 3.0);
    }

    #[test]
    fn dimension_checks() {
        let mut h = h1("h");
        assert!(h.fill(&[0.5, 0.5], 1.0).is_err());
        assert!(h.value_at(&[1, 1]).is_err());
        assert!(h.value_at(&[6]).is_err());
        assert!(Histogram::new("bad", "", vec![], StatsMode::Sum).is_err());
    }

    #[test]
    fn add_sum_mode() {
        let mut a = h1("a");
        let mut b = h1("b");
        a.fill(&[0.5], 1.0).unwrap();
        b.fill(&[0.5], 2.0).unwrap();
        a.add(&b).unwrap();
        assert_eq!(a.value_at(&[1]).unwrap(), 3.0);
        assert_relative_eq!(a.error_at(&[1]).unwrap(), 5.0_f64.sqrt());
        assert_eq!(a.entries(), 2.0);
    }

    #[test]
    fn add_is_order_independent() {
        let mut a1 = h1("x");
        let mut b = h1("x");
        let mut c = h1("x");
        a1.fill(&[0.5], 1.0).unwrap();
        b.fill(&[1.5], 2.0).unwrap();
        c.fill(&[0.5], 4.0).unwrap();
        let mut a2 = a1.clone();

        a1.add(&b).unwrap();
        a1.add(&c).unwrap();
        a2.add(&c).unwrap();
        a2.add(&b).unwrap();
        assert_eq!(a1, a2);
    }

    #[test]
    fn add_shape_mismatch() {
        let mut a = h1("a");
        let b = Histogram::new_1d("b", "", Axis::uniform(5, 0.0, 4.0).unwrap());
        assert!(a.add(&b).is_err());
        let mut c = h1("c");
        c.mode = StatsMode::Average;
        assert!(a.add(&c).is_err());
    }

    #[test]
    fn add_average_mode() {
        let ax = || Axis::uniform(1, 0.0, 1.0).unwrap();
        let mut a = Histogram::new("a", "", vec![ax()], StatsMode::Average).unwrap();
        let mut b = Histogram::new("b", "", vec![ax()], StatsMode::Average).unwrap();
        a.fill_measured(&[0.5], 2.0, 1.0).unwrap();
        b.fill_measured(&[0.5], 4.0, 1.0).unwrap();
        a.add(&b).unwrap();
        assert_relative_eq!(a.value_at(&[1]).unwrap(), 3.0);
        assert_relative_eq!(a.error_at(&[1]).unwrap(), 0.5_f64.sqrt());

        // one side empty: the populated cell wins
        let mut c = Histogram::new("c", "", vec![ax()], StatsMode::Average).unwrap();
        let empty = Histogram::new("e", "", vec![ax()], StatsMode::Average).unwrap();
        c.fill_measured(&[0.5], 7.0, 2.0).unwrap();
        c.add(&empty).unwrap();
        assert_relative_eq!(c.value_at(&[1]).unwrap(), 7.0);
        assert_relative_eq!(c.error_at(&[1]).unwrap(), 2.0_f64.sqrt());

        // both empty stays (0, 0)
        let mut d = Histogram::new("d", "", vec![ax()], StatsMode::Average).unwrap();
        d.add(&empty).unwrap();
        assert_eq!(d.value_at(&[1]).unwrap(), 0.0);
        assert_eq!(d.error_at(&[1]).unwrap(), 0.0);
    }

    #[test]
    fn fill_measured_running_update() {
        let mut h = Histogram::new(
            "m",
            "",
            vec![Axis::uniform(1, 0.0, 1.0).unwrap()],
            StatsMode::Average,
        )
        .unwrap();
        h.fill_measured(&[0.5], 2.0, 1.0).unwrap();
        assert_relative_eq!(h.value_at(&[1]).unwrap(), 2.0);
        h.fill_measured(&[0.5], 4.0, 1.0).unwrap();
        assert_relative_eq!(h.value_at(&[1]).unwrap(), 3.0);
        assert_relative_eq!(h.error_at(&[1]).unwrap(), 0.5_f64.sqrt());
        assert!(h.fill_measured(&[0.5], 1.0, 0.0).is_err());
    }

    #[test]
    fn divide_propagates_errors() {
        let ax = || Axis::uniform(1, 0.0, 1.0).unwrap();
        let mut a = Histogram::new_1d("a", "", ax());
        let mut b = Histogram::new_1d("b", "", ax());
        a.fill(&[0.5], 3.0).unwrap();
        a.fill(&[0.5], 3.0).unwrap();
        b.fill(&[0.5], 2.0).unwrap();
        // a = 6 ± 3√2, b = 2 ± 2
        a.divide(&b).unwrap();
        assert_relative_eq!(a.value_at(&[1]).unwrap(), 3.0);
        // e² = (18·4 + 4·36)/16 = 13.5
        assert_relative_eq!(a.error_at(&[1]).unwrap(), 13.5_f64.sqrt());
    }

    #[test]
    fn divide_zero_cells() {
        let ax = || Axis::uniform(2, 0.0, 2.0).unwrap();
        let mut a = Histogram::new_1d("a", "", ax());
        let b = Histogram::new_1d("b", "", ax());
        a.fill(&[0.5], 5.0).unwrap();
        a.divide(&b).unwrap();
        assert_eq!(a.value_at(&[1]).unwrap(), 0.0);
        assert_eq!(a.error_at(&[1]).unwrap(), 0.0);
    }

    #[test]
    fn scale_contents_and_variances() {
        let mut h = h1("h");
        h.fill(&[0.5], 2.0).unwrap();
        h.scale(3.0);
        assert_eq!(h.value_at(&[1]).unwrap(), 6.0);
        assert_relative_eq!(h.error_at(&[1]).unwrap(), 6.0);
    }

    #[test]
    fn three_dim_layout() {
        let mut h = Histogram::new_3d(
            "h3",
            "",
            Axis::uniform(2, 0.0, 2.0).unwrap(),
            Axis::uniform(3, 0.0, 3.0).unwrap(),
            Axis::uniform(4, 0.0, 4.0).unwrap(),
        );
        h.fill(&[1.5, 2.5, 3.5], 1.0).unwrap();
        assert_eq!(h.value_at(&[2, 3, 4]).unwrap(), 1.0);
        assert_eq!(h.integral(), 1.0);
        h.fill(&[-1.0, 2.5, 3.5], 1.0).unwrap();
        assert_eq!(h.integral(), 1.0);
    }

    #[test]
    fn serde_round_trip() {
        let mut h = h1("h");
        h.fill(&[1.5], 2.5).unwrap();
        let json = serde_json::to_string(&h).unwrap();
        let back: Histogram = serde_json::from_str(&json).unwrap();
        assert_eq!(h, back);
    }
}
