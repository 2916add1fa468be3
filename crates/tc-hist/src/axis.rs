//! Bin edge tables and histogram axes.

use serde::{Deserialize, Serialize};
use tc_core::{Error, Result};

/// An ordered table of bin boundaries.
///
/// `n` edges define `n - 1` half-open intervals `[edge[i], edge[i+1])`.
/// Construction validates that the edges are finite and strictly increasing;
/// the table is immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinEdges(Vec<f64>);

impl BinEdges {
    /// Build a table from explicit edge values.
    pub fn new(edges: Vec<f64>) -> Result<Self> {
        if edges.len() < 2 {
            return Err(Error::Validation(format!(
                "bin edge table needs at least 2 edges, got {}",
                edges.len()
            )));
        }
        for w in edges.windows(2) {
            if !w[0].is_finite() || !w[1].is_finite() || w[0] >= w[1] {
                return Err(Error::Validation(format!(
                    "bin edges must be finite and strictly increasing, got {} then {}",
                    w[0], w[1]
                )));
            }
        }
        Ok(Self(edges))
    }

    /// Build a table of `n_bins` equal-width intervals over `[low, high)`.
    pub fn uniform(n_bins: usize, low: f64, high: f64) -> Result<Self> {
        if n_bins == 0 {
            return Err(Error::Validation("axis needs at least one bin".into()));
        }
        let width = (high - low) / n_bins as f64;
        let edges = (0..=n_bins)
            .map(|i| {
                if i == n_bins {
                    high
                } else {
                    low + width * i as f64
                }
            })
            .collect();
        Self::new(edges)
    }

    /// Number of intervals.
    pub fn n_bins(&self) -> usize {
        self.0.len() - 1
    }

    /// Lowest edge.
    pub fn low(&self) -> f64 {
        self.0[0]
    }

    /// Highest edge.
    pub fn high(&self) -> f64 {
        self.0[self.0.len() - 1]
    }

    /// The raw edge values.
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// The interval containing `v`, or `None` for values below the first or
    /// at/above the last edge (and for NaN).
    pub fn locate(&self, v: f64) -> Option<usize> {
        if !(v >= self.low()) || v >= self.high() {
            return None;
        }
        Some(self.0.partition_point(|e| *e <= v) - 1)
    }
}

/// One histogram axis: a bin edge table plus flow slots.
///
/// Storage bin indices are `0` (underflow), `1..=n_bins` (in range) and
/// `n_bins + 1` (overflow). [`Axis::find_bin`] is total: every value maps to
/// a storage slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    edges: BinEdges,
}

impl Axis {
    /// Wrap a validated edge table.
    pub fn new(edges: BinEdges) -> Self {
        Self { edges }
    }

    /// Uniform axis over `[low, high)`.
    pub fn uniform(n_bins: usize, low: f64, high: f64) -> Result<Self> {
        Ok(Self::new(BinEdges::uniform(n_bins, low, high)?))
    }

    /// Number of in-range bins.
    pub fn n_bins(&self) -> usize {
        self.edges.n_bins()
    }

    /// Number of storage slots including both flow bins.
    pub fn storage_bins(&self) -> usize {
        self.n_bins() + 2
    }

    /// Lowest edge.
    pub fn low(&self) -> f64 {
        self.edges.low()
    }

    /// Highest edge.
    pub fn high(&self) -> f64 {
        self.edges.high()
    }

    /// The underlying edge table.
    pub fn edges(&self) -> &BinEdges {
        &self.edges
    }

    /// Storage slot for a value. Values below range map to `0`, values
    /// at/above the last edge (and NaN) to `n_bins + 1`.
    pub fn find_bin(&self, v: f64) -> usize {
        match self.edges.locate(v) {
            Some(i) => i + 1,
            None if v < self.low() => 0,
            None => self.n_bins() + 1,
        }
    }

    /// Center of a storage bin. Flow bins extrapolate by the width of the
    /// adjacent edge interval.
    pub fn center(&self, bin: usize) -> f64 {
        let e = self.edges.as_slice();
        let n = self.n_bins();
        if bin == 0 {
            e[0] - 0.5 * (e[1] - e[0])
        } else if bin > n {
            e[n] + 0.5 * (e[n] - e[n - 1])
        } else {
            0.5 * (e[bin - 1] + e[bin])
        }
    }
}
