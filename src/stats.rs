//! Tukey's fences over file sizes.
//!
//! Quartiles use the *exclusive* method: the i-th quartile sits at position
//! `i * (n + 1) / 4` of the sorted sample (1-based) and is linearly
//! interpolated between its neighbours. Same as R's `quantile(type = 6)`.

use serde::Serialize;

/// Fewest samples for which quartiles are meaningful.
pub const MIN_SAMPLES: usize = 4;

/// Which side of the fences a value fell on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Low,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Fences {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower: f64,
    pub upper: f64,
    pub samples: usize,
}

impl Fences {
    /// `Some` when `value` lies strictly outside the fences.
    pub fn outside(&self, value: u64) -> Option<Direction> {
        let v = value as f64;
        if v < self.lower {
            Some(Direction::Low)
        } else if v > self.upper {
            Some(Direction::High)
        } else {
            None
        }
    }
}

/// Compute fences for `sizes`. `None` with fewer than [`MIN_SAMPLES`]
/// samples, or when the IQR is zero (no spread, so nothing can stand out).
pub fn compute_fences(sizes: &[u64], multiplier: f64) -> Option<Fences> {
    if sizes.len() < MIN_SAMPLES {
        return None;
    }
    let mut sorted = sizes.to_vec();
    sorted.sort_unstable();
    let [q1, _, q3] = quartiles(&sorted);
    let iqr = q3 - q1;
    if iqr == 0.0 {
        return None;
    }
    Some(Fences {
        q1,
        q3,
        iqr,
        lower: q1 - multiplier * iqr,
        upper: q3 + multiplier * iqr,
        samples: sizes.len(),
    })
}

// Requires `sorted.len() >= 3` so every interpolation index is in bounds.
fn quartiles(sorted: &[u64]) -> [f64; 3] {
    const N: usize = 4;
    let m = sorted.len();
    let mut out = [0.0; 3];
    for (i, slot) in (1..N).zip(out.iter_mut()) {
        let j = i * (m + 1) / N;
        let delta = i * (m + 1) - j * N;
        let below = sorted[j - 1] as f64;
        let above = sorted[j] as f64;
        *slot = (below * (N - delta) as f64 + above * delta as f64) / N as f64;
    }
    out
}

/// Indices into the input slice of values below and above the fences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutlierIndices {
    pub lower: Vec<usize>,
    pub upper: Vec<usize>,
}

pub fn detect_outliers(sizes: &[u64], multiplier: f64) -> OutlierIndices {
    let Some(fences) = compute_fences(sizes, multiplier) else {
        return OutlierIndices::default();
    };
    let mut found = OutlierIndices::default();
    for (i, &size) in sizes.iter().enumerate() {
        match fences.outside(size) {
            Some(Direction::Low) => found.lower.push(i),
            Some(Direction::High) => found.upper.push(i),
            None => {}
        }
    }
    found
}

/// Upper-middle element of the sorted sample (`sorted[n / 2]`).
pub fn median(sizes: &[u64]) -> Option<u64> {
    if sizes.is_empty() {
        return None;
    }
    let mut sorted = sizes.to_vec();
    sorted.sort_unstable();
    Some(sorted[sorted.len() / 2])
}
