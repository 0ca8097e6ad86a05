//! Numeric helpers shared by the checks.
//!
//! All functions take plain `f64` slices with nulls already removed. Functions
//! that are undefined for their input return `None` rather than NaN.

use crate::prelude::*;
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Floor applied to empty bins before taking logarithms in PSI.
pub const PSI_EPSILON: f64 = 0.0001;

pub fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(sum(values) / values.len() as f64)
    }
}

pub fn min(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

pub fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

/// Sorts a copy of `values` in ascending order.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(f64::total_cmp);
    out
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(percentile_sorted(&sorted(values), 0.5))
}

/// Sample standard deviation (n - 1 denominator).
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (n - 1) as f64).sqrt())
}

fn central_moments(values: &[f64]) -> Option<(f64, f64, f64, f64)> {
    let n = values.len() as f64;
    let m = mean(values)?;
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for v in values {
        let d = v - m;
        m2 += d * d;
        m3 += d * d * d;
        m4 += d * d * d * d;
    }
    Some((n, m2 / n, m3 / n, m4 / n))
}

/// Adjusted Fisher-Pearson skewness (G1). Zero for fewer than 3 values or
/// a constant series.
pub fn skewness(values: &[f64]) -> f64 {
    let Some((n, m2, m3, _)) = central_moments(values) else {
        return 0.0;
    };
    if n < 3.0 || m2 <= f64::EPSILON * f64::EPSILON {
        return 0.0;
    }
    let g1 = m3 / m2.powf(1.5);
    (n * (n - 1.0)).sqrt() / (n - 2.0) * g1
}

/// Bias-corrected excess kurtosis (G2). Zero for fewer than 4 values or a
/// constant series.
pub fn kurtosis(values: &[f64]) -> f64 {
    let Some((n, m2, _, m4)) = central_moments(values) else {
        return 0.0;
    };
    if n < 4.0 || m2 <= f64::EPSILON * f64::EPSILON {
        return 0.0;
    }
    let g2 = m4 / (m2 * m2) - 3.0;
    ((n + 1.0) * g2 + 6.0) * (n - 1.0) / ((n - 2.0) * (n - 3.0))
}

/// Linear-interpolated percentile of an already sorted, non-empty slice.
pub fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Pearson correlation coefficient. `None` for fewer than two pairs or a
/// constant series.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let (x, y) = (&x[..n], &y[..n]);
    let mx = mean(x)?;
    let my = mean(y)?;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let (dx, dy) = (a - mx, b - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

/// Two-sided p-value for a Pearson coefficient from `n` pairs (Student t, n - 2 df).
pub fn pearson_p_value(r: f64, n: usize) -> Result<f64> {
    if n < 3 {
        return Err(SentriError::insufficient(
            "correlation significance needs at least 3 pairs",
            3,
            n,
        ));
    }
    if r.abs() >= 1.0 {
        return Ok(0.0);
    }
    let df = (n - 2) as f64;
    let t = r * (df / (1.0 - r * r)).sqrt();
    let dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| SentriError::calculation(format!("t distribution: {e}")))?;
    Ok((2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0))
}

/// Result of a two-sample Kolmogorov-Smirnov test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KsResult {
    pub statistic: f64,
    pub p_value: f64,
}

/// Two-sample KS test with the asymptotic p-value.
pub fn ks_two_sample(a: &[f64], b: &[f64]) -> Result<KsResult> {
    for (label, sample) in [("current", a), ("baseline", b)] {
        if sample.len() < 2 {
            return Err(SentriError::insufficient(
                format!("KS test {label} sample too small"),
                2,
                sample.len(),
            ));
        }
    }
    let (a, b) = (sorted(a), sorted(b));
    let (n, m) = (a.len() as f64, b.len() as f64);
    let (mut i, mut j) = (0usize, 0usize);
    let mut d: f64 = 0.0;
    while i < a.len() && j < b.len() {
        let x = a[i].min(b[j]);
        while i < a.len() && a[i] <= x {
            i += 1;
        }
        while j < b.len() && b[j] <= x {
            j += 1;
        }
        d = d.max((i as f64 / n - j as f64 / m).abs());
    }
    let en = (n * m / (n + m)).sqrt();
    let p_value = kolmogorov_q((en + 0.12 + 0.11 / en) * d);
    Ok(KsResult {
        statistic: d,
        p_value,
    })
}

/// Complementary Kolmogorov distribution Q_KS(lambda).
fn kolmogorov_q(lambda: f64) -> f64 {
    let a2 = -2.0 * lambda * lambda;
    let mut fac = 2.0;
    let mut total = 0.0;
    let mut previous: f64 = 0.0;
    for j in 1..=100 {
        let j = j as f64;
        let term = fac * (a2 * j * j).exp();
        total += term;
        if term.abs() <= 0.001 * previous || term.abs() <= 1.0e-8 * total {
            return total.clamp(0.0, 1.0);
        }
        fac = -fac;
        previous = term.abs();
    }
    1.0
}

/// Bin layout derived from a baseline sample.
#[derive(Debug, Clone, PartialEq)]
pub enum Binning {
    /// Interior cut points; values `<= cuts[k]` fall in bin `k`, the outer
    /// bins are open-ended.
    Quantile(Vec<f64>),
    /// Baseline was constant: below, equal and above the value.
    Constant(f64),
}

impl Binning {
    /// Derives quantile bins from `baseline`, deduplicating equal edges.
    pub fn from_baseline(baseline: &[f64], bins: usize) -> Result<Self> {
        if bins < 2 {
            return Err(SentriError::config(format!(
                "bin count must be at least 2, got {bins}"
            )));
        }
        let sorted = sorted(baseline);
        let (Some(lo), Some(hi)) = (sorted.first(), sorted.last()) else {
            return Err(SentriError::insufficient("baseline sample is empty", 1, 0));
        };
        if lo == hi {
            return Ok(Binning::Constant(*lo));
        }
        let mut cuts: Vec<f64> = (1..bins)
            .map(|k| percentile_sorted(&sorted, k as f64 / bins as f64))
            .collect();
        cuts.dedup();
        Ok(Binning::Quantile(cuts))
    }

    pub fn bin_count(&self) -> usize {
        match self {
            Binning::Quantile(cuts) => cuts.len() + 1,
            Binning::Constant(_) => 3,
        }
    }

    pub fn index(&self, value: f64) -> usize {
        match self {
            Binning::Quantile(cuts) => cuts.partition_point(|c| *c < value),
            Binning::Constant(c) => match value.total_cmp(c) {
                std::cmp::Ordering::Less => 0,
                std::cmp::Ordering::Equal => 1,
                std::cmp::Ordering::Greater => 2,
            },
        }
    }

    /// Fraction of `values` falling into each bin.
    pub fn proportions(&self, values: &[f64]) -> Vec<f64> {
        let mut counts = vec![0usize; self.bin_count()];
        for v in values {
            counts[self.index(*v)] += 1;
        }
        let total = values.len().max(1) as f64;
        counts.into_iter().map(|c| c as f64 / total).collect()
    }
}

/// Population Stability Index between baseline and current bin proportions.
pub fn psi(expected: &[f64], actual: &[f64]) -> f64 {
    expected
        .iter()
        .zip(actual)
        .map(|(e, a)| {
            let e = e.max(PSI_EPSILON);
            let a = a.max(PSI_EPSILON);
            (a - e) * (a / e).ln()
        })
        .sum()
}

/// Jensen-Shannon divergence (natural log) between two proportion vectors.
pub fn jensen_shannon(p: &[f64], q: &[f64]) -> f64 {
    fn kl(a: &[f64], b: &[f64]) -> f64 {
        a.iter()
            .zip(b)
            .filter(|(x, y)| **x > 0.0 && **y > 0.0)
            .map(|(x, y)| x * (x / y).ln())
            .sum()
    }
    let m: Vec<f64> = p.iter().zip(q).map(|(a, b)| (a + b) / 2.0).collect();
    (0.5 * kl(p, &m) + 0.5 * kl(q, &m)).max(0.0)
}

/// Rounds to six decimal places.
pub fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}
