//! Equal-width histogram binning.
//!
//! Bins are half-open `[min + i*width, min + (i+1)*width)` except the last,
//! which also holds `max`.

use serde::{Deserialize, Serialize};

use crate::error::ChartError;

/// Bin count used when the caller does not configure one.
pub const DEFAULT_BIN_COUNT: usize = 20;

/// Frequency table over equal-width bins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// Lower bound of each bin, one decimal place.
    pub categories: Vec<String>,
    /// Number of values in each bin.
    pub frequencies: Vec<u64>,
    /// Width shared by every bin (0.0 when all values are equal).
    pub bin_width: f64,
}

impl Histogram {
    pub fn total(&self) -> u64 {
        self.frequencies.iter().sum()
    }
}

/// Bucket `values` into `bin_count` equal-width bins between their min and max.
pub fn compute_histogram(values: &[f64], bin_count: usize) -> Result<Histogram, ChartError> {
    if values.is_empty() {
        return Err(ChartError::InsufficientData(
            "histogram needs at least one value".into(),
        ));
    }
    if bin_count == 0 {
        return Err(ChartError::InvalidBinCount(bin_count));
    }
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(ChartError::MalformedSeries(format!(
            "histogram value {} is not finite",
            bad
        )));
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let n = bin_count as f64;
    // max - min overflows when the values span more than f64::MAX.
    let span = max - min;
    let width = if span.is_finite() { span / n } else { max / n - min / n };

    let mut frequencies = vec![0u64; bin_count];
    for &value in values {
        frequencies[bin_index(value, min, width, bin_count)] += 1;
    }

    let categories = (0..bin_count)
        .map(|i| {
            let mut lower = min + i as f64 * width;
            if !lower.is_finite() {
                let t = i as f64 / n;
                lower = min * (1.0 - t) + max * t;
            }
            format!("{:.1}", lower)
        })
        .collect();

    Ok(Histogram {
        categories,
        frequencies,
        bin_width: width,
    })
}

/// Bin for `value`; the value equal to max is clamped into the last bin.
fn bin_index(value: f64, min: f64, width: f64, bin_count: usize) -> usize {
    if width == 0.0 {
        return 0;
    }
    let offset = value - min;
    let raw = if offset.is_finite() {
        (offset / width).floor()
    } else {
        let n = bin_count as f64;
        ((value / n - min / n) / width * n).floor()
    };
    (raw.max(0.0) as usize).min(bin_count - 1)
}
