//! Scalar metrics over the tail of a predator series.
//!
//! The tail window drops the transient start-up so the metrics describe the
//! settled oscillation. Every estimator returns NaN when the window does not
//! determine a value.

use crate::error::{OscillatorError, Result};
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The dominant spectral bin must carry this multiple of the mean bin power.
const SPECTRAL_PEAK_RATIO: f64 = 3.0;
const MIN_SPECTRAL_SAMPLES: usize = 4;

/// Percentage of a series, counted from the end, that metrics look at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct TailFraction(f64);

impl TailFraction {
    pub const FULL: Self = Self(100.0);
    pub const HALF: Self = Self(50.0);

    pub fn new(percent: f64) -> Result<Self> {
        if percent.is_finite() && percent > 0.0 && percent <= 100.0 {
            Ok(Self(percent))
        } else {
            Err(OscillatorError::InvalidTailPercent(percent))
        }
    }

    pub fn percent(self) -> f64 {
        self.0
    }

    /// Number of trailing samples in a series of length `len`.
    pub fn tail_len(self, len: usize) -> usize {
        let tail = (len as f64 * (self.0 / 100.0)).floor() as usize;
        tail.min(len)
    }

    /// Index of the first sample in the window.
    pub fn start(self, len: usize) -> usize {
        len - self.tail_len(len)
    }

    pub fn window(self, series: &[f64]) -> &[f64] {
        &series[self.start(series.len())..]
    }
}

impl Default for TailFraction {
    fn default() -> Self {
        Self::HALF
    }
}

impl TryFrom<f64> for TailFraction {
    type Error = OscillatorError;

    fn try_from(percent: f64) -> Result<Self> {
        Self::new(percent)
    }
}

impl From<TailFraction> for f64 {
    fn from(tail: TailFraction) -> f64 {
        tail.0
    }
}

/// How the oscillation period is estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodEstimator {
    /// Mean spacing of strict local maxima.
    #[default]
    PeakCounting,
    /// Dominant non-DC bin of the power spectrum.
    SpectralPeak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Amplitude,
    Period,
    PeriodSpectral,
}

impl Metric {
    pub fn period(estimator: PeriodEstimator) -> Self {
        match estimator {
            PeriodEstimator::PeakCounting => Metric::Period,
            PeriodEstimator::SpectralPeak => Metric::PeriodSpectral,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Amplitude => "amplitude",
            Metric::Period => "period",
            Metric::PeriodSpectral => "period_spectral",
        }
    }

    /// Evaluates the metric on an already-extracted tail window.
    pub fn evaluate_window(self, window: &[f64], dt: f64) -> f64 {
        match self {
            Metric::Amplitude => amplitude(window),
            Metric::Period => peak_period(window, dt),
            Metric::PeriodSpectral => spectral_period(window, dt),
        }
    }

    /// Evaluates the metric on the tail of a full series.
    pub fn evaluate(self, series: &[f64], tail: TailFraction, dt: f64) -> f64 {
        self.evaluate_window(tail.window(series), dt)
    }
}

impl Default for Metric {
    fn default() -> Self {
        Metric::Amplitude
    }
}

impl FromStr for Metric {
    type Err = OscillatorError;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "amplitude" => Ok(Metric::Amplitude),
            "period" => Ok(Metric::Period),
            "period_spectral" | "period-spectral" => Ok(Metric::PeriodSpectral),
            other => Err(OscillatorError::UnknownMetric(other.to_string())),
        }
    }
}

/// `(min, max)` of a window, or `None` when it is empty or holds a NaN.
pub fn extrema(window: &[f64]) -> Option<(f64, f64)> {
    if window.is_empty() {
        return None;
    }
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in window {
        if v.is_nan() {
            return None;
        }
        if v < min {
            min = v;
        }
        if v > max {
            max = v;
        }
    }
    Some((min, max))
}

/// `(min, max)` over the tail window of a full series.
pub fn tail_extrema(series: &[f64], tail: TailFraction) -> Option<(f64, f64)> {
    extrema(tail.window(series))
}

/// Peak-to-trough range of a window.
pub fn amplitude(window: &[f64]) -> f64 {
    match extrema(window) {
        Some((min, max)) => max - min,
        None => f64::NAN,
    }
}

/// Mean spacing of strict local maxima, in time units.
pub fn peak_period(window: &[f64], dt: f64) -> f64 {
    let mut first = None;
    let mut last = 0usize;
    let mut count = 0usize;
    for (offset, w) in window.windows(3).enumerate() {
        if w[1] > w[0] && w[1] > w[2] {
            let index = offset + 1;
            first.get_or_insert(index);
            last = index;
            count += 1;
        }
    }
    match first {
        Some(first) if count >= 2 => {
            let mean_step = (last - first) as f64 / (count - 1) as f64;
            mean_step * dt
        }
        _ => f64::NAN,
    }
}

/// Period of the dominant frequency of the mean-removed window.
///
/// The strongest bin among `1..=n/2` must exceed three times the mean power
/// of those bins; otherwise the signal is treated as having no period.
pub fn spectral_period(window: &[f64], dt: f64) -> f64 {
    let n = window.len();
    if n < MIN_SPECTRAL_SAMPLES {
        return f64::NAN;
    }
    let mean = window.iter().sum::<f64>() / n as f64;
    let mut buffer: Vec<Complex<f64>> = window
        .iter()
        .map(|&v| Complex::new(v - mean, 0.0))
        .collect();
    let mut planner = FftPlanner::<f64>::new();
    planner.plan_fft_forward(n).process(&mut buffer);

    let half = n / 2;
    let mut total = 0.0;
    let mut best: Option<(usize, f64)> = None;
    for (k, bin) in buffer.iter().enumerate().take(half + 1).skip(1) {
        let power = bin.norm_sqr();
        total += power;
        if best.map_or(power.is_finite(), |(_, top)| power > top) {
            best = Some((k, power));
        }
    }

    let mean_power = total / half as f64;
    match best {
        Some((k, power)) if power > SPECTRAL_PEAK_RATIO * mean_power => {
            (n as f64 * dt) / k as f64
        }
        _ => f64::NAN,
    }
}
