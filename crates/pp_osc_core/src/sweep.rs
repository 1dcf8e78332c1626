//! Parameter sweeps: bifurcation diagrams, metric heatmaps and the
//! (g, β) period contour.
//!
//! Every cell is an independent simulation. With the `parallel` feature the
//! cells are spread over the rayon pool; results are identical either way
//! because each cell only reads its own parameter set.

use crate::error::{OscillatorError, Result};
use crate::metrics::{tail_extrema, Metric, TailFraction};
use crate::model::PhysicalParameters;
use crate::modification::{celsius_to_kelvin, r_assoc_from_delta, DimensionlessGroups};
use crate::simulate::{evaluate_tail, simulate};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Temperature at which `assoc_ddg` sweep values are converted to ratios.
pub const SWEEP_TEMPERATURE_C: f64 = 37.0;

/// A scalar field of [`PhysicalParameters`] addressable by its front-end name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterName {
    Pol,
    Rec,
    G,
    K1,
    K2,
    KN,
    KP,
    B,
    KmP,
    N0,
    P0,
    TEndMin,
    DtMin,
}

impl ParameterName {
    pub const ALL: [ParameterName; 13] = [
        ParameterName::Pol,
        ParameterName::Rec,
        ParameterName::G,
        ParameterName::K1,
        ParameterName::K2,
        ParameterName::KN,
        ParameterName::KP,
        ParameterName::B,
        ParameterName::KmP,
        ParameterName::N0,
        ParameterName::P0,
        ParameterName::TEndMin,
        ParameterName::DtMin,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ParameterName::Pol => "pol",
            ParameterName::Rec => "rec",
            ParameterName::G => "G",
            ParameterName::K1 => "k1",
            ParameterName::K2 => "k2",
            ParameterName::KN => "kN",
            ParameterName::KP => "kP",
            ParameterName::B => "b",
            ParameterName::KmP => "KmP",
            ParameterName::N0 => "N0",
            ParameterName::P0 => "P0",
            ParameterName::TEndMin => "t_end_min",
            ParameterName::DtMin => "dt_min",
        }
    }

    fn field(self, params: &mut PhysicalParameters) -> &mut f64 {
        match self {
            ParameterName::Pol => &mut params.pol,
            ParameterName::Rec => &mut params.rec,
            ParameterName::G => &mut params.g,
            ParameterName::K1 => &mut params.k1,
            ParameterName::K2 => &mut params.k2,
            ParameterName::KN => &mut params.k_n,
            ParameterName::KP => &mut params.k_p,
            ParameterName::B => &mut params.b,
            ParameterName::KmP => &mut params.km_p,
            ParameterName::N0 => &mut params.n0,
            ParameterName::P0 => &mut params.p0,
            ParameterName::TEndMin => &mut params.t_end_min,
            ParameterName::DtMin => &mut params.dt_min,
        }
    }

    pub fn get(self, params: &PhysicalParameters) -> f64 {
        let mut copy = *params;
        *self.field(&mut copy)
    }

    pub fn set(self, params: &mut PhysicalParameters, value: f64) {
        *self.field(params) = value;
    }
}

impl FromStr for ParameterName {
    type Err = OscillatorError;

    fn from_str(name: &str) -> Result<Self> {
        ParameterName::ALL
            .into_iter()
            .find(|p| p.as_str() == name)
            .ok_or_else(|| OscillatorError::UnknownParameter(name.to_string()))
    }
}

/// What a sweep coordinate controls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SweepAxis {
    Parameter(ParameterName),
    /// Free-energy change of association (kcal/mol) at `temperature_k`;
    /// multiplies the association ratio.
    AssocDeltaG { temperature_k: f64 },
    /// Association ratio, floored at 0; multiplies the association ratio.
    AssocRatio,
}

impl SweepAxis {
    pub fn apply(&self, params: &mut PhysicalParameters, value: f64) {
        match *self {
            SweepAxis::Parameter(name) => name.set(params, value),
            SweepAxis::AssocDeltaG { temperature_k } => {
                params.ratios.r_assoc *= r_assoc_from_delta(value, temperature_k);
            }
            SweepAxis::AssocRatio => params.ratios.r_assoc *= value.max(0.0),
        }
    }
}

impl FromStr for SweepAxis {
    type Err = OscillatorError;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "assoc_ddg" => Ok(SweepAxis::AssocDeltaG {
                temperature_k: celsius_to_kelvin(SWEEP_TEMPERATURE_C),
            }),
            "assoc_r" => Ok(SweepAxis::AssocRatio),
            other => other.parse().map(SweepAxis::Parameter),
        }
    }
}

/// Evenly spaced values `min + (max - min) * i / (steps - 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepRange {
    pub min: f64,
    pub max: f64,
    pub steps: usize,
}

impl SweepRange {
    pub fn new(min: f64, max: f64, steps: usize) -> Self {
        Self { min, max, steps }
    }

    fn validate(&self, what: &str, min_steps: usize) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(OscillatorError::InvalidSweep(format!(
                "{what} range bounds must be finite"
            )));
        }
        if self.steps < min_steps {
            return Err(OscillatorError::InvalidSweep(format!(
                "{what} range needs at least {min_steps} step(s), got {}",
                self.steps
            )));
        }
        Ok(())
    }

    /// A single step yields `min`.
    pub fn values(&self) -> Vec<f64> {
        let denom = if self.steps > 1 { (self.steps - 1) as f64 } else { 1.0 };
        (0..self.steps)
            .map(|i| self.min + (self.max - self.min) * (i as f64 / denom))
            .collect()
    }
}

fn map_cells<T, U, F>(cells: &[T], f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        cells.par_iter().map(f).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        cells.iter().map(f).collect()
    }
}

fn finite_or_nan(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        f64::NAN
    }
}

/// Tail extrema of the predator at one swept value; NaN when undefined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BifurcationPoint {
    pub value: f64,
    pub p_min: f64,
    pub p_max: f64,
}

pub fn bifurcation_sweep(
    base: &PhysicalParameters,
    axis: SweepAxis,
    range: SweepRange,
    tail: TailFraction,
) -> Result<Vec<BifurcationPoint>> {
    range.validate("bifurcation", 1)?;
    let values = range.values();
    info!("bifurcation sweep over {} values", values.len());

    let pairs = map_cells(&values, |&value| {
        let mut params = *base;
        axis.apply(&mut params, value);
        let trajectory = simulate(&params);
        tail_extrema(trajectory.p(), tail).unwrap_or((f64::NAN, f64::NAN))
    });

    Ok(values
        .into_iter()
        .zip(pairs)
        .map(|(value, (p_min, p_max))| BifurcationPoint { value, p_min, p_max })
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatmapSpec {
    pub x_axis: SweepAxis,
    pub x_range: SweepRange,
    pub y_axis: SweepAxis,
    pub y_range: SweepRange,
    pub metric: Metric,
    pub tail: TailFraction,
}

/// Row-major grid: `values[j * nx + i]` belongs to `(x_values[i], y_values[j])`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapGrid {
    pub nx: usize,
    pub ny: usize,
    pub x_values: Vec<f64>,
    pub y_values: Vec<f64>,
    pub metric: Metric,
    pub values: Vec<f64>,
}

impl HeatmapGrid {
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        if i < self.nx && j < self.ny {
            Some(self.values[j * self.nx + i])
        } else {
            None
        }
    }

    /// `(min, max)` over the finite cells.
    pub fn finite_range(&self) -> Option<(f64, f64)> {
        let mut finite = self.values.iter().copied().filter(|v| v.is_finite());
        let first = finite.next()?;
        Some(finite.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }
}

pub fn heatmap_sweep(base: &PhysicalParameters, spec: &HeatmapSpec) -> Result<HeatmapGrid> {
    if spec.x_axis == spec.y_axis {
        return Err(OscillatorError::InvalidSweep(
            "x and y axes must control different parameters".to_string(),
        ));
    }
    spec.x_range.validate("x", 2)?;
    spec.y_range.validate("y", 2)?;

    let x_values = spec.x_range.values();
    let y_values = spec.y_range.values();
    let (nx, ny) = (x_values.len(), y_values.len());
    info!(
        "heatmap sweep {}x{} of {} over the last {}%",
        nx,
        ny,
        spec.metric.as_str(),
        spec.tail.percent()
    );

    let cells: Vec<(f64, f64)> = y_values
        .iter()
        .flat_map(|&y| x_values.iter().map(move |&x| (x, y)))
        .collect();
    let values = map_cells(&cells, |&(x, y)| {
        let mut params = *base;
        spec.x_axis.apply(&mut params, x);
        spec.y_axis.apply(&mut params, y);
        finite_or_nan(evaluate_tail(&params, spec.metric, spec.tail))
    });
    debug!(
        "heatmap finished with {} finite cells",
        values.iter().filter(|v| v.is_finite()).count()
    );

    Ok(HeatmapGrid {
        nx,
        ny,
        x_values,
        y_values,
        metric: spec.metric,
        values,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContourSpec {
    pub g_range: SweepRange,
    pub beta_range: SweepRange,
    pub tail: TailFraction,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ContourCell {
    pub g: f64,
    pub beta: f64,
    pub k1: f64,
    pub b: f64,
    pub period: f64,
}

/// Period over a grid of dimensionless groups. Each `(g, β)` is turned
/// into `(k1, b)` at the `k2`, `KmP` and `G` of `base`. Cells run β-major.
pub fn period_contour(base: &PhysicalParameters, spec: &ContourSpec) -> Result<Vec<ContourCell>> {
    spec.g_range.validate("g", 2)?;
    spec.beta_range.validate("beta", 2)?;
    let g_values = spec.g_range.values();
    let beta_values = spec.beta_range.values();
    info!("period contour {}x{}", g_values.len(), beta_values.len());

    let mut cells: Vec<ContourCell> = beta_values
        .iter()
        .flat_map(|&beta| g_values.iter().map(move |&g| (g, beta)))
        .map(|(g, beta)| {
            let (k1, b) = DimensionlessGroups { g, beta }.to_rate_constants(base);
            ContourCell {
                g,
                beta,
                k1,
                b,
                period: f64::NAN,
            }
        })
        .collect();

    let periods = map_cells(&cells, |cell| {
        let params = PhysicalParameters {
            k1: cell.k1,
            b: cell.b,
            ..*base
        };
        finite_or_nan(evaluate_tail(&params, Metric::Period, spec.tail))
    });
    for (cell, period) in cells.iter_mut().zip(periods) {
        cell.period = period;
    }
    Ok(cells)
}
