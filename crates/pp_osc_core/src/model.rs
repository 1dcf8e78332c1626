//! Physical parameterisation of the oscillator and its right-hand side.
//!
//! The two state variables are `N` (prey proxy) and `P` (predator), both in
//! nM. Rate constants are per minute.

use crate::modification::ModificationRatios;
use crate::traits::DynamicalSystem;
use serde::{Deserialize, Serialize};

/// User-facing parameters of one simulation run.
///
/// Field names serialize to the front-end spelling (`G`, `kN`, `KmP`, ...).
/// Missing fields take the baseline PP1 values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicalParameters {
    /// Polymerase concentration scalar.
    pub pol: f64,
    /// Exonuclease (recBJ) concentration scalar.
    pub rec: f64,
    /// Template concentration (nM).
    #[serde(rename = "G")]
    pub g: f64,
    pub k1: f64,
    pub k2: f64,
    #[serde(rename = "kN")]
    pub k_n: f64,
    #[serde(rename = "kP")]
    pub k_p: f64,
    /// Saturation coefficient (nM⁻¹).
    pub b: f64,
    /// Michaelis constant of the predator-dependent saturation (nM).
    #[serde(rename = "KmP")]
    pub km_p: f64,
    #[serde(rename = "N0")]
    pub n0: f64,
    #[serde(rename = "P0")]
    pub p0: f64,
    pub t_end_min: f64,
    pub dt_min: f64,
    pub ratios: ModificationRatios,
}

impl PhysicalParameters {
    /// The optimised PP1 set used as the regression baseline.
    pub const fn baseline() -> Self {
        Self {
            pol: 3.7,
            rec: 32.5,
            g: 150.0,
            k1: 0.0020,
            k2: 0.0031,
            k_n: 0.0210,
            k_p: 0.0047,
            b: 0.000048,
            km_p: 34.0,
            n0: 10.0,
            p0: 10.0,
            t_end_min: 2000.0,
            dt_min: 0.5,
            ratios: ModificationRatios::IDENTITY,
        }
    }

    pub fn with_ratios(mut self, ratios: ModificationRatios) -> Self {
        self.ratios = ratios;
        self
    }

    pub fn initial_state(&self) -> [f64; 2] {
        [self.n0, self.p0]
    }
}

impl Default for PhysicalParameters {
    fn default() -> Self {
        Self::baseline()
    }
}

/// Coefficients consumed by the right-hand side, resolved once per run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveCoefficients {
    pub k1_eff: f64,
    pub b_eff: f64,
    pub k2: f64,
    pub k_n: f64,
    pub k_p: f64,
    pub km_p: f64,
    pub pol: f64,
    pub rec: f64,
    pub g: f64,
}

impl EffectiveCoefficients {
    pub fn resolve(params: &PhysicalParameters) -> Self {
        let scaled = params.ratios.resolve(params.k1, params.b);
        Self {
            k1_eff: scaled.k1_eff,
            b_eff: scaled.b_eff,
            k2: params.k2,
            k_n: params.k_n,
            k_p: params.k_p,
            km_p: params.km_p,
            pol: params.pol,
            rec: params.rec,
            g: params.g,
        }
    }

    /// Returns `(dN/dt, dP/dt)` at `(n, p)`.
    ///
    /// Nothing is clamped: stage states may be transiently negative and a
    /// vanishing denominator yields an infinite or NaN derivative.
    #[inline]
    pub fn derivatives(&self, n: f64, p: f64) -> (f64, f64) {
        let growth = self.k1_eff * self.pol * self.g * n / (1.0 + self.b_eff * self.g * n);
        let predation = self.k2 * self.pol * n * p;
        let saturation = 1.0 + p / self.km_p;
        let deg_n = self.rec * self.k_n * n / saturation;
        let deg_p = self.rec * self.k_p * p / saturation;
        (growth - predation - deg_n, predation - deg_p)
    }
}

/// The physical two-species model as a [`DynamicalSystem`].
#[derive(Debug, Clone, Copy)]
pub struct OscillatorSystem {
    coefficients: EffectiveCoefficients,
}

impl OscillatorSystem {
    pub fn new(coefficients: EffectiveCoefficients) -> Self {
        Self { coefficients }
    }

    pub fn from_params(params: &PhysicalParameters) -> Self {
        Self::new(EffectiveCoefficients::resolve(params))
    }

    pub fn coefficients(&self) -> &EffectiveCoefficients {
        &self.coefficients
    }
}

impl DynamicalSystem<f64> for OscillatorSystem {
    fn dimension(&self) -> usize {
        2
    }

    fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) {
        let (dn, dp) = self.coefficients.derivatives(x[0], x[1]);
        out[0] = dn;
        out[1] = dp;
    }
}
