//! The legacy dimensionless form of the oscillator.
//!
//! States are scaled by `KmP = 34 nM` (`n = N/34`, `p = P/34`) and the
//! template by 53 nM. Time runs on a fixed grid `τ_i = i / 2.6` for
//! `i = 0..=2600`; each step uses `h_i = τ_{i+1} - τ_i` as computed on that
//! grid. Results are reported back in nM.

use crate::simulate::PREY_OFFSET_NM;
use crate::solvers::RK4;
use crate::traits::{DynamicalSystem, Steppable};
use serde::{Deserialize, Serialize};

pub const KM_P_NM: f64 = 34.0;
pub const TEMPLATE_SCALE_NM: f64 = 53.0;
pub const GRID_POINTS: usize = 2601;
pub const TAU_PER_INDEX: f64 = 2.6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionlessParameters {
    pub beta: f64,
    pub delta: f64,
    pub lambda: f64,
    /// Initial prey proxy (nM).
    pub n0_nm: f64,
    /// Initial predator (nM).
    pub p0_nm: f64,
    /// Template concentration (nM).
    pub g_nm: f64,
}

/// `dn/dτ = g·n/(1 + β·g·n) − p·n − λ·δ·n/(1 + p)`,
/// `dp/dτ = p·n − δ·p/(1 + p)`.
#[derive(Debug, Clone, Copy)]
pub struct DimensionlessSystem {
    beta: f64,
    delta: f64,
    lambda: f64,
    g: f64,
}

impl DimensionlessSystem {
    pub fn new(params: &DimensionlessParameters) -> Self {
        Self {
            beta: params.beta,
            delta: params.delta,
            lambda: params.lambda,
            g: params.g_nm / TEMPLATE_SCALE_NM,
        }
    }
}

impl DynamicalSystem<f64> for DimensionlessSystem {
    fn dimension(&self) -> usize {
        2
    }

    fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) {
        let (n, p) = (x[0], x[1]);
        out[0] = (self.g * n) / (1.0 + self.beta * self.g * n)
            - (p * n)
            - ((self.lambda * self.delta * n) / (1.0 + p));
        out[1] = (p * n) - ((self.delta * p) / (1.0 + p));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionlessTrajectory {
    pub tau: Vec<f64>,
    /// Displayed prey, `400 - N` in nM.
    pub prey_nm: Vec<f64>,
    pub predator_nm: Vec<f64>,
}

fn tau_grid() -> Vec<f64> {
    (0..GRID_POINTS).map(|i| i as f64 / TAU_PER_INDEX).collect()
}

pub fn simulate_dimensionless(params: &DimensionlessParameters) -> DimensionlessTrajectory {
    let system = DimensionlessSystem::new(params);
    let tau = tau_grid();
    let mut solver = RK4::new(system.dimension());
    let mut state = [params.n0_nm / KM_P_NM, params.p0_nm / KM_P_NM];

    let mut prey_nm = Vec::with_capacity(GRID_POINTS);
    let mut predator_nm = Vec::with_capacity(GRID_POINTS);
    prey_nm.push(PREY_OFFSET_NM - state[0] * KM_P_NM);
    predator_nm.push(state[1] * KM_P_NM);

    for window in tau.windows(2) {
        let mut t = window[0];
        let h = window[1] - window[0];
        solver.step(&system, &mut t, &mut state, h);
        prey_nm.push(PREY_OFFSET_NM - state[0] * KM_P_NM);
        predator_nm.push(state[1] * KM_P_NM);
    }

    DimensionlessTrajectory {
        tau,
        prey_nm,
        predator_nm,
    }
}
