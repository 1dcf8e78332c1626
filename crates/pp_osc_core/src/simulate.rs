//! Fixed-step integration of the physical model.
//!
//! A run advances `(N, P)` from `(N0, P0)` by `floor(t_end / dt)` classical
//! RK4 steps. Nothing is adapted, clamped or rejected: invalid arithmetic
//! stays in the samples as NaN so sweep callers can mark the cell.

use crate::error::Result;
use crate::metrics::{Metric, TailFraction};
use crate::model::{OscillatorSystem, PhysicalParameters};
use crate::solvers::RK4;
use crate::traits::{DynamicalSystem, Steppable};
use log::{debug, trace};
use serde::Serialize;

/// Display-layer offset: the prey curve is drawn as `PREY_OFFSET_NM - N`.
pub const PREY_OFFSET_NM: f64 = 400.0;

/// Number of RK4 steps for a horizon. Non-positive or undefined ratios give
/// zero steps, leaving only the initial sample.
pub fn step_count(t_end_min: f64, dt_min: f64) -> usize {
    let steps = (t_end_min / dt_min).floor();
    if steps.is_finite() && steps > 0.0 {
        steps as usize
    } else {
        0
    }
}

/// Sampled `(N, P)` at every step, sample 0 being the initial condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory {
    dt: f64,
    #[serde(rename = "N")]
    n: Vec<f64>,
    #[serde(rename = "P")]
    p: Vec<f64>,
}

impl Trajectory {
    fn with_capacity(capacity: usize, dt: f64) -> Self {
        Self {
            dt,
            n: Vec::with_capacity(capacity),
            p: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, n: f64, p: f64) {
        self.n.push(n);
        self.p.push(p);
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn len(&self) -> usize {
        self.n.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n.is_empty()
    }

    pub fn n(&self) -> &[f64] {
        &self.n
    }

    pub fn p(&self) -> &[f64] {
        &self.p
    }

    pub fn final_state(&self) -> Option<(f64, f64)> {
        Some((*self.n.last()?, *self.p.last()?))
    }

    pub fn times(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.len()).map(move |i| i as f64 * self.dt)
    }

    /// The prey curve as plotted (`400 - N`).
    pub fn prey_display(&self) -> Vec<f64> {
        self.n.iter().map(|n| PREY_OFFSET_NM - n).collect()
    }

    /// Single-precision `[N..., P...]`, the layout the browser bridge ships.
    pub fn to_concatenated_f32(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.n.len() + self.p.len());
        out.extend(self.n.iter().map(|&v| v as f32));
        out.extend(self.p.iter().map(|&v| v as f32));
        out
    }

    /// Applies a metric to the tail of the predator series.
    pub fn evaluate(&self, metric: Metric, tail: TailFraction) -> f64 {
        metric.evaluate(&self.p, tail, self.dt)
    }

    pub fn into_series(self) -> (Vec<f64>, Vec<f64>) {
        (self.n, self.p)
    }
}

/// Steps `system` `steps` times from `initial`, handing every sample
/// (including sample 0) to `record`.
pub(crate) fn integrate<S, F>(system: &S, initial: [f64; 2], steps: usize, dt: f64, mut record: F)
where
    S: DynamicalSystem<f64>,
    F: FnMut(usize, f64, f64),
{
    let mut solver = RK4::new(system.dimension());
    let mut state = initial;
    let mut t = 0.0;
    record(0, state[0], state[1]);
    for i in 1..=steps {
        solver.step(system, &mut t, &mut state, dt);
        record(i, state[0], state[1]);
    }
}

fn log_run(params: &PhysicalParameters, steps: usize) {
    debug!(
        "integrating {} RK4 steps (dt = {}, t_end = {})",
        steps, params.dt_min, params.t_end_min
    );
    let covered = steps as f64 * params.dt_min;
    if steps > 0 && covered < params.t_end_min {
        trace!(
            "horizon truncated to {} of {} (dt does not divide t_end)",
            covered,
            params.t_end_min
        );
    }
}

/// Integrates the model and returns the full trajectory of
/// `step_count(t_end, dt) + 1` samples.
pub fn simulate(params: &PhysicalParameters) -> Trajectory {
    let system = OscillatorSystem::from_params(params);
    let steps = step_count(params.t_end_min, params.dt_min);
    log_run(params, steps);

    let mut trajectory = Trajectory::with_capacity(steps + 1, params.dt_min);
    integrate(
        &system,
        params.initial_state(),
        steps,
        params.dt_min,
        |_, n, p| trajectory.push(n, p),
    );
    trajectory
}

/// Integrates the model and returns only `metric` over the tail window.
///
/// Equivalent to `simulate(params).evaluate(metric, tail)`, but only the
/// predator samples inside the tail window are kept.
pub fn simulate_and_evaluate(params: &PhysicalParameters, metric: Metric, tail_pct: f64) -> Result<f64> {
    let tail = TailFraction::new(tail_pct)?;
    Ok(evaluate_tail(params, metric, tail))
}

pub(crate) fn evaluate_tail(params: &PhysicalParameters, metric: Metric, tail: TailFraction) -> f64 {
    let system = OscillatorSystem::from_params(params);
    let steps = step_count(params.t_end_min, params.dt_min);
    log_run(params, steps);

    let len = steps + 1;
    let start = tail.start(len);
    let mut window = Vec::with_capacity(len - start);
    integrate(&system, params.initial_state(), steps, params.dt_min, |i, _, p| {
        if i >= start {
            window.push(p);
        }
    });
    metric.evaluate_window(&window, params.dt_min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modification::ModificationRatios;
    use crate::model::EffectiveCoefficients;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn step_count_truncates_and_clamps() {
        assert_eq!(step_count(2000.0, 0.5), 4000);
        assert_eq!(step_count(10.0, 3.0), 3);
        assert_eq!(step_count(0.0, 0.5), 0);
        assert_eq!(step_count(-10.0, 0.5), 0);
        assert_eq!(step_count(10.0, -0.5), 0);
        assert_eq!(step_count(10.0, 0.0), 0);
        assert_eq!(step_count(f64::NAN, 0.5), 0);
        assert_eq!(step_count(10.0, f64::NAN), 0);
    }

    #[test]
    fn trajectory_length_is_steps_plus_one() {
        init_logging();
        for &(t_end, dt) in &[(2000.0, 0.5), (100.0, 1.0), (10.0, 3.0), (1.0, 0.3), (0.2, 0.5)] {
            let params = PhysicalParameters {
                t_end_min: t_end,
                dt_min: dt,
                ..PhysicalParameters::baseline()
            };
            let trajectory = simulate(&params);
            let expected = (t_end / dt).floor() as usize + 1;
            assert_eq!(trajectory.len(), expected);
            assert_eq!(trajectory.n().len(), trajectory.p().len());
        }
    }

    #[test]
    fn invalid_horizon_returns_initial_sample_only() {
        for &(t_end, dt) in &[(0.0, 0.5), (-5.0, 0.5), (100.0, 0.0), (100.0, -1.0)] {
            let params = PhysicalParameters {
                t_end_min: t_end,
                dt_min: dt,
                ..PhysicalParameters::baseline()
            };
            let trajectory = simulate(&params);
            assert_eq!(trajectory.len(), 1);
            assert_eq!(trajectory.final_state(), Some((params.n0, params.p0)));
        }
    }

    #[test]
    fn first_step_matches_manual_rk4() {
        let params = PhysicalParameters {
            t_end_min: 1.0,
            dt_min: 1.0,
            ..PhysicalParameters::baseline()
        };
        let c = EffectiveCoefficients::resolve(&params);
        let h = params.dt_min;
        let (n, p) = (params.n0, params.p0);
        let (k1n, k1p) = c.derivatives(n, p);
        let (k2n, k2p) = c.derivatives(n + 0.5 * h * k1n, p + 0.5 * h * k1p);
        let (k3n, k3p) = c.derivatives(n + 0.5 * h * k2n, p + 0.5 * h * k2p);
        let (k4n, k4p) = c.derivatives(n + h * k3n, p + h * k3p);
        let n1 = n + (h / 6.0) * (k1n + 2.0 * k2n + 2.0 * k3n + k4n);
        let p1 = p + (h / 6.0) * (k1p + 2.0 * k2p + 2.0 * k3p + k4p);

        let trajectory = simulate(&params);
        assert_eq!(trajectory.n(), &[n, n1]);
        assert_eq!(trajectory.p(), &[p, p1]);
    }

    #[test]
    fn identical_parameters_give_bit_identical_trajectories() {
        let params = PhysicalParameters::baseline();
        let a = simulate(&params);
        let b = simulate(&params);
        assert_eq!(a, b);
        let bits = |t: &Trajectory| t.p().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn baseline_sustains_oscillation() {
        init_logging();
        let trajectory = simulate(&PhysicalParameters::baseline());
        assert_eq!(trajectory.len(), 4001);
        let amplitude = trajectory.evaluate(Metric::Amplitude, TailFraction::HALF);
        assert!(amplitude > 5.0, "tail amplitude {amplitude} is not oscillatory");
    }

    #[test]
    fn nan_parameters_poison_every_stepped_sample() {
        let cases: Vec<fn(&mut PhysicalParameters)> = vec![
            |p| p.pol = f64::NAN,
            |p| p.rec = f64::NAN,
            |p| p.g = f64::NAN,
            |p| p.k1 = f64::NAN,
            |p| p.k2 = f64::NAN,
            |p| p.k_n = f64::NAN,
            |p| p.k_p = f64::NAN,
            |p| p.b = f64::NAN,
            |p| p.km_p = f64::NAN,
            |p| p.n0 = f64::NAN,
            |p| p.p0 = f64::NAN,
            |p| p.ratios.r_assoc = f64::NAN,
            |p| p.ratios.r_poly = f64::NAN,
            |p| p.ratios.r_nick = f64::NAN,
        ];
        for poison in cases {
            let mut params = PhysicalParameters {
                t_end_min: 50.0,
                ..PhysicalParameters::baseline()
            };
            poison(&mut params);
            let trajectory = simulate(&params);
            assert_eq!(trajectory.len(), 101);
            assert!(trajectory.n()[1..].iter().all(|v| v.is_nan()));
            assert!(trajectory.p()[1..].iter().all(|v| v.is_nan()));
        }

        let horizons: [fn(&mut PhysicalParameters); 2] =
            [|p| p.t_end_min = f64::NAN, |p| p.dt_min = f64::NAN];
        for poison in horizons {
            let mut params = PhysicalParameters::baseline();
            poison(&mut params);
            assert!(simulate(&params).len() <= 1);
        }
    }

    #[test]
    fn fused_evaluation_matches_full_trajectory() {
        let mut variants = vec![
            PhysicalParameters::baseline(),
            PhysicalParameters {
                g: 90.0,
                ..PhysicalParameters::baseline()
            },
            PhysicalParameters::baseline().with_ratios(ModificationRatios::new(1.4, 0.8, 1.1)),
        ];
        variants.push(PhysicalParameters {
            k2: f64::NAN,
            ..PhysicalParameters::baseline()
        });

        for params in &variants {
            let trajectory = simulate(params);
            for metric in [Metric::Amplitude, Metric::Period, Metric::PeriodSpectral] {
                for tail_pct in [100.0, 60.0, 50.0, 12.5] {
                    let tail = TailFraction::new(tail_pct).expect("valid tail");
                    let full = metric.evaluate(trajectory.p(), tail, params.dt_min);
                    let fused = simulate_and_evaluate(params, metric, tail_pct)
                        .expect("valid tail percentage");
                    assert!(
                        full.to_bits() == fused.to_bits() || (full.is_nan() && fused.is_nan()),
                        "{metric:?} at {tail_pct}%: {full} vs {fused}"
                    );
                }
            }
        }
    }

    #[test]
    fn fused_evaluation_rejects_bad_tail() {
        let params = PhysicalParameters::baseline();
        assert!(simulate_and_evaluate(&params, Metric::Amplitude, 0.0).is_err());
        assert!(simulate_and_evaluate(&params, Metric::Amplitude, 150.0).is_err());
    }

    #[test]
    fn turnover_modification_scales_k1_over_b_threefold() {
        let base = PhysicalParameters::baseline();
        let modified = base.with_ratios(ModificationRatios::new(1.0, 3.0, 1.0));
        let c0 = EffectiveCoefficients::resolve(&base);
        let c1 = EffectiveCoefficients::resolve(&modified);
        let scale = (c1.k1_eff / c1.b_eff) / (c0.k1_eff / c0.b_eff);
        assert!((scale - 3.0).abs() < 1e-12);
        assert_ne!(simulate(&base), simulate(&modified));
    }

    #[test]
    fn trajectory_conveniences() {
        let params = PhysicalParameters {
            t_end_min: 2.0,
            dt_min: 0.5,
            ..PhysicalParameters::baseline()
        };
        let trajectory = simulate(&params);
        let times: Vec<f64> = trajectory.times().collect();
        assert_eq!(times, vec![0.0, 0.5, 1.0, 1.5, 2.0]);
        assert_eq!(trajectory.prey_display()[0], 390.0);

        let packed = trajectory.to_concatenated_f32();
        assert_eq!(packed.len(), 10);
        assert_eq!(packed[0], 10.0);
        assert_eq!(packed[5], 10.0);

        let dt = trajectory.dt();
        let (n, p) = trajectory.into_series();
        assert_eq!(n.len(), p.len());
        assert_eq!(dt, 0.5);
    }
}
