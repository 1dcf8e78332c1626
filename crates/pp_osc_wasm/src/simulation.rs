//! Trajectory exports. Series cross the boundary as `Float32Array`s laid out
//! `[first..., second...]`; structured results go through `serde-wasm-bindgen`.

use pp_osc_core::config::SimulationConfig;
use pp_osc_core::dimensionless::{simulate_dimensionless as core_dimensionless, DimensionlessParameters};
use pp_osc_core::metrics::Metric;
use pp_osc_core::model::PhysicalParameters;
use pp_osc_core::modification::ModificationRatios;
use pp_osc_core::simulate::{simulate, simulate_and_evaluate as core_simulate_and_evaluate};
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

/// Legacy dimensionless run: `[prey_nm..., predator_nm...]` over the fixed
/// τ grid.
#[wasm_bindgen(js_name = simulate)]
pub fn simulate_dimensionless(
    beta: f64,
    delta: f64,
    lam: f64,
    n0_nm: f64,
    p0_nm: f64,
    g_in: f64,
) -> Vec<f32> {
    console_error_panic_hook::set_once();
    let trajectory = core_dimensionless(&DimensionlessParameters {
        beta,
        delta,
        lambda: lam,
        n0_nm,
        p0_nm,
        g_nm: g_in,
    });
    trajectory
        .prey_nm
        .iter()
        .chain(trajectory.predator_nm.iter())
        .map(|&v| v as f32)
        .collect()
}

/// Physical run: `[N..., P...]`. `mod_factor` is the legacy single
/// multiplier on turnover and enters as the polymerase ratio.
#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn simulate_physical(
    pol: f64,
    rec: f64,
    g: f64,
    k1: f64,
    k2: f64,
    k_n: f64,
    k_p: f64,
    b: f64,
    km_p: f64,
    n0: f64,
    p0: f64,
    mod_factor: f64,
    t_end_min: f64,
    dt_min: f64,
) -> Vec<f32> {
    console_error_panic_hook::set_once();
    let params = PhysicalParameters {
        pol,
        rec,
        g,
        k1,
        k2,
        k_n,
        k_p,
        b,
        km_p,
        n0,
        p0,
        t_end_min,
        dt_min,
        ratios: ModificationRatios::new(1.0, mod_factor, 1.0),
    };
    simulate(&params).to_concatenated_f32()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfigRunResult {
    dt: f64,
    #[serde(rename = "N")]
    n: Vec<f64>,
    #[serde(rename = "P")]
    p: Vec<f64>,
    metric: Metric,
    value: f64,
}

/// Runs a JSON-shaped `SimulationConfig` and returns the series together
/// with the configured metric.
#[wasm_bindgen(js_name = simulateConfig)]
pub fn simulate_config(config: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let config: SimulationConfig = from_value(config)
        .map_err(|e| JsValue::from_str(&format!("Invalid simulation config: {}", e)))?;
    let trajectory = config.simulate();
    let value = trajectory.evaluate(config.metric, config.tail_pct);
    let dt = trajectory.dt();
    let (n, p) = trajectory.into_series();
    to_value(&ConfigRunResult {
        dt,
        n,
        p,
        metric: config.metric,
        value,
    })
    .map_err(|e| JsValue::from_str(&format!("Failed to serialize trajectory: {}", e)))
}

/// Fused simulate-and-measure; only the tail of `P` is kept in memory.
#[wasm_bindgen(js_name = simulateAndEvaluate)]
pub fn simulate_and_evaluate(params: JsValue, metric: &str, tail_pct: f64) -> Result<f64, JsValue> {
    console_error_panic_hook::set_once();
    let params: PhysicalParameters = from_value(params)
        .map_err(|e| JsValue::from_str(&format!("Invalid parameters: {}", e)))?;
    let metric: Metric = metric
        .parse()
        .map_err(|e| JsValue::from_str(&format!("Invalid metric: {}", e)))?;
    core_simulate_and_evaluate(&params, metric, tail_pct)
        .map_err(|e| JsValue::from_str(&format!("Evaluation failed: {}", e)))
}


#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::wasm_bindgen_test;

    #[wasm_bindgen_test]
    fn simulate_and_evaluate_rejects_unknown_metric() {
        let params = to_value(&PhysicalParameters::baseline()).expect("params");
        let result = simulate_and_evaluate(params, "frequency", 50.0);
        let message = result
            .err()
            .and_then(|err| err.as_string())
            .unwrap_or_default();
        assert!(message.contains("Invalid metric"));
    }

    #[wasm_bindgen_test]
    fn simulate_and_evaluate_rejects_bad_tail() {
        let params = to_value(&PhysicalParameters::baseline()).expect("params");
        assert!(simulate_and_evaluate(params, "amplitude", 0.0).is_err());
    }

    #[wasm_bindgen_test]
    fn simulate_config_returns_series_and_metric() {
        let mut config = SimulationConfig::default();
        config.params.t_end_min = 100.0;
        let value = simulate_config(to_value(&config).expect("config")).expect("run");
        let n = js_sys::Reflect::get(&value, &JsValue::from_str("N")).expect("N field");
        assert_eq!(js_sys::Array::from(&n).length(), 201);
    }
}
