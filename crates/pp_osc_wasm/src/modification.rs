//! Modification ratios at the JS boundary.

use pp_osc_core::model::PhysicalParameters;
use pp_osc_core::modification::{
    celsius_to_kelvin, delta_from_r_assoc as core_delta_from_r_assoc, derive_parameters,
    r_assoc_from_delta as core_r_assoc_from_delta, Modification, ModificationRatios,
};
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

/// How a modification perturbs the elementary rates.
#[wasm_bindgen]
#[derive(Debug, Clone, Copy)]
pub struct ModificationParams {
    ratios: ModificationRatios,
    use_hairpin: bool,
    ddelta_g_fold: f64,
}

#[wasm_bindgen]
impl ModificationParams {
    #[wasm_bindgen(constructor)]
    pub fn new(r_assoc: f64, r_poly: f64, r_nick: f64) -> ModificationParams {
        ModificationParams {
            ratios: ModificationRatios::new(r_assoc, r_poly, r_nick),
            use_hairpin: false,
            ddelta_g_fold: 0.0,
        }
    }

    #[wasm_bindgen(getter)]
    pub fn r_assoc(&self) -> f64 {
        self.ratios.r_assoc
    }

    #[wasm_bindgen(setter)]
    pub fn set_r_assoc(&mut self, value: f64) {
        self.ratios.r_assoc = value;
    }

    #[wasm_bindgen(getter)]
    pub fn r_poly(&self) -> f64 {
        self.ratios.r_poly
    }

    #[wasm_bindgen(setter)]
    pub fn set_r_poly(&mut self, value: f64) {
        self.ratios.r_poly = value;
    }

    #[wasm_bindgen(getter)]
    pub fn r_nick(&self) -> f64 {
        self.ratios.r_nick
    }

    #[wasm_bindgen(setter)]
    pub fn set_r_nick(&mut self, value: f64) {
        self.ratios.r_nick = value;
    }

    #[wasm_bindgen(getter)]
    pub fn use_hairpin(&self) -> bool {
        self.use_hairpin
    }

    #[wasm_bindgen(setter)]
    pub fn set_use_hairpin(&mut self, value: bool) {
        self.use_hairpin = value;
    }

    #[wasm_bindgen(getter)]
    pub fn ddelta_g_fold(&self) -> f64 {
        self.ddelta_g_fold
    }

    #[wasm_bindgen(setter)]
    pub fn set_ddelta_g_fold(&mut self, value: f64) {
        self.ddelta_g_fold = value;
    }
}

#[wasm_bindgen]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveParams {
    k1_eff: f64,
    b_eff: f64,
}

#[wasm_bindgen]
impl EffectiveParams {
    #[wasm_bindgen(getter)]
    pub fn k1_eff(&self) -> f64 {
        self.k1_eff
    }

    #[wasm_bindgen(getter)]
    pub fn b_eff(&self) -> f64 {
        self.b_eff
    }
}

/// Effective `(k1, b)` for base rates under the given ratios. A zero nicking
/// ratio is passed through, so the result is infinite or NaN.
#[wasm_bindgen]
pub fn map_modification(base_k1: f64, base_b: f64, params: &ModificationParams) -> EffectiveParams {
    let scaled = params.ratios.resolve(base_k1, base_b);
    EffectiveParams {
        k1_eff: scaled.k1_eff,
        b_eff: scaled.b_eff,
    }
}

#[wasm_bindgen]
pub fn r_assoc_from_delta(delta_delta_g: f64, temperature_c: f64) -> f64 {
    core_r_assoc_from_delta(delta_delta_g, celsius_to_kelvin(temperature_c))
}

#[wasm_bindgen]
pub fn delta_from_r_assoc(r_assoc: f64, temperature_c: f64) -> f64 {
    core_delta_from_r_assoc(r_assoc, celsius_to_kelvin(temperature_c))
}

/// Derived-parameter report for `base` under an optional modification card
/// (`null`/`undefined` for the baseline).
#[wasm_bindgen(js_name = computeEffectiveParameters)]
pub fn compute_effective_parameters(base: JsValue, modification: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let base: PhysicalParameters = from_value(base)
        .map_err(|e| JsValue::from_str(&format!("Invalid base parameters: {}", e)))?;
    let card: Option<Modification> = from_value(modification)
        .map_err(|e| JsValue::from_str(&format!("Invalid modification: {}", e)))?;
    to_value(&derive_parameters(&base, card.as_ref()))
        .map_err(|e| JsValue::from_str(&format!("Failed to serialize parameters: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_modification_scales_k1_and_b() {
        let params = ModificationParams::new(2.0, 3.0, 0.5);
        let effective = map_modification(0.002, 0.000048, &params);
        assert!((effective.k1_eff() - 0.002 * 12.0).abs() < 1e-15);
        assert!((effective.b_eff() - 0.000048 * 4.0).abs() < 1e-18);
    }

    #[test]
    fn zero_nick_ratio_is_not_guarded() {
        let params = ModificationParams::new(1.0, 1.0, 0.0);
        let effective = map_modification(0.002, 0.000048, &params);
        assert!(effective.k1_eff().is_infinite());
        assert!(effective.b_eff().is_infinite());
    }

    #[test]
    fn setters_update_ratios() {
        let mut params = ModificationParams::new(1.0, 1.0, 1.0);
        params.set_r_poly(2.5);
        params.set_use_hairpin(true);
        params.set_ddelta_g_fold(-1.0);
        assert_eq!(params.r_poly(), 2.5);
        assert!(params.use_hairpin());
        assert_eq!(params.ddelta_g_fold(), -1.0);
        let effective = map_modification(1.0, 1.0, &params);
        assert_eq!(effective.k1_eff(), 2.5);
        assert_eq!(effective.b_eff(), 1.0);
    }

    #[test]
    fn free_energy_conversions_take_celsius() {
        assert_eq!(r_assoc_from_delta(0.0, 37.0), 1.0);
        let r = r_assoc_from_delta(-1.2, 25.0);
        assert!(r > 1.0);
        assert!((delta_from_r_assoc(r, 25.0) + 1.2).abs() < 1e-12);
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::wasm_bindgen_test;

    #[wasm_bindgen_test]
    fn baseline_report_has_identity_ratios() {
        let base = to_value(&PhysicalParameters::baseline()).expect("base");
        let report = compute_effective_parameters(base, JsValue::NULL).expect("report");
        let r_poly = js_sys::Reflect::get(&report, &JsValue::from_str("rPoly")).expect("rPoly");
        assert_eq!(r_poly.as_f64(), Some(1.0));
    }

    #[wasm_bindgen_test]
    fn malformed_card_is_rejected() {
        let base = to_value(&PhysicalParameters::baseline()).expect("base");
        let result = compute_effective_parameters(base, JsValue::from_str("nope"));
        let message = result
            .err()
            .and_then(|err| err.as_string())
            .unwrap_or_default();
        assert!(message.contains("Invalid modification"));
    }
}
