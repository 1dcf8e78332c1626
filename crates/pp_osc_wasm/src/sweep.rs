//! Sweep exports. Requests arrive as plain JS objects and results leave as
//! serialized structs.

use js_sys::Float64Array;
use pp_osc_core::metrics::{Metric, TailFraction};
use pp_osc_core::model::PhysicalParameters;
use pp_osc_core::sweep::{
    bifurcation_sweep as core_bifurcation, heatmap_sweep as core_heatmap,
    period_contour as core_contour, ContourSpec, HeatmapSpec, SweepAxis, SweepRange,
};
use serde::Deserialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BifurcationRequest {
    #[serde(default)]
    base: PhysicalParameters,
    axis: String,
    range: SweepRange,
    #[serde(default)]
    tail_pct: TailFraction,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HeatmapRequest {
    #[serde(default)]
    base: PhysicalParameters,
    x_axis: String,
    x_range: SweepRange,
    y_axis: String,
    y_range: SweepRange,
    #[serde(default)]
    metric: Metric,
    #[serde(default)]
    tail_pct: TailFraction,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContourRequest {
    #[serde(default)]
    base: PhysicalParameters,
    g_range: SweepRange,
    beta_range: SweepRange,
    #[serde(default)]
    tail_pct: TailFraction,
}

fn parse_request<T: for<'de> Deserialize<'de>>(request: JsValue, what: &str) -> Result<T, JsValue> {
    from_value(request).map_err(|e| JsValue::from_str(&format!("Invalid {} request: {}", what, e)))
}

fn parse_axis(name: &str) -> Result<SweepAxis, JsValue> {
    name.parse()
        .map_err(|e| JsValue::from_str(&format!("Invalid sweep axis: {}", e)))
}

fn sweep_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("Sweep failed: {}", e))
}

fn serialize<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    to_value(value).map_err(|e| JsValue::from_str(&format!("Failed to serialize sweep: {}", e)))
}

/// Grid coordinates of a sweep range, as the axes of a plot.
#[wasm_bindgen(js_name = sweepValues)]
pub fn sweep_values(min: f64, max: f64, steps: u32) -> Float64Array {
    let values = SweepRange::new(min, max, steps as usize).values();
    Float64Array::from(values.as_slice())
}

#[wasm_bindgen(js_name = bifurcationSweep)]
pub fn bifurcation_sweep(request: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let request: BifurcationRequest = parse_request(request, "bifurcation")?;
    let axis = parse_axis(&request.axis)?;
    let points = core_bifurcation(&request.base, axis, request.range, request.tail_pct)
        .map_err(sweep_error)?;
    serialize(&points)
}

#[wasm_bindgen(js_name = heatmapSweep)]
pub fn heatmap_sweep(request: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let request: HeatmapRequest = parse_request(request, "heatmap")?;
    let spec = HeatmapSpec {
        x_axis: parse_axis(&request.x_axis)?,
        x_range: request.x_range,
        y_axis: parse_axis(&request.y_axis)?,
        y_range: request.y_range,
        metric: request.metric,
        tail: request.tail_pct,
    };
    let grid = core_heatmap(&request.base, &spec).map_err(sweep_error)?;
    serialize(&grid)
}

#[wasm_bindgen(js_name = periodContour)]
pub fn period_contour(request: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let request: ContourRequest = parse_request(request, "contour")?;
    let spec = ContourSpec {
        g_range: request.g_range,
        beta_range: request.beta_range,
        tail: request.tail_pct,
    };
    let cells = core_contour(&request.base, &spec).map_err(sweep_error)?;
    serialize(&cells)
}
