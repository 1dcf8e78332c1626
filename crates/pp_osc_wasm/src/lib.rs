//! `wasm-bindgen` bridge between the browser workbench and `pp_osc_core`.

mod modification;
mod simulation;
mod sweep;

pub use modification::{
    compute_effective_parameters, delta_from_r_assoc, map_modification, r_assoc_from_delta,
    EffectiveParams, ModificationParams,
};
pub use simulation::{simulate_and_evaluate, simulate_config, simulate_dimensionless, simulate_physical};
pub use sweep::{bifurcation_sweep, heatmap_sweep, period_contour, sweep_values};
