//! The `pp_osc_core` crate is the numerical engine of the predator-prey DNA
//! oscillator workbench. It has no browser dependencies; `pp_osc_wasm` wraps
//! it for the front end.
//!
//! Key components:
//! - **Traits**: `Scalar`, `DynamicalSystem` (right-hand sides), `Steppable` (solvers).
//! - **Model**: Physical parameters, modification ratios and the effective coefficients.
//! - **Simulate**: Fixed-step RK4 trajectories and the fused tail-metric path.
//! - **Metrics**: Amplitude and period estimators over a tail window.
//! - **Sweep**: Bifurcation, heatmap and (g, β) contour grids.

pub mod config;
pub mod dimensionless;
pub mod error;
pub mod metrics;
pub mod model;
pub mod modification;
pub mod simulate;
pub mod solvers;
pub mod store;
pub mod sweep;
pub mod traits;

pub use error::{OscillatorError, Result};
pub use metrics::{Metric, TailFraction};
pub use model::PhysicalParameters;
pub use modification::{Modification, ModificationRatios};
pub use simulate::{simulate, simulate_and_evaluate, Trajectory};
