//! A single run described as JSON: parameters, an optional modification
//! card, the metric and its tail window.

use crate::error::Result;
use crate::metrics::{Metric, TailFraction};
use crate::model::PhysicalParameters;
use crate::modification::Modification;
use crate::simulate::{evaluate_tail, simulate, Trajectory};
use anyhow::Context;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulationConfig {
    pub params: PhysicalParameters,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modification: Option<Modification>,
    pub metric: Metric,
    pub tail_pct: TailFraction,
}

impl SimulationConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        let (t_end, dt) = (config.params.t_end_min, config.params.dt_min);
        if !(t_end > 0.0 && dt > 0.0) {
            warn!("horizon t_end_min = {t_end}, dt_min = {dt} yields only the initial sample");
        }
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = Self::from_json_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        info!("loaded simulation config from {}", path.display());
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// `params` with the modification card applied, if any.
    pub fn resolved_params(&self) -> PhysicalParameters {
        match &self.modification {
            Some(card) => card.apply_to(&self.params),
            None => self.params,
        }
    }

    pub fn simulate(&self) -> Trajectory {
        simulate(&self.resolved_params())
    }

    pub fn evaluate(&self) -> f64 {
        evaluate_tail(&self.resolved_params(), self.metric, self.tail_pct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OscillatorError;
    use crate::modification::ModificationRatios;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn empty_object_is_the_baseline() {
        let config = SimulationConfig::from_json_str("{}").expect("empty config parses");
        assert_eq!(config, SimulationConfig::default());
        assert_eq!(config.params, PhysicalParameters::baseline());
        assert_eq!(config.metric, Metric::Amplitude);
        assert_eq!(config.tail_pct, TailFraction::HALF);
    }

    #[test]
    fn front_end_field_names_are_accepted() {
        let json = r#"{
            "params": { "G": 120, "KmP": 30, "t_end_min": 500 },
            "modification": { "id": "m1", "rPoly": 2.0, "rNick": 0.5 },
            "metric": "period_spectral",
            "tailPct": 25
        }"#;
        let config = SimulationConfig::from_json_str(json).expect("config parses");
        assert_eq!(config.params.g, 120.0);
        assert_eq!(config.params.km_p, 30.0);
        assert_eq!(config.params.k1, PhysicalParameters::baseline().k1);
        assert_eq!(config.metric, Metric::PeriodSpectral);
        assert_eq!(config.tail_pct.percent(), 25.0);
        assert_eq!(
            config.resolved_params().ratios,
            ModificationRatios::new(1.0, 2.0, 0.5)
        );
    }

    #[test]
    fn invalid_tail_and_metric_are_rejected() {
        for json in [r#"{"tailPct": 0}"#, r#"{"tailPct": 150}"#, r#"{"metric": "phase"}"#] {
            assert!(matches!(
                SimulationConfig::from_json_str(json),
                Err(OscillatorError::Json(_))
            ));
        }
    }

    #[test]
    fn evaluate_matches_full_trajectory() {
        let mut config = SimulationConfig::default();
        config.params.t_end_min = 600.0;
        config.modification = Modification::from_legacy_mod_factor(1.5);
        let expected = config.simulate().evaluate(config.metric, config.tail_pct);
        assert_eq!(config.evaluate().to_bits(), expected.to_bits());
        assert_eq!(config.resolved_params().ratios.r_poly, 1.5);
    }

    #[test]
    fn load_reads_file_and_reports_path_on_failure() {
        init_logger();
        let dir = std::env::temp_dir();
        let path = dir.join(format!("pp_osc_config_{}.json", std::process::id()));
        let mut config = SimulationConfig::default();
        config.metric = Metric::Period;
        fs::write(&path, config.to_json_pretty().expect("config serializes"))
            .expect("temp file is writable");

        let loaded = SimulationConfig::load(&path).expect("config loads");
        assert_eq!(loaded, config);
        fs::remove_file(&path).expect("temp file is removable");

        let missing = SimulationConfig::load(&path).expect_err("file was removed");
        assert!(format!("{missing:#}").contains("failed to read config"));
    }
}
