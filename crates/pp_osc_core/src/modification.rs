//! Chemical modifications expressed as rate ratios, and the resolver that
//! maps them onto the effective growth and saturation coefficients.
//!
//! A modification perturbs three elementary processes relative to the
//! unmodified template: primer association (`r_assoc`), polymerase turnover
//! (`r_poly`) and nicking saturation (`r_nick`). They enter the model only
//! through
//!
//! ```text
//! k1' = k1 * (r_assoc * r_poly / r_nick)
//! b'  = b  * (r_assoc / r_nick)
//! ```
//!
//! so `k1'/b' = (k1/b) * r_poly`: association and nicking cancel in the
//! ratio and only turnover moves it.

use crate::model::PhysicalParameters;
use serde::{Deserialize, Serialize};

/// Gas constant in kcal·mol⁻¹·K⁻¹.
pub const GAS_CONSTANT_KCAL: f64 = 0.00198720425864083;
pub const ABSOLUTE_ZERO_C: f64 = 273.15;
/// Temperature assumed for a modification card that does not state one.
pub const DEFAULT_CARD_TEMPERATURE_C: f64 = 25.0;

/// Stand-in for a zero rate constant when forming dimensionless groups.
const GROUP_FLOOR: f64 = 1e-12;
/// Below this log-magnitude a ratio counts as "no change".
const DOMINANCE_NEUTRAL_LOG: f64 = 1e-3;
/// A runner-up factor under this share of the leader does not make it mixed.
const DOMINANCE_RUNNER_UP_SHARE: f64 = 0.3;

pub fn celsius_to_kelvin(temperature_c: f64) -> f64 {
    temperature_c + ABSOLUTE_ZERO_C
}

/// Association ratio equivalent to a binding free-energy change (kcal/mol).
pub fn r_assoc_from_delta(delta_delta_g: f64, temperature_k: f64) -> f64 {
    (-delta_delta_g / (GAS_CONSTANT_KCAL * temperature_k)).exp()
}

/// Inverse of [`r_assoc_from_delta`].
pub fn delta_from_r_assoc(r_assoc: f64, temperature_k: f64) -> f64 {
    -r_assoc.ln() * GAS_CONSTANT_KCAL * temperature_k
}

/// Fraction of templates whose hairpin is open for a folding free-energy
/// change `delta_delta_g_fold` (kcal/mol).
pub fn hairpin_open_fraction(delta_delta_g_fold: f64, temperature_k: f64) -> f64 {
    1.0 / (1.0 + (delta_delta_g_fold / (GAS_CONSTANT_KCAL * temperature_k)).exp())
}

/// Dimensionless modification ratios; `1` means unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModificationRatios {
    pub r_assoc: f64,
    pub r_poly: f64,
    pub r_nick: f64,
}

/// Effective `(k1', b')` pair produced by [`ModificationRatios::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaledRates {
    pub k1_eff: f64,
    pub b_eff: f64,
}

impl ModificationRatios {
    pub const IDENTITY: Self = Self {
        r_assoc: 1.0,
        r_poly: 1.0,
        r_nick: 1.0,
    };

    pub const fn new(r_assoc: f64, r_poly: f64, r_nick: f64) -> Self {
        Self {
            r_assoc,
            r_poly,
            r_nick,
        }
    }

    /// Ratios whose association term comes from a free-energy change.
    pub fn from_delta_g(delta_delta_g: f64, temperature_k: f64, r_poly: f64, r_nick: f64) -> Self {
        Self::new(r_assoc_from_delta(delta_delta_g, temperature_k), r_poly, r_nick)
    }

    /// Applies the ratios to a baseline `(k1, b)`.
    ///
    /// `r_nick == 0` is not guarded and yields infinite or NaN rates.
    pub fn resolve(&self, k1_base: f64, b_base: f64) -> ScaledRates {
        ScaledRates {
            k1_eff: k1_base * (self.r_assoc * self.r_poly / self.r_nick),
            b_eff: b_base * (self.r_assoc / self.r_nick),
        }
    }

    /// Which of the three processes the modification mostly acts through.
    pub fn dominance(&self) -> Dominance {
        let log_magnitude = |r: f64| {
            let r = if r == 0.0 || r.is_nan() { 1.0 } else { r };
            let value = r.ln().abs();
            if value.is_nan() {
                0.0
            } else {
                value
            }
        };
        let mut logs = [
            (Dominance::Association, log_magnitude(self.r_assoc)),
            (Dominance::Polymerase, log_magnitude(self.r_poly)),
            (Dominance::Saturation, log_magnitude(self.r_nick)),
        ];
        logs.sort_by(|a, b| b.1.total_cmp(&a.1));

        let (leader, leading) = logs[0];
        if leading < DOMINANCE_NEUTRAL_LOG {
            return Dominance::Neutral;
        }
        if logs[1].1 < DOMINANCE_RUNNER_UP_SHARE * leading {
            return leader;
        }
        Dominance::Mixed
    }
}

impl Default for ModificationRatios {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dominance {
    Neutral,
    Association,
    Polymerase,
    Saturation,
    Mixed,
}

impl Dominance {
    pub fn describe(self) -> &'static str {
        match self {
            Dominance::Association => "Association-driven",
            Dominance::Polymerase => "Polymerase-rate driven",
            Dominance::Saturation => "Nick saturation-driven",
            Dominance::Mixed => "Mixed factors",
            Dominance::Neutral => "Neutral",
        }
    }
}

/// The two dimensionless groups that govern the oscillator's shape:
/// `g = k1·G/(k2·KmP)` and `β = b·k2·KmP²/k1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionlessGroups {
    pub g: f64,
    pub beta: f64,
}

impl DimensionlessGroups {
    /// Groups of the unmodified rates in `params`. Zero `k1`, `k2` or `KmP`
    /// are replaced by a tiny floor so the groups stay finite.
    pub fn from_params(params: &PhysicalParameters) -> Self {
        let floor = |v: f64| if v != 0.0 { v } else { GROUP_FLOOR };
        let k1 = floor(params.k1);
        let k2 = floor(params.k2);
        let km_p = floor(params.km_p);
        Self {
            g: (k1 * params.g) / (k2 * km_p),
            beta: (params.b * k2 * km_p * km_p) / k1,
        }
    }

    /// The `(k1, b)` that realise these groups at the `k2`, `KmP` and `G`
    /// of `params`.
    pub fn to_rate_constants(&self, params: &PhysicalParameters) -> (f64, f64) {
        let k1 = (self.g * params.k2 * params.km_p) / params.g;
        let b = (self.beta * k1) / (params.k2 * params.km_p * params.km_p);
        (k1, b)
    }
}

fn default_card_temperature() -> f64 {
    DEFAULT_CARD_TEMPERATURE_C
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v > 0.0)
}

/// A named modification card as stored by the workbench.
///
/// Ratios are optional; [`Modification::ratios`] resolves missing or
/// non-positive entries to `1`, and an association ratio may instead be
/// given as a free-energy change at the card temperature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Modification {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_card_temperature")]
    pub temperature_c: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r_assoc: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_delta_g_assoc: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r_poly: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r_nick: Option<f64>,
    #[serde(default)]
    pub use_hairpin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_delta_g_fold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Modification {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            temperature_c: DEFAULT_CARD_TEMPERATURE_C,
            r_assoc: None,
            delta_delta_g_assoc: None,
            r_poly: None,
            r_nick: None,
            use_hairpin: false,
            delta_delta_g_fold: None,
            notes: None,
        }
    }

    /// Card equivalent of the legacy single `mod_factor` multiplier on k1,
    /// which is a pure turnover change. A factor of 1 needs no card.
    pub fn from_legacy_mod_factor(mod_factor: f64) -> Option<Self> {
        if !mod_factor.is_finite() || mod_factor == 1.0 {
            return None;
        }
        let mut card = Self::new(
            format!("legacy-{mod_factor}"),
            format!("Legacy mod_factor {mod_factor:.2}"),
        );
        card.r_assoc = Some(1.0);
        card.r_poly = Some(mod_factor);
        card.r_nick = Some(1.0);
        card.notes = Some("Imported from legacy mod_factor".to_string());
        Some(card)
    }

    pub fn temperature_k(&self) -> f64 {
        celsius_to_kelvin(self.temperature_c)
    }

    pub fn resolve_r_assoc(&self) -> f64 {
        if let Some(r) = positive(self.r_assoc) {
            return r;
        }
        match self.delta_delta_g_assoc {
            Some(delta) => r_assoc_from_delta(delta, self.temperature_k()),
            None => 1.0,
        }
    }

    pub fn resolve_delta_g_assoc(&self) -> f64 {
        if let Some(delta) = self.delta_delta_g_assoc {
            return delta;
        }
        match positive(self.r_assoc) {
            Some(r) => delta_from_r_assoc(r, self.temperature_k()),
            None => 0.0,
        }
    }

    pub fn ratios(&self) -> ModificationRatios {
        ModificationRatios::new(
            self.resolve_r_assoc(),
            positive(self.r_poly).unwrap_or(1.0),
            positive(self.r_nick).unwrap_or(1.0),
        )
    }

    /// Open-hairpin fraction scaling the template, or 1 when disabled.
    pub fn hairpin_factor(&self) -> f64 {
        match (self.use_hairpin, self.delta_delta_g_fold) {
            (true, Some(delta)) => hairpin_open_fraction(delta, self.temperature_k()),
            _ => 1.0,
        }
    }

    /// Parameters for simulating `base` under this card: the card's ratios
    /// replace those of `base`, and the template is scaled by the hairpin
    /// factor.
    pub fn apply_to(&self, base: &PhysicalParameters) -> PhysicalParameters {
        let mut params = base.with_ratios(self.ratios());
        let hairpin = self.hairpin_factor();
        if hairpin != 1.0 {
            params.g *= hairpin;
        }
        params
    }
}

/// Everything the workbench reports about a modification applied to a base
/// parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedParameters {
    pub r_assoc: f64,
    pub r_poly: f64,
    pub r_nick: f64,
    pub k1_eff: f64,
    pub b_eff: f64,
    pub g_eff: f64,
    pub g_eff_fold: f64,
    pub hairpin_factor: f64,
    pub beta_eff: f64,
    pub dominance: Dominance,
}

pub fn derive_parameters(
    base: &PhysicalParameters,
    modification: Option<&Modification>,
) -> DerivedParameters {
    let ratios = modification.map_or(ModificationRatios::IDENTITY, Modification::ratios);
    let hairpin_factor = modification.map_or(1.0, Modification::hairpin_factor);
    let scaled = ratios.resolve(base.k1, base.b);
    let groups = DimensionlessGroups::from_params(base);
    let g_eff = groups.g * (ratios.r_assoc * ratios.r_poly / ratios.r_nick);

    DerivedParameters {
        r_assoc: ratios.r_assoc,
        r_poly: ratios.r_poly,
        r_nick: ratios.r_nick,
        k1_eff: scaled.k1_eff,
        b_eff: scaled.b_eff,
        g_eff,
        g_eff_fold: g_eff * hairpin_factor,
        hairpin_factor,
        beta_eff: groups.beta / ratios.r_poly,
        dominance: ratios.dominance(),
    }
}
