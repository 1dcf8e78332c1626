//! Named modification cards and the simulation variants built from them.
//!
//! Storage sits entirely on the caller's side of the integrator: variants
//! carry fully resolved [`PhysicalParameters`], never card ids.

use crate::error::{OscillatorError, Result};
use crate::model::PhysicalParameters;
use crate::modification::{derive_parameters, DerivedParameters, Modification};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const BASELINE_VARIANT_ID: &str = "baseline";

pub trait ModificationRepository {
    fn get(&self, id: &str) -> Option<Modification>;

    /// Inserts a card, replacing any card with the same id in place.
    fn upsert(&mut self, modification: Modification);

    fn delete(&mut self, id: &str) -> Option<Modification>;

    fn list_all(&self) -> Vec<Modification>;
}

/// In-memory card store that also tracks the active card and the overlay
/// cards drawn alongside it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InMemoryModificationStore {
    modifications: Vec<Modification>,
    active_id: Option<String>,
    overlay_ids: Vec<String>,
}

impl InMemoryModificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let mut store: Self = serde_json::from_str(json)?;
        store.prune_selection();
        Ok(store)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    fn contains(&self, id: &str) -> bool {
        self.modifications.iter().any(|m| m.id == id)
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    pub fn set_active(&mut self, id: Option<&str>) -> Result<()> {
        match id {
            Some(id) if !self.contains(id) => {
                Err(OscillatorError::ModificationNotFound(id.to_string()))
            }
            _ => {
                self.active_id = id.map(str::to_string);
                Ok(())
            }
        }
    }

    pub fn overlay_ids(&self) -> &[String] {
        &self.overlay_ids
    }

    /// Selects overlay cards; ids without a stored card are dropped.
    pub fn set_overlays<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.overlay_ids = ids.into_iter().map(Into::into).collect();
        self.prune_selection();
    }

    fn prune_selection(&mut self) {
        let before = self.overlay_ids.len();
        let known: HashSet<String> = self.modifications.iter().map(|m| m.id.clone()).collect();
        self.overlay_ids.retain(|id| known.contains(id));
        if self.overlay_ids.len() != before {
            warn!(
                "dropped {} overlay id(s) with no stored modification",
                before - self.overlay_ids.len()
            );
        }
        if let Some(active) = &self.active_id {
            if !known.contains(active) {
                warn!("active modification {active} no longer exists; clearing it");
                self.active_id = None;
            }
        }
    }

    pub fn variants(&self, base: &PhysicalParameters) -> Vec<SimulationVariant> {
        build_variants(base, self, self.active_id(), &self.overlay_ids)
    }
}

impl ModificationRepository for InMemoryModificationStore {
    fn get(&self, id: &str) -> Option<Modification> {
        self.modifications.iter().find(|m| m.id == id).cloned()
    }

    fn upsert(&mut self, modification: Modification) {
        match self.modifications.iter_mut().find(|m| m.id == modification.id) {
            Some(existing) => *existing = modification,
            None => self.modifications.push(modification),
        }
    }

    fn delete(&mut self, id: &str) -> Option<Modification> {
        let index = self.modifications.iter().position(|m| m.id == id)?;
        let removed = self.modifications.remove(index);
        if self.active_id.as_deref() == Some(id) {
            self.active_id = None;
        }
        self.overlay_ids.retain(|overlay| overlay != id);
        Some(removed)
    }

    fn list_all(&self) -> Vec<Modification> {
        self.modifications.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantKind {
    Baseline,
    Active,
    Overlay,
}

/// One curve to simulate: the baseline or a card applied to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationVariant {
    pub id: String,
    pub label: String,
    pub kind: VariantKind,
    pub params: PhysicalParameters,
    pub derived: DerivedParameters,
}

/// Baseline first, then the active card, then overlays in order. Unknown
/// ids and repeats are skipped.
pub fn build_variants<R>(
    base: &PhysicalParameters,
    repository: &R,
    active_id: Option<&str>,
    overlay_ids: &[String],
) -> Vec<SimulationVariant>
where
    R: ModificationRepository + ?Sized,
{
    let mut variants = vec![SimulationVariant {
        id: BASELINE_VARIANT_ID.to_string(),
        label: "Baseline".to_string(),
        kind: VariantKind::Baseline,
        params: *base,
        derived: derive_parameters(base, None),
    }];
    let mut seen: HashSet<String> = HashSet::from([BASELINE_VARIANT_ID.to_string()]);

    let requested = active_id
        .map(|id| (id, VariantKind::Active))
        .into_iter()
        .chain(overlay_ids.iter().map(|id| (id.as_str(), VariantKind::Overlay)));

    for (id, kind) in requested {
        if seen.contains(id) {
            continue;
        }
        let Some(card) = repository.get(id) else {
            continue;
        };
        let label = if card.label.is_empty() {
            "Unnamed".to_string()
        } else {
            card.label.clone()
        };
        variants.push(SimulationVariant {
            id: id.to_string(),
            label,
            kind,
            params: card.apply_to(base),
            derived: derive_parameters(base, Some(&card)),
        });
        seen.insert(id.to_string());
    }

    variants
}
