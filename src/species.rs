use corona_common::SpeciesParams;
use serde::Serialize;

use crate::error::KmcError;
use crate::geometry::{exclusion_angle, max_binding_sites};

/// A validated species with its binding-site count on the current nanoparticle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Species {
    pub name: String,
    pub concentration: f64,
    pub radius: f64,
    pub kon: f64,
    pub koff: f64,
    /// Surface area over footprint area; non-integer.
    pub max_binding_sites: f64,
}

impl Species {
    /// Rate of collisions that could lead to adsorption: `c * kon * sites`.
    pub fn adsorption_rate(&self) -> f64 {
        self.concentration * self.kon * self.max_binding_sites
    }
}

/// Immutable per-run table of species, indexed by species id.
#[derive(Debug, Clone)]
pub struct SpeciesTable {
    /// Validated species, indexed by species id.
    species: Vec<Species>,
    /// Exclusion cap half-angle per species id (rad), cached for the collision tests.
    exclusion_angles: Vec<f64>,
    /// Nanoparticle radius the derived values were computed for (nm).
    np_radius: f64,
}

fn check(index: usize, params: &SpeciesParams, ok: bool, reason: &str) -> Result<(), KmcError> {
    if ok {
        Ok(())
    } else {
        Err(KmcError::InvalidSpecies {
            index,
            name: params.name.clone(),
            reason: reason.to_string(),
        })
    }
}

impl SpeciesTable {
    pub fn new(params: &[SpeciesParams], np_radius: f64) -> Result<Self, KmcError> {
        if !(np_radius.is_finite() && np_radius > 0.0) {
            return Err(KmcError::InvalidRunParams(format!(
                "nanoparticle radius must be positive, got {}",
                np_radius
            )));
        }
        if params.is_empty() {
            return Err(KmcError::EmptySpeciesTable);
        }

        let mut species = Vec::with_capacity(params.len());
        let mut exclusion_angles = Vec::with_capacity(params.len());
        for (index, p) in params.iter().enumerate() {
            check(index, p, p.concentration.is_finite() && p.concentration > 0.0, "concentration must be positive")?;
            check(index, p, p.radius.is_finite() && p.radius > 0.0, "radius must be positive")?;
            check(index, p, p.kon.is_finite() && p.kon > 0.0, "kon must be positive")?;
            check(index, p, p.koff.is_finite() && p.koff >= 0.0, "koff must be non-negative")?;

            species.push(Species {
                name: p.name.clone(),
                concentration: p.concentration,
                radius: p.radius,
                kon: p.kon,
                koff: p.koff,
                max_binding_sites: max_binding_sites(np_radius, p.radius),
            });
            exclusion_angles.push(exclusion_angle(p.radius, np_radius));
        }

        Ok(Self { species, exclusion_angles, np_radius })
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    pub fn np_radius(&self) -> f64 {
        self.np_radius
    }

    pub fn get(&self, id: usize) -> Option<&Species> {
        self.species.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Species> + '_ {
        self.species.iter()
    }

    pub fn radius(&self, id: usize) -> f64 {
        self.species[id].radius
    }

    pub fn koff(&self, id: usize) -> f64 {
        self.species[id].koff
    }

    /// Half-angle of the exclusion cap of species `id`.
    pub fn exclusion_angle(&self, id: usize) -> f64 {
        self.exclusion_angles[id]
    }

    pub fn adsorption_rates(&self) -> Vec<f64> {
        self.species.iter().map(Species::adsorption_rate).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.species.iter().map(|s| s.name.clone()).collect()
    }

    pub fn total_concentration(&self) -> f64 {
        self.species.iter().map(|s| s.concentration).sum()
    }

    /// Maps each species id to a report column.
    ///
    /// With `group_by_name`, rows sharing a name (different orientations of the same
    /// protein) share a column; columns follow the sorted unique names. Otherwise each
    /// species id gets its own column.
    pub fn report_columns(&self, group_by_name: bool) -> (Vec<String>, Vec<usize>) {
        if !group_by_name {
            return (self.names(), (0..self.len()).collect());
        }
        let mut labels = self.names();
        labels.sort();
        labels.dedup();
        let columns = self
            .species
            .iter()
            .map(|s| labels.iter().position(|label| *label == s.name).unwrap_or(0))
            .collect();
        (labels, columns)
    }
}
