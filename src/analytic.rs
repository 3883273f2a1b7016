//! Mean-field (Langmuir) comparison model.
//!
//! Ignores hard-sphere geometry: every species sees the fraction of free sites left by all
//! others. Its predictions differ from the KMC engine at high coverage, which is the point.

use anyhow::Result;
use nalgebra::{DMatrix, DVector};

use crate::species::SpeciesTable;

/// Linear ODE `dN/dt = b + A N` with `N(0) = 0`, solved via the matrix exponential.
#[derive(Debug, Clone)]
pub struct MeanFieldModel {
    rate_matrix: DMatrix<f64>,
    steady_state: DVector<f64>,
}

impl MeanFieldModel {
    pub fn new(species: &SpeciesTable) -> Result<Self> {
        let n = species.len();
        let sites: Vec<f64> = species.iter().map(|s| s.max_binding_sites).collect();
        let forcing = DVector::from_iterator(n, species.iter().map(|s| s.adsorption_rate()));

        let mut rate_matrix = DMatrix::zeros(n, n);
        for (i, s) in species.iter().enumerate() {
            let on_rate = s.concentration * s.kon * s.max_binding_sites;
            for j in 0..n {
                rate_matrix[(i, j)] = -on_rate / sites[j];
            }
            rate_matrix[(i, i)] -= s.koff;
        }

        let solution = rate_matrix
            .clone()
            .lu()
            .solve(&forcing)
            .ok_or_else(|| anyhow::anyhow!("mean-field rate matrix is singular; no steady state"))?;

        Ok(Self {
            rate_matrix,
            steady_state: -solution,
        })
    }

    /// Long-time bound counts per species id.
    pub fn steady_state(&self) -> &[f64] {
        self.steady_state.as_slice()
    }

    /// Expected bound counts per species id at time `t`.
    pub fn evaluate(&self, t: f64) -> Vec<f64> {
        let propagator = (&self.rate_matrix * t).exp();
        let state = &self.steady_state - propagator * &self.steady_state;
        state.iter().copied().collect()
    }
}

/// Closed-form single-species Langmuir curve:
/// `c kon M / (koff + c kon) * (1 - exp(-t (koff + c kon)))`.
pub fn langmuir_single_species(t: f64, concentration: f64, kon: f64, koff: f64, sites: f64) -> f64 {
    let on = concentration * kon;
    on * sites / (koff + on) * (1.0 - (-t * (koff + on)).exp())
}

/// Single-species curve with no area limit: adsorption never slows as the surface fills.
pub fn unlimited_single_species(t: f64, concentration: f64, kon: f64, koff: f64, sites: f64) -> f64 {
    let on = concentration * kon;
    if koff > 0.0 {
        on * sites / koff * (1.0 - (-t * koff).exp())
    } else {
        on * sites * t
    }
}
