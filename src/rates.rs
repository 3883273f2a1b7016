use crate::species::SpeciesTable;
use crate::surface::SurfaceState;

/// Which channel the scheduler picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventChoice {
    /// Try to adsorb a particle of this species.
    Adsorb { species_id: usize },
    /// Desorb the particle at this position of the surface's insertion order.
    Desorb { position: usize },
}

/// Instantaneous event rates for the current surface state.
///
/// Adsorption channels (one per species) are fixed for the run. Desorption channels
/// (one per bound particle, in insertion order) are rebuilt by `refresh`.
#[derive(Debug, Clone)]
pub struct RateModel {
    /// `c * kon * sites` per species id; constant for the run.
    adsorption: Vec<f64>,
    /// Prefix sums over adsorption channels followed by desorption channels.
    cumulative: Vec<f64>,
}

impl RateModel {
    pub fn new(species: &SpeciesTable) -> Self {
        let adsorption = species.adsorption_rates();
        let mut model = Self {
            cumulative: Vec::with_capacity(adsorption.len()),
            adsorption,
        };
        model.refresh(&SurfaceState::new(), species);
        model
    }

    pub fn adsorption_rates(&self) -> &[f64] {
        &self.adsorption
    }

    pub fn adsorption_total(&self) -> f64 {
        self.adsorption.iter().sum()
    }

    /// `koff` of every bound particle, in insertion order.
    pub fn desorption_rates(surface: &SurfaceState, species: &SpeciesTable) -> Vec<f64> {
        surface
            .particles()
            .map(|(_, particle)| species.koff(particle.species_id))
            .collect()
    }

    /// Rebuilds the cumulative rate vector and returns the total rate.
    pub fn refresh(&mut self, surface: &SurfaceState, species: &SpeciesTable) -> f64 {
        self.cumulative.clear();
        let mut running = 0.0;
        // Adsorption channels first, one per species
        for &rate in &self.adsorption {
            running += rate;
            self.cumulative.push(running);
        }
        // Then one desorption channel per bound particle
        for (_, particle) in surface.particles() {
            running += species.koff(particle.species_id);
            self.cumulative.push(running);
        }
        running
    }

    /// Total rate as of the last `refresh`.
    pub fn total(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    pub fn cumulative(&self) -> &[f64] {
        &self.cumulative
    }

    /// Maps a uniform draw `u` in (0, 1) onto a channel.
    pub fn choose(&self, u: f64) -> Option<EventChoice> {
        let index = select_index(&self.cumulative, u)?;
        let num_adsorption = self.adsorption.len();
        Some(if index < num_adsorption {
            EventChoice::Adsorb { species_id: index }
        } else {
            EventChoice::Desorb { position: index - num_adsorption }
        })
    }
}

/// First index whose prefix sum strictly exceeds `u * total`.
///
/// Returns `None` when the total rate is not positive. If round-off leaves every
/// prefix sum at or below the threshold, the last channel with a positive rate wins.
pub fn select_index(cumulative: &[f64], u: f64) -> Option<usize> {
    let total = *cumulative.last()?;
    if !(total > 0.0) {
        return None;
    }
    let threshold = u * total;
    let index = cumulative.partition_point(|&c| c <= threshold);
    if index < cumulative.len() {
        return Some(index);
    }
    (0..cumulative.len()).rev().find(|&i| {
        let previous = if i == 0 { 0.0 } else { cumulative[i - 1] };
        cumulative[i] > previous
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::BoundParticle;
    use corona_common::SpeciesParams;

    fn prefix(rates: &[f64]) -> Vec<f64> {
        rates
            .iter()
            .scan(0.0, |acc, &r| {
                *acc += r;
                Some(*acc)
            })
            .collect()
    }

    #[test]
    fn selection_is_strict_first_exceeding_index() {
        let cumulative = prefix(&[1.0, 1.0, 2.0]); // total 4
        assert_eq!(select_index(&cumulative, 0.1), Some(0));
        // Threshold lands exactly on a prefix sum: the next channel wins.
        assert_eq!(select_index(&cumulative, 0.25), Some(1));
        assert_eq!(select_index(&cumulative, 0.5), Some(2));
        assert_eq!(select_index(&cumulative, 0.249_999_999), Some(0));
        assert_eq!(select_index(&cumulative, 0.999_999), Some(2));
    }

    #[test]
    fn zero_rate_channels_are_never_chosen() {
        let cumulative = prefix(&[0.0, 2.0, 0.0, 0.0]);
        for u in [1e-12, 0.3, 0.999_999_999_999] {
            assert_eq!(select_index(&cumulative, u), Some(1));
        }
        // u = 1 is outside the open interval but still must not pick a dead channel.
        assert_eq!(select_index(&cumulative, 1.0), Some(1));
    }

    #[test]
    fn nothing_to_choose_without_rate() {
        assert_eq!(select_index(&[], 0.5), None);
        assert_eq!(select_index(&[0.0, 0.0], 0.5), None);
    }

    fn table() -> SpeciesTable {
        let params = vec![
            SpeciesParams::new("A", 1e-5, 2.0, 1e4, 0.5),
            SpeciesParams::new("B", 2e-5, 3.0, 1e4, 0.25),
        ];
        SpeciesTable::new(&params, 30.0).unwrap()
    }

    #[test]
    fn empty_surface_always_adsorbs() {
        let species = table();
        let model = RateModel::new(&species);
        assert_eq!(model.cumulative().len(), species.len());
        for u in [1e-9, 0.5, 0.999_999_999] {
            assert!(matches!(model.choose(u), Some(EventChoice::Adsorb { .. })));
        }
    }

    #[test]
    fn total_is_sum_of_both_rate_vectors() {
        let species = table();
        let mut model = RateModel::new(&species);
        let mut surface = SurfaceState::new();
        surface.insert(BoundParticle::new(0, 0.0, 1.0));
        surface.insert(BoundParticle::new(1, 2.0, 1.0));
        surface.insert(BoundParticle::new(0, 4.0, 2.0));

        let total = model.refresh(&surface, &species);
        let desorption = RateModel::desorption_rates(&surface, &species);
        assert_eq!(desorption, vec![0.5, 0.25, 0.5]);
        let expected = model.adsorption_total() + desorption.iter().sum::<f64>();
        assert!((total - expected).abs() <= 1e-12 * expected);
        assert_eq!(model.total(), total);
    }

    #[test]
    fn desorption_index_maps_to_insertion_position() {
        let species = table();
        let mut model = RateModel::new(&species);
        let mut surface = SurfaceState::new();
        surface.insert(BoundParticle::new(0, 0.0, 1.0));
        surface.insert(BoundParticle::new(1, 2.0, 1.0));
        let total = model.refresh(&surface, &species);

        // Aim just below the end of the cumulative vector: the last bound particle.
        let u = (total - 0.1) / total;
        assert_eq!(model.choose(u), Some(EventChoice::Desorb { position: 1 }));
    }
}
