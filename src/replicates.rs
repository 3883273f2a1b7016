use anyhow::Result;
use corona_common::{FinalCoordinate, RunParams, TimeSeries};
use log::info;
use rayon::prelude::*;

use crate::analytic::MeanFieldModel;
use crate::report::TimeSeriesRecorder;
use crate::simulation::{KmcSimulation, RunSummary};
use crate::species::SpeciesTable;

/// Everything one independent trajectory produced.
#[derive(Debug, Clone)]
pub struct ReplicateResult {
    pub seed: u64,
    pub summary: RunSummary,
    pub series: TimeSeries,
    pub coords: Vec<FinalCoordinate>,
}

/// Settings shared by every trajectory of a batch.
#[derive(Debug, Clone)]
pub struct ReplicatePlan {
    pub params: RunParams,
    pub base_seed: u64,
    pub replicates: u32,
    pub group_by_name: bool,
    pub analytic: Option<MeanFieldModel>,
}

/// Runs one trajectory to completion with its own recorder.
pub fn run_single(plan: &ReplicatePlan, species: &SpeciesTable, seed: u64) -> Result<ReplicateResult> {
    let mut recorder = TimeSeriesRecorder::new(species, plan.group_by_name);
    if let Some(model) = &plan.analytic {
        recorder = recorder.with_analytic(model.clone());
    }
    let mut sim = KmcSimulation::new(plan.params.clone(), species.clone(), seed)?;
    let summary = sim.run(&mut recorder)?;
    let coords = sim.final_coordinates();
    Ok(ReplicateResult {
        seed,
        summary,
        series: recorder.into_series(),
        coords,
    })
}

/// Runs `plan.replicates` independent trajectories in parallel. Replicate `i` uses seed
/// `base_seed + i`, so results do not depend on the thread count. Output is in seed order.
pub fn run_replicates(plan: &ReplicatePlan, species: &SpeciesTable) -> Result<Vec<ReplicateResult>> {
    info!("Launching {} replicate(s) from seed {}", plan.replicates, plan.base_seed);
    (0..plan.replicates)
        .into_par_iter()
        .map(|i| run_single(plan, species, plan.base_seed.wrapping_add(u64::from(i))))
        .collect()
}

/// Mean and sample standard deviation of the final bound count per species id.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicateStatistics {
    pub replicates: usize,
    pub mean_counts: Vec<f64>,
    pub std_counts: Vec<f64>,
}

impl ReplicateStatistics {
    pub fn from_results(results: &[ReplicateResult]) -> Self {
        let n_species = results.first().map_or(0, |r| r.summary.final_counts.len());
        let n = results.len() as f64;
        let mut mean_counts = vec![0.0; n_species];
        for result in results {
            for (mean, &count) in mean_counts.iter_mut().zip(&result.summary.final_counts) {
                *mean += count as f64 / n;
            }
        }

        let mut std_counts = vec![0.0; n_species];
        if results.len() > 1 {
            for result in results {
                for (i, &count) in result.summary.final_counts.iter().enumerate() {
                    std_counts[i] += (count as f64 - mean_counts[i]).powi(2);
                }
            }
            for s in &mut std_counts {
                *s = (*s / (n - 1.0)).sqrt();
            }
        }

        Self {
            replicates: results.len(),
            mean_counts,
            std_counts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corona_common::SpeciesParams;

    fn plan(replicates: u32) -> (ReplicatePlan, SpeciesTable) {
        let species = SpeciesTable::new(&[SpeciesParams::new("A", 1e-5, 3.0, 1e4, 0.5)], 15.0).unwrap();
        let plan = ReplicatePlan {
            params: RunParams { np_radius: 15.0, end_time: 20.0, update_interval: 2.0, diffusion: None },
            base_seed: 100,
            replicates,
            group_by_name: true,
            analytic: None,
        };
        (plan, species)
    }

    #[test]
    fn replicates_are_seeded_in_order_and_reproducible() {
        let (plan, species) = plan(4);
        let first = run_replicates(&plan, &species).unwrap();
        let second = run_replicates(&plan, &species).unwrap();
        let seeds: Vec<u64> = first.iter().map(|r| r.seed).collect();
        assert_eq!(seeds, vec![100, 101, 102, 103]);
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.summary, b.summary);
            assert_eq!(a.series.snapshots, b.series.snapshots);
            assert_eq!(a.series.snapshots.len(), 10);
        }
    }

    #[test]
    fn statistics_of_fixed_counts() {
        let (plan, species) = plan(1);
        let template = run_single(&plan, &species, 1).unwrap();
        let results: Vec<ReplicateResult> = [2u32, 4, 6]
            .iter()
            .map(|&n| {
                let mut r = template.clone();
                r.summary.final_counts = vec![n];
                r
            })
            .collect();
        let stats = ReplicateStatistics::from_results(&results);
        assert_eq!(stats.replicates, 3);
        assert!((stats.mean_counts[0] - 4.0).abs() < 1e-12);
        assert!((stats.std_counts[0] - 2.0).abs() < 1e-12);
    }
}
