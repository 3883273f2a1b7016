use anyhow::Result;
use corona_common::{FinalCoordinate, RunParams};
use log::{debug, info, trace};
use rand::distr::Open01;
use rand::prelude::*;
use std::f64::consts::TAU;
use std::time::Instant;

use crate::diffusion::{diffuse_surface, DiffusionStats};
use crate::error::KmcError;
use crate::geometry::{adsorption_collides, to_cartesian};
use crate::rates::{EventChoice, RateModel};
use crate::report::{Reporter, SurfaceView};
use crate::species::SpeciesTable;
use crate::surface::{BoundParticle, ParticleHandle, SurfaceState};

/// Simulated time and report bookkeeping.
#[derive(Debug, Clone)]
pub struct SimulationClock {
    pub current_time: f64,
    /// Next boundary to hand to the reporter; every earlier boundary has been reported.
    pub last_reported_time: f64,
    interval: f64,
    reports_issued: u64,
    /// `floor(end_time / interval)`; no boundary past it is ever reported.
    report_budget: u64,
}

impl SimulationClock {
    pub fn new(params: &RunParams) -> Self {
        Self {
            current_time: 0.0,
            last_reported_time: 0.0,
            interval: params.update_interval,
            reports_issued: 0,
            report_budget: params.snapshot_budget(),
        }
    }

    pub fn reports_issued(&self) -> u64 {
        self.reports_issued
    }

    /// Advances by `dt` in steps of at most one interval, calling `on_boundary` for every
    /// report boundary the clock moves past.
    pub fn advance<F: FnMut(f64)>(&mut self, dt: f64, mut on_boundary: F) {
        let mut remaining = dt;
        while remaining > self.interval && self.reports_issued < self.report_budget {
            remaining -= self.interval;
            self.current_time += self.interval;
            self.report_crossed(&mut on_boundary);
        }
        self.current_time += remaining;
        self.report_crossed(&mut on_boundary);
    }

    fn report_crossed<F: FnMut(f64)>(&mut self, on_boundary: &mut F) {
        while self.current_time > self.last_reported_time && self.reports_issued < self.report_budget {
            on_boundary(self.last_reported_time);
            self.reports_issued += 1;
            // Recomputed from the count so boundaries do not drift.
            self.last_reported_time = self.reports_issued as f64 * self.interval;
        }
    }
}

/// What one scheduler iteration did to the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    Adsorbed { handle: ParticleHandle, species_id: usize },
    /// The incoming particle hit an occupied patch and was reflected.
    Rejected { species_id: usize },
    Desorbed { handle: ParticleHandle, species_id: usize },
}

/// Running totals over a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EventStats {
    pub iterations: u64,
    pub adsorbed: u64,
    pub rejected: u64,
    pub desorbed: u64,
    pub diffusion_moves: u64,
    pub diffusion_stuck: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub final_time: f64,
    pub stats: EventStats,
    /// Bound particles per species id at the end of the run.
    pub final_counts: Vec<u32>,
    pub snapshots_reported: u64,
}

/// Kinetic Monte Carlo simulation of competitive adsorption onto one nanoparticle.
///
/// Owns the whole simulation context: species table, surface state, clock, and the
/// random source. `R` defaults to a seeded `StdRng`; tests can supply any other `Rng`.
pub struct KmcSimulation<R = StdRng> {
    params: RunParams,
    species: SpeciesTable,
    surface: SurfaceState,
    rates: RateModel,
    clock: SimulationClock,
    rng: R,
    stats: EventStats,
}

impl KmcSimulation<StdRng> {
    /// Creates a simulation drawing from `StdRng::seed_from_u64(seed)`.
    pub fn new(params: RunParams, species: SpeciesTable, seed: u64) -> Result<Self> {
        Self::with_rng(params, species, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> KmcSimulation<R> {
    pub fn with_rng(params: RunParams, species: SpeciesTable, rng: R) -> Result<Self> {
        validate_params(&params, &species)?;

        let rates = RateModel::new(&species);
        let initial_rate = rates.adsorption_total();
        if !(initial_rate > 0.0 && initial_rate.is_finite()) {
            return Err(KmcError::ZeroTotalRate { total: initial_rate, time: 0.0 }.into());
        }
        debug!("Adsorption rates per species: {:?}", rates.adsorption_rates());

        Ok(Self {
            clock: SimulationClock::new(&params),
            params,
            species,
            surface: SurfaceState::new(),
            rates,
            rng,
            stats: EventStats::default(),
        })
    }

    pub fn params(&self) -> &RunParams {
        &self.params
    }

    pub fn species(&self) -> &SpeciesTable {
        &self.species
    }

    pub fn surface(&self) -> &SurfaceState {
        &self.surface
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn stats(&self) -> &EventStats {
        &self.stats
    }

    pub fn current_time(&self) -> f64 {
        self.clock.current_time
    }

    pub fn is_finished(&self) -> bool {
        self.clock.current_time >= self.params.end_time
    }

    /// Performs one scheduler iteration: draw the waiting time and the event, advance the
    /// clock (reporting crossed boundaries), diffuse if enabled, then apply the event.
    pub fn step<P: Reporter + ?Sized>(&mut self, reporter: &mut P) -> Result<StepOutcome> {
        let total_rate = self.rates.refresh(&self.surface, &self.species);
        if !(total_rate > 0.0 && total_rate.is_finite()) {
            return Err(KmcError::ZeroTotalRate { total: total_rate, time: self.clock.current_time }.into());
        }

        let u_time: f64 = self.rng.sample(Open01);
        let dt = -u_time.ln() / total_rate;
        let u_event: f64 = self.rng.sample(Open01);
        let choice = self
            .rates
            .choose(u_event)
            .ok_or(KmcError::ZeroTotalRate { total: total_rate, time: self.clock.current_time })?;

        let surface = &self.surface;
        let species = &self.species;
        self.clock.advance(dt, |boundary| {
            reporter.record(boundary, SurfaceView { surface, species });
        });

        if let Some(diffusion) = self.params.diffusion {
            let DiffusionStats { moved, stuck, .. } =
                diffuse_surface(&mut self.surface, &self.species, &diffusion, dt, &mut self.rng)?;
            self.stats.diffusion_moves += moved;
            self.stats.diffusion_stuck += stuck;
        }

        let outcome = self.apply(choice)?;
        self.stats.iterations += 1;
        Ok(outcome)
    }

    fn apply(&mut self, choice: EventChoice) -> Result<StepOutcome> {
        match choice {
            EventChoice::Adsorb { species_id } => {
                let phi = TAU * self.rng.random::<f64>();
                let theta = (2.0 * self.rng.random::<f64>() - 1.0).acos();
                if adsorption_collides(&self.surface, &self.species, species_id, phi, theta) {
                    self.stats.rejected += 1;
                    trace!("Rejected species {} at ({:.3}, {:.3})", species_id, phi, theta);
                    Ok(StepOutcome::Rejected { species_id })
                } else {
                    let handle = self.surface.insert(BoundParticle::new(species_id, phi, theta));
                    self.stats.adsorbed += 1;
                    trace!("Adsorbed species {} at ({:.3}, {:.3})", species_id, phi, theta);
                    Ok(StepOutcome::Adsorbed { handle, species_id })
                }
            }
            EventChoice::Desorb { position } => {
                let (handle, particle) = self.surface.remove_at(position).ok_or_else(|| {
                    anyhow::anyhow!("desorption channel {} has no particle ({} bound)", position, self.surface.len())
                })?;
                self.stats.desorbed += 1;
                trace!("Desorbed species {} from position {}", particle.species_id, position);
                Ok(StepOutcome::Desorbed { handle, species_id: particle.species_id })
            }
        }
    }

    /// Runs until the clock reaches the end time, then hands the final state to `finish`.
    pub fn run<P: Reporter + ?Sized>(&mut self, reporter: &mut P) -> Result<RunSummary> {
        info!(
            "Running KMC to t = {} s ({} species, R = {} nm, diffusion {})",
            self.params.end_time,
            self.species.len(),
            self.params.np_radius,
            if self.params.diffusion.is_some() { "on" } else { "off" }
        );
        let start_time = Instant::now();

        while !self.is_finished() {
            self.step(reporter)?;
        }

        reporter.finish(
            self.clock.current_time,
            SurfaceView { surface: &self.surface, species: &self.species },
        );

        let elapsed = start_time.elapsed();
        info!(
            "Finished {} iterations in {:.3} s: {} adsorbed, {} rejected, {} desorbed, {} bound at end",
            self.stats.iterations,
            elapsed.as_secs_f64(),
            self.stats.adsorbed,
            self.stats.rejected,
            self.stats.desorbed,
            self.surface.len()
        );

        Ok(RunSummary {
            final_time: self.clock.current_time,
            stats: self.stats,
            final_counts: self.surface.count_by_species(self.species.len()),
            snapshots_reported: self.clock.reports_issued(),
        })
    }

    /// Cartesian centres of all bound particles, at `R + r` from the origin.
    pub fn final_coordinates(&self) -> Vec<FinalCoordinate> {
        let np_radius = self.params.np_radius;
        self.surface
            .particles()
            .map(|(_, particle)| {
                let radius = self.species.radius(particle.species_id);
                let position = to_cartesian(particle.phi, particle.theta, np_radius + radius);
                FinalCoordinate {
                    species_id: particle.species_id,
                    x: position.x,
                    y: position.y,
                    z: position.z,
                    radius,
                }
            })
            .collect()
    }
}

fn validate_params(params: &RunParams, species: &SpeciesTable) -> Result<(), KmcError> {
    let positive = |v: f64| v.is_finite() && v > 0.0;
    if !positive(params.np_radius) {
        return Err(KmcError::InvalidRunParams(format!("nanoparticle radius {}", params.np_radius)));
    }
    if (params.np_radius - species.np_radius()).abs() > 1e-12 * params.np_radius {
        return Err(KmcError::InvalidRunParams(format!(
            "species table built for R = {} but run uses R = {}",
            species.np_radius(),
            params.np_radius
        )));
    }
    if !positive(params.end_time) {
        return Err(KmcError::InvalidRunParams(format!("end time {}", params.end_time)));
    }
    if !positive(params.update_interval) {
        return Err(KmcError::InvalidRunParams(format!("update interval {}", params.update_interval)));
    }
    if let Some(diffusion) = &params.diffusion {
        if !(diffusion.coefficient.is_finite() && diffusion.coefficient >= 0.0) {
            return Err(KmcError::InvalidRunParams(format!("diffusion coefficient {}", diffusion.coefficient)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use corona_common::SpeciesParams;

    fn params(end_time: f64, interval: f64) -> RunParams {
        RunParams { np_radius: 20.0, end_time, update_interval: interval, diffusion: None }
    }

    fn table() -> SpeciesTable {
        SpeciesTable::new(&[SpeciesParams::new("A", 1e-5, 2.0, 1e4, 0.1)], 20.0).unwrap()
    }

    #[test]
    fn clock_reports_each_crossed_boundary_once() {
        let mut clock = SimulationClock::new(&params(100.0, 5.0));
        let mut seen = Vec::new();
        clock.advance(0.5, |t| seen.push(t));
        assert_eq!(seen, vec![0.0]);
        clock.advance(17.0, |t| seen.push(t));
        assert_eq!(seen, vec![0.0, 5.0, 10.0, 15.0]);
        assert!((clock.current_time - 17.5).abs() < 1e-12);
        assert_eq!(clock.last_reported_time, 20.0);
        clock.advance(1.0, |t| seen.push(t));
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn clock_stops_reporting_at_budget() {
        let mut clock = SimulationClock::new(&params(10.0, 1.0));
        let mut seen = Vec::new();
        clock.advance(1e9, |t| seen.push(t));
        assert_eq!(seen.len(), 10);
        assert_eq!(seen.last(), Some(&9.0));
        assert!(clock.current_time >= 1e9);
    }

    #[test]
    fn first_event_on_empty_surface_is_adsorption() {
        for seed in 0..50 {
            let mut sim = KmcSimulation::new(params(10.0, 1.0), table(), seed).unwrap();
            let outcome = sim.step(&mut crate::report::NullReporter).unwrap();
            assert!(matches!(outcome, StepOutcome::Adsorbed { species_id: 0, .. }));
            assert_eq!(sim.surface().len(), 1);
        }
    }

    #[test]
    fn mismatched_radius_is_rejected() {
        let wrong_radius = SpeciesTable::new(&[SpeciesParams::new("A", 1e-5, 2.0, 1e4, 0.1)], 30.0).unwrap();
        let err = KmcSimulation::new(params(10.0, 1.0), wrong_radius, 1).err().unwrap();
        assert!(matches!(err.downcast_ref::<KmcError>(), Some(KmcError::InvalidRunParams(_))));
    }

    #[test]
    fn vanishing_adsorption_rate_is_fatal() {
        // c * kon underflows to zero, so nothing can ever fire.
        let frozen = SpeciesTable::new(&[SpeciesParams::new("A", 1e-200, 2.0, 1e-200, 0.1)], 20.0).unwrap();
        assert_eq!(frozen.adsorption_rates(), vec![0.0]);
        let err = KmcSimulation::new(params(10.0, 1.0), frozen, 1).err().unwrap();
        match err.downcast_ref::<KmcError>() {
            Some(KmcError::ZeroTotalRate { total, time }) => {
                assert_eq!(*total, 0.0);
                assert_eq!(*time, 0.0);
            }
            other => panic!("expected ZeroTotalRate, got {:?}", other),
        }
    }

    #[test]
    fn final_coordinates_sit_on_lifted_sphere() {
        let mut sim = KmcSimulation::new(params(50.0, 1.0), table(), 9).unwrap();
        sim.run(&mut crate::report::NullReporter).unwrap();
        let coords = sim.final_coordinates();
        assert_eq!(coords.len(), sim.surface().len());
        for c in coords {
            let r = (c.x * c.x + c.y * c.y + c.z * c.z).sqrt();
            assert!((r - 22.0).abs() < 1e-9);
            assert_eq!(c.radius, 2.0);
        }
    }
}
