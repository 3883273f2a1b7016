use corona_common::{Snapshot, TimeSeries};
use log::{debug, info, warn};
use std::time::{Duration, Instant};

use crate::analytic::MeanFieldModel;
use crate::species::SpeciesTable;
use crate::surface::SurfaceState;

/// Read-only view of the surface handed to reporters.
#[derive(Clone, Copy)]
pub struct SurfaceView<'a> {
    pub surface: &'a SurfaceState,
    pub species: &'a SpeciesTable,
}

/// Consumer of the surface state at report boundaries.
///
/// `record` is called once per interval boundary, before the event whose waiting time
/// crossed it is applied. `finish` is called once, with the state at the end of the run.
pub trait Reporter {
    fn record(&mut self, time: f64, view: SurfaceView<'_>);

    fn finish(&mut self, _time: f64, _view: SurfaceView<'_>) {}
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn record(&mut self, _time: f64, _view: SurfaceView<'_>) {}
}

const STATUS_INTERVAL: Duration = Duration::from_secs(5);

/// Builds the per-species (or per-name) time series of bound counts.
pub struct TimeSeriesRecorder {
    columns: Vec<usize>,
    inverse_sites: Vec<f64>,
    analytic: Option<MeanFieldModel>,
    series: TimeSeries,
    last_status: Instant,
}

impl TimeSeriesRecorder {
    pub fn new(species: &SpeciesTable, group_by_name: bool) -> Self {
        let (labels, columns) = species.report_columns(group_by_name);
        Self {
            columns,
            inverse_sites: species.iter().map(|s| 1.0 / s.max_binding_sites).collect(),
            analytic: None,
            series: TimeSeries {
                labels,
                species_names: species.names(),
                snapshots: Vec::new(),
                final_state: None,
            },
            last_status: Instant::now(),
        }
    }

    /// Adds the mean-field prediction to every snapshot.
    pub fn with_analytic(mut self, model: MeanFieldModel) -> Self {
        self.analytic = Some(model);
        self
    }

    /// Summarises the surface at `time` without storing anything.
    pub fn snapshot(&self, time: f64, view: SurfaceView<'_>) -> Snapshot {
        let per_species = view.surface.count_by_species(view.species.len());
        let mut counts = vec![0u32; self.series.labels.len()];
        let mut total_coverage = 0.0;
        for (id, &n) in per_species.iter().enumerate() {
            counts[self.columns[id]] += n;
            total_coverage += n as f64 * self.inverse_sites[id];
        }

        Snapshot {
            time,
            total_count: per_species.iter().sum(),
            counts,
            total_coverage,
            analytic: self.analytic.as_ref().map(|model| model.evaluate(time)),
        }
    }

    pub fn series(&self) -> &TimeSeries {
        &self.series
    }

    pub fn into_series(self) -> TimeSeries {
        self.series
    }
}

impl Reporter for TimeSeriesRecorder {
    fn record(&mut self, time: f64, view: SurfaceView<'_>) {
        let snapshot = self.snapshot(time, view);
        if self.last_status.elapsed() >= STATUS_INTERVAL {
            info!(
                "t = {:.1} s | bound: {} | coverage: {:.4} | counts: {:?}",
                time, snapshot.total_count, snapshot.total_coverage, snapshot.counts
            );
            self.last_status = Instant::now();
        } else {
            debug!("t = {:.1} s | counts: {:?}", time, snapshot.counts);
        }
        self.series.snapshots.push(snapshot);
    }

    fn finish(&mut self, time: f64, view: SurfaceView<'_>) {
        let snapshot = self.snapshot(time, view);
        info!(
            "Final state at t = {:.2} s: {} bound, coverage {:.4}",
            time, snapshot.total_count, snapshot.total_coverage
        );
        self.series.final_state = Some(snapshot);
    }
}

/// Effective single-protein parameters, treating every species as one orientation
/// of the same protein.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoarseGrainSummary {
    pub total_count: u32,
    pub total_coverage: f64,
    /// Radius of a single hard sphere reproducing the observed count and coverage (nm).
    pub effective_radius: Option<f64>,
    /// `K_eq * concentration` from the scaled-particle adsorption isotherm.
    pub keq_concentration: Option<f64>,
    /// Binding free energy in units of kT.
    pub delta_g: Option<f64>,
}

impl CoarseGrainSummary {
    pub fn from_snapshot(snapshot: &Snapshot, np_radius: f64, total_concentration: f64) -> Self {
        let p = snapshot.total_count as f64;
        let c = snapshot.total_coverage;

        let denominator = (p - 2.0 * c).powi(2);
        let effective_radius = (denominator > 0.0 && c <= p)
            .then(|| {
                2.0 * np_radius * (-2.0 * c * c + 2.0 * c * p + p * (c * (p - c)).sqrt()) / denominator
            })
            .filter(|r| r.is_finite());

        let keq_concentration = (c < 1.0)
            .then(|| {
                let x = c / (1.0 - c);
                x * (3.0 * x + x * x).exp()
            })
            .filter(|k| k.is_finite());

        let delta_g = keq_concentration
            .filter(|&k| k > 0.0 && total_concentration > 0.0)
            .map(|k| -(k / total_concentration).ln());

        if effective_radius.is_none() || keq_concentration.is_none() {
            warn!("Coarse-grained summary is degenerate for count {} and coverage {:.4}", p, c);
        }

        Self {
            total_count: snapshot.total_count,
            total_coverage: c,
            effective_radius,
            keq_concentration,
            delta_g,
        }
    }
}
