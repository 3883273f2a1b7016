use corona_common::{default_species, RunParams, SpeciesParams, TimeSeries};
use corona_kmc::analytic::langmuir_single_species;
use corona_kmc::report::{Reporter, SurfaceView};
use corona_kmc::{KmcSimulation, MeanFieldModel, SpeciesTable, TimeSeriesRecorder};

fn low_coverage() -> SpeciesTable {
    // c * kon = 0.01 /s on ~255 sites, koff = 1 /s: about 2.5 bound on average.
    SpeciesTable::new(&[SpeciesParams::new("A", 1e-6, 5.0, 1e4, 1.0)], 35.0).unwrap()
}

fn record(params: RunParams, species: SpeciesTable, seed: u64) -> TimeSeries {
    let mut recorder = TimeSeriesRecorder::new(&species, true);
    let mut sim = KmcSimulation::new(params, species, seed).unwrap();
    sim.run(&mut recorder).unwrap();
    recorder.into_series()
}

#[test]
fn low_coverage_matches_langmuir_average() {
    let params = RunParams { np_radius: 35.0, end_time: 400.0, update_interval: 1.0, diffusion: None };
    let species = low_coverage();
    let s = species.get(0).unwrap();
    let expected = langmuir_single_species(400.0, s.concentration, s.kon, s.koff, s.max_binding_sites);
    assert!((expected - 2.5).abs() < 0.1, "closed-form count {}", expected);
    let steady = MeanFieldModel::new(&species).unwrap().steady_state()[0];
    assert!((steady - expected).abs() < 1e-9);

    let series = record(params, species, 2024);
    assert_eq!(series.snapshots.len(), 400);
    for (k, snapshot) in series.snapshots.iter().enumerate() {
        assert_eq!(snapshot.time, k as f64);
    }

    let late: Vec<f64> = series
        .snapshots
        .iter()
        .filter(|s| s.time >= 20.0)
        .map(|s| s.total_count as f64)
        .collect();
    let mean = late.iter().sum::<f64>() / late.len() as f64;
    assert!((mean - expected).abs() < 0.5, "time-averaged count {} vs {}", mean, expected);

    let final_state = series.final_state.unwrap();
    assert!(final_state.time >= 400.0);
}

#[test]
fn same_seed_replays_the_same_trajectory() {
    let params = RunParams { np_radius: 35.0, end_time: 50.0, update_interval: 5.0, diffusion: None };
    let species = SpeciesTable::new(&default_species(), 35.0).unwrap();
    let a = record(params.clone(), species.clone(), 77);
    let b = record(params, species, 77);
    assert_eq!(a.snapshots, b.snapshots);
    assert_eq!(a.final_state, b.final_state);
    assert_eq!(a.snapshots.len(), 10);
}

#[test]
fn snapshots_count_only_when_interval_divides_end_time() {
    let params = RunParams { np_radius: 35.0, end_time: 12.5, update_interval: 5.0, diffusion: None };
    let series = record(params, low_coverage(), 1);
    let times: Vec<f64> = series.snapshots.iter().map(|s| s.time).collect();
    assert_eq!(times, vec![0.0, 5.0]);
}

/// Checks what reporters are handed rather than what they store.
#[derive(Default)]
struct BoundaryLog {
    times: Vec<f64>,
    populations: Vec<usize>,
    finished: Vec<f64>,
}

impl Reporter for BoundaryLog {
    fn record(&mut self, time: f64, view: SurfaceView<'_>) {
        self.times.push(time);
        self.populations.push(view.surface.len());
    }

    fn finish(&mut self, time: f64, _view: SurfaceView<'_>) {
        self.finished.push(time);
    }
}

#[test]
fn reporter_sees_every_boundary_then_one_finish() {
    let params = RunParams { np_radius: 20.0, end_time: 30.0, update_interval: 0.5, diffusion: None };
    let species = SpeciesTable::new(&[SpeciesParams::new("A", 1e-5, 3.0, 1e4, 0.2)], 20.0).unwrap();
    let mut seen = BoundaryLog::default();
    let mut sim = KmcSimulation::new(params, species, 8).unwrap();
    let summary = sim.run(&mut seen).unwrap();

    assert_eq!(seen.times.len(), 60);
    assert!(seen.times.windows(2).all(|w| w[1] > w[0]));
    assert_eq!(seen.populations[0], 0);
    assert_eq!(seen.finished, vec![summary.final_time]);
    assert_eq!(summary.snapshots_reported, 60);
    assert_eq!(summary.final_counts.iter().sum::<u32>() as usize, sim.surface().len());
}
