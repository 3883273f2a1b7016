use serde::{Serialize, Deserialize};

/// Surface composition at one report boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// The report boundary (s) this snapshot belongs to.
    pub time: f64,
    /// Bound particles per reported column (species id or species-name group).
    pub counts: Vec<u32>,
    pub total_count: u32,
    /// Sum over species of bound count divided by that species' binding-site count.
    pub total_coverage: f64,
    /// Mean-field prediction per species id, if the analytic overlay is enabled.
    #[serde(default)]
    pub analytic: Option<Vec<f64>>,
}

/// A full recorded run: column labels plus the interval snapshots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeSeries {
    /// One label per entry of `Snapshot::counts`.
    pub labels: Vec<String>,
    /// Species names, one per entry of `Snapshot::analytic`.
    pub species_names: Vec<String>,
    pub snapshots: Vec<Snapshot>,
    /// State when the run stopped, outside the regular interval grid.
    #[serde(default)]
    pub final_state: Option<Snapshot>,
}

/// Cartesian position of one bound particle at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinalCoordinate {
    pub species_id: usize,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub radius: f64,
}
