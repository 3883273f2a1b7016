use serde::{Deserialize, Serialize};
use crate::config::DiffusionMetric;

/// Run parameters derived from the configuration, read by the engine on every iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunParams {
    pub np_radius: f64,      // Nanoparticle radius (nm)
    pub end_time: f64,       // s
    pub update_interval: f64, // Snapshot spacing (s)
    /// `None` disables surface diffusion.
    pub diffusion: Option<DiffusionParams>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DiffusionParams {
    pub coefficient: f64, // nm^2/s
    pub max_trials: u32,
    pub metric: DiffusionMetric,
}

impl RunParams {
    /// Number of interval snapshots a complete run emits.
    pub fn snapshot_budget(&self) -> u64 {
        // Small slack so 10.0 / 0.1 still counts as 100 intervals.
        (self.end_time / self.update_interval + 1e-9).floor() as u64
    }
}
