use serde::{Deserialize, Serialize};
use anyhow::Result;
use crate::sim_params::{DiffusionParams, RunParams};
use std::path::{Path, PathBuf};

// Configuration for the nanoparticle the species adsorb onto
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct NanoparticleConfig {
    pub radius_nm: f64,
}

impl Default for NanoparticleConfig {
    fn default() -> Self {
        NanoparticleConfig { radius_nm: 35.0 }
    }
}

// Configuration for timing
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct TimingConfig {
    /// Simulated time at which the run stops (s).
    pub end_time_s: f64,
    /// Spacing of the recorded snapshots (s).
    pub update_interval_s: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            end_time_s: 3600.0,
            update_interval_s: 5.0,
        }
    }
}

/// Distance law used when validating a diffusion move against its neighbours.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DiffusionMetric {
    /// Chord distance scaled by the larger of the two radii plus the NP radius.
    /// Matches the adsorption test for equal radii only.
    #[default]
    Approximate,
    /// Same great-circle test used for adsorption.
    Exact,
}

// Surface diffusion settings. Mostly unnecessary for reversible binding, since
// the surface restructures through desorption and readsorption anyway.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct DiffusionConfig {
    pub enabled: bool,
    pub coefficient_nm2_per_s: f64,
    /// Attempts per particle per event before giving up.
    pub max_trials: u32,
    pub metric: DiffusionMetric,
}

impl Default for DiffusionConfig {
    fn default() -> Self {
        DiffusionConfig {
            enabled: false,
            coefficient_nm2_per_s: 1e5,
            max_trials: 4,
            metric: DiffusionMetric::Approximate,
        }
    }
}

// Where the species parameters come from and how they are reported
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct SpeciesConfig {
    /// Whitespace-delimited species file. The built-in HSA/HDL/Fib set is used if absent.
    pub file: Option<PathBuf>,
    /// Sum rows sharing a name (orientations of one protein) in reports.
    pub group_by_name: bool,
    /// Treat every row as an orientation of a single protein and print an
    /// effective radius / equilibrium constant at the end.
    pub coarse_grain: bool,
}

impl Default for SpeciesConfig {
    fn default() -> Self {
        SpeciesConfig {
            file: None,
            group_by_name: true,
            coarse_grain: false,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct RunConfig {
    pub seed: u64,
    /// Independent trajectories, seeded `seed`, `seed + 1`, ...
    pub replicates: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig { seed: 42, replicates: 1 }
    }
}

// Configuration for output settings, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub base_filename: String,
    /// Free-form tag appended to every output file name.
    pub file_id: String,
    pub save_stats: bool,
    pub format: Option<String>, // Output format: "json", "bincode", "messagepack"
    pub save_time_series: bool,
    pub save_final_coords: bool,
    /// Evaluate the mean-field model alongside every snapshot.
    pub analytic: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            base_filename: "kmc".to_string(),
            file_id: "0".to_string(),
            save_stats: true,
            format: None,
            save_time_series: true,
            save_final_coords: true,
            analytic: false,
        }
    }
}

// Main simulation configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct SimulationConfig {
    pub nanoparticle: NanoparticleConfig,
    pub timing: TimingConfig,
    pub diffusion: DiffusionConfig,
    pub species: SpeciesConfig,
    pub run: RunConfig,
    pub output: OutputConfig,
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        let config = Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config in '{}': {}", path_ref.display(), e))?;
        Ok(config)
    }

    /// Parses and validates a configuration held in memory.
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let radius = self.nanoparticle.radius_nm;
        if !(radius.is_finite() && radius > 0.0) {
            anyhow::bail!("radius_nm must be positive, got {}.", radius);
        }
        if !(self.timing.end_time_s.is_finite() && self.timing.end_time_s > 0.0) {
            anyhow::bail!("end_time_s must be positive.");
        }
        if !(self.timing.update_interval_s.is_finite() && self.timing.update_interval_s > 0.0) {
            anyhow::bail!("update_interval_s must be positive.");
        }
        if self.diffusion.enabled {
            if !(self.diffusion.coefficient_nm2_per_s.is_finite() && self.diffusion.coefficient_nm2_per_s >= 0.0) {
                anyhow::bail!("coefficient_nm2_per_s must be non-negative.");
            }
            if self.diffusion.max_trials == 0 {
                anyhow::bail!("max_trials must be greater than 0 when diffusion is enabled.");
            }
        }
        if self.run.replicates == 0 {
            anyhow::bail!("replicates must be greater than 0.");
        }
        Ok(())
    }

    /// Converts the configuration into the parameters the engine reads at runtime.
    pub fn run_params(&self) -> RunParams {
        let diffusion = if self.diffusion.enabled {
            Some(DiffusionParams {
                coefficient: self.diffusion.coefficient_nm2_per_s,
                max_trials: self.diffusion.max_trials,
                metric: self.diffusion.metric,
            })
        } else {
            None
        };

        RunParams {
            np_radius: self.nanoparticle.radius_nm,
            end_time: self.timing.end_time_s,
            update_interval: self.timing.update_interval_s,
            diffusion,
        }
    }

    /// Common prefix of every output file, e.g. `kmc_35_s0_0`.
    pub fn output_stem(&self) -> String {
        format!(
            "{}_{}_s{}_{}",
            self.output.base_filename,
            self.nanoparticle.radius_nm,
            u8::from(self.diffusion.enabled),
            self.output.file_id
        )
    }
}
