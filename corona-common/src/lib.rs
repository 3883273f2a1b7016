pub mod config;
pub mod sim_params;
pub mod snapshot;
pub mod species;
pub mod vecmath;

// Re-export key types for easier use by dependent crates
pub use config::{SimulationConfig, NanoparticleConfig, TimingConfig, DiffusionConfig, DiffusionMetric, SpeciesConfig, RunConfig, OutputConfig};
pub use sim_params::{RunParams, DiffusionParams};
pub use snapshot::{Snapshot, TimeSeries, FinalCoordinate};
pub use species::{SpeciesParams, default_species, load_species_file, parse_species_table};
pub use vecmath::Vec3;
