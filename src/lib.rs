//! Kinetic Monte Carlo engine for protein corona formation on a spherical nanoparticle.
//!
//! Species adsorb at random surface points (rejected if they would overlap a bound
//! particle), desorb with first-order kinetics, and optionally diffuse over the surface.

pub mod analytic;
pub mod diffusion;
pub mod error;
pub mod geometry;
pub mod output;
pub mod rates;
pub mod replicates;
pub mod report;
pub mod simulation;
pub mod species;
pub mod surface;

pub use analytic::MeanFieldModel;
pub use error::KmcError;
pub use rates::{EventChoice, RateModel};
pub use replicates::{run_replicates, ReplicatePlan, ReplicateResult, ReplicateStatistics};
pub use report::{CoarseGrainSummary, NullReporter, Reporter, SurfaceView, TimeSeriesRecorder};
pub use simulation::{EventStats, KmcSimulation, RunSummary, SimulationClock, StepOutcome};
pub use species::{Species, SpeciesTable};
pub use surface::{BoundParticle, ParticleHandle, SurfaceState};
