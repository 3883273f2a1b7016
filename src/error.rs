use thiserror::Error;

/// Fatal configuration problems detected by the engine.
///
/// Rejected adsorption or diffusion moves are not errors and never show up here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KmcError {
    /// No adsorption channel is open and nothing is bound, so time cannot advance.
    #[error("total event rate is {total} at t = {time} s; no event can fire")]
    ZeroTotalRate { total: f64, time: f64 },

    #[error("species {index} ('{name}'): {reason}")]
    InvalidSpecies {
        index: usize,
        name: String,
        reason: String,
    },

    #[error("species table is empty")]
    EmptySpeciesTable,

    #[error("invalid run parameters: {0}")]
    InvalidRunParams(String),
}
