//! Error types for the solve driver.

use pn_links::LinkError;
use pn_network::NetworkError;
use thiserror::Error;

/// Errors that can occur while driving a major step.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Network did not confirm within {steps} minor steps")]
    NonConvergence { steps: usize },

    #[error("Linear solve failed: {what}")]
    Singular { what: &'static str },

    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
}

pub type SolverResult<T> = Result<T, SolverError>;
