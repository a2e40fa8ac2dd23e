//! Error types for link configuration and stepping.
//!
//! Configuration mistakes are fatal to initialization and surface here as
//! `Err`. Runtime protection (trips, limit entries, bias flips) is never an
//! error: it propagates through `SolutionResult` and sticky flags only.

use pn_core::PnError;
use pn_network::NetworkError;
use thiserror::Error;

/// Errors that can occur while building or stepping a link.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LinkError {
    #[error("Invalid configuration: {what}")]
    InvalidConfig { what: &'static str },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
}

pub type LinkResult<T> = Result<T, LinkError>;

impl From<LinkError> for PnError {
    fn from(e: LinkError) -> Self {
        match e {
            LinkError::InvalidConfig { what } => PnError::InvalidArg { what },
            LinkError::InvalidArg { what } => PnError::InvalidArg { what },
            LinkError::Network(n) => n.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = LinkError::InvalidConfig {
            what: "efficiency must be in (0, 1]",
        };
        assert!(err.to_string().contains("efficiency"));
    }

    #[test]
    fn network_error_wraps() {
        let err: LinkError = NetworkError::InvalidArg { what: "test" }.into();
        let core: PnError = err.into();
        assert!(matches!(core, PnError::InvalidArg { .. }));
    }
}
