//! Network-state error types.

use pn_core::PnError;
use thiserror::Error;

/// Errors raised by the shared nodal system.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error("Node index {index} out of range (node count {count})")]
    NodeOutOfRange { index: u32, count: usize },

    #[error("Stamp slot {slot} out of range (slot count {count})")]
    SlotOutOfRange { slot: usize, count: usize },

    #[error("Non-finite stamp value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}

pub type NetworkResult<T> = Result<T, NetworkError>;

impl From<NetworkError> for PnError {
    fn from(e: NetworkError) -> Self {
        match e {
            NetworkError::NodeOutOfRange { index, count } => PnError::IndexOob {
                what: "node",
                index: index as usize,
                len: count,
            },
            NetworkError::SlotOutOfRange { slot, count } => PnError::IndexOob {
                what: "stamp slot",
                index: slot,
                len: count,
            },
            NetworkError::NonFinite { what, value } => PnError::NonFinite { what, value },
            NetworkError::InvalidArg { what } => PnError::InvalidArg { what },
        }
    }
}
