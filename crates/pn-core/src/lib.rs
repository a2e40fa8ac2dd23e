//! pn-core: stable foundation for powernet.
//!
//! Contains:
//! - units (uom SI electrical types + constructors)
//! - numeric (Real + convergence tolerances)
//! - ids (compact node identifiers)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{PnError, PnResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
