//! pn-network: shared linear-system state for the power network.
//!
//! The outer solver owns one [`NodalSystem`] per network. Nonlinear links
//! reserve their port cells at initialization and write their admittance and
//! source contribution into those cells (and only those cells) once per minor
//! step. The acceptance protocol ([`SolutionResult`]) and the minor-step
//! counter pair ([`MinorStep`]) live here because every link and the solve
//! driver speak them.

pub mod acceptance;
pub mod error;
pub mod step;
pub mod system;

pub use acceptance::SolutionResult;
pub use error::{NetworkError, NetworkResult};
pub use step::MinorStep;
pub use system::{NodalSystem, Ports, StampSlot};
