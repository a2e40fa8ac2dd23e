//! Reference minor-step driver for the nonlinear link protocol.
//!
//! This crate is deliberately thin: the production outer solver lives with
//! the host environment. What is here is the protocol itself: stamp, solve,
//! track the converged-step counter, aggregate every link's acceptance
//! verdict under Reject > Delay > Confirm, and iterate until the network
//! confirms a settled solution or the minor-step budget runs out.

pub mod error;
pub mod solve;

pub use error::{SolverError, SolverResult};
pub use solve::{solve_major_step, MajorStepReport, SolverConfig};
