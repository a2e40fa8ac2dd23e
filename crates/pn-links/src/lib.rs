//! Nonlinear power-link models for the network solve.
//!
//! Every link in this crate obeys the same discipline so the outer iterative
//! solve stays safe and terminating:
//! - protective trips are sticky, priority-gated [`TripLogic`] primitives;
//! - acceptance of a solution is the tri-state [`SolutionResult`] protocol
//!   (reject forces a re-linearization, delay asks for more iterations);
//! - every state machine runs its transitions through a [`FlipGuard`] so the
//!   number of state changes per major step is bounded;
//! - paired input/output links negotiate leadership over a [`PowerBus`].

pub mod conductor;
pub mod converter;
pub mod diode;
pub mod error;
pub mod guard;
pub mod interface;
pub mod potential;
pub mod regulation;
pub mod shunt;
pub mod source;
pub mod state;
pub mod traits;
pub mod trip;

pub use conductor::ConductorLink;
pub use converter::{
    ConverterInputLink, ConverterOutputLink, RegulationMode, RegulationTarget,
};
pub use diode::DiodeLink;
pub use error::{LinkError, LinkResult};
pub use guard::FlipGuard;
pub use interface::{BusHandle, BusSide, PowerBus, Published};
pub use potential::PotentialLink;
pub use regulation::{
    select_active_state, BiasMachine, FlipOutcome, LimitBounds, LimitMachine, OperateConditions,
};
pub use shunt::ShuntRegulatorLink;
pub use source::{CornerSource, SourceCurve, Terminal};
pub use state::{Availability, Bias, LimitState};
pub use traits::{grounded, PowerLink};
pub use trip::{TripLogic, TripSense};

// Re-export the protocol types links speak, for downstream convenience.
pub use pn_network::{MinorStep, SolutionResult};
