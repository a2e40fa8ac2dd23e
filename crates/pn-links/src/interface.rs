//! Cross-link power negotiation.
//!
//! A power-consuming input link and a power-producing output link wired to
//! the same conceptual bus register against a shared [`PowerBus`]. Exactly
//! one side leads the interface, decided once by registration order: the
//! leader computes its terminal voltage/power from its own network and
//! publishes it; the follower reads the published values instead of
//! computing its own. A link with no partner keeps its handle absent
//! (`None`) and falls back to leading with its local measurement.
//!
//! Single-threaded by design (the core is call-driven by an external
//! scheduler), hence `Rc<RefCell>`.

use pn_core::Real;
use std::cell::RefCell;
use std::rc::Rc;

/// Which role a link plays on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusSide {
    /// Power-consuming link (draws from its network).
    Input,
    /// Power-producing link (sources into its network).
    Output,
}

/// Values the leading side publishes from its acceptance check.
///
/// Publication is deliberately tied to converged steps only: terminal
/// voltage and validity firm up only once the network has settled on the
/// current linearization, so followers never act on a still-moving
/// intermediate solution. In between, the bus retains the last published
/// values. The default is invalid, meaning a follower draws nothing until
/// its leader has confirmed a settled solution at least once.
#[derive(Debug, Clone, Copy, Default)]
pub struct Published {
    pub voltage: Real,
    pub power: Real,
    /// False on trip, disable, or invalid upstream. A follower seeing false
    /// zeroes its own derived quantities immediately, without waiting for
    /// its own protective checks.
    pub valid: bool,
}

#[derive(Debug, Default)]
struct BusState {
    leader: Option<BusSide>,
    published: Published,
}

/// Shared bus both sides hold a handle to.
#[derive(Debug, Clone, Default)]
pub struct PowerBus {
    state: Rc<RefCell<BusState>>,
}

impl PowerBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one side. The first side to attach leads the interface;
    /// leadership is fixed until re-initialization.
    pub fn attach(&self, side: BusSide) -> BusHandle {
        let mut state = self.state.borrow_mut();
        let leads = match state.leader {
            None => {
                state.leader = Some(side);
                true
            }
            Some(leader) => leader == side,
        };
        BusHandle {
            state: Rc::clone(&self.state),
            side,
            leads,
        }
    }
}

/// One side's handle to the shared bus.
#[derive(Debug, Clone)]
pub struct BusHandle {
    state: Rc<RefCell<BusState>>,
    side: BusSide,
    leads: bool,
}

impl BusHandle {
    pub fn side(&self) -> BusSide {
        self.side
    }

    pub fn leads(&self) -> bool {
        self.leads
    }

    /// Publish this step's terminal values. Only meaningful from the leader;
    /// a follower's publish is ignored.
    pub fn publish(&self, voltage: Real, power: Real, valid: bool) {
        if !self.leads {
            return;
        }
        self.state.borrow_mut().published = Published {
            voltage,
            power,
            valid,
        };
    }

    /// Read the leader's latest published values.
    pub fn read(&self) -> Published {
        self.state.borrow().published
    }
}
