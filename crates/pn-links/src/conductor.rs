//! Fixed-conductance two-port link.
//!
//! The simplest possible network participant: a resistor. Linear, so its
//! acceptance check always confirms. Useful as distribution wiring and as
//! the load in end-to-end scenarios.

use crate::error::{LinkError, LinkResult};
use crate::traits::{grounded, PowerLink};
use pn_core::units::Conductance;
use pn_core::{NodeId, Real};
use pn_network::{MinorStep, NodalSystem, Ports, SolutionResult, StampSlot};

#[derive(Debug)]
pub struct ConductorLink {
    name: String,
    ports: Ports,
    slot: StampSlot,
    conductance: Real,
    flux: Real,
    power: Real,
}

impl ConductorLink {
    /// A conductor between two nodes.
    pub fn between(
        name: String,
        system: &mut NodalSystem,
        from: NodeId,
        to: NodeId,
        conductance: Conductance,
    ) -> LinkResult<Self> {
        Self::with_ports(name, system, Ports::Pair(from, to), conductance)
    }

    /// A conductor from one node to ground.
    pub fn to_ground(
        name: String,
        system: &mut NodalSystem,
        node: NodeId,
        conductance: Conductance,
    ) -> LinkResult<Self> {
        Self::with_ports(name, system, Ports::Shunt(node), conductance)
    }

    fn with_ports(
        name: String,
        system: &mut NodalSystem,
        ports: Ports,
        conductance: Conductance,
    ) -> LinkResult<Self> {
        if conductance.value <= 0.0 {
            return Err(LinkError::InvalidConfig {
                what: "conductance must be positive",
            });
        }
        let slot = system.reserve_ports(ports)?;
        Ok(Self {
            name,
            ports,
            slot,
            conductance: conductance.value,
            flux: 0.0,
            power: 0.0,
        })
    }

    /// Current through the conductor (A).
    pub fn flux(&self) -> Real {
        self.flux
    }

    /// Dissipated power (W).
    pub fn power(&self) -> Real {
        self.power
    }
}

impl PowerLink for ConductorLink {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> Ports {
        self.ports
    }

    fn update_contribution(&mut self, system: &mut NodalSystem) -> LinkResult<()> {
        system.set_stamp(self.slot, self.conductance, 0.0)?;
        Ok(())
    }

    fn confirm_solution(&mut self, _system: &NodalSystem, _step: MinorStep) -> SolutionResult {
        SolutionResult::Confirm
    }

    fn compute_flows(&mut self, system: &NodalSystem) -> LinkResult<()> {
        if grounded(system, self.ports) {
            self.flux = 0.0;
            self.power = 0.0;
            return Ok(());
        }
        let dv = match self.ports {
            Ports::Shunt(node) => system.potential(node),
            Ports::Pair(a, b) => system.delta(a, b),
        };
        self.flux = self.conductance * dv;
        self.power = dv * self.flux;
        Ok(())
    }
}
