//! Fixed potential source link.
//!
//! Pins a node near a set potential through a stiff conductance. Linear;
//! always confirms. Plays the upstream battery/bus role in scenarios.

use crate::error::{LinkError, LinkResult};
use crate::traits::PowerLink;
use pn_core::units::{Conductance, Voltage};
use pn_core::{NodeId, Real};
use pn_network::{MinorStep, NodalSystem, Ports, SolutionResult, StampSlot};

#[derive(Debug)]
pub struct PotentialLink {
    name: String,
    node: NodeId,
    slot: StampSlot,
    target: Real,
    conductance: Real,
}

impl PotentialLink {
    pub fn new(
        name: String,
        system: &mut NodalSystem,
        node: NodeId,
        target: Voltage,
        conductance: Conductance,
    ) -> LinkResult<Self> {
        if conductance.value <= 0.0 {
            return Err(LinkError::InvalidConfig {
                what: "source conductance must be positive",
            });
        }
        let slot = system.reserve_ports(Ports::Shunt(node))?;
        Ok(Self {
            name,
            node,
            slot,
            target: target.value,
            conductance: conductance.value,
        })
    }

    pub fn set_target(&mut self, target: Voltage) {
        self.target = target.value;
    }
}

impl PowerLink for PotentialLink {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> Ports {
        Ports::Shunt(self.node)
    }

    fn update_contribution(&mut self, system: &mut NodalSystem) -> LinkResult<()> {
        system
            .set_stamp(self.slot, self.conductance, self.conductance * self.target)?;
        Ok(())
    }

    fn confirm_solution(&mut self, _system: &NodalSystem, _step: MinorStep) -> SolutionResult {
        SolutionResult::Confirm
    }
}
