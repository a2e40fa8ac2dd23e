//! Diode link: two-terminal device with a flip-guarded bias state machine.

use crate::error::{LinkError, LinkResult};
use crate::regulation::{BiasMachine, FlipOutcome};
use crate::state::Bias;
use crate::traits::{grounded, PowerLink};
use pn_core::units::Conductance;
use pn_core::{NodeId, Real};
use pn_network::{MinorStep, NodalSystem, Ports, SolutionResult, StampSlot};

/// Ideal-switch diode: forward conductance when biased forward, a small
/// leakage conductance when biased reverse.
///
/// The bias used for the linearization is only re-judged on a converged step.
/// If the stored bias disagrees with what the measured potential difference
/// implies, the link flips (flip-guarded) and rejects the solution so the
/// network re-linearizes with the other conductance.
#[derive(Debug)]
pub struct DiodeLink {
    name: String,
    anode: NodeId,
    cathode: NodeId,
    slot: StampSlot,
    forward_conductance: Real,
    reverse_conductance: Real,
    bias: BiasMachine,
    /// Bias assumption baked into the current stamp.
    stamped_bias: Bias,
    flux: Real,
    power: Real,
}

impl DiodeLink {
    pub fn new(
        name: String,
        system: &mut NodalSystem,
        anode: NodeId,
        cathode: NodeId,
        forward_conductance: Conductance,
        reverse_conductance: Conductance,
    ) -> LinkResult<Self> {
        let g_fwd = forward_conductance.value;
        let g_rev = reverse_conductance.value;
        if g_fwd <= 0.0 {
            return Err(LinkError::InvalidConfig {
                what: "forward conductance must be positive",
            });
        }
        if g_rev < 0.0 || g_rev >= g_fwd {
            return Err(LinkError::InvalidConfig {
                what: "reverse conductance must be non-negative and below forward",
            });
        }
        let slot = system.reserve_ports(Ports::Pair(anode, cathode))?;
        Ok(Self {
            name,
            anode,
            cathode,
            slot,
            forward_conductance: g_fwd,
            reverse_conductance: g_rev,
            bias: BiasMachine::new(Bias::Forward, crate::FlipGuard::DEFAULT_CAP),
            stamped_bias: Bias::Forward,
            flux: 0.0,
            power: 0.0,
        })
    }

    /// Override the flip-guard cap (default 4).
    pub fn with_flip_cap(mut self, cap: u32) -> Self {
        let bias = self.bias.bias();
        self.bias = BiasMachine::new(bias, cap);
        self
    }

    /// Start from a given bias assumption (default forward).
    pub fn with_initial_bias(mut self, bias: Bias) -> Self {
        let cap = self.bias.guard().cap();
        self.bias = BiasMachine::new(bias, cap);
        self.stamped_bias = bias;
        self
    }

    pub fn bias(&self) -> Bias {
        self.bias.bias()
    }

    /// Current through the diode, anode to cathode (A).
    pub fn flux(&self) -> Real {
        self.flux
    }

    /// Dissipated power (W).
    pub fn power(&self) -> Real {
        self.power
    }

    fn conductance_for(&self, bias: Bias) -> Real {
        match bias {
            Bias::Forward => self.forward_conductance,
            Bias::Reverse => self.reverse_conductance,
        }
    }
}

impl PowerLink for DiodeLink {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> Ports {
        Ports::Pair(self.anode, self.cathode)
    }

    fn begin_major_step(&mut self) {
        self.bias.begin_major_step();
    }

    fn update_contribution(&mut self, system: &mut NodalSystem) -> LinkResult<()> {
        let bias = self.bias.bias();
        system.set_stamp(self.slot, self.conductance_for(bias), 0.0)?;
        self.stamped_bias = bias;
        Ok(())
    }

    fn confirm_solution(&mut self, system: &NodalSystem, step: MinorStep) -> SolutionResult {
        if grounded(system, self.ports()) {
            return SolutionResult::Confirm;
        }
        if !step.is_converged() {
            return SolutionResult::Confirm;
        }
        // Immediate correction: the stamp still reflects the previous step's
        // bias assumption. Reject once; the flip was already counted.
        if self.stamped_bias != self.bias.bias() {
            return SolutionResult::Reject;
        }
        let implied = Bias::from_delta(system.delta(self.anode, self.cathode));
        match self.bias.observe(implied) {
            FlipOutcome::Flipped => SolutionResult::Reject,
            FlipOutcome::Held | FlipOutcome::Saturated => SolutionResult::Confirm,
        }
    }

    fn compute_flows(&mut self, system: &NodalSystem) -> LinkResult<()> {
        if grounded(system, self.ports()) {
            self.flux = 0.0;
            self.power = 0.0;
            return Ok(());
        }
        let dv = system.delta(self.anode, self.cathode);
        self.flux = self.conductance_for(self.stamped_bias) * dv;
        self.power = dv * self.flux;
        Ok(())
    }
}
