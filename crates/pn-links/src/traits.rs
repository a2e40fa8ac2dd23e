//! Core trait for nonlinear power links.

use crate::error::LinkResult;
use pn_network::{MinorStep, NodalSystem, Ports, SolutionResult};

/// Trait for links participating in the iterative network solve.
///
/// The outer solver drives three calls per minor step, in order across all
/// links: `update_contribution` (write admittance/source into the link's
/// reserved cells), `confirm_solution` (the acceptance check; may read but
/// never write network-wide state), and, once the step is accepted,
/// `compute_flows` (power/flux bookkeeping). State transitions happen only
/// inside `confirm_solution`, on a converged step.
///
/// A link whose ports are all the designated ground node must always confirm
/// and treat its own physical quantities as zero; [`grounded`] is the check.
pub trait PowerLink {
    /// Link name for debugging and identification.
    fn name(&self) -> &str;

    /// The network ports this link reserved.
    fn ports(&self) -> Ports;

    /// Major-step boundary: reset flip guards and per-frame counters.
    /// Trip latches are NOT cleared here; those wait for an explicit command.
    fn begin_major_step(&mut self) {}

    /// Write this minor step's admittance/source contribution. Must be
    /// idempotent for identical inputs with no intervening acceptance call.
    fn update_contribution(&mut self, system: &mut NodalSystem) -> LinkResult<()>;

    /// Judge the latest potentials against the state this link linearized
    /// with. Read-only on the shared system.
    fn confirm_solution(&mut self, system: &NodalSystem, step: MinorStep) -> SolutionResult;

    /// Post-acceptance flow/power computation.
    fn compute_flows(&mut self, _system: &NodalSystem) -> LinkResult<()> {
        Ok(())
    }
}

/// True when every port of `ports` is the system's ground node.
pub fn grounded(system: &NodalSystem, ports: Ports) -> bool {
    ports.all_ground(system.ground())
}
