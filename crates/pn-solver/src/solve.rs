//! Minor-step iteration over a set of nonlinear links.

use crate::error::{SolverError, SolverResult};
use nalgebra::DVector;
use pn_core::Tolerances;
use pn_links::PowerLink;
use pn_network::{MinorStep, NodalSystem, SolutionResult};
use tracing::{debug, trace};

/// Driver configuration.
pub struct SolverConfig {
    /// Minor-step budget per major step.
    pub max_minor_steps: usize,
    /// Tolerance for deciding the potentials stopped moving.
    pub tolerance: Tolerances,
    /// Floor added to every diagonal so islands of disconnected (Off,
    /// tripped) links do not make the matrix singular.
    pub diagonal_floor: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_minor_steps: 40,
            tolerance: Tolerances {
                abs: 1e-9,
                rel: 1e-9,
            },
            diagonal_floor: 1e-12,
        }
    }
}

/// Outcome of one major step.
#[derive(Debug, Clone)]
pub struct MajorStepReport {
    /// Minor steps taken, including the confirming one.
    pub minor_steps: usize,
    /// Minor steps a link rejected (forced re-linearizations).
    pub rejections: usize,
    /// Minor steps the network was asked to keep iterating.
    pub delays: usize,
}

fn solve_linear(system: &NodalSystem, config: &SolverConfig) -> SolverResult<DVector<f64>> {
    let n = system.node_count();
    let mut matrix = system.conductance().clone();
    let mut rhs = system.source_vector().clone();
    for i in 0..n {
        matrix[(i, i)] += config.diagonal_floor;
    }
    if let Some(g) = system.ground() {
        // Reference row: potential pinned to zero.
        let gi = g.index() as usize;
        for j in 0..n {
            matrix[(gi, j)] = 0.0;
        }
        matrix[(gi, gi)] = 1.0;
        rhs[gi] = 0.0;
    }
    matrix
        .lu()
        .solve(&rhs)
        .ok_or(SolverError::Singular {
            what: "conductance matrix decomposition failed",
        })
}

/// Run one major step: iterate minor steps until every link confirms a
/// settled solution.
///
/// Per minor step, in a fixed order: all links write their contributions,
/// the system is re-assembled and solved, the converged counter advances (or
/// resets, if the potentials moved), then every link's acceptance verdict is
/// aggregated. A reject zeroes the converged counter and re-linearizes; a
/// delay just iterates again. On the confirming step all flows are computed.
pub fn solve_major_step(
    system: &mut NodalSystem,
    links: &mut [&mut dyn PowerLink],
    config: &SolverConfig,
) -> SolverResult<MajorStepReport> {
    for link in links.iter_mut() {
        link.begin_major_step();
    }

    let mut converged = 0usize;
    let mut rejections = 0usize;
    let mut delays = 0usize;
    let mut previous = system.potentials().clone();

    for absolute in 1..=config.max_minor_steps {
        for link in links.iter_mut() {
            link.update_contribution(system)?;
        }
        system.assemble();
        let potentials = solve_linear(system, config)?;

        let moved = potentials
            .iter()
            .zip(previous.iter())
            .any(|(a, b)| !config.tolerance.nearly_equal(*a, *b));
        converged = if moved { 0 } else { converged + 1 };
        previous = potentials.clone();
        system.set_potentials(potentials)?;

        let step = MinorStep::new(absolute, converged);
        let mut verdict = SolutionResult::Confirm;
        for link in links.iter_mut() {
            let result = link.confirm_solution(system, step);
            if !result.is_confirm() {
                debug!(
                    link = link.name(),
                    ?result,
                    absolute,
                    converged,
                    "link did not confirm"
                );
            }
            verdict = verdict.combine(result);
        }
        trace!(absolute, converged, ?verdict, "minor step");

        match verdict {
            SolutionResult::Reject => {
                rejections += 1;
                converged = 0;
            }
            SolutionResult::Delay => {
                delays += 1;
            }
            SolutionResult::Confirm if step.is_converged() => {
                for link in links.iter_mut() {
                    link.compute_flows(system)?;
                }
                return Ok(MajorStepReport {
                    minor_steps: absolute,
                    rejections,
                    delays,
                });
            }
            SolutionResult::Confirm => {}
        }
    }

    Err(SolverError::NonConvergence {
        steps: config.max_minor_steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pn_core::units::{siemens, volts};
    use pn_core::NodeId;
    use pn_links::{ConductorLink, PotentialLink};

    #[test]
    fn linear_network_confirms_in_a_few_steps() {
        // 28 V stiff source feeding a 1 S load through a 2 S line.
        let mut system = NodalSystem::new(2, None).unwrap();
        let n0 = NodeId::from_index(0);
        let n1 = NodeId::from_index(1);
        let mut src =
            PotentialLink::new("src".into(), &mut system, n0, volts(28.0), siemens(1e6)).unwrap();
        let mut line =
            ConductorLink::between("line".into(), &mut system, n0, n1, siemens(2.0)).unwrap();
        let mut load =
            ConductorLink::to_ground("load".into(), &mut system, n1, siemens(1.0)).unwrap();

        let mut links: Vec<&mut dyn PowerLink> = vec![&mut src, &mut line, &mut load];
        let report =
            solve_major_step(&mut system, &mut links, &SolverConfig::default()).unwrap();

        assert_eq!(report.rejections, 0);
        assert!(report.minor_steps <= 3);
        let v1 = system.potential(n1);
        assert!((v1 - 28.0 * 2.0 / 3.0).abs() < 1e-3, "v1 = {v1}");
        assert!((load.flux() - v1).abs() < 1e-9);
    }

    #[test]
    fn empty_network_settles_at_zero_via_diagonal_floor() {
        let mut system = NodalSystem::new(1, None).unwrap();
        let mut links: Vec<&mut dyn PowerLink> = vec![];
        let report =
            solve_major_step(&mut system, &mut links, &SolverConfig::default()).unwrap();
        // Zero start, zero solution: the very first step is already settled.
        assert_eq!(report.minor_steps, 1);
        assert_eq!(system.potential(NodeId::from_index(0)), 0.0);
    }
}
