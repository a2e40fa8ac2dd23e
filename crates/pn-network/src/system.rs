//! Shared nodal admittance/source state.
//!
//! One [`NodalSystem`] holds the conductance matrix, source vector, and
//! potential vector for a whole network. Links never touch the matrix
//! directly: at initialization each link reserves its port cells and receives
//! an opaque [`StampSlot`]; the per-minor-step contribution is an absolute
//! write into that slot. `assemble` then folds every slot into the matrix and
//! vector, so a repeated write with identical values is idempotent by
//! construction.

use crate::error::{NetworkError, NetworkResult};
use nalgebra::{DMatrix, DVector};
use pn_core::{NodeId, Real};

/// Port assignment for one link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ports {
    /// One node, referenced to ground (sources and loads).
    Shunt(NodeId),
    /// Two nodes; positive source current flows from the first to the second.
    Pair(NodeId, NodeId),
}

impl Ports {
    /// True when every assigned port is the designated ground node.
    pub fn all_ground(&self, ground: Option<NodeId>) -> bool {
        let Some(g) = ground else { return false };
        match *self {
            Ports::Shunt(n) => n == g,
            Ports::Pair(a, b) => a == g && b == g,
        }
    }
}

/// Opaque handle to a link's reserved cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StampSlot(usize);

#[derive(Debug, Clone, Copy)]
struct Stamp {
    ports: Ports,
    admittance: Real,
    source: Real,
}

/// The externally-owned linear-system state links stamp into.
#[derive(Debug, Clone)]
pub struct NodalSystem {
    node_count: usize,
    ground: Option<NodeId>,
    stamps: Vec<Stamp>,
    conductance: DMatrix<Real>,
    source: DVector<Real>,
    potentials: DVector<Real>,
}

impl NodalSystem {
    /// Create a system with `node_count` nodes and an optional ground node.
    pub fn new(node_count: usize, ground: Option<NodeId>) -> NetworkResult<Self> {
        if node_count == 0 {
            return Err(NetworkError::InvalidArg {
                what: "node_count must be positive",
            });
        }
        if let Some(g) = ground {
            Self::check_node(g, node_count)?;
        }
        Ok(Self {
            node_count,
            ground,
            stamps: Vec::new(),
            conductance: DMatrix::zeros(node_count, node_count),
            source: DVector::zeros(node_count),
            potentials: DVector::zeros(node_count),
        })
    }

    fn check_node(node: NodeId, count: usize) -> NetworkResult<()> {
        if (node.index() as usize) < count {
            Ok(())
        } else {
            Err(NetworkError::NodeOutOfRange {
                index: node.index(),
                count,
            })
        }
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn ground(&self) -> Option<NodeId> {
        self.ground
    }

    pub fn is_ground(&self, node: NodeId) -> bool {
        self.ground == Some(node)
    }

    /// Reserve the cells for one link's ports. Called once at link init.
    pub fn reserve_ports(&mut self, ports: Ports) -> NetworkResult<StampSlot> {
        match ports {
            Ports::Shunt(n) => Self::check_node(n, self.node_count)?,
            Ports::Pair(a, b) => {
                Self::check_node(a, self.node_count)?;
                Self::check_node(b, self.node_count)?;
            }
        }
        self.stamps.push(Stamp {
            ports,
            admittance: 0.0,
            source: 0.0,
        });
        Ok(StampSlot(self.stamps.len() - 1))
    }

    /// Absolute write of a link's admittance/source contribution.
    pub fn set_stamp(
        &mut self,
        slot: StampSlot,
        admittance: Real,
        source: Real,
    ) -> NetworkResult<()> {
        if !admittance.is_finite() {
            return Err(NetworkError::NonFinite {
                what: "admittance",
                value: admittance,
            });
        }
        if !source.is_finite() {
            return Err(NetworkError::NonFinite {
                what: "source",
                value: source,
            });
        }
        let count = self.stamps.len();
        let stamp = self
            .stamps
            .get_mut(slot.0)
            .ok_or(NetworkError::SlotOutOfRange {
                slot: slot.0,
                count,
            })?;
        stamp.admittance = admittance;
        stamp.source = source;
        Ok(())
    }

    /// Read back a slot's current contribution (admittance, source).
    pub fn stamp(&self, slot: StampSlot) -> NetworkResult<(Real, Real)> {
        self.stamps
            .get(slot.0)
            .map(|s| (s.admittance, s.source))
            .ok_or(NetworkError::SlotOutOfRange {
                slot: slot.0,
                count: self.stamps.len(),
            })
    }

    /// Fold every link's contribution into the conductance matrix and source
    /// vector. Ground-node handling (reference row) is the solver's job.
    pub fn assemble(&mut self) {
        self.conductance.fill(0.0);
        self.source.fill(0.0);
        for stamp in &self.stamps {
            let g = stamp.admittance;
            let w = stamp.source;
            match stamp.ports {
                Ports::Shunt(n) => {
                    let i = n.index() as usize;
                    self.conductance[(i, i)] += g;
                    self.source[i] += w;
                }
                Ports::Pair(a, b) => {
                    let ia = a.index() as usize;
                    let ib = b.index() as usize;
                    self.conductance[(ia, ia)] += g;
                    self.conductance[(ib, ib)] += g;
                    self.conductance[(ia, ib)] -= g;
                    self.conductance[(ib, ia)] -= g;
                    self.source[ia] -= w;
                    self.source[ib] += w;
                }
            }
        }
    }

    pub fn conductance(&self) -> &DMatrix<Real> {
        &self.conductance
    }

    pub fn source_vector(&self) -> &DVector<Real> {
        &self.source
    }

    /// Node potential. The ground node always reads as the zero reference.
    pub fn potential(&self, node: NodeId) -> Real {
        if self.is_ground(node) {
            return 0.0;
        }
        self.potentials[node.index() as usize]
    }

    /// Potential difference `a - b`.
    pub fn delta(&self, a: NodeId, b: NodeId) -> Real {
        self.potential(a) - self.potential(b)
    }

    pub fn potentials(&self) -> &DVector<Real> {
        &self.potentials
    }

    /// Install a freshly solved potential vector. The ground entry is forced
    /// to zero so links always read a clean reference.
    pub fn set_potentials(&mut self, potentials: DVector<Real>) -> NetworkResult<()> {
        if potentials.len() != self.node_count {
            return Err(NetworkError::InvalidArg {
                what: "potential vector length mismatch",
            });
        }
        self.potentials = potentials;
        if let Some(g) = self.ground {
            self.potentials[g.index() as usize] = 0.0;
        }
        Ok(())
    }
}
