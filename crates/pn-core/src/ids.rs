//! Network node identifiers.

use core::fmt;
use core::num::NonZeroU32;

/// Index of a node in the shared potential vector.
///
/// Stored as `NonZeroU32` (0-based index plus one) so `Option<NodeId>`,
/// which is how the designated ground node travels through the network
/// state, costs no extra space. Ordering follows the index.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    /// Build from a 0-based node index.
    pub fn from_index(index: u32) -> Self {
        // index+1 must be nonzero
        Self(NonZeroU32::new(index + 1).expect("index+1 is nonzero"))
    }

    /// The 0-based index into the potential vector.
    pub fn index(self) -> u32 {
        self.0.get() - 1
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.index())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_round_trips() {
        for i in [0_u32, 1, 2, 42, 10_000] {
            assert_eq!(NodeId::from_index(i).index(), i);
        }
    }

    #[test]
    fn optional_ground_node_is_free() {
        // The niche is the point of NonZero here: the ground node is carried
        // as Option<NodeId> at no size cost.
        assert_eq!(
            core::mem::size_of::<NodeId>(),
            core::mem::size_of::<Option<NodeId>>()
        );
    }

    #[test]
    fn ordering_follows_index() {
        assert!(NodeId::from_index(0) < NodeId::from_index(1));
        assert!(NodeId::from_index(7) < NodeId::from_index(100));
    }
}
