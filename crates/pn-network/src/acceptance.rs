//! Solution-acceptance protocol shared by all nonlinear links.

use serde::{Deserialize, Serialize};

/// A link's verdict on the latest network solution.
///
/// The derived ordering is load-bearing: `Confirm < Delay < Reject`, so
/// aggregating a set of verdicts is a max-fold and Reject always dominates.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum SolutionResult {
    /// The link's admittance/source still reflects the latest potentials.
    #[default]
    Confirm,
    /// A state change is warranted but the link's priority ordering says the
    /// network has not iterated long enough yet. Never forces a
    /// re-linearization by itself.
    Delay,
    /// The link changed internal state; the outer solver must re-linearize.
    Reject,
}

impl SolutionResult {
    /// Combine two verdicts under the Reject > Delay > Confirm total order.
    pub fn combine(self, other: SolutionResult) -> SolutionResult {
        self.max(other)
    }

    pub fn is_reject(self) -> bool {
        self == SolutionResult::Reject
    }

    pub fn is_confirm(self) -> bool {
        self == SolutionResult::Confirm
    }
}
