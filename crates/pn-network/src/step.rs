//! Minor-step counter pair handed to every acceptance check.

/// Iteration counters for the current minor step.
///
/// `absolute` counts minor steps since the start of the current major step,
/// monotonically. `converged` counts minor steps since the potentials last
/// moved beyond tolerance; it resets to 0 whenever they move, so
/// `converged >= 1` means the network has actually settled at least once on
/// the current linearization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MinorStep {
    pub absolute: usize,
    pub converged: usize,
}

impl MinorStep {
    pub fn new(absolute: usize, converged: usize) -> Self {
        Self {
            absolute,
            converged,
        }
    }

    /// True once the outer solver has seen at least one settled solution.
    pub fn is_converged(&self) -> bool {
        self.converged >= 1
    }
}
