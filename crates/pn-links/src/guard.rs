//! Anti-oscillation flip guard.
//!
//! Every state sub-machine (bias, limit, availability) runs its transitions
//! through one of these. The counter persists for the lifetime of a major
//! step; once it reaches the cap, further transitions of that kind are
//! suppressed and the machine holds whatever state it last had, trading
//! correctness near the cap for guaranteed termination of the outer
//! iteration. Runtime-only: not checkpointed, reset at major-step boundaries.

/// Bounded state-transition counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlipGuard {
    cap: u32,
    count: u32,
}

impl FlipGuard {
    pub const DEFAULT_CAP: u32 = 4;

    pub fn new(cap: u32) -> Self {
        Self { cap, count: 0 }
    }

    /// Record a transition attempt. Returns true if the transition may be
    /// taken, false once the cap is exhausted.
    pub fn try_flip(&mut self) -> bool {
        if self.count >= self.cap {
            return false;
        }
        self.count += 1;
        true
    }

    pub fn saturated(&self) -> bool {
        self.count >= self.cap
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn cap(&self) -> u32 {
        self.cap
    }

    /// Major-step boundary reset. Never called mid-major-step.
    pub fn reset(&mut self) {
        self.count = 0;
    }
}

impl Default for FlipGuard {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAP)
    }
}
