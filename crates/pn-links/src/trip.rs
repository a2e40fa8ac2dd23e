//! Threshold trip primitive with priority-gated, delayed activation.
//!
//! A trip watches one measured quantity against a fixed limit. The condition
//! check is stateless; the result is sticky: once tripped, the latch holds
//! until an explicit [`TripLogic::reset`], regardless of the measured value.
//!
//! Priority lets several independently-tripping guards on one network agree
//! on an order of resolution: while the minor-step index is below a guard's
//! priority it only reports [`SolutionResult::Delay`], letting higher-priority
//! corrections run first (they may make the low-priority condition go away on
//! their own).

use pn_core::Real;
use pn_network::SolutionResult;
use serde::{Deserialize, Serialize};

/// Which side of the limit is the trip condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TripSense {
    GreaterThan,
    LessThan,
}

/// Sticky threshold trip with priority gating and malfunction overrides.
///
/// A `priority` of 0 or a `limit` of exactly 0.0 disables the trip entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripLogic {
    sense: TripSense,
    limit: Real,
    priority: u32,
    tripped: bool,
    force_trip: bool,
    inhibit_trip: bool,
}

impl TripLogic {
    pub fn new(sense: TripSense, limit: Real, priority: u32) -> Self {
        Self {
            sense,
            limit,
            priority,
            tripped: false,
            force_trip: false,
            inhibit_trip: false,
        }
    }

    /// A trip that can never fire (priority 0).
    pub fn disabled(sense: TripSense) -> Self {
        Self::new(sense, 0.0, 0)
    }

    /// Check the monitored value against the limit.
    ///
    /// # Arguments
    ///
    /// * `current` - the acceptance result accumulated so far this minor step
    /// * `value` - the measured quantity
    /// * `step` - the minor-step index compared against `priority`
    ///
    /// # Returns
    ///
    /// The (possibly escalated) acceptance result, and whether the trip fired
    /// on this exact call. An incoming `Reject` is preserved across a
    /// pre-priority `Delay` re-check.
    pub fn check(
        &mut self,
        current: SolutionResult,
        value: Real,
        step: usize,
    ) -> (SolutionResult, bool) {
        if self.priority == 0 || self.limit == 0.0 || self.tripped {
            return (current, false);
        }

        let mut condition = match self.sense {
            TripSense::GreaterThan => value > self.limit,
            TripSense::LessThan => value < self.limit,
        } || self.force_trip;
        if self.inhibit_trip {
            condition = false;
        }
        if !condition {
            return (current, false);
        }

        if step < self.priority as usize {
            // Not our turn yet: ask the network to keep iterating.
            (current.combine(SolutionResult::Delay), false)
        } else {
            self.tripped = true;
            (SolutionResult::Reject, true)
        }
    }

    /// Clear the latch. Does not touch the malfunction overrides.
    pub fn reset(&mut self) {
        self.tripped = false;
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped
    }

    pub fn limit(&self) -> Real {
        self.limit
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    /// Malfunction override: force the condition true.
    pub fn set_force_trip(&mut self, on: bool) {
        self.force_trip = on;
    }

    /// Malfunction override: force the condition false.
    pub fn set_inhibit_trip(&mut self, on: bool) {
        self.inhibit_trip = on;
    }
}
