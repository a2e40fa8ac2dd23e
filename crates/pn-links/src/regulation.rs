//! Generalized regulation/limiting/bias machinery.
//!
//! The three link families (diode, converter output, shunt regulator) share
//! these sub-machines and differ only in which ones they instantiate and in
//! the data they feed them. Every transition runs through a [`FlipGuard`], so
//! the number of state changes per major step is bounded and the outer
//! iteration is guaranteed to terminate.
//!
//! All of this is evaluated only from inside the acceptance check, on a
//! converged step, never from the plain per-minor-step contribution update.

use crate::error::{LinkError, LinkResult};
use crate::guard::FlipGuard;
use crate::source::SourceCurve;
use crate::state::{Availability, Bias, LimitState};
use pn_core::Real;

/// Outcome of one guarded sub-machine evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipOutcome {
    /// Stored state already agrees with the observation.
    Held,
    /// State changed; the link must reject this solution.
    Flipped,
    /// A change was warranted but the guard cap is exhausted; the stored
    /// state is confirmed as-is for the remainder of the major step.
    Saturated,
}

/// Bias sub-machine for diodes and back-drivable voltage sources.
///
/// Keeps a "previous" shadow so a flip within the current evaluation is
/// detectable by the flow computation. The shadow is runtime-only.
#[derive(Debug, Clone)]
pub struct BiasMachine {
    bias: Bias,
    previous: Bias,
    guard: FlipGuard,
}

impl BiasMachine {
    pub fn new(initial: Bias, cap: u32) -> Self {
        Self {
            bias: initial,
            previous: initial,
            guard: FlipGuard::new(cap),
        }
    }

    /// The bias used for the current linearization.
    pub fn bias(&self) -> Bias {
        self.bias
    }

    /// True when the last observation flipped the stored bias.
    pub fn flipped(&self) -> bool {
        self.previous != self.bias
    }

    pub fn guard(&self) -> &FlipGuard {
        &self.guard
    }

    /// Compare the bias implied by the measured potentials with the stored
    /// bias used for this step's linearization.
    pub fn observe(&mut self, implied: Bias) -> FlipOutcome {
        self.previous = self.bias;
        if implied == self.bias {
            FlipOutcome::Held
        } else if self.guard.try_flip() {
            self.bias = implied;
            FlipOutcome::Flipped
        } else {
            FlipOutcome::Saturated
        }
    }

    /// Force the stored bias without consulting the guard (host command /
    /// malfunction override path).
    pub fn force(&mut self, bias: Bias) {
        self.previous = self.bias;
        self.bias = bias;
    }

    pub fn begin_major_step(&mut self) {
        self.guard.reset();
        self.previous = self.bias;
    }
}

/// Protective operating bounds for a regulating output.
///
/// Absent bounds are simply not checked.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LimitBounds {
    pub over_voltage: Option<Real>,
    pub under_voltage: Option<Real>,
    pub over_current: Option<Real>,
}

impl LimitBounds {
    pub fn validate(&self) -> LinkResult<()> {
        if let (Some(uv), Some(ov)) = (self.under_voltage, self.over_voltage) {
            if uv >= ov {
                return Err(LinkError::InvalidConfig {
                    what: "under-voltage bound must be below over-voltage bound",
                });
            }
        }
        if let Some(oc) = self.over_current {
            if oc <= 0.0 {
                return Err(LinkError::InvalidConfig {
                    what: "over-current bound must be positive",
                });
            }
        }
        Ok(())
    }

    /// Classify an operating point, checking bounds in priority order:
    /// over-voltage, then under-voltage, then over-current.
    pub fn classify(&self, voltage: Real, current: Real) -> LimitState {
        if let Some(ov) = self.over_voltage {
            if voltage > ov {
                return LimitState::OverVoltage;
            }
        }
        if let Some(uv) = self.under_voltage {
            if voltage < uv {
                return LimitState::UnderVoltage;
            }
        }
        if let Some(oc) = self.over_current {
            if current > oc {
                return LimitState::OverCurrent;
            }
        }
        LimitState::Unlimited
    }
}

/// Limit-state sub-machine: flip-guarded entry/exit of protective clamps.
#[derive(Debug, Clone)]
pub struct LimitMachine {
    state: LimitState,
    bounds: LimitBounds,
    guard: FlipGuard,
}

impl LimitMachine {
    pub fn new(bounds: LimitBounds, cap: u32) -> LinkResult<Self> {
        bounds.validate()?;
        Ok(Self {
            state: LimitState::Unlimited,
            bounds,
            guard: FlipGuard::new(cap),
        })
    }

    pub fn state(&self) -> LimitState {
        self.state
    }

    pub fn bounds(&self) -> &LimitBounds {
        &self.bounds
    }

    pub fn guard(&self) -> &FlipGuard {
        &self.guard
    }

    /// Evaluate the demanded operating point against the bounds. Entering or
    /// leaving any limit state is a guarded transition; past the cap the
    /// machine confirms its last state for the remainder of the major step.
    pub fn evaluate(&mut self, voltage: Real, current: Real) -> FlipOutcome {
        let wanted = self.bounds.classify(voltage, current);
        if wanted == self.state {
            FlipOutcome::Held
        } else if self.guard.try_flip() {
            self.state = wanted;
            FlipOutcome::Flipped
        } else {
            FlipOutcome::Saturated
        }
    }

    pub fn begin_major_step(&mut self) {
        self.guard.reset();
    }
}

/// Inputs to the Off/Active availability decision.
#[derive(Debug, Clone, Copy)]
pub struct OperateConditions {
    pub enabled: bool,
    pub tripped: bool,
    /// Supply power/voltage validity (from the interface leader, or local).
    pub powered: bool,
    /// Predicted bulk power from the source collaborator, if source-backed.
    pub available_power: Option<Real>,
    /// Minimum-operate threshold; available power at or below this turns the
    /// regulator off.
    pub min_operate_power: Real,
}

impl OperateConditions {
    pub fn can_operate(&self) -> bool {
        self.enabled
            && !self.tripped
            && self.powered
            && self
                .available_power
                .is_none_or(|p| p > self.min_operate_power)
    }
}

/// Choose the active sub-state for a source-backed regulator by comparing
/// the regulation target against the source's I-V corner.
///
/// * demanded current above the short-circuit capability: clamp to maximum
///   current (`CurrentLimited`);
/// * source cannot sustain the target voltage at the demanded current:
///   deliver maximum available power instead (`Sagging`);
/// * otherwise the target is reachable at full regulation (`Regulating`).
pub fn select_active_state(
    source: &dyn SourceCurve,
    target_voltage: Real,
    demanded_current: Real,
) -> Availability {
    if demanded_current > source.short_circuit_current() {
        return Availability::CurrentLimited;
    }
    if target_voltage >= source.open_circuit_voltage() {
        return Availability::Sagging;
    }
    let (power_at_target, _) = source.predicted_load(target_voltage);
    let current_at_target = if target_voltage > 0.0 {
        power_at_target / target_voltage
    } else {
        source.short_circuit_current()
    };
    if demanded_current > current_at_target {
        Availability::Sagging
    } else {
        Availability::Regulating
    }
}
