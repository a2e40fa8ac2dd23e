//! State vocabulary shared by the link state machines.

use serde::{Deserialize, Serialize};

/// Regulator availability: Off, or one of the active family states.
///
/// Which active states a link family uses is data, not subclassing: a
/// converter regulator uses all three, a shunt regulator stops at `Sagging`,
/// a diode or plain converter output carries only a bias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Availability {
    /// Disabled, tripped, unpowered, or source exhausted. Contributes zero
    /// admittance and zero source (electrically disconnected).
    #[default]
    Off,
    /// Holding the regulation target; near-ideal voltage source.
    Regulating,
    /// Source cannot sustain the target voltage; delivering maximum available
    /// power at the source's natural sag voltage.
    Sagging,
    /// Demanded current exceeds the source's short-circuit capability;
    /// clamped to maximum current, near-ideal current source.
    CurrentLimited,
}

impl Availability {
    pub fn is_active(self) -> bool {
        self != Availability::Off
    }
}

/// Protective-limit state for current/voltage/power-regulating outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LimitState {
    #[default]
    Unlimited,
    OverVoltage,
    UnderVoltage,
    OverCurrent,
}

impl LimitState {
    pub fn is_limited(self) -> bool {
        self != LimitState::Unlimited
    }
}

/// Polarity of current flow relative to the device's forward direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Bias {
    #[default]
    Forward,
    Reverse,
}

impl Bias {
    /// Bias implied by a terminal potential difference (forward minus
    /// reverse terminal).
    pub fn from_delta(dv: f64) -> Self {
        if dv >= 0.0 {
            Bias::Forward
        } else {
            Bias::Reverse
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Bias::Forward => Bias::Reverse,
            Bias::Reverse => Bias::Forward,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn availability_active_family() {
        assert!(!Availability::Off.is_active());
        assert!(Availability::Regulating.is_active());
        assert!(Availability::Sagging.is_active());
        assert!(Availability::CurrentLimited.is_active());
    }

    #[test]
    fn bias_from_delta() {
        assert_eq!(Bias::from_delta(0.5), Bias::Forward);
        assert_eq!(Bias::from_delta(0.0), Bias::Forward);
        assert_eq!(Bias::from_delta(-0.5), Bias::Reverse);
        assert_eq!(Bias::Forward.opposite(), Bias::Reverse);
    }
}
