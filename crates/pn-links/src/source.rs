//! Upstream source collaborator interface.
//!
//! Source-backed regulators never model the source physics themselves; they
//! query it through [`SourceCurve`] (bulk-power/voltage predictions and the
//! characteristic I-V corner). The production implementation lives with the
//! host's photovoltaic models; [`CornerSource`] is a two-segment reference
//! curve good enough for regulators and tests.

use crate::error::{LinkError, LinkResult};
use pn_core::Real;
use std::cell::Cell;

/// One terminal operating point on the source curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Terminal {
    pub voltage: Real,
    pub current: Real,
}

/// Read-only queries a regulator makes of its backing source.
pub trait SourceCurve {
    /// Predicted (power, conductance) the source supplies at a terminal
    /// voltage. Conductance is the magnitude of the local I-V slope, i.e.
    /// the admittance of the linearization at that point.
    fn predicted_load(&self, voltage: Real) -> (Real, Real);

    /// Corner of the I-V curve: the point separating the current-source-like
    /// and voltage-source-like regions. Maximum power is delivered here.
    fn corner_voltage(&self) -> Real;
    fn corner_current(&self) -> Real;

    fn open_circuit_voltage(&self) -> Real;
    fn short_circuit_current(&self) -> Real;

    /// Terminal state delivering `power`, on the side of the corner selected
    /// by `near_open_circuit`. `None` when the source cannot deliver that
    /// power on that side.
    fn load_at_power(&self, power: Real, near_open_circuit: bool) -> Option<Terminal>;

    /// Maximum deliverable bulk power (at the corner).
    fn max_power(&self) -> Real {
        self.corner_voltage() * self.corner_current()
    }
}

/// Two-segment piecewise-linear I-V curve.
///
/// Current falls linearly from short-circuit at 0 V to the corner current at
/// the corner voltage, then linearly to zero at open circuit. An output
/// scale in [0, 1] derates both segments uniformly (eclipse, degradation);
/// it is interior-mutable so a shared handle can be faded mid-scenario.
#[derive(Debug)]
pub struct CornerSource {
    open_circuit_voltage: Real,
    short_circuit_current: Real,
    corner_voltage: Real,
    corner_current: Real,
    scale: Cell<Real>,
}

impl CornerSource {
    pub fn new(
        open_circuit_voltage: Real,
        short_circuit_current: Real,
        corner_voltage: Real,
        corner_current: Real,
    ) -> LinkResult<Self> {
        if !(open_circuit_voltage > 0.0 && short_circuit_current > 0.0) {
            return Err(LinkError::InvalidConfig {
                what: "open-circuit voltage and short-circuit current must be positive",
            });
        }
        if !(corner_voltage > 0.0 && corner_voltage < open_circuit_voltage) {
            return Err(LinkError::InvalidConfig {
                what: "corner voltage must lie between 0 and open circuit",
            });
        }
        if !(corner_current > 0.0 && corner_current <= short_circuit_current) {
            return Err(LinkError::InvalidConfig {
                what: "corner current must lie between 0 and short circuit",
            });
        }
        Ok(Self {
            open_circuit_voltage,
            short_circuit_current,
            corner_voltage,
            corner_current,
            scale: Cell::new(1.0),
        })
    }

    /// Derate the whole curve. Clamped to [0, 1].
    pub fn set_scale(&self, scale: Real) {
        self.scale.set(scale.clamp(0.0, 1.0));
    }

    pub fn scale(&self) -> Real {
        self.scale.get()
    }

    /// I-V slope magnitude of the current-source-like segment.
    fn low_side_slope(&self) -> Real {
        (self.short_circuit_current - self.corner_current) / self.corner_voltage
    }

    /// I-V slope magnitude of the voltage-source-like segment.
    fn high_side_slope(&self) -> Real {
        self.corner_current / (self.open_circuit_voltage - self.corner_voltage)
    }

    fn current_at(&self, voltage: Real) -> Real {
        let s = self.scale.get();
        if voltage <= 0.0 {
            s * self.short_circuit_current
        } else if voltage <= self.corner_voltage {
            s * (self.short_circuit_current - self.low_side_slope() * voltage)
        } else if voltage < self.open_circuit_voltage {
            s * self.high_side_slope() * (self.open_circuit_voltage - voltage)
        } else {
            0.0
        }
    }
}

impl SourceCurve for CornerSource {
    fn predicted_load(&self, voltage: Real) -> (Real, Real) {
        let s = self.scale.get();
        let slope = if voltage <= self.corner_voltage {
            self.low_side_slope()
        } else {
            self.high_side_slope()
        };
        let v = voltage.max(0.0);
        (v * self.current_at(voltage), s * slope)
    }

    fn corner_voltage(&self) -> Real {
        self.corner_voltage
    }

    fn corner_current(&self) -> Real {
        self.scale.get() * self.corner_current
    }

    fn open_circuit_voltage(&self) -> Real {
        self.open_circuit_voltage
    }

    fn short_circuit_current(&self) -> Real {
        self.scale.get() * self.short_circuit_current
    }

    fn load_at_power(&self, power: Real, near_open_circuit: bool) -> Option<Terminal> {
        if power < 0.0 {
            return None;
        }
        if power == 0.0 {
            let voltage = if near_open_circuit {
                self.open_circuit_voltage
            } else {
                0.0
            };
            return Some(Terminal {
                voltage,
                current: 0.0,
            });
        }
        let s = self.scale.get();
        if s <= 0.0 {
            return None;
        }
        if near_open_circuit {
            // v * a (voc - v) = p, pick the root nearer open circuit.
            let a = s * self.high_side_slope();
            let voc = self.open_circuit_voltage;
            let disc = voc * voc - 4.0 * power / a;
            if disc < 0.0 {
                return None;
            }
            let voltage = 0.5 * (voc + disc.sqrt());
            Some(Terminal {
                voltage,
                current: power / voltage,
            })
        } else {
            // v * (isc - b v) = p, pick the root nearer short circuit.
            let isc = s * self.short_circuit_current;
            let b = s * self.low_side_slope();
            if b == 0.0 {
                let voltage = power / isc;
                return Some(Terminal {
                    voltage,
                    current: isc,
                });
            }
            let disc = isc * isc - 4.0 * b * power;
            if disc < 0.0 {
                return None;
            }
            let voltage = (isc - disc.sqrt()) / (2.0 * b);
            Some(Terminal {
                voltage,
                current: power / voltage,
            })
        }
    }
}
