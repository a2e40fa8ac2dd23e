//! uom SI electrical quantities used at configuration boundaries.
//!
//! Links take typed quantities in their constructors and builders, then work
//! on the raw `.value` (coherent SI base units) internally. Only the
//! quantities powernet configures with are aliased here.

use uom::si::f64::{
    ElectricPotential as UomElectricPotential, ElectricalConductance as UomElectricalConductance,
    Power as UomPower, Ratio as UomRatio,
};

pub type Voltage = UomElectricPotential;
pub type Conductance = UomElectricalConductance;
pub type Power = UomPower;
pub type Ratio = UomRatio;

#[inline]
pub fn volts(v: f64) -> Voltage {
    use uom::si::electric_potential::volt;
    Voltage::new::<volt>(v)
}

#[inline]
pub fn siemens(v: f64) -> Conductance {
    use uom::si::electrical_conductance::siemens;
    Conductance::new::<siemens>(v)
}

#[inline]
pub fn watts(v: f64) -> Power {
    use uom::si::power::watt;
    Power::new::<watt>(v)
}

#[inline]
pub fn unitless(v: f64) -> Ratio {
    use uom::si::ratio::ratio;
    Ratio::new::<ratio>(v)
}
