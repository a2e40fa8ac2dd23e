//! Shunt regulator link.
//!
//! Regulates a bus fed by a string-built source (photovoltaic sections) by
//! shunting excess strings. Availability is source-backed: the regulator
//! runs only while the predicted bulk power exceeds its minimum-operate
//! threshold, regulates while the source can sustain the setpoint, and sags
//! to maximum available power when it cannot. The shunt family has no
//! short-circuit sub-state; an over-demanded source simply sags.

use crate::error::{LinkError, LinkResult};
use crate::regulation::{select_active_state, OperateConditions};
use crate::source::SourceCurve;
use crate::state::Availability;
use crate::traits::{grounded, PowerLink};
use crate::trip::{TripLogic, TripSense};
use crate::FlipGuard;
use pn_core::units::{Conductance, Power, Voltage};
use pn_core::{NodeId, Real};
use pn_network::{MinorStep, NodalSystem, Ports, SolutionResult, StampSlot};
use std::rc::Rc;

pub struct ShuntRegulatorLink {
    name: String,
    node: NodeId,
    slot: StampSlot,
    setpoint: Real,
    regulation_conductance: Real,
    min_operate_power: Real,
    total_strings: u32,
    shunted_strings: u32,
    source: Rc<dyn SourceCurve>,
    enabled: bool,
    availability: Availability,
    avail_guard: FlipGuard,
    over_current_trip: TripLogic,
    valid: bool,
    flux: Real,
    power_delivered: Real,
    shunted_power: Real,
}

impl ShuntRegulatorLink {
    pub fn new(
        name: String,
        system: &mut NodalSystem,
        node: NodeId,
        setpoint: Voltage,
        regulation_conductance: Conductance,
        source: Rc<dyn SourceCurve>,
        total_strings: u32,
        min_operate_power: Power,
    ) -> LinkResult<Self> {
        if setpoint.value <= 0.0 {
            return Err(LinkError::InvalidConfig {
                what: "shunt regulator setpoint must be positive",
            });
        }
        if regulation_conductance.value <= 0.0 {
            return Err(LinkError::InvalidConfig {
                what: "regulation conductance must be positive",
            });
        }
        if total_strings == 0 {
            return Err(LinkError::InvalidConfig {
                what: "shunt regulator needs at least one string",
            });
        }
        if min_operate_power.value < 0.0 {
            return Err(LinkError::InvalidConfig {
                what: "minimum-operate power must be non-negative",
            });
        }
        let slot = system.reserve_ports(Ports::Shunt(node))?;
        Ok(Self {
            name,
            node,
            slot,
            setpoint: setpoint.value,
            regulation_conductance: regulation_conductance.value,
            min_operate_power: min_operate_power.value,
            total_strings,
            shunted_strings: total_strings,
            source,
            enabled: true,
            availability: Availability::Off,
            avail_guard: FlipGuard::default(),
            over_current_trip: TripLogic::disabled(TripSense::GreaterThan),
            valid: false,
            flux: 0.0,
            power_delivered: 0.0,
            shunted_power: 0.0,
        })
    }

    pub fn with_over_current_trip(mut self, trip: TripLogic) -> LinkResult<Self> {
        if trip.limit() != 0.0 && trip.priority() == 0 {
            return Err(LinkError::InvalidConfig {
                what: "shunt over-current trip needs priority >= 1",
            });
        }
        self.over_current_trip = trip;
        Ok(self)
    }

    pub fn with_flip_cap(mut self, cap: u32) -> Self {
        self.avail_guard = FlipGuard::new(cap);
        self
    }

    pub fn set_enabled(&mut self, on: bool) {
        self.enabled = on;
    }

    pub fn reset_trips(&mut self) {
        self.over_current_trip.reset();
    }

    pub fn availability(&self) -> Availability {
        self.availability
    }

    pub fn is_tripped(&self) -> bool {
        self.over_current_trip.is_tripped()
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Strings currently bled off to the shunt.
    pub fn shunted_strings(&self) -> u32 {
        self.shunted_strings
    }

    pub fn total_strings(&self) -> u32 {
        self.total_strings
    }

    /// Current delivered to the bus (A).
    pub fn flux(&self) -> Real {
        self.flux
    }

    pub fn power_delivered(&self) -> Real {
        self.power_delivered
    }

    /// Bulk power bled off instead of delivered (W).
    pub fn shunted_power(&self) -> Real {
        self.shunted_power
    }

    fn available_power(&self) -> Real {
        self.source.max_power()
    }

    /// Strings shunted for a given delivered fraction of the bulk power.
    fn strings_for_load(&self, delivered: Real, available: Real) -> u32 {
        if available <= 0.0 {
            return self.total_strings;
        }
        let excess = (1.0 - delivered / available).clamp(0.0, 1.0);
        ((self.total_strings as Real) * excess).round() as u32
    }
}

impl PowerLink for ShuntRegulatorLink {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> Ports {
        Ports::Shunt(self.node)
    }

    fn begin_major_step(&mut self) {
        self.avail_guard.reset();
    }

    fn update_contribution(&mut self, system: &mut NodalSystem) -> LinkResult<()> {
        let (g, w) = match self.availability {
            Availability::Off => (0.0, 0.0),
            Availability::Regulating => {
                let g = self.regulation_conductance;
                (g, g * self.setpoint)
            }
            // Sagging (and anything the selector clamps to it): deliver the
            // maximum available power at the source's natural sag voltage.
            _ => match self.source.load_at_power(self.available_power(), true) {
                Some(t) => (0.0, t.current),
                None => (0.0, 0.0),
            },
        };
        system.set_stamp(self.slot, g, w)?;
        Ok(())
    }

    fn confirm_solution(&mut self, system: &NodalSystem, step: MinorStep) -> SolutionResult {
        if grounded(system, self.ports()) {
            return SolutionResult::Confirm;
        }
        if !step.is_converged() {
            return SolutionResult::Confirm;
        }
        let v = system.potential(self.node);
        // A system this link never stamped has nothing to judge.
        let Ok((g, w)) = system.stamp(self.slot) else {
            return SolutionResult::Confirm;
        };
        let i = w - g * v;
        let mut result = SolutionResult::Confirm;
        (result, _) = self.over_current_trip.check(result, i, step.converged);

        let available = self.available_power();
        let conditions = OperateConditions {
            enabled: self.enabled,
            tripped: self.is_tripped(),
            powered: true,
            available_power: Some(available),
            min_operate_power: self.min_operate_power,
        };
        let wanted = if !conditions.can_operate() {
            Availability::Off
        } else {
            match select_active_state(self.source.as_ref(), self.setpoint, i.max(0.0)) {
                // No short-circuit clamp in the shunt family.
                Availability::CurrentLimited => Availability::Sagging,
                other => other,
            }
        };
        if wanted != self.availability && self.avail_guard.try_flip() {
            self.availability = wanted;
            result = SolutionResult::Reject;
        }

        self.shunted_strings = if self.availability.is_active() {
            self.strings_for_load(v * i.max(0.0), available)
        } else {
            self.total_strings
        };

        self.valid = self.enabled && !self.is_tripped() && self.availability.is_active();
        result
    }

    fn compute_flows(&mut self, system: &NodalSystem) -> LinkResult<()> {
        if grounded(system, self.ports()) || !self.valid {
            self.flux = 0.0;
            self.power_delivered = 0.0;
            self.shunted_power = 0.0;
            return Ok(());
        }
        let v = system.potential(self.node);
        let (g, w) = system.stamp(self.slot)?;
        self.flux = w - g * v;
        self.power_delivered = v * self.flux;
        self.shunted_power = (self.available_power() - self.power_delivered).max(0.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::CornerSource;
    use pn_core::units::{siemens, volts, watts};

    fn n(i: u32) -> NodeId {
        NodeId::from_index(i)
    }

    fn converged() -> MinorStep {
        MinorStep::new(4, 1)
    }

    fn regulator(
        system: &mut NodalSystem,
        source: Rc<CornerSource>,
    ) -> ShuntRegulatorLink {
        ShuntRegulatorLink::new(
            "pv-reg".into(),
            system,
            n(0),
            volts(90.0),
            siemens(1e6),
            source,
            10,
            watts(50.0),
        )
        .unwrap()
    }

    #[test]
    fn turns_on_and_regulates_when_power_is_available() {
        let source = Rc::new(CornerSource::new(120.0, 12.0, 100.0, 10.0).unwrap());
        let mut system = NodalSystem::new(1, None).unwrap();
        let mut reg = regulator(&mut system, Rc::clone(&source));

        reg.update_contribution(&mut system).unwrap();
        assert_eq!(system.stamp(reg.slot).unwrap(), (0.0, 0.0));

        system.set_potentials(nalgebra::dvector![0.0]).unwrap();
        assert!(reg.confirm_solution(&system, converged()).is_reject());
        assert_eq!(reg.availability(), Availability::Regulating);

        reg.update_contribution(&mut system).unwrap();
        let (g, w) = system.stamp(reg.slot).unwrap();
        assert_eq!(w / g, 90.0);
    }

    #[test]
    fn power_fade_turns_off_only_on_a_converged_step() {
        let source = Rc::new(CornerSource::new(120.0, 12.0, 100.0, 10.0).unwrap());
        let mut system = NodalSystem::new(1, None).unwrap();
        let mut reg = regulator(&mut system, Rc::clone(&source));

        system.set_potentials(nalgebra::dvector![90.0]).unwrap();
        let _ = reg.confirm_solution(&system, converged());
        reg.update_contribution(&mut system).unwrap();
        assert_eq!(reg.availability(), Availability::Regulating);

        // Eclipse: bulk power (1000 W scaled) falls below the 50 W floor.
        source.set_scale(0.01);

        // Unconverged step: no transition, still regulating.
        assert_eq!(
            reg.confirm_solution(&system, MinorStep::new(6, 0)),
            SolutionResult::Confirm
        );
        assert_eq!(reg.availability(), Availability::Regulating);

        // Converged step: Regulating -> Off, reject, all strings shunted.
        assert!(reg.confirm_solution(&system, converged()).is_reject());
        assert_eq!(reg.availability(), Availability::Off);
        assert_eq!(reg.shunted_strings(), reg.total_strings());

        reg.update_contribution(&mut system).unwrap();
        assert_eq!(system.stamp(reg.slot).unwrap(), (0.0, 0.0));
        reg.compute_flows(&system).unwrap();
        assert_eq!(reg.power_delivered(), 0.0);
    }

    #[test]
    fn unsustainable_setpoint_sags_to_max_power() {
        // Corner at 100 V but setpoint asks for 110 V with real demand.
        let source = Rc::new(CornerSource::new(120.0, 12.0, 100.0, 10.0).unwrap());
        let mut system = NodalSystem::new(1, None).unwrap();
        let mut reg = ShuntRegulatorLink::new(
            "pv-reg".into(),
            &mut system,
            n(0),
            volts(110.0),
            siemens(1e6),
            Rc::clone(&source) as Rc<dyn SourceCurve>,
            10,
            watts(50.0),
        )
        .unwrap();

        system.set_potentials(nalgebra::dvector![110.0]).unwrap();
        let _ = reg.confirm_solution(&system, converged());
        reg.update_contribution(&mut system).unwrap();
        // First pass decides Regulating (no demand yet); drive a demand
        // above the curve's supply at 110 V (5 A available there).
        system.set_potentials(nalgebra::dvector![104.0]).unwrap();
        assert!(reg.confirm_solution(&system, converged()).is_reject());
        assert_eq!(reg.availability(), Availability::Sagging);

        reg.update_contribution(&mut system).unwrap();
        let (g, w) = system.stamp(reg.slot).unwrap();
        assert_eq!(g, 0.0);
        // Sag current delivers max power at the corner.
        assert!((w - 10.0).abs() < 1e-9);
    }

    #[test]
    fn partial_load_shunts_partial_strings() {
        let source = Rc::new(CornerSource::new(120.0, 12.0, 100.0, 10.0).unwrap());
        let mut system = NodalSystem::new(1, None).unwrap();
        let reg = regulator(&mut system, source);
        // 400 W delivered of 1000 W available: 60% excess, 6 of 10 strings.
        assert_eq!(reg.strings_for_load(400.0, 1000.0), 6);
        assert_eq!(reg.strings_for_load(1000.0, 1000.0), 0);
        assert_eq!(reg.strings_for_load(0.0, 1000.0), 10);
    }

    #[test]
    fn confirm_against_unstamped_system_is_inert() {
        let source = Rc::new(CornerSource::new(120.0, 12.0, 100.0, 10.0).unwrap());
        let mut system = NodalSystem::new(1, None).unwrap();
        let _first = regulator(&mut system, Rc::clone(&source));
        let mut reg = regulator(&mut system, source);

        // Slot 1 does not exist in the foreign system: confirm, no abort,
        // no state change.
        let foreign = NodalSystem::new(1, None).unwrap();
        assert_eq!(
            reg.confirm_solution(&foreign, converged()),
            SolutionResult::Confirm
        );
        assert_eq!(reg.availability(), Availability::Off);
    }

    #[test]
    fn bad_configs_rejected() {
        let source = Rc::new(CornerSource::new(120.0, 12.0, 100.0, 10.0).unwrap());
        let mut system = NodalSystem::new(1, None).unwrap();
        assert!(ShuntRegulatorLink::new(
            "bad".into(),
            &mut system,
            n(0),
            volts(0.0),
            siemens(1e6),
            Rc::clone(&source) as Rc<dyn SourceCurve>,
            10,
            watts(50.0),
        )
        .is_err());
        assert!(ShuntRegulatorLink::new(
            "bad".into(),
            &mut system,
            n(0),
            volts(90.0),
            siemens(1e6),
            source,
            0,
            watts(50.0),
        )
        .is_err());
    }
}
