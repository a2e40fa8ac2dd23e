//! Converter input/output link pair.
//!
//! A converter is modeled as two links on two separate electrical islands:
//! the input link draws power from the upstream network as a
//! conductance-effective constant-power load, and the output link sources
//! power into the downstream network under a voltage, current, or power
//! regulation mode. Wired together through a [`PowerBus`] they negotiate
//! which side computes its terminal state first (§ interface leadership) and
//! exchange demand power and supply validity. Either link also works alone,
//! falling back to its local measurement.

use crate::error::{LinkError, LinkResult};
use crate::interface::{BusHandle, BusSide, PowerBus};
use crate::regulation::{
    select_active_state, BiasMachine, FlipOutcome, LimitBounds, LimitMachine, OperateConditions,
};
use crate::source::SourceCurve;
use crate::state::{Availability, Bias, LimitState};
use crate::traits::{grounded, PowerLink};
use crate::trip::{TripLogic, TripSense};
use crate::FlipGuard;
use pn_core::units::{Conductance, Ratio, Voltage};
use pn_core::{NodeId, Real};
use pn_network::{MinorStep, NodalSystem, Ports, SolutionResult, StampSlot};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Guard against dividing by a near-zero node potential.
const MIN_POTENTIAL: Real = 1e-6;

/// What quantity the output link regulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegulationMode {
    Voltage,
    Current,
    Power,
}

/// How the regulation target is produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RegulationTarget {
    /// Fixed setpoint in the regulated quantity's unit.
    Setpoint(Real),
    /// Multiplier applied to the upstream potential published by the paired
    /// input link (transformer-style tracking).
    UpstreamRatio(Real),
}

fn validate_trip(trip: &TripLogic, what: &'static str) -> LinkResult<()> {
    if trip.limit() != 0.0 && trip.priority() == 0 {
        return Err(LinkError::InvalidConfig { what });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Output side
// ---------------------------------------------------------------------------

/// Power-producing converter output link.
pub struct ConverterOutputLink {
    name: String,
    node: NodeId,
    slot: StampSlot,
    mode: RegulationMode,
    target: RegulationTarget,
    /// Regulation admittance: large for a stiff voltage source, also the
    /// resistive output channel for loss accounting.
    output_conductance: Real,
    efficiency: Real,
    /// Fallback upstream potential for `UpstreamRatio` with no partner.
    nominal_upstream: Real,
    enabled: bool,
    availability: Availability,
    avail_guard: FlipGuard,
    limit: LimitMachine,
    bias: Option<BiasMachine>,
    over_voltage_trip: TripLogic,
    over_current_trip: TripLogic,
    source: Option<Rc<dyn SourceCurve>>,
    bus: Option<BusHandle>,
    valid: bool,
    flux: Real,
    power_delivered: Real,
    channel_loss: Real,
    interface_loss: Real,
}

impl ConverterOutputLink {
    pub fn new(
        name: String,
        system: &mut NodalSystem,
        node: NodeId,
        mode: RegulationMode,
        target: RegulationTarget,
        output_conductance: Conductance,
        efficiency: Ratio,
    ) -> LinkResult<Self> {
        let g_out = output_conductance.value;
        let eta = efficiency.value;
        if g_out <= 0.0 {
            return Err(LinkError::InvalidConfig {
                what: "output conductance must be positive",
            });
        }
        if !(eta > 0.0 && eta <= 1.0) {
            return Err(LinkError::InvalidConfig {
                what: "efficiency must be in (0, 1]",
            });
        }
        if let RegulationTarget::Setpoint(s) = target {
            if s < 0.0 {
                return Err(LinkError::InvalidConfig {
                    what: "regulation setpoint must be non-negative",
                });
            }
        }
        let slot = system.reserve_ports(Ports::Shunt(node))?;
        Ok(Self {
            name,
            node,
            slot,
            mode,
            target,
            output_conductance: g_out,
            efficiency: eta,
            nominal_upstream: 0.0,
            enabled: true,
            availability: Availability::Off,
            avail_guard: FlipGuard::default(),
            limit: LimitMachine::new(LimitBounds::default(), FlipGuard::DEFAULT_CAP)?,
            bias: None,
            over_voltage_trip: TripLogic::disabled(TripSense::GreaterThan),
            over_current_trip: TripLogic::disabled(TripSense::GreaterThan),
            source: None,
            bus: None,
            valid: false,
            flux: 0.0,
            power_delivered: 0.0,
            channel_loss: 0.0,
            interface_loss: 0.0,
        })
    }

    /// Protective operating bounds (limit-state sub-machine).
    pub fn with_limits(mut self, bounds: LimitBounds, flip_cap: u32) -> LinkResult<Self> {
        self.limit = LimitMachine::new(bounds, flip_cap)?;
        Ok(self)
    }

    /// Block reverse (back-driven) flow with a flip-guarded bias machine.
    pub fn with_reverse_blocking(mut self, flip_cap: u32) -> Self {
        self.bias = Some(BiasMachine::new(Bias::Forward, flip_cap));
        self
    }

    pub fn with_over_voltage_trip(mut self, trip: TripLogic) -> LinkResult<Self> {
        validate_trip(&trip, "output over-voltage trip needs priority >= 1")?;
        self.over_voltage_trip = trip;
        Ok(self)
    }

    pub fn with_over_current_trip(mut self, trip: TripLogic) -> LinkResult<Self> {
        validate_trip(&trip, "output over-current trip needs priority >= 1")?;
        self.over_current_trip = trip;
        Ok(self)
    }

    /// Back the regulator with a bulk source (enables sag / current clamp).
    pub fn with_source(mut self, source: Rc<dyn SourceCurve>) -> Self {
        self.source = Some(source);
        self
    }

    /// Fallback upstream potential for ratio targets without a partner.
    pub fn with_nominal_upstream(mut self, upstream: Voltage) -> LinkResult<Self> {
        if upstream.value <= 0.0 {
            return Err(LinkError::InvalidConfig {
                what: "nominal upstream voltage must be positive",
            });
        }
        self.nominal_upstream = upstream.value;
        Ok(self)
    }

    /// Register on the shared bus. Leadership goes to whichever side
    /// attached first; fixed thereafter.
    pub fn connect_bus(&mut self, bus: &PowerBus) {
        self.bus = Some(bus.attach(BusSide::Output));
    }

    pub fn set_enabled(&mut self, on: bool) {
        self.enabled = on;
    }

    /// Explicit command-reset of the sticky trip latches.
    pub fn reset_trips(&mut self) {
        self.over_voltage_trip.reset();
        self.over_current_trip.reset();
    }

    pub fn availability(&self) -> Availability {
        self.availability
    }

    pub fn limit_state(&self) -> LimitState {
        self.limit.state()
    }

    pub fn bias(&self) -> Option<Bias> {
        self.bias.as_ref().map(|b| b.bias())
    }

    pub fn is_tripped(&self) -> bool {
        self.over_voltage_trip.is_tripped() || self.over_current_trip.is_tripped()
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Output current into the node (A).
    pub fn flux(&self) -> Real {
        self.flux
    }

    /// Power delivered to the downstream network (W).
    pub fn power_delivered(&self) -> Real {
        self.power_delivered
    }

    /// Resistive loss in the output channel (W). Never double-counts the
    /// conversion loss below.
    pub fn channel_loss(&self) -> Real {
        self.channel_loss
    }

    /// Conversion loss across the interface: upstream demand minus delivered
    /// power (W).
    pub fn interface_loss(&self) -> Real {
        self.interface_loss
    }

    /// Power the paired input side must draw upstream (W).
    pub fn demand_power(&self) -> Real {
        self.power_delivered + self.interface_loss
    }

    /// Upstream potential as seen through the interface (or fallback).
    fn upstream_voltage(&self) -> Real {
        match &self.bus {
            Some(handle) if !handle.leads() => handle.read().voltage,
            _ => self.nominal_upstream,
        }
    }

    /// Supply validity as seen through the interface. Optimistically true
    /// when leading or unpaired.
    fn upstream_valid(&self) -> bool {
        match &self.bus {
            Some(handle) if !handle.leads() => handle.read().valid,
            _ => true,
        }
    }

    fn target_value(&self) -> Real {
        match self.target {
            RegulationTarget::Setpoint(s) => s,
            RegulationTarget::UpstreamRatio(r) => r * self.upstream_voltage(),
        }
    }

    /// Target terminal voltage used by the bias comparison and the sag /
    /// corner selection. For current/power modes this is the upstream-scaled
    /// voltage only when tracking; otherwise the present node potential.
    fn target_voltage(&self, system: &NodalSystem) -> Real {
        match self.mode {
            RegulationMode::Voltage => self.target_value(),
            RegulationMode::Current | RegulationMode::Power => system.potential(self.node),
        }
    }

    fn stamp_for(&self, system: &NodalSystem) -> (Real, Real) {
        if !self.availability.is_active() {
            return (0.0, 0.0);
        }
        if let Some(bias) = &self.bias {
            if bias.bias() == Bias::Reverse {
                // Back-driven and blocking: electrically disconnected.
                return (0.0, 0.0);
            }
        }
        match self.limit.state() {
            LimitState::OverVoltage => {
                let ov = self.limit.bounds().over_voltage.unwrap_or(0.0);
                return (self.output_conductance, self.output_conductance * ov);
            }
            LimitState::UnderVoltage => {
                let uv = self.limit.bounds().under_voltage.unwrap_or(0.0);
                return (self.output_conductance, self.output_conductance * uv);
            }
            LimitState::OverCurrent => {
                let oc = self.limit.bounds().over_current.unwrap_or(0.0);
                return (0.0, oc);
            }
            LimitState::Unlimited => {}
        }
        match self.availability {
            Availability::Sagging => {
                // Maximum available power at the source's natural sag voltage.
                if let Some(source) = &self.source {
                    let p = source.max_power();
                    if let Some(t) = source.load_at_power(p, true) {
                        return (0.0, t.current);
                    }
                }
                (0.0, 0.0)
            }
            Availability::CurrentLimited => {
                let clamp = self
                    .source
                    .as_ref()
                    .map_or(0.0, |s| s.short_circuit_current());
                (0.0, clamp)
            }
            Availability::Regulating => match self.mode {
                RegulationMode::Voltage => {
                    let g = self.output_conductance;
                    (g, g * self.target_value())
                }
                RegulationMode::Current => (0.0, self.target_value()),
                RegulationMode::Power => {
                    let v = system.potential(self.node).max(MIN_POTENTIAL);
                    (0.0, self.target_value() / v)
                }
            },
            Availability::Off => (0.0, 0.0),
        }
    }
}

impl PowerLink for ConverterOutputLink {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> Ports {
        Ports::Shunt(self.node)
    }

    fn begin_major_step(&mut self) {
        self.avail_guard.reset();
        self.limit.begin_major_step();
        if let Some(bias) = &mut self.bias {
            bias.begin_major_step();
        }
    }

    fn update_contribution(&mut self, system: &mut NodalSystem) -> LinkResult<()> {
        let (g, w) = self.stamp_for(system);
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

        (result, _) = self.over_voltage_trip.check(result, v, step.converged);
        (result, _) = self.over_current_trip.check(result, i, step.converged);

        // Bias: back-driven when the node sits above the target voltage.
        let target = self.target_voltage(system);
        if let Some(bias) = &mut self.bias {
            let implied = Bias::from_delta(target - v);
            if let FlipOutcome::Flipped = bias.observe(implied) {
                result = SolutionResult::Reject;
            }
        }

        // Availability, guarded like every other sub-machine.
        let conditions = OperateConditions {
            enabled: self.enabled,
            tripped: self.is_tripped(),
            powered: self.upstream_valid(),
            available_power: self.source.as_ref().map(|s| s.max_power()),
            min_operate_power: 0.0,
        };
        let wanted = if !conditions.can_operate() {
            Availability::Off
        } else if let Some(source) = &self.source {
            select_active_state(source.as_ref(), self.target_voltage(system), i.max(0.0))
        } else {
            Availability::Regulating
        };
        if wanted != self.availability && self.avail_guard.try_flip() {
            self.availability = wanted;
            result = SolutionResult::Reject;
        }

        // Protective limit entry/exit forces a re-linearization.
        if let FlipOutcome::Flipped = self.limit.evaluate(v, i) {
            result = SolutionResult::Reject;
        }

        // Validity only firms up on a converged solution; optimistic true,
        // driven false by explicit failure conditions only.
        self.valid = self.enabled
            && !self.is_tripped()
            && self.availability.is_active()
            && self.bias.as_ref().is_none_or(|b| b.bias() == Bias::Forward)
            && self.upstream_valid();

        if let Some(handle) = &self.bus {
            if handle.leads() {
                let delivered = v * i;
                handle.publish(v, delivered / self.efficiency, self.valid);
            }
        }
        result
    }

    fn compute_flows(&mut self, system: &NodalSystem) -> LinkResult<()> {
        if grounded(system, self.ports()) || !self.valid {
            self.flux = 0.0;
            self.power_delivered = 0.0;
            self.channel_loss = 0.0;
            self.interface_loss = 0.0;
            return Ok(());
        }
        let v = system.potential(self.node);
        let (g, w) = system.stamp(self.slot)?;
        self.flux = w - g * v;
        self.power_delivered = v * self.flux;
        self.channel_loss = self.flux * self.flux / self.output_conductance;
        self.interface_loss = self.power_delivered / self.efficiency - self.power_delivered;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Input side
// ---------------------------------------------------------------------------

/// Power-consuming converter input link.
///
/// Stamps a conductance-effective constant-power load: `g = p / v0^2` with
/// `v0` the latest node potential, re-linearized every minor step until the
/// drawn power settles at the demand.
pub struct ConverterInputLink {
    name: String,
    node: NodeId,
    slot: StampSlot,
    nominal_voltage: Real,
    enabled: bool,
    /// Local demand, used when leading or unpaired.
    local_demand: Real,
    under_voltage_trip: TripLogic,
    over_voltage_trip: TripLogic,
    bus: Option<BusHandle>,
    /// True once the stamp reflects an active (drawing) link.
    stamped_active: bool,
    valid: bool,
    input_voltage: Real,
    drawn_power: Real,
}

impl ConverterInputLink {
    pub fn new(
        name: String,
        system: &mut NodalSystem,
        node: NodeId,
        nominal_voltage: Voltage,
    ) -> LinkResult<Self> {
        if nominal_voltage.value <= 0.0 {
            return Err(LinkError::InvalidConfig {
                what: "nominal input voltage must be positive",
            });
        }
        let slot = system.reserve_ports(Ports::Shunt(node))?;
        Ok(Self {
            name,
            node,
            slot,
            nominal_voltage: nominal_voltage.value,
            enabled: true,
            local_demand: 0.0,
            under_voltage_trip: TripLogic::disabled(TripSense::LessThan),
            over_voltage_trip: TripLogic::disabled(TripSense::GreaterThan),
            bus: None,
            stamped_active: false,
            valid: false,
            input_voltage: 0.0,
            drawn_power: 0.0,
        })
    }

    pub fn with_under_voltage_trip(mut self, trip: TripLogic) -> LinkResult<Self> {
        validate_trip(&trip, "input under-voltage trip needs priority >= 1")?;
        self.under_voltage_trip = trip;
        Ok(self)
    }

    pub fn with_over_voltage_trip(mut self, trip: TripLogic) -> LinkResult<Self> {
        validate_trip(&trip, "input over-voltage trip needs priority >= 1")?;
        self.over_voltage_trip = trip;
        Ok(self)
    }

    pub fn connect_bus(&mut self, bus: &PowerBus) {
        self.bus = Some(bus.attach(BusSide::Input));
    }

    pub fn set_enabled(&mut self, on: bool) {
        self.enabled = on;
    }

    /// Standalone / leading demand (W).
    pub fn set_load_power(&mut self, power: Real) {
        self.local_demand = power.max(0.0);
    }

    pub fn reset_trips(&mut self) {
        self.under_voltage_trip.reset();
        self.over_voltage_trip.reset();
    }

    pub fn is_tripped(&self) -> bool {
        self.under_voltage_trip.is_tripped() || self.over_voltage_trip.is_tripped()
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn input_voltage(&self) -> Real {
        self.input_voltage
    }

    pub fn drawn_power(&self) -> Real {
        self.drawn_power
    }

    /// Demand the stamp should draw this step. A follower whose leader
    /// published invalid is zeroed immediately, without waiting for its own
    /// protective checks.
    fn demand(&self) -> Real {
        match &self.bus {
            Some(handle) if !handle.leads() => {
                let published = handle.read();
                if published.valid {
                    published.power
                } else {
                    0.0
                }
            }
            _ => self.local_demand,
        }
    }

    fn partner_valid(&self) -> bool {
        match &self.bus {
            Some(handle) if !handle.leads() => handle.read().valid,
            _ => true,
        }
    }
}

impl PowerLink for ConverterInputLink {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> Ports {
        Ports::Shunt(self.node)
    }

    fn update_contribution(&mut self, system: &mut NodalSystem) -> LinkResult<()> {
        let active = self.enabled && !self.is_tripped() && self.partner_valid();
        let demand = if active { self.demand() } else { 0.0 };
        let g = if demand > 0.0 {
            let v0 = system.potential(self.node).max(MIN_POTENTIAL);
            // Seed from the nominal voltage until the network has a real
            // potential to linearize around.
            let v0 = if v0 <= MIN_POTENTIAL {
                self.nominal_voltage
            } else {
                v0
            };
            demand / (v0 * v0)
        } else {
            0.0
        };
        system.set_stamp(self.slot, g, 0.0)?;
        self.stamped_active = demand > 0.0;
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
        let mut result = SolutionResult::Confirm;
        (result, _) = self.under_voltage_trip.check(result, v, step.converged);
        (result, _) = self.over_voltage_trip.check(result, v, step.converged);

        // The stamp must reflect whether we draw at all; a mismatch (trip
        // just latched, partner went invalid, demand appeared) forces a
        // re-linearization.
        let active = self.enabled && !self.is_tripped() && self.partner_valid();
        let should_stamp = active && self.demand() > 0.0;
        if should_stamp != self.stamped_active {
            result = SolutionResult::Reject;
        }

        self.valid = self.enabled && !self.is_tripped() && self.partner_valid();

        if let Some(handle) = &self.bus {
            if handle.leads() {
                handle.publish(v, self.drawn_power, self.valid);
            }
        }
        result
    }

    fn compute_flows(&mut self, system: &NodalSystem) -> LinkResult<()> {
        if grounded(system, self.ports()) || !self.valid {
            self.input_voltage = 0.0;
            self.drawn_power = 0.0;
            return Ok(());
        }
        let v = system.potential(self.node);
        let (g, _) = system.stamp(self.slot)?;
        self.input_voltage = v;
        self.drawn_power = g * v * v;
        Ok(())
    }
}
