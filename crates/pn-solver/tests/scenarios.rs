//! End-to-end scenarios: full networks driven through the minor-step loop.

use pn_core::units::{siemens, unitless, volts, watts};
use pn_core::NodeId;
use pn_links::{
    Availability, Bias, ConductorLink, ConverterInputLink, ConverterOutputLink, CornerSource,
    DiodeLink, PotentialLink, PowerBus, PowerLink, RegulationMode, RegulationTarget, SourceCurve,
    ShuntRegulatorLink,
};
use pn_network::NodalSystem;
use pn_solver::{solve_major_step, SolverConfig};
use std::rc::Rc;

fn n(i: u32) -> NodeId {
    NodeId::from_index(i)
}

#[test]
fn diode_rectifier_conducts_forward() {
    // 28 V feed, diode into a 1 S load. Forward assumption holds, so the
    // network settles without a single rejection.
    let mut system = NodalSystem::new(2, None).unwrap();
    let mut src =
        PotentialLink::new("feed".into(), &mut system, n(0), volts(28.0), siemens(1e6)).unwrap();
    let mut diode = DiodeLink::new(
        "d1".into(),
        &mut system,
        n(0),
        n(1),
        siemens(10.0),
        siemens(1e-9),
    )
    .unwrap();
    let mut load = ConductorLink::to_ground("load".into(), &mut system, n(1), siemens(1.0)).unwrap();

    let mut links: Vec<&mut dyn PowerLink> = vec![&mut src, &mut diode, &mut load];
    let report = solve_major_step(&mut system, &mut links, &SolverConfig::default()).unwrap();

    assert_eq!(report.rejections, 0);
    assert_eq!(diode.bias(), Bias::Forward);
    let v1 = system.potential(n(1));
    assert!((v1 - 280.0 / 11.0).abs() < 1e-3, "v1 = {v1}");
    assert!((diode.flux() - v1).abs() < 1e-3);
}

#[test]
fn diode_rectifier_blocks_reverse() {
    // Same network, feed polarity reversed. The stale forward assumption is
    // rejected exactly once, then the reverse linearization confirms with
    // only leakage flowing.
    let mut system = NodalSystem::new(2, None).unwrap();
    let mut src =
        PotentialLink::new("feed".into(), &mut system, n(0), volts(-28.0), siemens(1e6)).unwrap();
    let mut diode = DiodeLink::new(
        "d1".into(),
        &mut system,
        n(0),
        n(1),
        siemens(10.0),
        siemens(1e-9),
    )
    .unwrap();
    let mut load = ConductorLink::to_ground("load".into(), &mut system, n(1), siemens(1.0)).unwrap();

    let mut links: Vec<&mut dyn PowerLink> = vec![&mut src, &mut diode, &mut load];
    let report = solve_major_step(&mut system, &mut links, &SolverConfig::default()).unwrap();

    assert_eq!(report.rejections, 1);
    assert_eq!(diode.bias(), Bias::Reverse);
    assert!(system.potential(n(1)).abs() < 1e-6);
    assert!(diode.flux().abs() < 1e-6);
}

#[test]
fn converter_pair_negotiates_demand_over_the_bus() {
    // Upstream 28 V island feeds a converter whose output regulates 10 V
    // into a 1 S load on a separate island. The output side attaches to the
    // bus first and leads; the input side follows the published demand.
    let mut system = NodalSystem::new(2, None).unwrap();
    let bus = PowerBus::new();

    let mut feed =
        PotentialLink::new("feed".into(), &mut system, n(0), volts(28.0), siemens(1e6)).unwrap();
    let mut output = ConverterOutputLink::new(
        "conv-out".into(),
        &mut system,
        n(1),
        RegulationMode::Voltage,
        RegulationTarget::Setpoint(10.0),
        siemens(1e6),
        unitless(0.9),
    )
    .unwrap();
    output.connect_bus(&bus);
    let mut input =
        ConverterInputLink::new("conv-in".into(), &mut system, n(0), volts(28.0)).unwrap();
    input.connect_bus(&bus);
    let mut load = ConductorLink::to_ground("load".into(), &mut system, n(1), siemens(1.0)).unwrap();

    let mut links: Vec<&mut dyn PowerLink> =
        vec![&mut feed, &mut output, &mut input, &mut load];
    let report = solve_major_step(&mut system, &mut links, &SolverConfig::default()).unwrap();

    // Two forced re-linearizations: availability turn-on, then the follower
    // picking up the published demand.
    assert!(report.rejections >= 2, "rejections = {}", report.rejections);

    let v_out = system.potential(n(1));
    assert!((v_out - 10.0).abs() < 1e-3, "v_out = {v_out}");
    assert!(output.is_valid());
    assert!(input.is_valid());

    // 100 W delivered at 90% efficiency: 111.1 W drawn upstream.
    let delivered = output.power_delivered();
    assert!((delivered - 100.0).abs() < 0.01, "delivered = {delivered}");
    assert!((output.demand_power() - delivered / 0.9).abs() < 1e-6);
    assert!(
        (input.drawn_power() - output.demand_power()).abs() < 1e-3,
        "drawn = {}, demand = {}",
        input.drawn_power(),
        output.demand_power()
    );
    assert!((output.interface_loss() - (delivered / 0.9 - delivered)).abs() < 1e-6);
    assert!((input.input_voltage() - 28.0).abs() < 1e-3);
}

#[test]
fn shunt_regulator_rides_through_an_eclipse() {
    let source = Rc::new(CornerSource::new(120.0, 12.0, 100.0, 10.0).unwrap());
    let mut system = NodalSystem::new(1, None).unwrap();
    let mut reg = ShuntRegulatorLink::new(
        "pv-reg".into(),
        &mut system,
        n(0),
        volts(90.0),
        siemens(1e6),
        Rc::clone(&source) as Rc<dyn SourceCurve>,
        10,
        watts(50.0),
    )
    .unwrap();
    let mut load = ConductorLink::to_ground("bus-load".into(), &mut system, n(0), siemens(0.05))
        .unwrap();

    // Sunlit: the regulator turns on and holds the bus at the setpoint.
    {
        let mut links: Vec<&mut dyn PowerLink> = vec![&mut reg, &mut load];
        let report =
            solve_major_step(&mut system, &mut links, &SolverConfig::default()).unwrap();
        assert_eq!(report.rejections, 1);
    }
    assert_eq!(reg.availability(), Availability::Regulating);
    let v = system.potential(n(0));
    assert!((v - 90.0).abs() < 1e-3, "v = {v}");
    assert!((reg.flux() - 4.5).abs() < 1e-3);
    // 405 W of 1000 W available: 6 of 10 strings bled off.
    assert_eq!(reg.shunted_strings(), 6);
    assert!((reg.shunted_power() - 595.0).abs() < 0.5);

    // Eclipse: bulk power collapses below the minimum-operate floor. The
    // next major step drops the regulator to Off and the bus with it.
    source.set_scale(0.01);
    {
        let mut links: Vec<&mut dyn PowerLink> = vec![&mut reg, &mut load];
        let report =
            solve_major_step(&mut system, &mut links, &SolverConfig::default()).unwrap();
        assert_eq!(report.rejections, 1);
    }
    assert_eq!(reg.availability(), Availability::Off);
    assert!(!reg.is_valid());
    assert_eq!(reg.shunted_strings(), reg.total_strings());
    assert!(system.potential(n(0)).abs() < 1e-6);
    assert_eq!(reg.power_delivered(), 0.0);
}
