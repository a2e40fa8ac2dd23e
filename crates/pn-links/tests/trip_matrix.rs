//! Interaction of multiple trip primitives at different priorities.
//!
//! Two guards watching the same network chain their checks through one
//! accumulated result per minor step. The intended total order is
//! Reject > Delay > Confirm: a higher-priority trip that fires must not be
//! masked by a lower-priority guard still in its delay window, regardless of
//! check order.

use pn_links::{SolutionResult, TripLogic, TripSense};
use SolutionResult::{Confirm, Delay, Reject};

fn pair(p_first: u32, p_second: u32) -> (TripLogic, TripLogic) {
    (
        TripLogic::new(TripSense::GreaterThan, 100.0, p_first),
        TripLogic::new(TripSense::GreaterThan, 200.0, p_second),
    )
}

/// Run both checks with both conditions met at the given step, first-listed
/// trip first, and return the chained result.
fn chain(a: &mut TripLogic, b: &mut TripLogic, step: usize) -> SolutionResult {
    let (r, _) = a.check(Confirm, 1_000.0, step);
    let (r, _) = b.check(r, 1_000.0, step);
    r
}

#[test]
fn both_below_priority_is_delay() {
    let (mut low, mut high) = pair(3, 5);
    assert_eq!(chain(&mut low, &mut high, 1), Delay);
    assert!(!low.is_tripped());
    assert!(!high.is_tripped());
}

#[test]
fn one_fires_one_delays_reject_wins() {
    // Step 3: the priority-3 trip fires, the priority-5 trip is still in
    // its delay window. Reject must survive the later delay re-check.
    let (mut low, mut high) = pair(3, 5);
    assert_eq!(chain(&mut low, &mut high, 3), Reject);
    assert!(low.is_tripped());
    assert!(!high.is_tripped());
}

#[test]
fn reject_survives_in_either_check_order() {
    let (mut low, mut high) = pair(3, 5);
    let (r, fired) = high.check(Confirm, 1_000.0, 3);
    assert_eq!(r, Delay);
    assert!(!fired);
    let (r, fired) = low.check(r, 1_000.0, 3);
    assert_eq!(r, Reject);
    assert!(fired);
}

#[test]
fn both_fire_at_the_higher_priority() {
    let (mut low, mut high) = pair(3, 5);
    assert_eq!(chain(&mut low, &mut high, 5), Reject);
    assert!(low.is_tripped());
    assert!(high.is_tripped());
}

#[test]
fn latched_trip_passes_later_results_through() {
    let (mut low, mut high) = pair(3, 5);
    let _ = chain(&mut low, &mut high, 3);
    assert!(low.is_tripped());
    // Next step: the latched trip contributes nothing; the other keeps
    // delaying until its own priority is reached.
    assert_eq!(chain(&mut low, &mut high, 4), Delay);
    assert_eq!(chain(&mut low, &mut high, 5), Reject);
    assert!(high.is_tripped());
    // Fully latched network settles back to confirm.
    assert_eq!(chain(&mut low, &mut high, 6), Confirm);
}

#[test]
fn same_priority_trips_fire_together() {
    let (mut a, mut b) = pair(2, 2);
    assert_eq!(chain(&mut a, &mut b, 2), Reject);
    assert!(a.is_tripped());
    assert!(b.is_tripped());
}

#[test]
fn equal_priority_below_window_delays_and_preserves_incoming_reject() {
    let mut trip = TripLogic::new(TripSense::GreaterThan, 100.0, 4);
    // An earlier guard already rejected this step: the delay window must
    // not downgrade it.
    let (r, fired) = trip.check(Reject, 1_000.0, 2);
    assert_eq!(r, Reject);
    assert!(!fired);
}
