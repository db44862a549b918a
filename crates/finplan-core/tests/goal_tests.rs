use finplan_core::assumptions::{registry, Region};
use finplan_core::goals::{
    allocate_goal_budget, Goal, GoalFeasibility, GoalPriority,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Goal allocator: priority-greedy funding with feasibility classification.
// ===========================================================================

const CURRENT_YEAR: i32 = 2025;

fn assumptions() -> &'static finplan_core::assumptions::MarketAssumptions {
    registry::get(Region::In, "2024-Q4").unwrap()
}

fn goal(id: &str, target: Decimal, year: i32, priority: GoalPriority) -> Goal {
    Goal {
        id: id.to_string(),
        name: id.to_string(),
        target_amount: target,
        target_year: year,
        priority,
        current_savings: Decimal::ZERO,
    }
}

// ---------------------------------------------------------------------------
// Scenario: two high-priority goals crowd out a low-priority one
// ---------------------------------------------------------------------------

#[test]
fn test_low_priority_goal_is_impossible_when_budget_exhausted() {
    let goals = vec![
        goal("child-education", dec!(2_000_000), 2032, GoalPriority::High),
        goal("home-downpayment", dec!(1_000_000), 2035, GoalPriority::High),
        goal("world-trip", dec!(500_000), 2030, GoalPriority::Low),
    ];
    // Slightly below the combined high-priority requirement, so the second
    // high goal takes the remainder and nothing is left for the trip.
    let result = allocate_goal_budget(&goals, dec!(30_000), CURRENT_YEAR, assumptions()).unwrap();
    let r = &result.result;

    let trip = r
        .allocations
        .iter()
        .find(|a| a.goal_id == "world-trip")
        .unwrap();
    assert_eq!(trip.monthly_sip, Decimal::ZERO);
    assert_eq!(trip.feasibility, GoalFeasibility::Impossible);
    assert!(r.conflicts.iter().any(|c| c.contains("world-trip")));

    // Education (nearer, same priority) is served first and in full.
    let education = r
        .allocations
        .iter()
        .find(|a| a.goal_id == "child-education")
        .unwrap();
    assert_eq!(education.feasibility, GoalFeasibility::OnTrack);
    assert_eq!(education.monthly_sip, education.required_sip);
}

// ---------------------------------------------------------------------------
// Closure and bounds invariants
// ---------------------------------------------------------------------------

#[test]
fn test_allocation_closure_over_budget_sweep() {
    let goals = vec![
        goal("a", dec!(1_500_000), 2034, GoalPriority::High),
        goal("b", dec!(900_000), 2031, GoalPriority::Medium),
        goal("c", dec!(400_000), 2028, GoalPriority::Low),
    ];
    for budget in [
        Decimal::ZERO,
        dec!(5_000),
        dec!(20_000),
        dec!(60_000),
        dec!(1_000_000),
    ] {
        let result =
            allocate_goal_budget(&goals, budget, CURRENT_YEAR, assumptions()).unwrap();
        let r = &result.result;

        assert_eq!(r.total_monthly + r.unallocated, budget);
        for alloc in &r.allocations {
            assert!(alloc.monthly_sip >= Decimal::ZERO);
            assert!(alloc.monthly_sip <= alloc.required_sip);
            assert!(alloc.shortfall >= Decimal::ZERO);
        }
    }
}

#[test]
fn test_fully_funded_goal_reaches_inflated_target() {
    let goals = vec![goal("house", dec!(3_000_000), 2037, GoalPriority::High)];
    let result =
        allocate_goal_budget(&goals, dec!(200_000), CURRENT_YEAR, assumptions()).unwrap();
    let alloc = &result.result.allocations[0];

    assert_eq!(alloc.feasibility, GoalFeasibility::OnTrack);
    assert!(alloc.shortfall.is_zero());
    // Projected value covers the 5%-inflated target.
    let inflated = dec!(3_000_000) * finplan_core::time_value::compound(dec!(0.05), 12);
    assert!(alloc.projected_value >= inflated * dec!(0.999));
}

#[test]
fn test_empty_goal_list_leaves_budget_untouched() {
    let result = allocate_goal_budget(&[], dec!(40_000), CURRENT_YEAR, assumptions()).unwrap();
    let r = &result.result;
    assert!(r.allocations.is_empty());
    assert_eq!(r.unallocated, dec!(40_000));
    assert_eq!(r.budget_utilization, Decimal::ZERO);
    assert!(r.conflicts.is_empty());
}

#[test]
fn test_goal_already_covered_by_savings() {
    let mut g = goal("emergency-fund", dec!(400_000), 2030, GoalPriority::Medium);
    g.current_savings = dec!(800_000);
    let result =
        allocate_goal_budget(&[g], dec!(15_000), CURRENT_YEAR, assumptions()).unwrap();
    let alloc = &result.result.allocations[0];

    assert_eq!(alloc.required_sip, Decimal::ZERO);
    assert_eq!(alloc.monthly_sip, Decimal::ZERO);
    assert_eq!(alloc.feasibility, GoalFeasibility::OnTrack);
    assert_eq!(result.result.unallocated, dec!(15_000));
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[test]
fn test_negative_budget_is_rejected() {
    let err = allocate_goal_budget(&[], dec!(-100), CURRENT_YEAR, assumptions()).unwrap_err();
    assert!(err.to_string().contains("monthly_budget"));
}

#[test]
fn test_goal_in_the_past_is_rejected() {
    let goals = vec![goal("stale", dec!(100_000), 2024, GoalPriority::Low)];
    assert!(allocate_goal_budget(&goals, dec!(10_000), CURRENT_YEAR, assumptions()).is_err());
}

// ---------------------------------------------------------------------------
// Recommendations
// ---------------------------------------------------------------------------

#[test]
fn test_over_subscribed_budget_recommends_increase() {
    let goals = vec![
        goal("a", dec!(5_000_000), 2030, GoalPriority::High),
        goal("b", dec!(5_000_000), 2031, GoalPriority::High),
    ];
    let result = allocate_goal_budget(&goals, dec!(20_000), CURRENT_YEAR, assumptions()).unwrap();
    assert!(result
        .result
        .recommendations
        .iter()
        .any(|rec| rec.contains("Increase the monthly budget")));
}

#[test]
fn test_surplus_budget_is_reported() {
    let goals = vec![goal("small", dec!(200_000), 2030, GoalPriority::High)];
    let result =
        allocate_goal_budget(&goals, dec!(100_000), CURRENT_YEAR, assumptions()).unwrap();
    assert!(result.result.unallocated > Decimal::ZERO);
    assert!(result
        .result
        .recommendations
        .iter()
        .any(|rec| rec.contains("unallocated")));
}
