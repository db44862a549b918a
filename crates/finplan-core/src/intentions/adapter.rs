//! Thin façade between UI-level intentions and engine calls. Each handler
//! sequences the relevant engine operations and shapes the outcome into a
//! uniform steps-plus-report structure for the command-bar UI.
//!
//! The "thinking steps" are fixed presentation artifacts with pre-measured
//! durations; nothing in the engine reads or branches on them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::assumptions::{AssetId, MarketAssumptions};
use crate::goals::{allocate_goal_budget, Goal};
use crate::projection::{
    project_deterministic, run_monte_carlo, MonteCarloConfig, ProjectionInputs, SuccessMetric,
};
use crate::rebalancing::{generate_rebalancing_trades, RebalancingConfig};
use crate::types::{Money, Percent};
use crate::PlanResult;

/// A presentation step shown while the UI "thinks". Durations are constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThinkingStep {
    pub label: String,
    pub duration_ms: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetric {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentionReport {
    pub headline: String,
    pub metrics: Vec<ReportMetric>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentionResponse {
    pub steps: Vec<ThinkingStep>,
    pub report: IntentionReport,
}

fn step(label: &str, duration_ms: u32) -> ThinkingStep {
    ThinkingStep {
        label: label.to_string(),
        duration_ms,
    }
}

fn metric(label: &str, value: impl ToString) -> ReportMetric {
    ReportMetric {
        label: label.to_string(),
        value: value.to_string(),
    }
}

fn rupees(amount: Money) -> String {
    format!("₹{}", amount.round_dp(0))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Deterministic retirement check: corpus needed vs corpus projected.
pub fn optimize_retirement(
    inputs: &ProjectionInputs,
    assumptions: &MarketAssumptions,
) -> PlanResult<IntentionResponse> {
    let projection = project_deterministic(inputs, assumptions)?;
    let summary = &projection.result.summary;

    let mut recommendations = Vec::new();
    let headline = match summary.success_metric {
        SuccessMetric::Surplus => {
            recommendations.push(
                "You are ahead of plan; consider de-risking the allocation as retirement nears"
                    .to_string(),
            );
            "On course for retirement with a surplus".to_string()
        }
        SuccessMetric::OnTrack => {
            recommendations.push(
                "Stay the course; revisit the plan after any major income change".to_string(),
            );
            "Broadly on track for retirement".to_string()
        }
        SuccessMetric::Shortfall => {
            let gap = summary.retirement_corpus_needed - summary.projected_corpus_at_retirement;
            recommendations.push(format!(
                "Projected corpus falls short by {}; increase the monthly investment or defer retirement",
                rupees(gap)
            ));
            "Retirement corpus falls short of the need".to_string()
        }
        SuccessMetric::Depletion => {
            recommendations.push(
                "Projected savings run out before life expectancy; a materially higher savings rate is needed"
                    .to_string(),
            );
            "Portfolio depletes before life expectancy".to_string()
        }
    };

    Ok(IntentionResponse {
        steps: vec![
            step("Loading market assumptions", 120),
            step("Projecting yearly cashflows", 480),
            step("Evaluating retirement corpus", 260),
        ],
        report: IntentionReport {
            headline,
            metrics: vec![
                metric(
                    "Corpus at retirement",
                    rupees(summary.projected_corpus_at_retirement),
                ),
                metric("Corpus needed", rupees(summary.retirement_corpus_needed)),
                metric(
                    "Final portfolio value",
                    rupees(summary.final_portfolio_value),
                ),
            ],
            recommendations,
        },
    })
}

/// Monte Carlo retirement confidence at the standard N=1000, seed=42 run.
pub fn analyze_monte_carlo(
    inputs: &ProjectionInputs,
    assumptions: &MarketAssumptions,
) -> PlanResult<IntentionResponse> {
    let config = MonteCarloConfig::default();
    let simulation = run_monte_carlo(inputs, assumptions, &config)?;
    let result = &simulation.result;

    let p10 = result
        .percentile_paths
        .iter()
        .find(|p| p.percentile == 10)
        .map(|p| p.terminal_value)
        .unwrap_or_default();
    let p90 = result
        .percentile_paths
        .iter()
        .find(|p| p.percentile == 90)
        .map(|p| p.terminal_value)
        .unwrap_or_default();

    let mut recommendations = Vec::new();
    if result.success_probability < 0.8 {
        // Spread the deterministic corpus gap over the months left to
        // retirement to size the SIP increase.
        let deterministic = project_deterministic(inputs, assumptions)?;
        let summary = &deterministic.result.summary;
        let gap = (summary.retirement_corpus_needed - summary.projected_corpus_at_retirement)
            .max(Decimal::ZERO);
        let months = Decimal::from((inputs.retirement_age - inputs.current_age) * 12);
        if gap > Decimal::ZERO && !months.is_zero() {
            recommendations.push(format!(
                "Success probability is {:.0}%; raising the monthly SIP by {} would close the corpus gap",
                result.success_probability * 100.0,
                rupees(gap / months)
            ));
        } else {
            recommendations.push(format!(
                "Success probability is {:.0}%; consider a higher savings rate or a later retirement",
                result.success_probability * 100.0
            ));
        }
    }

    Ok(IntentionResponse {
        steps: vec![
            step("Loading market assumptions", 120),
            step("Simulating 1000 market scenarios", 1400),
            step("Ranking outcomes by terminal value", 300),
        ],
        report: IntentionReport {
            headline: format!(
                "{:.0}% of simulated futures sustain the plan",
                result.success_probability * 100.0
            ),
            metrics: vec![
                metric(
                    "Success probability",
                    format!("{:.1}%", result.success_probability * 100.0),
                ),
                metric("Median outcome", format!("₹{:.0}", result.median_outcome)),
                metric("10th percentile", format!("₹{p10:.0}")),
                metric("90th percentile", format!("₹{p90:.0}")),
            ],
            recommendations,
        },
    })
}

/// Deterministic projection with milestone values at ages 40, 50 and 60.
pub fn project_portfolio(
    inputs: &ProjectionInputs,
    assumptions: &MarketAssumptions,
) -> PlanResult<IntentionResponse> {
    let projection = project_deterministic(inputs, assumptions)?;
    let timeline = &projection.result.timeline;

    let mut metrics = Vec::new();
    for milestone in [40u32, 50, 60] {
        if let Some(year) = timeline.iter().find(|y| y.age == milestone) {
            metrics.push(metric(
                &format!("Portfolio at {milestone}"),
                rupees(year.portfolio_value),
            ));
        }
    }
    metrics.push(metric(
        "Final portfolio value",
        rupees(projection.result.summary.final_portfolio_value),
    ));

    Ok(IntentionResponse {
        steps: vec![
            step("Loading market assumptions", 120),
            step("Projecting portfolio growth", 520),
            step("Extracting milestone values", 180),
        ],
        report: IntentionReport {
            headline: "Projected portfolio trajectory".to_string(),
            metrics,
            recommendations: vec![],
        },
    })
}

/// Goal funding against a monthly budget.
pub fn fund_goals(
    goals: &[Goal],
    monthly_budget: Money,
    current_year: i32,
    assumptions: &MarketAssumptions,
) -> PlanResult<IntentionResponse> {
    let allocation = allocate_goal_budget(goals, monthly_budget, current_year, assumptions)?;
    let result = &allocation.result;

    let mut metrics = vec![
        metric("Budget allocated", rupees(result.total_monthly)),
        metric("Unallocated", rupees(result.unallocated)),
        metric(
            "Budget utilization",
            format!("{}%", result.budget_utilization.round_dp(1)),
        ),
    ];
    for alloc in &result.allocations {
        metrics.push(metric(
            &alloc.name,
            format!("{} per month", rupees(alloc.monthly_sip)),
        ));
    }

    let mut recommendations = result.recommendations.clone();
    recommendations.extend(result.conflicts.iter().cloned());

    Ok(IntentionResponse {
        steps: vec![
            step("Sizing each goal's required SIP", 340),
            step("Allocating budget by priority", 220),
        ],
        report: IntentionReport {
            headline: format!(
                "{} of {} goals fully funded",
                result
                    .allocations
                    .iter()
                    .filter(|a| a.monthly_sip == a.required_sip)
                    .count(),
                result.allocations.len()
            ),
            metrics,
            recommendations,
        },
    })
}

/// Rebalancing check against a target allocation.
pub fn rebalance_portfolio(
    holdings: &BTreeMap<AssetId, Money>,
    target_allocation: &BTreeMap<AssetId, Percent>,
    assumptions: &MarketAssumptions,
    config: &RebalancingConfig,
) -> PlanResult<IntentionResponse> {
    let rebalancing = generate_rebalancing_trades(holdings, target_allocation, assumptions, config)?;
    let result = &rebalancing.result;

    let headline = if result.needs_rebalancing {
        format!(
            "Drift of {}pp exceeds the {}pp threshold",
            result.max_drift.round_dp(1),
            config.drift_threshold
        )
    } else {
        "Portfolio is within its drift tolerance".to_string()
    };

    let mut metrics = vec![metric("Max drift", format!("{}pp", result.max_drift.round_dp(2)))];
    for trade in &result.trades {
        metrics.push(metric(
            &format!("{:?} {}", trade.side, trade.asset),
            rupees(trade.amount),
        ));
    }
    if result.needs_rebalancing {
        metrics.push(metric("Estimated cost", rupees(result.estimated_cost)));
        metrics.push(metric(
            "Return impact",
            format!("{}bps", result.impact_on_return_bps.round_dp(2)),
        ));
    }

    let recommendations = if result.needs_rebalancing {
        vec![format!(
            "Execute {} trades to restore the target allocation",
            result.trades.len()
        )]
    } else {
        vec![]
    };

    Ok(IntentionResponse {
        steps: vec![
            step("Measuring allocation drift", 240),
            step("Sizing rebalancing trades", 310),
        ],
        report: IntentionReport {
            headline,
            metrics,
            recommendations,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumptions::{registry, Region};
    use crate::goals::GoalPriority;
    use rust_decimal_macros::dec;

    fn assumptions() -> &'static MarketAssumptions {
        registry::get(Region::In, "2024-Q4").unwrap()
    }

    fn baseline() -> ProjectionInputs {
        ProjectionInputs {
            current_age: 30,
            retirement_age: 60,
            life_expectancy: 85,
            current_savings: dec!(1_000_000),
            monthly_investment: dec!(25_000),
            monthly_expenses: dec!(50_000),
            investment_growth_rate: None,
            expense_growth_rate: None,
            asset_allocation: BTreeMap::from([
                (AssetId::Equity, dec!(70)),
                (AssetId::Debt, dec!(30)),
            ]),
            future_expenses: vec![],
        }
    }

    #[test]
    fn test_optimize_retirement_reports_corpus_metrics() {
        let response = optimize_retirement(&baseline(), assumptions()).unwrap();
        assert!(!response.steps.is_empty());
        assert_eq!(response.report.metrics.len(), 3);
        assert!(response
            .report
            .metrics
            .iter()
            .any(|m| m.label == "Corpus needed"));
    }

    #[test]
    fn test_depleting_plan_recommends_higher_savings() {
        let mut inputs = baseline();
        inputs.current_savings = dec!(100_000);
        inputs.monthly_investment = dec!(5_000);
        let response = optimize_retirement(&inputs, assumptions()).unwrap();
        assert!(response.report.headline.contains("depletes"));
        assert!(!response.report.recommendations.is_empty());
    }

    #[test]
    fn test_monte_carlo_reports_percentile_band() {
        let response = analyze_monte_carlo(&baseline(), assumptions()).unwrap();
        let labels: Vec<&str> = response
            .report
            .metrics
            .iter()
            .map(|m| m.label.as_str())
            .collect();
        assert!(labels.contains(&"Success probability"));
        assert!(labels.contains(&"10th percentile"));
        assert!(labels.contains(&"90th percentile"));
    }

    #[test]
    fn test_monte_carlo_low_success_recommends_sip_raise() {
        let mut inputs = baseline();
        inputs.current_savings = dec!(100_000);
        inputs.monthly_investment = dec!(2_000);
        let response = analyze_monte_carlo(&inputs, assumptions()).unwrap();
        assert!(!response.report.recommendations.is_empty());
    }

    #[test]
    fn test_project_portfolio_has_milestones() {
        let response = project_portfolio(&baseline(), assumptions()).unwrap();
        let labels: Vec<&str> = response
            .report
            .metrics
            .iter()
            .map(|m| m.label.as_str())
            .collect();
        assert!(labels.contains(&"Portfolio at 40"));
        assert!(labels.contains(&"Portfolio at 50"));
        assert!(labels.contains(&"Portfolio at 60"));
    }

    #[test]
    fn test_milestones_outside_horizon_are_skipped() {
        let mut inputs = baseline();
        inputs.current_age = 45;
        let response = project_portfolio(&inputs, assumptions()).unwrap();
        let labels: Vec<&str> = response
            .report
            .metrics
            .iter()
            .map(|m| m.label.as_str())
            .collect();
        assert!(!labels.contains(&"Portfolio at 40"));
        assert!(labels.contains(&"Portfolio at 50"));
    }

    #[test]
    fn test_fund_goals_passthrough() {
        let goals = vec![Goal {
            id: "education".to_string(),
            name: "Education".to_string(),
            target_amount: dec!(1_500_000),
            target_year: 2035,
            priority: GoalPriority::High,
            current_savings: Decimal::ZERO,
        }];
        let response = fund_goals(&goals, dec!(40_000), 2025, assumptions()).unwrap();
        assert!(response.report.headline.contains("fully funded"));
        assert!(response
            .report
            .metrics
            .iter()
            .any(|m| m.label == "Education"));
    }

    #[test]
    fn test_rebalance_portfolio_passthrough() {
        let holdings = BTreeMap::from([
            (AssetId::Equity, dec!(850_000)),
            (AssetId::Debt, dec!(150_000)),
        ]);
        let target = BTreeMap::from([(AssetId::Equity, dec!(70)), (AssetId::Debt, dec!(30))]);
        let response = rebalance_portfolio(
            &holdings,
            &target,
            assumptions(),
            &RebalancingConfig::default(),
        )
        .unwrap();
        assert!(response.report.headline.contains("threshold"));
        assert!(!response.report.recommendations.is_empty());
    }

    #[test]
    fn test_steps_are_fixed_constants() {
        let a = optimize_retirement(&baseline(), assumptions()).unwrap();
        let b = optimize_retirement(&baseline(), assumptions()).unwrap();
        let durations_a: Vec<u32> = a.steps.iter().map(|s| s.duration_ms).collect();
        let durations_b: Vec<u32> = b.steps.iter().map(|s| s.duration_ms).collect();
        assert_eq!(durations_a, durations_b);
    }
}
