use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::assumptions::MarketAssumptions;
use crate::error::PlanningError;
use crate::time_value::{
    compound, future_value_annuity, required_payment, AnnuityTiming, PaymentFrequency,
};
use crate::types::{with_metadata, ComputationOutput, Money, Percent, Rate};
use crate::PlanResult;

/// Fixed annual planning return for goal SIP sizing. Deliberately decoupled
/// from the portfolio allocation so required SIPs are comparable across
/// users; a configuration constant rather than inline magic.
pub const GOAL_PLANNING_RETURN: Rate = dec!(0.10);

/// Funding priority. Ordering is the allocation order: High before Medium
/// before Low.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum GoalPriority {
    High,
    Medium,
    Low,
}

/// A savings goal, target stated in today's money.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub name: String,
    pub target_amount: Money,
    /// Calendar year, strictly in the future.
    pub target_year: i32,
    pub priority: GoalPriority,
    #[serde(default)]
    pub current_savings: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GoalFeasibility {
    OnTrack,
    Tight,
    Underfunded,
    Impossible,
}

/// Funding decision for one goal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalAllocation {
    pub goal_id: String,
    pub name: String,
    /// Monthly SIP granted from the budget.
    pub monthly_sip: Money,
    /// Monthly SIP needed for full funding.
    pub required_sip: Money,
    pub feasibility: GoalFeasibility,
    /// Value at the target year from the granted SIP plus grown savings.
    pub projected_value: Money,
    pub shortfall: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalAllocationResult {
    pub allocations: Vec<GoalAllocation>,
    pub total_monthly: Money,
    pub unallocated: Money,
    pub budget_utilization: Percent,
    pub conflicts: Vec<String>,
    pub recommendations: Vec<String>,
    pub assumption_version: String,
}

struct SizedGoal<'a> {
    goal: &'a Goal,
    years: u32,
    inflated_target: Money,
    grown_savings: Money,
    required_sip: Money,
}

/// Distribute a monthly budget across goals by priority, classifying each
/// goal's feasibility. Ties on priority go to the nearer target year.
pub fn allocate_goal_budget(
    goals: &[Goal],
    monthly_budget: Money,
    current_year: i32,
    assumptions: &MarketAssumptions,
) -> PlanResult<ComputationOutput<GoalAllocationResult>> {
    let start = Instant::now();
    let warnings: Vec<String> = Vec::new();

    if monthly_budget < Decimal::ZERO {
        return Err(PlanningError::InvalidInput {
            field: "monthly_budget".into(),
            reason: format!("must be non-negative, got {monthly_budget}"),
        });
    }

    let inflation = assumptions.inflation.mean_fraction();
    let mut sized: Vec<SizedGoal<'_>> = Vec::with_capacity(goals.len());

    for goal in goals {
        if goal.target_amount < Decimal::ZERO {
            return Err(PlanningError::InvalidInput {
                field: "target_amount".into(),
                reason: format!("goal \"{}\" must be non-negative", goal.id),
            });
        }
        if goal.current_savings < Decimal::ZERO {
            return Err(PlanningError::InvalidInput {
                field: "current_savings".into(),
                reason: format!("goal \"{}\" must be non-negative", goal.id),
            });
        }
        let years_i = goal.target_year - current_year;
        if years_i <= 0 {
            return Err(PlanningError::InvalidInput {
                field: "target_year".into(),
                reason: format!(
                    "goal \"{}\" must be after the current year {current_year}, got {}",
                    goal.id, goal.target_year
                ),
            });
        }
        let years = years_i as u32;

        let inflated_target = goal.target_amount * compound(inflation, years);
        let grown_savings = goal.current_savings * compound(GOAL_PLANNING_RETURN, years);
        let remaining_need = (inflated_target - grown_savings).max(Decimal::ZERO);
        let required_sip = if remaining_need.is_zero() {
            Decimal::ZERO
        } else {
            required_payment(
                remaining_need,
                GOAL_PLANNING_RETURN,
                years,
                PaymentFrequency::Monthly,
            )?
        };

        sized.push(SizedGoal {
            goal,
            years,
            inflated_target,
            grown_savings,
            required_sip,
        });
    }

    // High before medium before low; within a priority, shorter timelines
    // first (greater urgency).
    sized.sort_by(|a, b| {
        a.goal
            .priority
            .cmp(&b.goal.priority)
            .then(a.years.cmp(&b.years))
    });

    let mut remaining = monthly_budget;
    let mut allocations: Vec<GoalAllocation> = Vec::with_capacity(sized.len());
    let mut conflicts: Vec<String> = Vec::new();

    for sg in &sized {
        let (granted, feasibility) = if remaining >= sg.required_sip {
            (sg.required_sip, GoalFeasibility::OnTrack)
        } else if remaining > Decimal::ZERO {
            let granted = remaining;
            let ratio = granted / sg.required_sip;
            let feasibility = if ratio > dec!(0.70) {
                GoalFeasibility::Tight
            } else {
                GoalFeasibility::Underfunded
            };
            conflicts.push(format!(
                "\"{}\" is partially funded: needs {} per month, granted {}",
                sg.goal.name,
                sg.required_sip.round_dp(0),
                granted.round_dp(0)
            ));
            (granted, feasibility)
        } else {
            conflicts.push(format!(
                "\"{}\" cannot be funded: needs {} per month, budget exhausted",
                sg.goal.name,
                sg.required_sip.round_dp(0)
            ));
            (Decimal::ZERO, GoalFeasibility::Impossible)
        };
        remaining -= granted;

        let sip_growth = if granted.is_zero() {
            Decimal::ZERO
        } else {
            future_value_annuity(
                granted,
                GOAL_PLANNING_RETURN / dec!(12),
                sg.years * 12,
                AnnuityTiming::Due,
            )?
        };
        let projected_value = sip_growth + sg.grown_savings;
        let shortfall = (sg.inflated_target - projected_value).max(Decimal::ZERO);

        allocations.push(GoalAllocation {
            goal_id: sg.goal.id.clone(),
            name: sg.goal.name.clone(),
            monthly_sip: granted,
            required_sip: sg.required_sip,
            feasibility,
            projected_value,
            shortfall,
        });
    }

    let total_monthly = monthly_budget - remaining;
    let budget_utilization = if monthly_budget.is_zero() {
        Decimal::ZERO
    } else {
        dec!(100) * total_monthly / monthly_budget
    };

    let mut recommendations: Vec<String> = Vec::new();
    let total_required: Decimal = sized.iter().map(|g| g.required_sip).sum();
    if total_required > monthly_budget {
        recommendations.push(format!(
            "Increase the monthly budget by {} to fully fund every goal, or defer underfunded goals",
            (total_required - monthly_budget).round_dp(0)
        ));
    }
    if remaining > Decimal::ZERO {
        recommendations.push(format!(
            "{} per month remains unallocated and could accelerate existing goals",
            remaining.round_dp(0)
        ));
    }

    let output = GoalAllocationResult {
        allocations,
        total_monthly,
        unallocated: remaining,
        budget_utilization,
        conflicts,
        recommendations,
        assumption_version: assumptions.version.clone(),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Priority-Greedy Goal Funding (annuity-due SIP sizing at fixed planning return)",
        &serde_json::json!({
            "assumption_version": assumptions.version,
            "planning_return": GOAL_PLANNING_RETURN.to_string(),
            "inflation": inflation.to_string(),
            "current_year": current_year,
            "goal_count": goals.len(),
        }),
        warnings,
        elapsed,
        output,
    ))
}
