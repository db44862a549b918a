use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::assumptions::{AssetId, MarketAssumptions};
use crate::error::PlanningError;
use crate::types::{Money, Percent, Rate};
use crate::PlanResult;

/// A one-time future outflow, stated in today's money.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedExpense {
    pub year_offset: u32,
    pub amount: Money,
    pub label: String,
}

/// Household inputs for a cashflow projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionInputs {
    pub current_age: u32,
    pub retirement_age: u32,
    pub life_expectancy: u32,
    pub current_savings: Money,
    pub monthly_investment: Money,
    /// Stated in today's money; inflated over the horizon.
    pub monthly_expenses: Money,
    /// Annualized fraction. Defaults to inflation mean + 1pp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub investment_growth_rate: Option<Rate>,
    /// Annualized fraction. Defaults to the inflation mean.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expense_growth_rate: Option<Rate>,
    /// Percent weights per asset, summing to 100.
    pub asset_allocation: BTreeMap<AssetId, Percent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub future_expenses: Vec<PlannedExpense>,
}

impl ProjectionInputs {
    /// Validate every documented invariant against the loaded assumptions.
    /// Errors carry the offending field name for UI highlighting.
    pub fn validate(&self, assumptions: &MarketAssumptions) -> PlanResult<()> {
        if !(18..=100).contains(&self.current_age) {
            return Err(PlanningError::InvalidInput {
                field: "current_age".into(),
                reason: format!("must be between 18 and 100, got {}", self.current_age),
            });
        }
        if self.retirement_age <= self.current_age {
            return Err(PlanningError::InvalidInput {
                field: "retirement_age".into(),
                reason: format!(
                    "must be greater than current_age ({}), got {}",
                    self.current_age, self.retirement_age
                ),
            });
        }
        if self.life_expectancy <= self.retirement_age {
            return Err(PlanningError::InvalidInput {
                field: "life_expectancy".into(),
                reason: format!(
                    "must be greater than retirement_age ({}), got {}",
                    self.retirement_age, self.life_expectancy
                ),
            });
        }
        for (field, value) in [
            ("current_savings", self.current_savings),
            ("monthly_investment", self.monthly_investment),
            ("monthly_expenses", self.monthly_expenses),
        ] {
            if value < Decimal::ZERO {
                return Err(PlanningError::InvalidInput {
                    field: field.into(),
                    reason: format!("must be non-negative, got {value}"),
                });
            }
        }
        for planned in &self.future_expenses {
            if planned.amount < Decimal::ZERO {
                return Err(PlanningError::InvalidInput {
                    field: "future_expenses".into(),
                    reason: format!(
                        "amount for \"{}\" must be non-negative, got {}",
                        planned.label, planned.amount
                    ),
                });
            }
        }
        if self.asset_allocation.is_empty() {
            return Err(PlanningError::InvalidInput {
                field: "asset_allocation".into(),
                reason: "at least one asset weight is required".into(),
            });
        }
        let mut weight_sum = Decimal::ZERO;
        for (asset, weight) in &self.asset_allocation {
            if *weight < Decimal::ZERO || *weight > dec!(100) {
                return Err(PlanningError::InvalidInput {
                    field: "asset_allocation".into(),
                    reason: format!("weight for {asset} must be in [0, 100], got {weight}"),
                });
            }
            if assumptions.asset(*asset).is_none() {
                return Err(PlanningError::InvalidInput {
                    field: "asset_allocation".into(),
                    reason: format!(
                        "asset {asset} is not in assumption set {}",
                        assumptions.version
                    ),
                });
            }
            weight_sum += *weight;
        }
        if (weight_sum - dec!(100)).abs() > dec!(0.01) {
            return Err(PlanningError::InvalidInput {
                field: "asset_allocation".into(),
                reason: format!("weights must sum to 100%, got {weight_sum}"),
            });
        }
        Ok(())
    }

    /// Projection horizon in years.
    pub fn horizon_years(&self) -> u32 {
        self.life_expectancy - self.current_age
    }

    /// Allocation-weighted expected nominal portfolio return, as a fraction.
    pub fn portfolio_nominal_return(&self, assumptions: &MarketAssumptions) -> Rate {
        self.asset_allocation
            .iter()
            .filter_map(|(asset, weight)| {
                assumptions
                    .asset(*asset)
                    .map(|a| weight / dec!(100) * a.nominal.mean_fraction())
            })
            .sum()
    }
}

/// One year of a projected timeline. `income` is reserved for a future
/// earned-income model and is always zero today.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearlyProjection {
    pub year_offset: u32,
    pub age: u32,
    /// End-of-year portfolio value.
    pub portfolio_value: Money,
    pub income: Money,
    /// Nominal, inflation-adjusted annual expenses.
    pub expenses: Money,
    /// Contributions minus withdrawals.
    pub net_cashflow: Money,
    pub contributions: Money,
    pub withdrawals: Money,
    /// Nominal return on the start-of-year portfolio, in currency.
    pub investment_return: Money,
    /// Investment return deflated by cumulative inflation.
    pub real_return: Money,
    /// Withdrawal divided by the portfolio it was taken from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withdrawal_rate: Option<Decimal>,
}

/// Outcome classification for a deterministic projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuccessMetric {
    Surplus,
    OnTrack,
    Shortfall,
    Depletion,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionSummary {
    /// Present value, at retirement, of the post-retirement expense stream
    /// discounted at the portfolio's real return.
    pub retirement_corpus_needed: Money,
    pub projected_corpus_at_retirement: Money,
    pub final_portfolio_value: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depletion_age: Option<u32>,
    pub success_metric: SuccessMetric,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionResult {
    pub timeline: Vec<YearlyProjection>,
    pub summary: ProjectionSummary,
    /// Assumption bundle version used, for audit and reproducibility.
    pub assumption_version: String,
}
