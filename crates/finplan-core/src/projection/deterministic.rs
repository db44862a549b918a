use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Instant;

use crate::assumptions::MarketAssumptions;
use crate::projection::inputs::{
    ProjectionInputs, ProjectionResult, ProjectionSummary, SuccessMetric, YearlyProjection,
};
use crate::time_value::{compound, nominal_to_real, present_value_annuity};
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::PlanResult;

/// Project a single expected-value cashflow timeline from the current age to
/// life expectancy.
///
/// The yearly walk applies the allocation-weighted expected nominal return to
/// the start-of-year portfolio, adds inflation-grown contributions until
/// retirement, withdraws inflation-grown expenses afterwards, and clamps the
/// portfolio at zero. The timeline ends at life expectancy or at the first
/// post-retirement year the portfolio is exhausted.
pub fn project_deterministic(
    inputs: &ProjectionInputs,
    assumptions: &MarketAssumptions,
) -> PlanResult<ComputationOutput<ProjectionResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    inputs.validate(assumptions)?;

    let inflation = assumptions.inflation.mean_fraction();
    let expense_growth = inputs.expense_growth_rate.unwrap_or(inflation);
    let investment_growth = inputs
        .investment_growth_rate
        .unwrap_or(inflation + dec!(0.01));
    let portfolio_return = inputs.portfolio_nominal_return(assumptions);

    let annual_expenses_today = inputs.monthly_expenses * dec!(12);
    let annual_investment_today = inputs.monthly_investment * dec!(12);

    let horizon = inputs.horizon_years();
    let mut portfolio = inputs.current_savings;
    let mut timeline: Vec<YearlyProjection> = Vec::with_capacity(horizon as usize);
    let mut depletion_age: Option<u32> = None;

    for t in 0..horizon {
        let age = inputs.current_age + t;
        let is_retired = age >= inputs.retirement_age;

        let mut expenses = annual_expenses_today * compound(expense_growth, t);
        for planned in &inputs.future_expenses {
            if planned.year_offset == t {
                expenses += planned.amount * compound(inflation, t);
            }
        }

        let contributions = if is_retired {
            Decimal::ZERO
        } else {
            annual_investment_today * compound(investment_growth, t)
        };
        let withdrawals = if is_retired { expenses } else { Decimal::ZERO };

        let investment_return = portfolio * portfolio_return;
        let before_withdrawal = portfolio + investment_return + contributions;
        portfolio = (before_withdrawal - withdrawals).max(Decimal::ZERO);

        let withdrawal_rate = if withdrawals > Decimal::ZERO && before_withdrawal > Decimal::ZERO
        {
            Some(withdrawals / before_withdrawal)
        } else {
            None
        };

        timeline.push(YearlyProjection {
            year_offset: t,
            age,
            portfolio_value: portfolio,
            income: Decimal::ZERO,
            expenses,
            net_cashflow: contributions - withdrawals,
            contributions,
            withdrawals,
            investment_return,
            real_return: investment_return / compound(inflation, t),
            withdrawal_rate,
        });

        if portfolio.is_zero() && is_retired {
            depletion_age = Some(age);
            break;
        }
    }

    let summary = summarize(
        inputs,
        &timeline,
        depletion_age,
        portfolio_return,
        inflation,
        expense_growth,
    )?;

    if let Some(age) = depletion_age {
        warnings.push(format!(
            "Portfolio depletes at age {age}, {} years before life expectancy",
            inputs.life_expectancy - age
        ));
    }

    let output = ProjectionResult {
        timeline,
        summary,
        assumption_version: assumptions.version.clone(),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Deterministic Cashflow Projection (expected-value, annual steps)",
        &serde_json::json!({
            "assumption_version": assumptions.version,
            "region": assumptions.region.to_string(),
            "portfolio_nominal_return": portfolio_return.to_string(),
            "inflation": inflation.to_string(),
            "expense_growth": expense_growth.to_string(),
            "investment_growth": investment_growth.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

fn summarize(
    inputs: &ProjectionInputs,
    timeline: &[YearlyProjection],
    depletion_age: Option<u32>,
    portfolio_return: Decimal,
    inflation: Decimal,
    expense_growth: Decimal,
) -> PlanResult<ProjectionSummary> {
    let years_to_retirement = inputs.retirement_age - inputs.current_age;
    let retirement_years = inputs.life_expectancy - inputs.retirement_age;

    // Annual expenses in the first retirement year, at then-current prices.
    let retirement_year_expenses =
        inputs.monthly_expenses * dec!(12) * compound(expense_growth, years_to_retirement);

    let real_return = nominal_to_real(portfolio_return, inflation)?;
    let retirement_corpus_needed =
        present_value_annuity(retirement_year_expenses, real_return, retirement_years)?;

    let projected_corpus_at_retirement: Money = timeline
        .iter()
        .find(|y| y.age == inputs.retirement_age)
        .map(|y| y.portfolio_value)
        .unwrap_or_default();

    let final_portfolio_value = timeline
        .last()
        .map(|y| y.portfolio_value)
        .unwrap_or_default();

    let success_metric = if depletion_age.is_some() {
        SuccessMetric::Depletion
    } else if projected_corpus_at_retirement > retirement_corpus_needed {
        SuccessMetric::Surplus
    } else if retirement_corpus_needed.is_zero() {
        SuccessMetric::OnTrack
    } else {
        let relative_shortfall = (retirement_corpus_needed - projected_corpus_at_retirement)
            / retirement_corpus_needed;
        if relative_shortfall <= dec!(0.10) {
            SuccessMetric::OnTrack
        } else {
            SuccessMetric::Shortfall
        }
    };

    Ok(ProjectionSummary {
        retirement_corpus_needed,
        projected_corpus_at_retirement,
        final_portfolio_value,
        depletion_age,
        success_metric,
    })
}
