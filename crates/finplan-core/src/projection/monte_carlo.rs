//! Stochastic outcome simulation over N independently seeded paths.
//!
//! Asset returns are sampled independently per asset and per year; the
//! bundle's correlation matrix is deliberately not consulted (a Cholesky
//! based correlated sampler is a future extension, and applying correlation
//! silently would invalidate every calibrated success probability). Paths use
//! f64 arithmetic, matching the engine's precision split between
//! deterministic money math and simulation.

use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::assumptions::MarketAssumptions;
use crate::error::PlanningError;
use crate::projection::inputs::ProjectionInputs;
use crate::rng::SeededRng;
use crate::stats;
use crate::types::{with_metadata_f64, ComputationOutput};
use crate::PlanResult;

pub const DEFAULT_NUM_SIMULATIONS: u32 = 1_000;
pub const DEFAULT_SEED: u64 = 42;

/// Timeline granularity. Only annual steps are implemented; monthly is part
/// of the configuration contract for a future extension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeStep {
    #[default]
    Annual,
    Monthly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    #[serde(default = "default_num_simulations")]
    pub num_simulations: u32,
    /// Base seed; path i uses seed + i.
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub time_step: TimeStep,
}

fn default_num_simulations() -> u32 {
    DEFAULT_NUM_SIMULATIONS
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        MonteCarloConfig {
            num_simulations: DEFAULT_NUM_SIMULATIONS,
            seed: DEFAULT_SEED,
            time_step: TimeStep::Annual,
        }
    }
}

/// One simulated year of one path. Mirrors the deterministic timeline record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedYear {
    pub year_offset: u32,
    pub age: u32,
    pub portfolio_value: f64,
    pub income: f64,
    pub expenses: f64,
    pub net_cashflow: f64,
    pub contributions: f64,
    pub withdrawals: f64,
    pub investment_return: f64,
    pub real_return: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withdrawal_rate: Option<f64>,
}

/// The full trajectory whose terminal value sits at a given percentile rank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PercentilePath {
    pub percentile: u8,
    /// Original path index, so the trajectory can be re-derived from
    /// seed + path_index alone.
    pub path_index: usize,
    pub seed: u64,
    pub terminal_value: f64,
    pub timeline: Vec<SimulatedYear>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalDistribution {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    /// Terminal value of every path, sorted ascending.
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortfallRisk {
    /// Probability of depletion; exact complement of the success probability.
    pub probability: f64,
    /// Mean unmet-expense magnitude at the depletion year, over failed paths.
    pub average_shortfall: f64,
    /// Smallest terminal value across all paths.
    pub worst_case: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloResult {
    pub num_simulations: u32,
    pub seed: u64,
    /// Fraction of paths whose terminal portfolio value is positive.
    pub success_probability: f64,
    pub median_outcome: f64,
    pub percentile_paths: Vec<PercentilePath>,
    pub terminal_distribution: TerminalDistribution,
    pub shortfall_risk: ShortfallRisk,
    pub assumption_version: String,
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// Plan parameters flattened to f64 for the path walk. Assets are kept in
/// sorted id order so the per-year sampling sequence is fixed.
struct PathParams {
    current_age: u32,
    retirement_age: u32,
    horizon: u32,
    starting_portfolio: f64,
    annual_expenses: f64,
    annual_investment: f64,
    inflation: f64,
    expense_growth: f64,
    investment_growth: f64,
    /// (weight fraction, nominal mean fraction, nominal volatility fraction)
    assets: Vec<(f64, f64, f64)>,
    /// (year_offset, amount in today's money)
    planned_expenses: Vec<(u32, f64)>,
}

struct SimulatedPath {
    index: usize,
    seed: u64,
    terminal_value: f64,
    depletion_shortfall: f64,
    timeline: Vec<SimulatedYear>,
}

fn to_f64(value: rust_decimal::Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

fn build_params(inputs: &ProjectionInputs, assumptions: &MarketAssumptions) -> PathParams {
    // BTreeMap iteration is sorted by AssetId, fixing the sampling order.
    let assets = inputs
        .asset_allocation
        .iter()
        .filter_map(|(asset, weight)| {
            assumptions.asset(*asset).map(|a| {
                (
                    to_f64(*weight) / 100.0,
                    to_f64(a.nominal.mean_fraction()),
                    to_f64(a.nominal.volatility_fraction()),
                )
            })
        })
        .collect();

    let inflation = to_f64(assumptions.inflation.mean_fraction());
    let expense_growth = inputs
        .expense_growth_rate
        .map(to_f64)
        .unwrap_or(inflation);
    let investment_growth = inputs
        .investment_growth_rate
        .map(to_f64)
        .unwrap_or(inflation + 0.01);

    PathParams {
        current_age: inputs.current_age,
        retirement_age: inputs.retirement_age,
        horizon: inputs.horizon_years(),
        starting_portfolio: to_f64(inputs.current_savings),
        annual_expenses: to_f64(inputs.monthly_expenses) * 12.0,
        annual_investment: to_f64(inputs.monthly_investment) * 12.0,
        inflation,
        expense_growth,
        investment_growth,
        assets,
        planned_expenses: inputs
            .future_expenses
            .iter()
            .map(|e| (e.year_offset, to_f64(e.amount)))
            .collect(),
    }
}

fn simulate_path(index: usize, seed: u64, params: &PathParams) -> SimulatedPath {
    let mut rng = SeededRng::new(seed);
    let mut portfolio = params.starting_portfolio;
    let mut timeline = Vec::with_capacity(params.horizon as usize);
    let mut depletion_shortfall = 0.0;

    for t in 0..params.horizon {
        let age = params.current_age + t;
        let is_retired = age >= params.retirement_age;

        let mut expenses =
            params.annual_expenses * (1.0 + params.expense_growth).powi(t as i32);
        for (offset, amount) in &params.planned_expenses {
            if *offset == t {
                expenses += amount * (1.0 + params.inflation).powi(t as i32);
            }
        }

        let contributions = if is_retired {
            0.0
        } else {
            params.annual_investment * (1.0 + params.investment_growth).powi(t as i32)
        };
        let withdrawals = if is_retired { expenses } else { 0.0 };

        // One draw per asset, in sorted asset-id order.
        let year_return: f64 = params
            .assets
            .iter()
            .map(|(weight, mean, vol)| weight * rng.next_gaussian(*mean, *vol))
            .sum();

        let investment_return = portfolio * year_return;
        let before_withdrawal = portfolio + investment_return + contributions;
        let mut end = before_withdrawal - withdrawals;
        if end < 0.0 {
            if is_retired && depletion_shortfall == 0.0 {
                depletion_shortfall = -end;
            }
            end = 0.0;
        }
        portfolio = end;

        let withdrawal_rate = if withdrawals > 0.0 && before_withdrawal > 0.0 {
            Some(withdrawals / before_withdrawal)
        } else {
            None
        };

        timeline.push(SimulatedYear {
            year_offset: t,
            age,
            portfolio_value: portfolio,
            income: 0.0,
            expenses,
            net_cashflow: contributions - withdrawals,
            contributions,
            withdrawals,
            investment_return,
            real_return: investment_return / (1.0 + params.inflation).powi(t as i32),
            withdrawal_rate,
        });

        if portfolio == 0.0 && is_retired {
            break;
        }
    }

    let terminal_value = timeline.last().map(|y| y.portfolio_value).unwrap_or(0.0);
    SimulatedPath {
        index,
        seed,
        terminal_value,
        depletion_shortfall,
        timeline,
    }
}

/// Run the full Monte Carlo simulation.
///
/// For a fixed (inputs, assumptions, config) the result is bit-identical
/// across runs and platforms: every path derives from seed + path_index, and
/// aggregation sorts by terminal value (ties broken by path index), so the
/// outcome does not depend on execution order.
pub fn run_monte_carlo(
    inputs: &ProjectionInputs,
    assumptions: &MarketAssumptions,
    config: &MonteCarloConfig,
) -> PlanResult<ComputationOutput<MonteCarloResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    inputs.validate(assumptions)?;
    if config.num_simulations == 0 {
        return Err(PlanningError::InvalidInput {
            field: "num_simulations".into(),
            reason: "must be positive".into(),
        });
    }
    if config.time_step == TimeStep::Monthly {
        return Err(PlanningError::Unsupported {
            feature: "monthly time step (annual only)".into(),
        });
    }
    if config.num_simulations < 100 {
        warnings.push(format!(
            "{} simulations may give unstable percentile estimates; 1000 or more recommended",
            config.num_simulations
        ));
    }

    let params = build_params(inputs, assumptions);
    let n = config.num_simulations as usize;

    let mut paths: Vec<SimulatedPath> = (0..n)
        .map(|i| simulate_path(i, config.seed + i as u64, &params))
        .collect();

    // Ascending by terminal value; ties broken by path index so the sort is
    // total and the result independent of scheduling.
    paths.sort_by(|a, b| {
        a.terminal_value
            .partial_cmp(&b.terminal_value)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.index.cmp(&b.index))
    });

    let terminal_values: Vec<f64> = paths.iter().map(|p| p.terminal_value).collect();
    let successes = terminal_values.iter().filter(|v| **v > 0.0).count();
    let success_probability = successes as f64 / n as f64;

    let failed: Vec<&SimulatedPath> = paths.iter().filter(|p| p.terminal_value <= 0.0).collect();
    let average_shortfall = if failed.is_empty() {
        0.0
    } else {
        failed.iter().map(|p| p.depletion_shortfall.abs()).sum::<f64>() / failed.len() as f64
    };

    let percentile_paths = [10u8, 25, 50, 75, 90]
        .iter()
        .map(|p| {
            let idx = ((n as f64 * *p as f64 / 100.0).floor() as usize).min(n - 1);
            let path = &paths[idx];
            PercentilePath {
                percentile: *p,
                path_index: path.index,
                seed: path.seed,
                terminal_value: path.terminal_value,
                timeline: path.timeline.clone(),
            }
        })
        .collect();

    let output = MonteCarloResult {
        num_simulations: config.num_simulations,
        seed: config.seed,
        success_probability,
        median_outcome: stats::median(&terminal_values),
        percentile_paths,
        terminal_distribution: TerminalDistribution {
            mean: stats::mean(&terminal_values),
            median: stats::median(&terminal_values),
            std_dev: stats::std_dev(&terminal_values),
            values: terminal_values,
        },
        shortfall_risk: ShortfallRisk {
            probability: 1.0 - success_probability,
            average_shortfall,
            worst_case: paths[0].terminal_value,
        },
        assumption_version: assumptions.version.clone(),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata_f64(
        "Monte Carlo Retirement Simulation (stationary GBM, independent per-asset sampling)",
        &serde_json::json!({
            "assumption_version": assumptions.version,
            "region": assumptions.region.to_string(),
            "num_simulations": config.num_simulations,
            "seed": config.seed,
            "time_step": "annual",
            "correlation": "not applied; assets sampled independently",
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumptions::{registry, AssetId, Region};
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

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

    fn config(n: u32, seed: u64) -> MonteCarloConfig {
        MonteCarloConfig {
            num_simulations: n,
            seed,
            time_step: TimeStep::Annual,
        }
    }

    #[test]
    fn test_path_count_and_sorted_terminals() {
        let result = run_monte_carlo(&baseline(), assumptions(), &config(200, 42)).unwrap();
        let values = &result.result.terminal_distribution.values;
        assert_eq!(values.len(), 200);
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_success_and_shortfall_are_exact_complements() {
        let result = run_monte_carlo(&baseline(), assumptions(), &config(250, 7)).unwrap();
        let r = &result.result;
        assert_eq!(
            r.success_probability + r.shortfall_risk.probability,
            1.0
        );
    }

    #[test]
    fn test_percentile_paths_are_monotonic() {
        let result = run_monte_carlo(&baseline(), assumptions(), &config(500, 42)).unwrap();
        let paths = &result.result.percentile_paths;
        assert_eq!(paths.len(), 5);
        for w in paths.windows(2) {
            assert!(w[0].terminal_value <= w[1].terminal_value);
            assert!(w[0].percentile < w[1].percentile);
        }
    }

    #[test]
    fn test_percentile_paths_carry_full_timelines() {
        let result = run_monte_carlo(&baseline(), assumptions(), &config(100, 42)).unwrap();
        for path in &result.result.percentile_paths {
            assert!(!path.timeline.is_empty());
            for (i, year) in path.timeline.iter().enumerate() {
                assert_eq!(year.year_offset, i as u32);
            }
            let last = path.timeline.last().unwrap();
            assert_eq!(last.portfolio_value, path.terminal_value);
        }
    }

    #[test]
    fn test_path_reproducible_from_recorded_seed() {
        let result = run_monte_carlo(&baseline(), assumptions(), &config(100, 42)).unwrap();
        let p50 = &result.result.percentile_paths[2];
        assert_eq!(p50.seed, 42 + p50.path_index as u64);
    }

    #[test]
    fn test_seeded_reproducibility() {
        let a = run_monte_carlo(&baseline(), assumptions(), &config(100, 12345)).unwrap();
        let b = run_monte_carlo(&baseline(), assumptions(), &config(100, 12345)).unwrap();
        assert_eq!(a.result.success_probability, b.result.success_probability);
        assert_eq!(a.result.median_outcome, b.result.median_outcome);
        let ja = serde_json::to_string(&a.result).unwrap();
        let jb = serde_json::to_string(&b.result).unwrap();
        assert_eq!(ja, jb);
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = run_monte_carlo(&baseline(), assumptions(), &config(200, 1)).unwrap();
        let b = run_monte_carlo(&baseline(), assumptions(), &config(200, 2)).unwrap();
        assert_ne!(a.result.median_outcome, b.result.median_outcome);
    }

    #[test]
    fn test_equity_heavy_allocation_is_riskier() {
        let mut conservative = baseline();
        conservative.asset_allocation = BTreeMap::from([
            (AssetId::Equity, dec!(30)),
            (AssetId::Debt, dec!(70)),
        ]);
        let mut aggressive = baseline();
        aggressive.asset_allocation = BTreeMap::from([
            (AssetId::Equity, dec!(90)),
            (AssetId::Debt, dec!(10)),
        ]);

        let low = run_monte_carlo(&conservative, assumptions(), &config(500, 42)).unwrap();
        let high = run_monte_carlo(&aggressive, assumptions(), &config(500, 42)).unwrap();
        assert!(
            high.result.terminal_distribution.std_dev
                > low.result.terminal_distribution.std_dev
        );
    }

    #[test]
    fn test_portfolio_values_never_negative() {
        let mut inputs = baseline();
        inputs.current_savings = dec!(100_000);
        inputs.monthly_investment = dec!(5_000);
        let result = run_monte_carlo(&inputs, assumptions(), &config(100, 42)).unwrap();
        for path in &result.result.percentile_paths {
            for year in &path.timeline {
                assert!(year.portfolio_value >= 0.0);
                assert!(year.investment_return.is_finite());
                assert!(year.expenses.is_finite());
            }
        }
    }

    #[test]
    fn test_depleted_paths_report_shortfall() {
        let mut inputs = baseline();
        inputs.current_savings = dec!(100_000);
        inputs.monthly_investment = dec!(1_000);
        let result = run_monte_carlo(&inputs, assumptions(), &config(200, 42)).unwrap();
        let r = &result.result;
        assert!(r.shortfall_risk.probability > 0.5);
        assert!(r.shortfall_risk.average_shortfall > 0.0);
        assert_eq!(r.shortfall_risk.worst_case, r.terminal_distribution.values[0]);
    }

    #[test]
    fn test_monthly_time_step_rejected() {
        let mut cfg = config(100, 42);
        cfg.time_step = TimeStep::Monthly;
        let err = run_monte_carlo(&baseline(), assumptions(), &cfg).unwrap_err();
        assert!(matches!(err, PlanningError::Unsupported { .. }));
    }

    #[test]
    fn test_zero_simulations_rejected() {
        let cfg = config(0, 42);
        assert!(run_monte_carlo(&baseline(), assumptions(), &cfg).is_err());
    }

    #[test]
    fn test_small_run_emits_warning() {
        let result = run_monte_carlo(&baseline(), assumptions(), &config(50, 42)).unwrap();
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn test_default_config_values() {
        let cfg = MonteCarloConfig::default();
        assert_eq!(cfg.num_simulations, 1_000);
        assert_eq!(cfg.seed, 42);
        assert_eq!(cfg.time_step, TimeStep::Annual);
    }

    #[test]
    fn test_envelope_reports_f64_precision_and_version() {
        let result = run_monte_carlo(&baseline(), assumptions(), &config(100, 42)).unwrap();
        assert_eq!(result.metadata.precision, "ieee754_f64");
        assert_eq!(result.result.assumption_version, "2024-Q4");
    }
}
