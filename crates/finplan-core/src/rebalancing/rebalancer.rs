use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use crate::assumptions::{AssetId, MarketAssumptions};
use crate::error::PlanningError;
use crate::types::{with_metadata, ComputationOutput, Money, Percent};
use crate::PlanResult;

/// Per-asset drifts below this floor are never traded, independent of the
/// portfolio-level threshold.
const PER_ASSET_DRIFT_FLOOR: Decimal = dec!(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalancingConfig {
    /// Max-drift percentage points that trigger rebalancing.
    #[serde(default = "default_drift_threshold")]
    pub drift_threshold: Percent,
    /// Trades below this magnitude are suppressed.
    #[serde(default = "default_minimum_trade_amount")]
    pub minimum_trade_amount: Money,
    /// Overrides the per-asset bundled trading cost when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trading_cost_bps: Option<Decimal>,
}

fn default_drift_threshold() -> Percent {
    dec!(5)
}

fn default_minimum_trade_amount() -> Money {
    dec!(10_000)
}

impl Default for RebalancingConfig {
    fn default() -> Self {
        RebalancingConfig {
            drift_threshold: default_drift_threshold(),
            minimum_trade_amount: default_minimum_trade_amount(),
            trading_cost_bps: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub asset: AssetId,
    pub side: TradeSide,
    /// Trade magnitude in currency; the side carries the direction.
    pub amount: Money,
    pub current_value: Money,
    pub target_value: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalancingResult {
    pub needs_rebalancing: bool,
    /// Signed current% minus target%, per target asset.
    pub drifts: BTreeMap<AssetId, Percent>,
    pub max_drift: Percent,
    pub trades: Vec<Trade>,
    pub estimated_cost: Money,
    /// Cost as basis points of the total portfolio.
    pub impact_on_return_bps: Decimal,
    pub assumption_version: String,
}

/// Measure drift against the target allocation and emit the trade list that
/// restores it.
///
/// The 1pp per-asset floor and the minimum trade amount are intentional
/// dead-zones: executing every emitted trade brings each asset within the
/// larger of 1pp or the minimum-trade-amount ratio, not exactly to target.
pub fn generate_rebalancing_trades(
    holdings: &BTreeMap<AssetId, Money>,
    target_allocation: &BTreeMap<AssetId, Percent>,
    assumptions: &MarketAssumptions,
    config: &RebalancingConfig,
) -> PlanResult<ComputationOutput<RebalancingResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate(holdings, target_allocation, assumptions, config)?;

    let total_value: Money = holdings.values().copied().sum();

    let no_op = |warnings: Vec<String>,
                 drifts: BTreeMap<AssetId, Percent>,
                 max_drift: Percent,
                 elapsed: u64| {
        let output = RebalancingResult {
            needs_rebalancing: false,
            drifts,
            max_drift,
            trades: vec![],
            estimated_cost: Decimal::ZERO,
            impact_on_return_bps: Decimal::ZERO,
            assumption_version: assumptions.version.clone(),
        };
        with_metadata(
            "Drift-Threshold Rebalancing",
            &serde_json::json!({
                "assumption_version": assumptions.version,
                "drift_threshold": config.drift_threshold.to_string(),
                "minimum_trade_amount": config.minimum_trade_amount.to_string(),
            }),
            warnings,
            elapsed,
            output,
        )
    };

    if total_value.is_zero() {
        let elapsed = start.elapsed().as_micros() as u64;
        return Ok(no_op(warnings, BTreeMap::new(), Decimal::ZERO, elapsed));
    }

    let mut drifts: BTreeMap<AssetId, Percent> = BTreeMap::new();
    let mut max_drift = Decimal::ZERO;
    for (asset, target_pct) in target_allocation {
        let held = holdings.get(asset).copied().unwrap_or(Decimal::ZERO);
        let current_pct = dec!(100) * held / total_value;
        let drift = current_pct - target_pct;
        max_drift = max_drift.max(drift.abs());
        drifts.insert(*asset, drift);
    }

    if max_drift < config.drift_threshold {
        let elapsed = start.elapsed().as_micros() as u64;
        return Ok(no_op(warnings, drifts, max_drift, elapsed));
    }

    let mut trades: Vec<Trade> = Vec::new();
    let mut estimated_cost = Decimal::ZERO;
    for (asset, target_pct) in target_allocation {
        let drift = drifts[asset];
        if drift.abs() <= PER_ASSET_DRIFT_FLOOR {
            continue;
        }
        let held = holdings.get(asset).copied().unwrap_or(Decimal::ZERO);
        let target_value = target_pct / dec!(100) * total_value;
        let trade_amount = target_value - held;
        if trade_amount.abs() < config.minimum_trade_amount {
            warnings.push(format!(
                "trade for {asset} ({}) below minimum {}, suppressed",
                trade_amount.abs().round_dp(0),
                config.minimum_trade_amount
            ));
            continue;
        }

        let cost_bps = config.trading_cost_bps.unwrap_or_else(|| {
            assumptions
                .asset(*asset)
                .map(|a| a.trading_cost_bps)
                .unwrap_or(Decimal::ZERO)
        });
        estimated_cost += trade_amount.abs() * cost_bps / dec!(10_000);

        trades.push(Trade {
            asset: *asset,
            side: if trade_amount > Decimal::ZERO {
                TradeSide::Buy
            } else {
                TradeSide::Sell
            },
            amount: trade_amount.abs(),
            current_value: held,
            target_value,
        });
    }

    let impact_on_return_bps = dec!(10_000) * estimated_cost / total_value;

    let output = RebalancingResult {
        needs_rebalancing: true,
        drifts,
        max_drift,
        trades,
        estimated_cost,
        impact_on_return_bps,
        assumption_version: assumptions.version.clone(),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Drift-Threshold Rebalancing",
        &serde_json::json!({
            "assumption_version": assumptions.version,
            "drift_threshold": config.drift_threshold.to_string(),
            "minimum_trade_amount": config.minimum_trade_amount.to_string(),
            "trading_cost_override_bps": config
                .trading_cost_bps
                .map(|c| c.to_string()),
        }),
        warnings,
        elapsed,
        output,
    ))
}

fn validate(
    holdings: &BTreeMap<AssetId, Money>,
    target_allocation: &BTreeMap<AssetId, Percent>,
    assumptions: &MarketAssumptions,
    config: &RebalancingConfig,
) -> PlanResult<()> {
    for (asset, value) in holdings {
        if *value < Decimal::ZERO {
            return Err(PlanningError::InvalidInput {
                field: "holdings".into(),
                reason: format!("value for {asset} must be non-negative, got {value}"),
            });
        }
    }
    if target_allocation.is_empty() {
        return Err(PlanningError::InvalidInput {
            field: "target_allocation".into(),
            reason: "at least one target weight is required".into(),
        });
    }
    let mut weight_sum = Decimal::ZERO;
    for (asset, weight) in target_allocation {
        if *weight < Decimal::ZERO || *weight > dec!(100) {
            return Err(PlanningError::InvalidInput {
                field: "target_allocation".into(),
                reason: format!("weight for {asset} must be in [0, 100], got {weight}"),
            });
        }
        if assumptions.asset(*asset).is_none() {
            return Err(PlanningError::InvalidInput {
                field: "target_allocation".into(),
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
            field: "target_allocation".into(),
            reason: format!("weights must sum to 100%, got {weight_sum}"),
        });
    }
    if config.drift_threshold < Decimal::ZERO {
        return Err(PlanningError::InvalidInput {
            field: "drift_threshold".into(),
            reason: "must be non-negative".into(),
        });
    }
    if config.minimum_trade_amount < Decimal::ZERO {
        return Err(PlanningError::InvalidInput {
            field: "minimum_trade_amount".into(),
            reason: "must be non-negative".into(),
        });
    }
    Ok(())
}
