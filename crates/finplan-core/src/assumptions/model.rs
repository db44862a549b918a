use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::PlanningError;
use crate::types::Percent;
use crate::PlanResult;

/// Closed set of asset-class identifiers. `Ord` so that every map keyed by
/// asset id iterates in a stable order, which the simulator relies on for
/// bit-reproducible sampling.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AssetId {
    Equity,
    Debt,
    Gold,
    Cash,
}

impl AssetId {
    pub fn all() -> [AssetId; 4] {
        [AssetId::Equity, AssetId::Debt, AssetId::Gold, AssetId::Cash]
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AssetId::Equity => "equity",
            AssetId::Debt => "debt",
            AssetId::Gold => "gold",
            AssetId::Cash => "cash",
        };
        write!(f, "{s}")
    }
}

/// Broad category tag for an asset class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetCategory {
    Equity,
    Debt,
    Commodity,
    Alternative,
    Cash,
}

/// Annualized return distribution, in percent (12.0 = 12% p.a.).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReturnDistribution {
    pub mean_pct: Percent,
    pub volatility_pct: Percent,
}

impl ReturnDistribution {
    pub fn mean_fraction(&self) -> Decimal {
        self.mean_pct / dec!(100)
    }

    pub fn volatility_fraction(&self) -> Decimal {
        self.volatility_pct / dec!(100)
    }
}

/// Calibrated parameters for one asset class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetClassAssumptions {
    pub label: String,
    pub category: AssetCategory,
    pub nominal: ReturnDistribution,
    pub real: ReturnDistribution,
    pub trading_cost_bps: Decimal,
}

/// One off-diagonal correlation, keyed by an ordered asset pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationEntry {
    pub assets: (AssetId, AssetId),
    pub value: Decimal,
}

/// Pairwise asset correlations in named form. The diagonal is implicit
/// (always 1.0) and lookups are symmetric, so the silent-reordering hazard of
/// positional matrices cannot arise. A positional materialization exists for
/// the future correlated sampler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    entries: Vec<CorrelationEntry>,
}

impl CorrelationMatrix {
    pub fn from_pairs(pairs: &[((AssetId, AssetId), Decimal)]) -> Self {
        let entries = pairs
            .iter()
            .map(|((a, b), value)| CorrelationEntry {
                assets: if a <= b { (*a, *b) } else { (*b, *a) },
                value: *value,
            })
            .collect();
        CorrelationMatrix { entries }
    }

    /// Correlation between two assets. Identity on the diagonal; 0 for a pair
    /// the calibration does not list.
    pub fn get(&self, a: AssetId, b: AssetId) -> Decimal {
        if a == b {
            return Decimal::ONE;
        }
        let key = if a <= b { (a, b) } else { (b, a) };
        self.entries
            .iter()
            .find(|e| e.assets == key)
            .map(|e| e.value)
            .unwrap_or(Decimal::ZERO)
    }

    /// Whether the calibration explicitly lists this (unordered) pair.
    pub fn has_pair(&self, a: AssetId, b: AssetId) -> bool {
        if a == b {
            return true;
        }
        let key = if a <= b { (a, b) } else { (b, a) };
        self.entries.iter().any(|e| e.assets == key)
    }

    /// Materialize into a positional matrix for the given asset ordering.
    pub fn to_positional(&self, order: &[AssetId]) -> Vec<Vec<Decimal>> {
        order
            .iter()
            .map(|a| order.iter().map(|b| self.get(*a, *b)).collect())
            .collect()
    }

    /// Every entry must lie in [-1, 1].
    pub fn validate(&self) -> PlanResult<()> {
        for entry in &self.entries {
            if entry.value < dec!(-1) || entry.value > dec!(1) {
                return Err(PlanningError::Calibration {
                    reason: format!(
                        "correlation {}-{} out of [-1, 1]: {}",
                        entry.assets.0, entry.assets.1, entry.value
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Per-asset return and volatility multipliers within a regime.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RegimeMultiplier {
    pub return_multiplier: Decimal,
    pub volatility_multiplier: Decimal,
}

/// A labelled market state. Part of the data contract only: the current
/// simulator never activates regimes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketRegime {
    pub name: String,
    pub steady_state_probability: Decimal,
    pub mean_duration_years: Decimal,
    pub duration_volatility_years: Decimal,
    pub multipliers: BTreeMap<AssetId, RegimeMultiplier>,
}

/// Long-run inflation process parameters (percent units, AR(1) persistence).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InflationAssumptions {
    pub mean_pct: Percent,
    pub volatility_pct: Percent,
    /// AR(1) persistence coefficient in [0, 1].
    pub persistence: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regime_adjustments_pct: Option<BTreeMap<String, Decimal>>,
}

impl InflationAssumptions {
    pub fn mean_fraction(&self) -> Decimal {
        self.mean_pct / dec!(100)
    }
}

/// Market region for which a bundle is calibrated.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Region {
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "US")]
    Us,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Region::In => "IN",
            Region::Us => "US",
        };
        write!(f, "{s}")
    }
}

/// An immutable, versioned bundle of market assumptions. Produced by
/// calibration, compiled into the registry, never mutated at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketAssumptions {
    /// Quarter tag, e.g. "2024-Q4".
    pub version: String,
    pub effective_date: NaiveDate,
    pub region: Region,
    pub asset_classes: BTreeMap<AssetId, AssetClassAssumptions>,
    pub correlations: CorrelationMatrix,
    pub regimes: Vec<MarketRegime>,
    pub inflation: InflationAssumptions,
}

impl MarketAssumptions {
    pub fn asset(&self, id: AssetId) -> Option<&AssetClassAssumptions> {
        self.asset_classes.get(&id)
    }

    /// Internal consistency checks on a calibrated bundle. Bundles are
    /// compile-time constants, so this is exercised by tests rather than on
    /// every engine call.
    pub fn validate_calibration(&self) -> PlanResult<()> {
        let prob_sum: Decimal = self
            .regimes
            .iter()
            .map(|r| r.steady_state_probability)
            .sum();
        if (prob_sum - Decimal::ONE).abs() > dec!(0.000001) {
            return Err(PlanningError::Calibration {
                reason: format!("regime probabilities sum to {prob_sum}, expected 1.0"),
            });
        }
        self.correlations.validate()?;
        if self.inflation.persistence < Decimal::ZERO || self.inflation.persistence > Decimal::ONE
        {
            return Err(PlanningError::Calibration {
                reason: format!(
                    "inflation persistence {} out of [0, 1]",
                    self.inflation.persistence
                ),
            });
        }
        for (id, asset) in &self.asset_classes {
            if asset.nominal.volatility_pct < Decimal::ZERO
                || asset.real.volatility_pct < Decimal::ZERO
            {
                return Err(PlanningError::Calibration {
                    reason: format!("negative volatility for {id}"),
                });
            }
            if asset.trading_cost_bps < Decimal::ZERO {
                return Err(PlanningError::Calibration {
                    reason: format!("negative trading cost for {id}"),
                });
            }
        }
        // Every unordered asset pair must be calibrated.
        let ids: Vec<AssetId> = self.asset_classes.keys().copied().collect();
        for (i, a) in ids.iter().enumerate() {
            for b in ids.iter().skip(i + 1) {
                if !self.correlations.has_pair(*a, *b) {
                    return Err(PlanningError::Calibration {
                        reason: format!("missing correlation for pair {a}-{b}"),
                    });
                }
            }
        }
        Ok(())
    }
}
