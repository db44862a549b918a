//! Process-wide registry of calibrated assumption bundles, keyed by
//! (region, version). Bundles are compiled-in constants; there is no
//! mutation API. New calibrations are appended by the quarterly calibration
//! pass and never edited in place.

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use super::model::{
    AssetCategory, AssetClassAssumptions, AssetId, CorrelationMatrix, InflationAssumptions,
    MarketAssumptions, MarketRegime, Region, RegimeMultiplier, ReturnDistribution,
};
use crate::error::PlanningError;
use crate::PlanResult;

static BUNDLES: OnceLock<Vec<MarketAssumptions>> = OnceLock::new();

fn bundles() -> &'static [MarketAssumptions] {
    BUNDLES.get_or_init(|| vec![in_2024_q4()])
}

/// Look up the bundle for an exact (region, version) key.
pub fn get(region: Region, version: &str) -> PlanResult<&'static MarketAssumptions> {
    bundles()
        .iter()
        .find(|b| b.region == region && b.version == version)
        .ok_or_else(|| PlanningError::AssumptionNotFound {
            region: region.to_string(),
            version: version.to_string(),
        })
}

/// Newest version available for a region. Quarter tags (YYYY-Qn) order
/// lexicographically, so a plain string max suffices.
pub fn get_latest(region: Region) -> PlanResult<&'static MarketAssumptions> {
    bundles()
        .iter()
        .filter(|b| b.region == region)
        .max_by(|a, b| a.version.cmp(&b.version))
        .ok_or_else(|| PlanningError::AssumptionNotFound {
            region: region.to_string(),
            version: "latest".to_string(),
        })
}

/// Enumerate all registered (region, version) keys.
pub fn list() -> Vec<(Region, String)> {
    bundles()
        .iter()
        .map(|b| (b.region, b.version.clone()))
        .collect()
}

// ---------------------------------------------------------------------------
// Calibrations
// ---------------------------------------------------------------------------

/// India, Q4 2024. Nominal means/vols from the quarterly calibration run;
/// real returns derived with the exact Fisher identity at 5% mean inflation.
fn in_2024_q4() -> MarketAssumptions {
    let mut asset_classes = BTreeMap::new();
    asset_classes.insert(
        AssetId::Equity,
        AssetClassAssumptions {
            label: "Large-cap equity index".to_string(),
            category: AssetCategory::Equity,
            nominal: ReturnDistribution {
                mean_pct: dec!(12.0),
                volatility_pct: dec!(18.0),
            },
            real: ReturnDistribution {
                mean_pct: dec!(6.67),
                volatility_pct: dec!(18.0),
            },
            trading_cost_bps: dec!(10),
        },
    );
    asset_classes.insert(
        AssetId::Debt,
        AssetClassAssumptions {
            label: "Aggregate bond".to_string(),
            category: AssetCategory::Debt,
            nominal: ReturnDistribution {
                mean_pct: dec!(7.0),
                volatility_pct: dec!(6.0),
            },
            real: ReturnDistribution {
                mean_pct: dec!(1.90),
                volatility_pct: dec!(6.0),
            },
            trading_cost_bps: dec!(15),
        },
    );
    asset_classes.insert(
        AssetId::Gold,
        AssetClassAssumptions {
            label: "Gold".to_string(),
            category: AssetCategory::Commodity,
            nominal: ReturnDistribution {
                mean_pct: dec!(8.0),
                volatility_pct: dec!(16.0),
            },
            real: ReturnDistribution {
                mean_pct: dec!(2.86),
                volatility_pct: dec!(16.0),
            },
            trading_cost_bps: dec!(25),
        },
    );
    asset_classes.insert(
        AssetId::Cash,
        AssetClassAssumptions {
            label: "Liquid / money market".to_string(),
            category: AssetCategory::Cash,
            nominal: ReturnDistribution {
                mean_pct: dec!(6.0),
                volatility_pct: dec!(1.0),
            },
            real: ReturnDistribution {
                mean_pct: dec!(0.95),
                volatility_pct: dec!(1.0),
            },
            trading_cost_bps: dec!(5),
        },
    );

    let correlations = CorrelationMatrix::from_pairs(&[
        ((AssetId::Equity, AssetId::Debt), dec!(-0.10)),
        ((AssetId::Equity, AssetId::Gold), dec!(-0.20)),
        ((AssetId::Equity, AssetId::Cash), dec!(0.00)),
        ((AssetId::Debt, AssetId::Gold), dec!(0.10)),
        ((AssetId::Debt, AssetId::Cash), dec!(0.30)),
        ((AssetId::Gold, AssetId::Cash), dec!(0.05)),
    ]);

    let regimes = vec![
        MarketRegime {
            name: "normal".to_string(),
            steady_state_probability: dec!(0.80),
            mean_duration_years: dec!(6.0),
            duration_volatility_years: dec!(2.0),
            multipliers: uniform_multipliers(dec!(1.0), dec!(1.0)),
        },
        MarketRegime {
            name: "bear".to_string(),
            steady_state_probability: dec!(0.15),
            mean_duration_years: dec!(1.5),
            duration_volatility_years: dec!(0.75),
            multipliers: BTreeMap::from([
                (
                    AssetId::Equity,
                    RegimeMultiplier {
                        return_multiplier: dec!(-0.5),
                        volatility_multiplier: dec!(1.6),
                    },
                ),
                (
                    AssetId::Debt,
                    RegimeMultiplier {
                        return_multiplier: dec!(1.2),
                        volatility_multiplier: dec!(1.1),
                    },
                ),
                (
                    AssetId::Gold,
                    RegimeMultiplier {
                        return_multiplier: dec!(1.3),
                        volatility_multiplier: dec!(1.2),
                    },
                ),
                (
                    AssetId::Cash,
                    RegimeMultiplier {
                        return_multiplier: dec!(1.0),
                        volatility_multiplier: dec!(1.0),
                    },
                ),
            ]),
        },
        MarketRegime {
            name: "crisis".to_string(),
            steady_state_probability: dec!(0.05),
            mean_duration_years: dec!(1.0),
            duration_volatility_years: dec!(0.5),
            multipliers: BTreeMap::from([
                (
                    AssetId::Equity,
                    RegimeMultiplier {
                        return_multiplier: dec!(-2.0),
                        volatility_multiplier: dec!(2.5),
                    },
                ),
                (
                    AssetId::Debt,
                    RegimeMultiplier {
                        return_multiplier: dec!(0.8),
                        volatility_multiplier: dec!(1.5),
                    },
                ),
                (
                    AssetId::Gold,
                    RegimeMultiplier {
                        return_multiplier: dec!(1.8),
                        volatility_multiplier: dec!(1.5),
                    },
                ),
                (
                    AssetId::Cash,
                    RegimeMultiplier {
                        return_multiplier: dec!(1.0),
                        volatility_multiplier: dec!(1.0),
                    },
                ),
            ]),
        },
    ];

    let inflation = InflationAssumptions {
        mean_pct: dec!(5.0),
        volatility_pct: dec!(1.5),
        persistence: dec!(0.6),
        regime_adjustments_pct: Some(BTreeMap::from([
            ("bear".to_string(), dec!(1.0)),
            ("crisis".to_string(), dec!(2.5)),
        ])),
    };

    MarketAssumptions {
        version: "2024-Q4".to_string(),
        effective_date: NaiveDate::from_ymd_opt(2024, 10, 1).expect("static calibration date"),
        region: Region::In,
        asset_classes,
        correlations,
        regimes,
        inflation,
    }
}

fn uniform_multipliers(
    return_multiplier: rust_decimal::Decimal,
    volatility_multiplier: rust_decimal::Decimal,
) -> BTreeMap<AssetId, RegimeMultiplier> {
    AssetId::all()
        .into_iter()
        .map(|id| {
            (
                id,
                RegimeMultiplier {
                    return_multiplier,
                    volatility_multiplier,
                },
            )
        })
        .collect()
}
