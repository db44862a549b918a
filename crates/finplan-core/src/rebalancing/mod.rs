pub mod rebalancer;

pub use rebalancer::{
    generate_rebalancing_trades, RebalancingConfig, RebalancingResult, Trade, TradeSide,
};
