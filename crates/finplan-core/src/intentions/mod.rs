pub mod adapter;

pub use adapter::{
    analyze_monte_carlo, fund_goals, optimize_retirement, project_portfolio,
    rebalance_portfolio, IntentionReport, IntentionResponse, ReportMetric, ThinkingStep,
};
