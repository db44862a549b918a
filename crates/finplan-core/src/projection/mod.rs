pub mod deterministic;
pub mod inputs;
pub mod monte_carlo;

pub use deterministic::project_deterministic;
pub use inputs::{
    PlannedExpense, ProjectionInputs, ProjectionResult, ProjectionSummary, SuccessMetric,
    YearlyProjection,
};
pub use monte_carlo::{
    run_monte_carlo, MonteCarloConfig, MonteCarloResult, PercentilePath, ShortfallRisk,
    SimulatedYear, TerminalDistribution, TimeStep,
};
