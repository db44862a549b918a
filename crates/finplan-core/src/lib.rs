pub mod assumptions;
pub mod error;
pub mod goals;
pub mod intentions;
pub mod projection;
pub mod rebalancing;
pub mod rng;
pub mod stats;
pub mod time_value;
pub mod types;

pub use error::PlanningError;
pub use types::*;

/// Standard result type for all planning-engine operations
pub type PlanResult<T> = Result<T, PlanningError>;
