pub mod allocator;

pub use allocator::{
    allocate_goal_budget, Goal, GoalAllocation, GoalAllocationResult, GoalFeasibility,
    GoalPriority, GOAL_PLANNING_RETURN,
};
