//! Command pipeline
//!
//! Operator text → [`OperatorCommand`]; `tell` text → [`TaskPlanner`] →
//! [`Plan`](crate::task::Plan) → [`TaskExecutor`] queue.

pub mod executor;
pub mod operator;
pub mod planner;

pub use executor::TaskExecutor;
pub use operator::OperatorCommand;
pub use planner::TaskPlanner;
