//! Donor to recipient allocation at minimum total distance.
//!
//! Every donor gives away exactly its capacity, every recipient takes at most
//! its capacity, and the sum of `distance * amount` is minimized. The model is
//! a transportation LP handed to a [`LinearSolver`].

pub mod cost;
pub mod error;
pub mod model;
pub mod optimizer;
pub mod plan;

pub use cost::{CostTable, parse_cost_label};
pub use error::AllocationError;
pub use maskmatch_solver::{LinearSolver, Solver};
pub use model::TransportModel;
pub use optimizer::{Optimizer, OptimizerConfig, optimize};
pub use plan::{Allocation, AllocationPlan, PlanViolation, SolveStatus};
