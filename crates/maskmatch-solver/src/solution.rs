use crate::problem::VarId;

/// The result of solving an LP problem
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Solution {
    /// Solution status
    pub status: SolutionStatus,
    /// Values for each variable; empty unless the status carries a solution
    pub values: Vec<f64>,
    /// Objective value at `values`
    pub objective_value: f64,
    /// Simplex pivots performed across both phases
    pub iterations: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolutionStatus {
    /// An optimal solution was found
    Optimal,
    /// A feasible solution was found but the iteration budget ran out before optimality was proven
    Feasible,
    /// The problem is infeasible (no solution exists)
    Infeasible,
    /// The problem is unbounded
    Unbounded,
    /// Solver gave up before reaching a feasible point
    Abnormal,
    /// The model failed validation
    ModelInvalid,
}

impl SolutionStatus {
    /// Whether `values` holds a usable assignment.
    pub fn has_solution(self) -> bool {
        matches!(self, SolutionStatus::Optimal | SolutionStatus::Feasible)
    }
}

impl Solution {
    pub fn value(&self, var: VarId) -> f64 {
        self.values.get(var.index()).copied().unwrap_or(0.0)
    }

    pub fn infeasible(iterations: usize) -> Self {
        Self::without_values(SolutionStatus::Infeasible, f64::INFINITY, iterations)
    }

    pub fn unbounded(iterations: usize) -> Self {
        Self::without_values(SolutionStatus::Unbounded, f64::NEG_INFINITY, iterations)
    }

    pub fn abnormal(iterations: usize) -> Self {
        Self::without_values(SolutionStatus::Abnormal, f64::NAN, iterations)
    }

    pub fn model_invalid() -> Self {
        Self::without_values(SolutionStatus::ModelInvalid, f64::NAN, 0)
    }

    fn without_values(status: SolutionStatus, objective_value: f64, iterations: usize) -> Self {
        Self {
            status,
            values: Vec::new(),
            objective_value,
            iterations,
        }
    }
}
