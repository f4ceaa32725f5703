use maskmatch_solver::{LinearSolver, Solver};
use tracing::{debug, info, warn};

use crate::cost::CostTable;
use crate::error::AllocationError;
use crate::model::TransportModel;
use crate::plan::{AllocationPlan, SolveStatus};

/// Tunables for [`Optimizer`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct OptimizerConfig {
    /// Pivot budget handed to the simplex; `None` scales with the model
    pub max_iterations: Option<usize>,
    /// Simplex pivot/feasibility tolerance
    pub pivot_tolerance: f64,
    /// Solved flows at or below this are reported as inactive
    pub zero_tolerance: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        let solver = Solver::default();
        Self {
            max_iterations: solver.max_iterations(),
            pivot_tolerance: solver.tolerance(),
            zero_tolerance: 1e-9,
        }
    }
}

/// Builds the transportation model, runs the solver and interprets its status.
#[derive(Debug, Clone)]
pub struct Optimizer<S = Solver> {
    solver: S,
    zero_tolerance: f64,
}

impl Default for Optimizer<Solver> {
    fn default() -> Self {
        Self {
            solver: Solver::default(),
            zero_tolerance: OptimizerConfig::default().zero_tolerance,
        }
    }
}

impl Optimizer<Solver> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an optimizer from loaded settings, rejecting tolerances the
    /// solver cannot work with.
    pub fn from_config(config: &OptimizerConfig) -> Result<Self, AllocationError> {
        if !config.pivot_tolerance.is_finite() || config.pivot_tolerance <= 0.0 {
            return Err(AllocationError::InvalidModel(format!(
                "pivot tolerance must be finite and positive, got {}",
                config.pivot_tolerance
            )));
        }
        check_zero_tolerance(config.zero_tolerance)?;

        let solver = match config.max_iterations {
            Some(max) => Solver::new().with_max_iterations(max),
            None => Solver::new(),
        };
        Ok(Self {
            solver: solver.with_tolerance(config.pivot_tolerance),
            zero_tolerance: config.zero_tolerance,
        })
    }
}

impl<S: LinearSolver> Optimizer<S> {
    /// Use a different LP backend.
    pub fn with_solver<T: LinearSolver>(self, solver: T) -> Optimizer<T> {
        Optimizer {
            solver,
            zero_tolerance: self.zero_tolerance,
        }
    }

    /// Checked when [`optimize`](Self::optimize) runs; it must be finite and
    /// non-negative.
    pub fn with_zero_tolerance(mut self, tol: f64) -> Self {
        self.zero_tolerance = tol;
        self
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Allocate every donor's full capacity across recipients at minimum total distance.
    ///
    /// Input problems are errors. Solver outcomes, including infeasibility,
    /// come back as the plan's status with an empty allocation list whenever
    /// there is no usable solution.
    pub fn optimize(
        &self,
        donor_capacities: &[f64],
        recipient_capacities: &[f64],
        costs: &CostTable,
    ) -> Result<AllocationPlan, AllocationError> {
        check_zero_tolerance(self.zero_tolerance)?;
        let model = TransportModel::build(donor_capacities, recipient_capacities, costs)?;

        let supply: f64 = donor_capacities.iter().sum();
        let capacity: f64 = recipient_capacities.iter().sum();
        if supply > capacity {
            warn!(supply, capacity, "donor supply exceeds recipient capacity");
        }

        debug!("solving allocation model");
        let solution = self.solver.solve(model.problem());
        let status = SolveStatus::from(solution.status);

        match status {
            SolveStatus::Optimal => info!(status = %status, "found optimal allocation"),
            SolveStatus::Feasible => warn!(status = %status, "allocation may be suboptimal"),
            _ => {
                warn!(status = %status, "solver could not produce an allocation");
                return Ok(AllocationPlan::failed(status));
            }
        }

        let expected = model.problem().num_variables();
        if solution.values.len() != expected {
            warn!(
                expected,
                found = solution.values.len(),
                "solver returned the wrong number of values"
            );
            return Ok(AllocationPlan::failed(SolveStatus::Abnormal));
        }

        let allocations = model.extract(&solution, self.zero_tolerance);
        let total_cost = model.cost_of(&allocations);
        debug!(records = allocations.len(), total_cost, "extracted allocation");

        Ok(AllocationPlan {
            status,
            allocations,
            total_cost: Some(total_cost),
        })
    }
}

fn check_zero_tolerance(tol: f64) -> Result<(), AllocationError> {
    if tol.is_finite() && tol >= 0.0 {
        Ok(())
    } else {
        Err(AllocationError::InvalidModel(format!(
            "zero tolerance must be finite and non-negative, got {tol}"
        )))
    }
}

/// [`Optimizer::optimize`] with the default configuration.
pub fn optimize(
    donor_capacities: &[f64],
    recipient_capacities: &[f64],
    costs: &CostTable,
) -> Result<AllocationPlan, AllocationError> {
    Optimizer::new().optimize(donor_capacities, recipient_capacities, costs)
}
