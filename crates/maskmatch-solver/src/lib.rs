mod problem;
mod simplex;
mod solution;

pub use problem::{Constraint, ConstraintId, LpProblem, ModelError, Objective, Sense, VarId, Variable};
pub use simplex::Solver;
pub use solution::{Solution, SolutionStatus};

/// Anything that can take a linear model and hand back a status plus variable values.
pub trait LinearSolver {
    fn solve(&self, problem: &LpProblem) -> Solution;
}

impl LinearSolver for Solver {
    fn solve(&self, problem: &LpProblem) -> Solution {
        Solver::solve(self, problem)
    }
}

impl<S: LinearSolver + ?Sized> LinearSolver for &S {
    fn solve(&self, problem: &LpProblem) -> Solution {
        (**self).solve(problem)
    }
}
