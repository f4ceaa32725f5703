use tracing::{debug, trace, warn};

use crate::problem::{LpProblem, Sense};
use crate::solution::{Solution, SolutionStatus};

/// Simplex solver for linear programming problems
///
/// Dense two-phase tableau. The entering column follows Dantzig's largest
/// reduced profit; after a degenerate pivot the solver switches to Bland's rule
/// until the objective moves again, so degenerate models (transportation
/// problems are full of them) terminate.
#[derive(Debug, Clone)]
pub struct Solver {
    /// Maximum pivots across both phases; `None` scales with the model size
    max_iterations: Option<usize>,
    /// Tolerance for floating point comparisons
    tolerance: f64,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            max_iterations: None,
            tolerance: 1e-9,
        }
    }
}

/// Floor of the size-scaled pivot budget.
const MIN_ITERATIONS: usize = 10_000;
/// Pivots allowed per tableau row plus column.
const ITERATIONS_PER_DIMENSION: usize = 50;

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = Some(max);
        self
    }

    /// Go back to a pivot budget scaled to each model.
    pub fn with_scaled_iterations(mut self) -> Self {
        self.max_iterations = None;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    /// Explicit pivot budget, or `None` when it scales with the model.
    pub fn max_iterations(&self) -> Option<usize> {
        self.max_iterations
    }

    /// Budget for a tableau of `rows` constraints and `cols` columns.
    pub fn iteration_budget(&self, rows: usize, cols: usize) -> usize {
        self.max_iterations
            .unwrap_or_else(|| MIN_ITERATIONS.max(ITERATIONS_PER_DIMENSION * (rows + cols)))
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Solve the LP problem using the two-phase simplex method
    pub fn solve(&self, problem: &LpProblem) -> Solution {
        if let Err(e) = problem.validate() {
            warn!(problem = %problem.name, error = %e, "rejecting invalid model");
            return Solution::model_invalid();
        }

        let rows = standard_rows(problem);
        let mut tableau = Tableau::new(problem.num_variables(), &rows);
        let mut iterations = Budget {
            used: 0,
            limit: self.iteration_budget(rows.len(), tableau.cols),
        };

        debug!(
            problem = %problem.name,
            rows = rows.len(),
            columns = tableau.cols,
            artificials = tableau.n_artificial,
            budget = iterations.limit,
            "built simplex tableau"
        );

        if tableau.n_artificial > 0 {
            match self.phase1(&mut tableau, &mut iterations) {
                Phase1::Feasible => {}
                Phase1::Infeasible => {
                    debug!(problem = %problem.name, iterations = iterations.used, "phase 1 left artificials in the basis");
                    return Solution::infeasible(iterations.used);
                }
                Phase1::Stalled => {
                    warn!(problem = %problem.name, iterations = iterations.used, "phase 1 did not converge");
                    return Solution::abnormal(iterations.used);
                }
            }
        }

        tableau.load_objective(&profits(problem));
        let art_start = tableau.art_start();
        let status = match self.iterate(&mut tableau, art_start, &mut iterations) {
            Pivoting::Optimal => SolutionStatus::Optimal,
            Pivoting::Exhausted => {
                warn!(problem = %problem.name, iterations = iterations.used, "iteration limit reached, returning feasible basis");
                SolutionStatus::Feasible
            }
            Pivoting::Unbounded => return Solution::unbounded(iterations.used),
        };

        let solution = self.extract_solution(&tableau, problem, status, iterations.used);
        debug!(
            problem = %problem.name,
            status = ?solution.status,
            objective = solution.objective_value,
            iterations = iterations.used,
            "solve finished"
        );
        solution
    }

    fn phase1(&self, tableau: &mut Tableau, iterations: &mut Budget) -> Phase1 {
        let art_start = tableau.art_start();
        let obj = tableau.obj_row();

        // Maximize -sum(artificials), priced out against the starting basis
        tableau.data[obj].fill(0.0);
        for j in art_start..art_start + tableau.n_artificial {
            tableau.data[obj][j] = -1.0;
        }
        for i in 0..obj {
            if tableau.basic_vars[i] >= art_start {
                tableau.add_row_to_objective(i, 1.0);
            }
        }

        let rhs = tableau.rhs_col();
        match self.iterate(tableau, rhs, iterations) {
            Pivoting::Optimal => {}
            Pivoting::Exhausted | Pivoting::Unbounded => return Phase1::Stalled,
        }

        let scale = (0..obj)
            .map(|i| tableau.data[i][rhs].abs())
            .fold(1.0, f64::max);
        let residual_limit = self.tolerance * scale;
        for i in 0..obj {
            if tableau.basic_vars[i] >= art_start && tableau.data[i][rhs] > residual_limit {
                return Phase1::Infeasible;
            }
        }

        // Pivot zero-level artificials out so phase 2 cannot move them.
        // Entries small against the row's own scale are round-off from a
        // redundant row, not pivot candidates.
        for i in 0..obj {
            if tableau.basic_vars[i] < art_start {
                continue;
            }
            let row_scale = tableau.data[i][..rhs]
                .iter()
                .fold(1.0, |m: f64, v| m.max(v.abs()));
            let threshold = self.tolerance * row_scale;
            let replacement = (0..art_start)
                .filter(|&j| tableau.data[i][j].abs() > threshold)
                .max_by(|&a, &b| tableau.data[i][a].abs().total_cmp(&tableau.data[i][b].abs()));
            tableau.data[i][rhs] = 0.0;
            match replacement {
                Some(col) => tableau.pivot(i, col),
                None => {
                    trace!(row = i, "redundant row keeps its artificial");
                    tableau.data[i][..art_start].fill(0.0);
                }
            }
        }

        Phase1::Feasible
    }

    fn iterate(&self, tableau: &mut Tableau, col_limit: usize, iterations: &mut Budget) -> Pivoting {
        let rhs = tableau.rhs_col();
        let mut bland = false;
        loop {
            let Some(col) = self.entering_column(tableau, col_limit, bland) else {
                return Pivoting::Optimal;
            };
            if iterations.used >= iterations.limit {
                return Pivoting::Exhausted;
            }
            let Some(row) = self.leaving_row(tableau, col) else {
                return Pivoting::Unbounded;
            };
            bland = tableau.data[row][rhs] <= self.tolerance;
            trace!(row, col, degenerate = bland, "pivot");
            tableau.pivot(row, col);
            iterations.used += 1;
        }
    }

    /// Dantzig picks the largest reduced profit; Bland the lowest-index
    /// positive one.
    fn entering_column(&self, tableau: &Tableau, col_limit: usize, bland: bool) -> Option<usize> {
        let obj = &tableau.data[tableau.obj_row()];
        if bland {
            return (0..col_limit).find(|&j| obj[j] > self.tolerance);
        }

        let mut best: Option<(usize, f64)> = None;
        for (j, &reduced) in obj[..col_limit].iter().enumerate() {
            if reduced > self.tolerance && best.is_none_or(|(_, max)| reduced > max) {
                best = Some((j, reduced));
            }
        }
        best.map(|(col, _)| col)
    }

    /// Minimum ratio test, ties broken by the lowest basic variable index.
    fn leaving_row(&self, tableau: &Tableau, col: usize) -> Option<usize> {
        let rhs = tableau.rhs_col();
        let mut best: Option<(usize, f64)> = None;

        for i in 0..tableau.obj_row() {
            let val = tableau.data[i][col];
            if val <= self.tolerance {
                continue;
            }
            let ratio = tableau.data[i][rhs] / val;
            best = match best {
                None => Some((i, ratio)),
                Some((row, min_ratio)) => {
                    let tied = (ratio - min_ratio).abs() <= self.tolerance;
                    if ratio < min_ratio - self.tolerance
                        || (tied && tableau.basic_vars[i] < tableau.basic_vars[row])
                    {
                        Some((i, ratio))
                    } else {
                        Some((row, min_ratio))
                    }
                }
            };
        }

        best.map(|(row, _)| row)
    }

    fn extract_solution(
        &self,
        tableau: &Tableau,
        problem: &LpProblem,
        status: SolutionStatus,
        iterations: usize,
    ) -> Solution {
        let n_vars = problem.num_variables();
        let rhs = tableau.rhs_col();

        let mut shifted = vec![0.0; n_vars];
        for (i, &basic) in tableau.basic_vars.iter().enumerate() {
            if basic < n_vars {
                shifted[basic] = tableau.data[i][rhs];
            }
        }

        let values: Vec<f64> = problem
            .variables
            .iter()
            .zip(shifted)
            .map(|(v, x)| v.lower + x)
            .collect();

        let objective_value = problem
            .objective_coefficients()
            .iter()
            .zip(&values)
            .map(|(c, x)| c * x)
            .sum();

        Solution {
            status,
            values,
            objective_value,
            iterations,
        }
    }
}

struct Budget {
    used: usize,
    limit: usize,
}

enum Pivoting {
    Optimal,
    Unbounded,
    Exhausted,
}

enum Phase1 {
    Feasible,
    Infeasible,
    Stalled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowKind {
    Le,
    Ge,
    Eq,
}

/// A single standard-form row over the shifted variables, with `rhs >= 0`.
struct Row {
    coefficients: Vec<f64>,
    kind: RowKind,
    rhs: f64,
}

impl Row {
    fn new(mut coefficients: Vec<f64>, kind: RowKind, rhs: f64) -> Self {
        if rhs >= 0.0 {
            return Self { coefficients, kind, rhs };
        }
        for c in &mut coefficients {
            *c = -*c;
        }
        let kind = match kind {
            RowKind::Le => RowKind::Ge,
            RowKind::Ge => RowKind::Le,
            RowKind::Eq => RowKind::Eq,
        };
        Self {
            coefficients,
            kind,
            rhs: -rhs,
        }
    }
}

/// Per-variable profit for the internal maximization.
fn profits(problem: &LpProblem) -> Vec<f64> {
    let mut coefficients = problem.objective_coefficients().to_vec();
    if problem.objective.sense == Sense::Minimize {
        for c in &mut coefficients {
            *c = -*c;
        }
    }
    coefficients
}

/// Lower standard form over `x' = x - lower`. Range sides already implied by
/// the sign pattern of the coefficients and `x' >= 0` are left out.
fn standard_rows(problem: &LpProblem) -> Vec<Row> {
    let n_vars = problem.num_variables();
    let mut rows = Vec::new();

    for c in &problem.constraints {
        let mut coefficients = vec![0.0; n_vars];
        for &(var, coef) in &c.coefficients {
            coefficients[var.index()] = coef;
        }

        let offset: f64 = coefficients
            .iter()
            .zip(&problem.variables)
            .map(|(a, v)| a * v.lower)
            .sum();
        let lower = c.lower - offset;
        let upper = c.upper - offset;

        if c.is_equality() {
            rows.push(Row::new(coefficients, RowKind::Eq, lower));
            continue;
        }

        let all_nonneg = coefficients.iter().all(|&a| a >= 0.0);
        let all_nonpos = coefficients.iter().all(|&a| a <= 0.0);

        if upper.is_finite() && !(all_nonpos && upper >= 0.0) {
            rows.push(Row::new(coefficients.clone(), RowKind::Le, upper));
        }
        if lower.is_finite() && !(all_nonneg && lower <= 0.0) {
            rows.push(Row::new(coefficients, RowKind::Ge, lower));
        }
    }

    for (k, v) in problem.variables.iter().enumerate() {
        if v.upper.is_finite() {
            let mut coefficients = vec![0.0; n_vars];
            coefficients[k] = 1.0;
            rows.push(Row::new(coefficients, RowKind::Le, v.upper - v.lower));
        }
    }

    rows
}

/// Constraint rows followed by one objective row of reduced profits.
/// Column layout: structural | slack/surplus | artificial | rhs.
struct Tableau {
    data: Vec<Vec<f64>>,
    basic_vars: Vec<usize>,
    cols: usize,
    n_vars: usize,
    n_slack: usize,
    n_artificial: usize,
}

impl Tableau {
    fn new(n_vars: usize, rows: &[Row]) -> Self {
        let n_slack = rows.iter().filter(|r| r.kind != RowKind::Eq).count();
        let n_artificial = rows.iter().filter(|r| r.kind != RowKind::Le).count();
        let cols = n_vars + n_slack + n_artificial + 1;

        let mut data = vec![vec![0.0; cols]; rows.len() + 1];
        let mut basic_vars = vec![0; rows.len()];
        let mut slack_idx = n_vars;
        let mut artificial_idx = n_vars + n_slack;

        for (i, row) in rows.iter().enumerate() {
            data[i][..n_vars].copy_from_slice(&row.coefficients);
            data[i][cols - 1] = row.rhs;

            match row.kind {
                RowKind::Le => {
                    data[i][slack_idx] = 1.0;
                    basic_vars[i] = slack_idx;
                    slack_idx += 1;
                }
                RowKind::Ge => {
                    data[i][slack_idx] = -1.0;
                    slack_idx += 1;
                    data[i][artificial_idx] = 1.0;
                    basic_vars[i] = artificial_idx;
                    artificial_idx += 1;
                }
                RowKind::Eq => {
                    data[i][artificial_idx] = 1.0;
                    basic_vars[i] = artificial_idx;
                    artificial_idx += 1;
                }
            }
        }

        Self {
            data,
            basic_vars,
            cols,
            n_vars,
            n_slack,
            n_artificial,
        }
    }

    #[inline]
    fn obj_row(&self) -> usize {
        self.data.len() - 1
    }

    #[inline]
    fn rhs_col(&self) -> usize {
        self.cols - 1
    }

    #[inline]
    fn art_start(&self) -> usize {
        self.n_vars + self.n_slack
    }

    fn add_row_to_objective(&mut self, row: usize, factor: f64) {
        let obj = self.obj_row();
        let (rows, objective) = self.data.split_at_mut(obj);
        for (o, v) in objective[0].iter_mut().zip(&rows[row]) {
            *o += factor * v;
        }
    }

    /// Install phase 2 profits and price out the current basis.
    fn load_objective(&mut self, profits: &[f64]) {
        let obj = self.obj_row();
        self.data[obj].fill(0.0);
        self.data[obj][..self.n_vars].copy_from_slice(profits);

        for i in 0..obj {
            let reduced = self.data[obj][self.basic_vars[i]];
            if reduced != 0.0 {
                self.add_row_to_objective(i, -reduced);
            }
        }
    }

    fn pivot(&mut self, row: usize, col: usize) {
        self.basic_vars[row] = col;

        let pivot_val = self.data[row][col];
        for v in &mut self.data[row] {
            *v /= pivot_val;
        }

        // Transportation rows are mostly zeros; only touch the pivot row's support
        let support: Vec<(usize, f64)> = self.data[row]
            .iter()
            .enumerate()
            .filter(|&(_, &p)| p != 0.0)
            .map(|(j, &p)| (j, p))
            .collect();
        for (i, r) in self.data.iter_mut().enumerate() {
            if i == row {
                continue;
            }
            let factor = r[col];
            if factor == 0.0 {
                continue;
            }
            for &(j, p) in &support {
                r[j] -= factor * p;
            }
            r[col] = 0.0;
        }
    }
}
