use maskmatch_solver::{LpProblem, Solution, VarId};
use tracing::debug;

use crate::cost::CostTable;
use crate::error::AllocationError;
use crate::plan::Allocation;

/// Transportation LP over a donor x recipient grid of flow variables.
///
/// * `x[i][j] >= 0` is the amount donor `i` sends to recipient `j`
/// * `0 <= sum_i x[i][j] <= recipient_capacities[j]`
/// * `donor_capacities[i] <= sum_j x[i][j] <= donor_capacities[i]`
/// * minimize `sum cost(i, j) * x[i][j]`
#[derive(Debug, Clone)]
pub struct TransportModel {
    problem: LpProblem,
    flows: Vec<Vec<VarId>>,
    costs: Vec<Vec<f64>>,
}

impl TransportModel {
    /// Validate the inputs and lay out the LP.
    pub fn build(
        donor_capacities: &[f64],
        recipient_capacities: &[f64],
        costs: &CostTable,
    ) -> Result<Self, AllocationError> {
        let costs = validate(donor_capacities, recipient_capacities, costs)?;
        let mut problem = LpProblem::new("maskmatch");

        let flows: Vec<Vec<VarId>> = (0..donor_capacities.len())
            .map(|i| {
                (0..recipient_capacities.len())
                    .map(|j| problem.add_variable(format!("x_{i}_{j}"), 0.0, f64::INFINITY))
                    .collect::<Vec<_>>()
            })
            .collect();
        debug!(
            donors = donor_capacities.len(),
            recipients = recipient_capacities.len(),
            "created flow variables"
        );

        for (j, &capacity) in recipient_capacities.iter().enumerate() {
            let c = problem.add_constraint(format!("recipient_{j}_capacity"), 0.0, capacity);
            for row in &flows {
                problem.set_coefficient(c, row[j], 1.0);
            }
        }
        debug!("applied recipient capacity constraints");

        for (i, &capacity) in donor_capacities.iter().enumerate() {
            let c = problem.add_constraint(format!("donor_{i}_supply"), capacity, capacity);
            for &x in &flows[i] {
                problem.set_coefficient(c, x, 1.0);
            }
        }
        debug!("applied donor supply constraints");

        for (row, cost_row) in flows.iter().zip(&costs) {
            for (&x, &cost) in row.iter().zip(cost_row) {
                problem.set_objective_coefficient(x, cost);
            }
        }
        problem.set_minimization();
        debug!("set objective to minimize total distance");

        Ok(Self { problem, flows, costs })
    }

    pub fn problem(&self) -> &LpProblem {
        &self.problem
    }

    pub fn num_donors(&self) -> usize {
        self.flows.len()
    }

    pub fn num_recipients(&self) -> usize {
        self.flows.first().map_or(0, Vec::len)
    }

    /// Variable carrying the flow from `donor` to `recipient`.
    pub fn flow(&self, donor: usize, recipient: usize) -> Option<VarId> {
        self.flows.get(donor)?.get(recipient).copied()
    }

    /// Active flows in donor-major order. Values at or below `zero_tolerance`
    /// count as inactive.
    pub fn extract(&self, solution: &Solution, zero_tolerance: f64) -> Vec<Allocation> {
        let mut allocations = Vec::new();
        for (i, row) in self.flows.iter().enumerate() {
            for (j, &x) in row.iter().enumerate() {
                let value = solution.value(x);
                if value > zero_tolerance {
                    allocations.push(Allocation {
                        donor_id: i,
                        recipient_id: j,
                        donation_amount: value,
                    });
                }
            }
        }
        allocations
    }

    /// `sum(distance * amount)` over the given records.
    pub fn cost_of(&self, allocations: &[Allocation]) -> f64 {
        allocations
            .iter()
            .map(|a| self.costs[a.donor_id][a.recipient_id] * a.donation_amount)
            .sum()
    }
}

/// Check every precondition and return the dense cost grid.
fn validate(
    donor_capacities: &[f64],
    recipient_capacities: &[f64],
    costs: &CostTable,
) -> Result<Vec<Vec<f64>>, AllocationError> {
    if donor_capacities.is_empty() {
        return Err(AllocationError::InvalidModel("no donors".to_string()));
    }
    if recipient_capacities.is_empty() {
        return Err(AllocationError::InvalidModel("no recipients".to_string()));
    }
    check_capacities("donor", donor_capacities)?;
    check_capacities("recipient", recipient_capacities)?;

    let (d, r) = (donor_capacities.len(), recipient_capacities.len());
    let extra = costs.iter().filter(|&((i, j), _)| i >= d || j >= r).count();
    if extra > 0 {
        debug!(extra, "ignoring cost entries outside the donor x recipient grid");
    }

    (0..d)
        .map(|donor| {
            (0..r)
                .map(|recipient| -> Result<f64, AllocationError> {
                    let cost = costs
                        .get(donor, recipient)
                        .ok_or(AllocationError::MissingCostData { donor, recipient })?;
                    if !cost.is_finite() || cost < 0.0 {
                        return Err(AllocationError::InvalidModel(format!(
                            "cost for donor {donor} and recipient {recipient} must be finite and non-negative, got {cost}"
                        )));
                    }
                    Ok(cost)
                })
                .collect::<Result<Vec<f64>, _>>()
        })
        .collect()
}

fn check_capacities(kind: &str, capacities: &[f64]) -> Result<(), AllocationError> {
    match capacities.iter().position(|c| !c.is_finite() || *c < 0.0) {
        Some(i) => Err(AllocationError::InvalidModel(format!(
            "{kind} {i} capacity must be finite and non-negative, got {}",
            capacities[i]
        ))),
        None => Ok(()),
    }
}
