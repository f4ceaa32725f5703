use std::fmt;

use maskmatch_solver::SolutionStatus;

/// How far the solver got with an allocation model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SolveStatus {
    /// Provably minimal-cost allocation
    Optimal,
    /// Valid allocation, possibly not minimal
    Feasible,
    /// Donor supply cannot fit within recipient capacity
    Infeasible,
    Unbounded,
    /// The solver stopped for a reason unrelated to feasibility
    Abnormal,
}

impl SolveStatus {
    /// Whether the plan carries allocation records.
    pub fn has_solution(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }

    pub fn is_optimal(self) -> bool {
        self == SolveStatus::Optimal
    }
}

impl From<SolutionStatus> for SolveStatus {
    fn from(status: SolutionStatus) -> Self {
        match status {
            SolutionStatus::Optimal => SolveStatus::Optimal,
            SolutionStatus::Feasible => SolveStatus::Feasible,
            SolutionStatus::Infeasible => SolveStatus::Infeasible,
            SolutionStatus::Unbounded => SolveStatus::Unbounded,
            SolutionStatus::Abnormal | SolutionStatus::ModelInvalid => SolveStatus::Abnormal,
        }
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SolveStatus::Optimal => "OPTIMAL",
            SolveStatus::Feasible => "FEASIBLE",
            SolveStatus::Infeasible => "INFEASIBLE",
            SolveStatus::Unbounded => "UNBOUNDED",
            SolveStatus::Abnormal => "ABNORMAL",
        };
        f.write_str(s)
    }
}

/// One active donor to recipient flow.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Allocation {
    pub donor_id: usize,
    pub recipient_id: usize,
    pub donation_amount: f64,
}

/// A way in which a plan disagrees with the capacities it was built for.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanViolation {
    /// Donor did not give away exactly its capacity
    Conservation { donor: usize, expected: f64, actual: f64 },
    /// Recipient took more than its capacity
    Capacity { recipient: usize, limit: f64, actual: f64 },
    /// A record with a non-positive amount
    NonPositive { donor: usize, recipient: usize, amount: f64 },
    /// A record naming a donor or recipient outside the capacity lists
    UnknownParty { donor: usize, recipient: usize },
}

impl fmt::Display for PlanViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanViolation::Conservation { donor, expected, actual } => {
                write!(f, "donor {donor} gives {actual:.4} but must give exactly {expected:.4}")
            }
            PlanViolation::Capacity { recipient, limit, actual } => {
                write!(f, "recipient {recipient} receives {actual:.4}, above its capacity of {limit:.4}")
            }
            PlanViolation::NonPositive { donor, recipient, amount } => {
                write!(f, "donor {donor} -> recipient {recipient} has non-positive amount {amount}")
            }
            PlanViolation::UnknownParty { donor, recipient } => {
                write!(f, "donor {donor} -> recipient {recipient} is outside the model")
            }
        }
    }
}

/// Solver outcome plus the sparse list of active flows.
///
/// `allocations` is empty whenever `status` has no solution.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AllocationPlan {
    pub status: SolveStatus,
    pub allocations: Vec<Allocation>,
    /// `sum(distance * amount)` over `allocations`; `None` without a solution
    pub total_cost: Option<f64>,
}

impl AllocationPlan {
    pub(crate) fn failed(status: SolveStatus) -> Self {
        Self {
            status,
            allocations: Vec::new(),
            total_cost: None,
        }
    }

    pub fn status(&self) -> SolveStatus {
        self.status
    }

    pub fn allocations(&self) -> &[Allocation] {
        &self.allocations
    }

    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }

    pub fn into_parts(self) -> (Vec<Allocation>, SolveStatus) {
        (self.allocations, self.status)
    }

    pub fn total_cost(&self) -> Option<f64> {
        self.total_cost
    }

    pub fn total_donated(&self) -> f64 {
        self.allocations.iter().map(|a| a.donation_amount).sum()
    }

    pub fn donated_by(&self, donor: usize) -> f64 {
        self.allocations
            .iter()
            .filter(|a| a.donor_id == donor)
            .map(|a| a.donation_amount)
            .sum()
    }

    pub fn received_by(&self, recipient: usize) -> f64 {
        self.allocations
            .iter()
            .filter(|a| a.recipient_id == recipient)
            .map(|a| a.donation_amount)
            .sum()
    }

    /// Re-check the plan against the capacities it was solved for.
    ///
    /// Plans without a solution have nothing to check and always pass.
    pub fn check(&self, donor_capacities: &[f64], recipient_capacities: &[f64], tolerance: f64) -> Vec<PlanViolation> {
        let mut violations = Vec::new();
        if !self.status.has_solution() {
            return violations;
        }

        let mut given = vec![0.0; donor_capacities.len()];
        let mut received = vec![0.0; recipient_capacities.len()];

        for a in &self.allocations {
            if a.donation_amount <= 0.0 {
                violations.push(PlanViolation::NonPositive {
                    donor: a.donor_id,
                    recipient: a.recipient_id,
                    amount: a.donation_amount,
                });
            }
            match (given.get_mut(a.donor_id), received.get_mut(a.recipient_id)) {
                (Some(g), Some(r)) => {
                    *g += a.donation_amount;
                    *r += a.donation_amount;
                }
                _ => violations.push(PlanViolation::UnknownParty {
                    donor: a.donor_id,
                    recipient: a.recipient_id,
                }),
            }
        }

        for (donor, (&expected, &actual)) in donor_capacities.iter().zip(&given).enumerate() {
            if (actual - expected).abs() > tolerance {
                violations.push(PlanViolation::Conservation { donor, expected, actual });
            }
        }
        for (recipient, (&limit, &actual)) in recipient_capacities.iter().zip(&received).enumerate() {
            if actual > limit + tolerance {
                violations.push(PlanViolation::Capacity { recipient, limit, actual });
            }
        }

        violations
    }
}
