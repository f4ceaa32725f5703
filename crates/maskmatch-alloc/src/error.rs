use thiserror::Error;

/// Input problems detected before the solver is ever called.
///
/// Solver outcomes such as infeasibility are not errors; they come back as a
/// [`SolveStatus`](crate::SolveStatus) on the plan.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AllocationError {
    #[error("Invalid model: {0}")]
    InvalidModel(String),
    #[error("Missing cost entry for donor {donor} and recipient {recipient}")]
    MissingCostData { donor: usize, recipient: usize },
    #[error("Invalid cost label '{0}', expected d<donor>_r<recipient>")]
    InvalidCostLabel(String),
}
