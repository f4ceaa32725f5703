use thiserror::Error;

/// Handle to a variable inside an [`LpProblem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VarId(usize);

impl VarId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle to a constraint inside an [`LpProblem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConstraintId(usize);

impl ConstraintId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Variable {name} has invalid bounds [{lower}, {upper}]")]
    InvalidVariableBounds { name: String, lower: f64, upper: f64 },
    #[error("Variable {0} has no finite lower bound")]
    UnboundedBelow(String),
    #[error("Constraint {name} has invalid bounds [{lower}, {upper}]")]
    InvalidConstraintBounds { name: String, lower: f64, upper: f64 },
    #[error("Non-finite coefficient {value} for {variable} in {context}")]
    NonFiniteCoefficient { context: String, variable: String, value: f64 },
    #[error("Unknown variable index {0}")]
    UnknownVariable(usize),
    #[error("Objective has {found} coefficients for {expected} variables")]
    ObjectiveSize { expected: usize, found: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Sense {
    #[default]
    Minimize,
    Maximize,
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub lower: f64,
    pub upper: f64,
}

/// A range constraint `lower <= sum(coef * x) <= upper`.
///
/// Equality is expressed as `lower == upper`; an open side uses an infinity.
#[derive(Debug, Clone)]
pub struct Constraint {
    /// Name/label for the constraint (for diagnostics)
    pub name: String,
    pub lower: f64,
    pub upper: f64,
    /// Sparse (variable, coefficient) pairs
    pub coefficients: Vec<(VarId, f64)>,
}

impl Constraint {
    pub fn coefficient(&self, var: VarId) -> f64 {
        self.coefficients
            .iter()
            .find(|(v, _)| *v == var)
            .map(|&(_, c)| c)
            .unwrap_or(0.0)
    }

    pub fn is_equality(&self) -> bool {
        self.lower == self.upper
    }
}

#[derive(Debug, Clone, Default)]
pub struct Objective {
    /// One coefficient per variable, indexed by [`VarId::index`]
    pub coefficients: Vec<f64>,
    pub sense: Sense,
}

/// Represents a linear programming problem
#[derive(Debug, Clone, Default)]
pub struct LpProblem {
    pub name: String,
    pub variables: Vec<Variable>,
    pub constraints: Vec<Constraint>,
    pub objective: Objective,
}

impl LpProblem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn add_variable(&mut self, name: impl Into<String>, lower: f64, upper: f64) -> VarId {
        self.variables.push(Variable {
            name: name.into(),
            lower,
            upper,
        });
        self.objective.coefficients.push(0.0);
        VarId(self.variables.len() - 1)
    }

    pub fn add_constraint(&mut self, name: impl Into<String>, lower: f64, upper: f64) -> ConstraintId {
        self.constraints.push(Constraint {
            name: name.into(),
            lower,
            upper,
            coefficients: Vec::new(),
        });
        ConstraintId(self.constraints.len() - 1)
    }

    /// Set the coefficient of `var` in `constraint`, replacing any earlier value.
    ///
    /// # Panics
    ///
    /// Panics if `constraint` was not created by this problem.
    pub fn set_coefficient(&mut self, constraint: ConstraintId, var: VarId, coefficient: f64) {
        upsert(&mut self.constraints[constraint.0].coefficients, var, coefficient);
    }

    /// # Panics
    ///
    /// Panics if `var` was not created by this problem.
    pub fn set_objective_coefficient(&mut self, var: VarId, coefficient: f64) {
        self.objective.coefficients[var.0] = coefficient;
    }

    pub fn set_sense(&mut self, sense: Sense) {
        self.objective.sense = sense;
    }

    pub fn set_minimization(&mut self) {
        self.set_sense(Sense::Minimize);
    }

    pub fn set_maximization(&mut self) {
        self.set_sense(Sense::Maximize);
    }

    pub fn variable(&self, var: VarId) -> &Variable {
        &self.variables[var.0]
    }

    pub fn constraint(&self, constraint: ConstraintId) -> &Constraint {
        &self.constraints[constraint.0]
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Objective coefficients, one per variable.
    pub fn objective_coefficients(&self) -> &[f64] {
        &self.objective.coefficients
    }

    /// Check that the model is something the simplex can represent.
    pub fn validate(&self) -> Result<(), ModelError> {
        for v in &self.variables {
            if v.lower.is_nan() || v.upper.is_nan() || v.lower > v.upper || v.lower == f64::INFINITY {
                return Err(ModelError::InvalidVariableBounds {
                    name: v.name.clone(),
                    lower: v.lower,
                    upper: v.upper,
                });
            }
            if v.lower == f64::NEG_INFINITY {
                return Err(ModelError::UnboundedBelow(v.name.clone()));
            }
        }

        for c in &self.constraints {
            if c.lower.is_nan()
                || c.upper.is_nan()
                || c.lower > c.upper
                || c.lower == f64::INFINITY
                || c.upper == f64::NEG_INFINITY
            {
                return Err(ModelError::InvalidConstraintBounds {
                    name: c.name.clone(),
                    lower: c.lower,
                    upper: c.upper,
                });
            }
            self.check_coefficients(&c.name, &c.coefficients)?;
        }

        if self.objective.coefficients.len() != self.variables.len() {
            return Err(ModelError::ObjectiveSize {
                expected: self.variables.len(),
                found: self.objective.coefficients.len(),
            });
        }
        for (v, &coef) in self.variables.iter().zip(&self.objective.coefficients) {
            if !coef.is_finite() {
                return Err(ModelError::NonFiniteCoefficient {
                    context: "objective".to_string(),
                    variable: v.name.clone(),
                    value: coef,
                });
            }
        }
        Ok(())
    }

    fn check_coefficients(&self, context: &str, coefficients: &[(VarId, f64)]) -> Result<(), ModelError> {
        for &(var, coef) in coefficients {
            let variable = self
                .variables
                .get(var.0)
                .ok_or(ModelError::UnknownVariable(var.0))?;
            if !coef.is_finite() {
                return Err(ModelError::NonFiniteCoefficient {
                    context: context.to_string(),
                    variable: variable.name.clone(),
                    value: coef,
                });
            }
        }
        Ok(())
    }
}

fn upsert(coefficients: &mut Vec<(VarId, f64)>, var: VarId, coefficient: f64) {
    match coefficients.iter_mut().find(|(v, _)| *v == var) {
        Some(slot) => slot.1 = coefficient,
        None => coefficients.push((var, coefficient)),
    }
}
