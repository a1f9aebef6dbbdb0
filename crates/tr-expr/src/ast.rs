use std::fmt;

use serde::{Deserialize, Serialize};

/// Parsed formula. Nodes carry no evaluation state; values are produced by a
/// [`Calculator`](crate::Calculator) on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expr {
    Constant {
        value: f64,
    },
    Variable {
        name: String,
    },
    Function {
        name: String,
        operand: Box<Expr>,
    },
    Sum {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Subtraction {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Product {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Division {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Modulo {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Factorial {
        operand: Box<Expr>,
    },
}

impl Expr {
    #[must_use]
    pub fn constant(value: f64) -> Self {
        Self::Constant { value }
    }

    #[must_use]
    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable { name: name.into() }
    }

    /// Names of every variable the formula reads, in first-seen order.
    #[must_use]
    pub fn variables(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Constant { .. } => {}
            Self::Variable { name } => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Self::Function { operand, .. } | Self::Factorial { operand } => {
                operand.collect_variables(out);
            }
            Self::Sum { left, right }
            | Self::Subtraction { left, right }
            | Self::Product { left, right }
            | Self::Division { left, right }
            | Self::Modulo { left, right } => {
                left.collect_variables(out);
                right.collect_variables(out);
            }
        }
    }
}

/// Canonical tree form, e.g. `Div[Var[A], Sub[Var[B], Const[12.5]]]`.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant { value } => write!(f, "Const[{value:?}]"),
            Self::Variable { name } => write!(f, "Var[{name}]"),
            Self::Function { name, operand } => write!(f, "Fn[{name}, {operand}]"),
            Self::Sum { left, right } => write!(f, "Sum[{left}, {right}]"),
            Self::Subtraction { left, right } => write!(f, "Sub[{left}, {right}]"),
            Self::Product { left, right } => write!(f, "Mul[{left}, {right}]"),
            Self::Division { left, right } => write!(f, "Div[{left}, {right}]"),
            Self::Modulo { left, right } => write!(f, "Mod[{left}, {right}]"),
            Self::Factorial { operand } => write!(f, "Fact[{operand}]"),
        }
    }
}
