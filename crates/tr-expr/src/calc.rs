use std::error::Error;

use rand::Rng;

use crate::ExprError;
use crate::ast::Expr;
use crate::function::{NamedConstant, UnaryFunction};

pub type ResolveError = Box<dyn Error + Send + Sync>;

/// Largest n whose factorial is finite in f64.
const MAX_FACTORIAL: usize = 170;

/// Supplies the row values of a variable.
///
/// `Ok(None)` means the name is unknown to the resolver; the calculator then
/// reports [`ExprError::UnknownVariable`].
pub trait Resolver {
    fn resolve(&mut self, name: &str) -> Result<Option<Vec<f64>>, ResolveError>;
}

impl<F> Resolver for F
where
    F: FnMut(&str) -> Result<Option<Vec<f64>>, ResolveError>,
{
    fn resolve(&mut self, name: &str) -> Result<Option<Vec<f64>>, ResolveError> {
        self(name)
    }
}

/// Elementwise evaluator of [`Expr`] trees over a fixed row count.
///
/// Factorials are memoised per calculator, so one calculator per view keeps
/// repeated `n!` lookups cheap without sharing state across views.
#[derive(Debug, Clone)]
pub struct Calculator {
    rows: usize,
    factorials: Vec<f64>,
}

impl Calculator {
    #[must_use]
    pub fn new(rows: usize) -> Self {
        Self {
            rows,
            factorials: vec![1.0],
        }
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn evaluate<R>(&mut self, expr: &Expr, resolver: &mut R) -> Result<Vec<f64>, ExprError>
    where
        R: Resolver + ?Sized,
    {
        match expr {
            Expr::Constant { value } => Ok(vec![*value; self.rows]),
            Expr::Variable { name } => self.variable(name, resolver),
            Expr::Function { name, operand } => {
                let function = UnaryFunction::lookup(name)
                    .ok_or_else(|| ExprError::UnknownFunction(name.clone()))?;
                let mut values = self.evaluate(operand, resolver)?;
                for v in &mut values {
                    *v = function.apply(*v);
                }
                Ok(values)
            }
            Expr::Factorial { operand } => {
                let mut values = self.evaluate(operand, resolver)?;
                for v in &mut values {
                    *v = self.factorial(*v);
                }
                Ok(values)
            }
            Expr::Sum { left, right } => self.binary(left, right, resolver, |a, b| a + b),
            Expr::Subtraction { left, right } => self.binary(left, right, resolver, |a, b| a - b),
            Expr::Product { left, right } => self.binary(left, right, resolver, |a, b| a * b),
            Expr::Division { left, right } => self.binary(left, right, resolver, |a, b| a / b),
            Expr::Modulo { left, right } => self.binary(left, right, resolver, |a, b| a % b),
        }
    }

    fn variable<R>(&mut self, name: &str, resolver: &mut R) -> Result<Vec<f64>, ExprError>
    where
        R: Resolver + ?Sized,
    {
        if let Some(constant) = NamedConstant::lookup(name) {
            return Ok(match constant.value() {
                Some(value) => vec![value; self.rows],
                None => {
                    let mut rng = rand::thread_rng();
                    (0..self.rows).map(|_| rng.gen_range(0.0..1.0)).collect()
                }
            });
        }

        let values = resolver
            .resolve(name)
            .map_err(|source| ExprError::Resolve {
                name: name.to_owned(),
                source,
            })?
            .ok_or_else(|| ExprError::UnknownVariable(name.to_owned()))?;
        if values.len() != self.rows {
            return Err(ExprError::LengthMismatch {
                name: name.to_owned(),
                expected: self.rows,
                actual: values.len(),
            });
        }
        Ok(values)
    }

    fn binary<R>(
        &mut self,
        left: &Expr,
        right: &Expr,
        resolver: &mut R,
        op: impl Fn(f64, f64) -> f64,
    ) -> Result<Vec<f64>, ExprError>
    where
        R: Resolver + ?Sized,
    {
        let mut values = self.evaluate(left, resolver)?;
        let rhs = self.evaluate(right, resolver)?;
        for (a, b) in values.iter_mut().zip(rhs) {
            *a = op(*a, b);
        }
        Ok(values)
    }

    /// `n!` of the truncated argument: NaN below zero, +inf above 170.
    fn factorial(&mut self, x: f64) -> f64 {
        if x.is_nan() || x < 0.0 {
            return f64::NAN;
        }
        let n = x.trunc();
        if n > MAX_FACTORIAL as f64 {
            return f64::INFINITY;
        }
        let n = n as usize;
        while self.factorials.len() <= n {
            let k = self.factorials.len();
            let previous = self.factorials[k - 1];
            self.factorials.push(previous * k as f64);
        }
        self.factorials[n]
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{Calculator, ResolveError};
    use crate::{ExprError, parse_expr};

    fn table(entries: Vec<(&str, Vec<f64>)>) -> BTreeMap<String, Vec<f64>> {
        entries
            .into_iter()
            .map(|(name, values)| (name.to_owned(), values))
            .collect()
    }

    fn eval(
        formula: &str,
        rows: usize,
        vars: &BTreeMap<String, Vec<f64>>,
    ) -> Result<Vec<f64>, ExprError> {
        let expr = parse_expr(formula)?;
        let mut resolver = |name: &str| -> Result<Option<Vec<f64>>, ResolveError> {
            Ok(vars.get(name).cloned())
        };
        Calculator::new(rows).evaluate(&expr, &mut resolver)
    }

    #[test]
    fn evaluates_elementwise() {
        let vars = table(vec![("A", vec![10.0, 20.0]), ("B", vec![14.5, 12.5])]);
        let out = eval("A / (B - 12.5)", 2, &vars).expect("eval");
        assert_eq!(out[0], 5.0);
        assert_eq!(out[1], f64::INFINITY);
    }

    #[test]
    fn constants_broadcast_to_row_count() {
        let vars = BTreeMap::new();
        assert_eq!(eval("1 + 2 * 3", 3, &vars).expect("eval"), vec![7.0; 3]);
        assert_eq!(eval("7 % 4", 1, &vars).expect("eval"), vec![3.0]);
        let pi = eval("PI", 2, &vars).expect("eval");
        assert_eq!(pi, vec![std::f64::consts::PI; 2]);
    }

    #[test]
    fn random_draws_unit_interval_per_row() {
        let vars = BTreeMap::new();
        let out = eval("RANDOM", 64, &vars).expect("eval");
        assert_eq!(out.len(), 64);
        assert!(out.iter().all(|v| (0.0..1.0).contains(v)));
    }

    #[test]
    fn factorial_truncates_and_saturates() {
        let vars = table(vec![("N", vec![5.0, 5.9, 0.0, -1.0, 171.0, f64::NAN])]);
        let out = eval("N!", 6, &vars).expect("eval");
        assert_eq!(&out[..3], &[120.0, 120.0, 1.0]);
        assert!(out[3].is_nan());
        assert_eq!(out[4], f64::INFINITY);
        assert!(out[5].is_nan());

        let largest = eval("170!", 1, &vars).expect("eval");
        assert!(largest[0].is_finite());
    }

    #[test]
    fn functions_apply_per_element() {
        let vars = table(vec![("x", vec![4.0, 9.0])]);
        assert_eq!(eval("sqrt(x) + 1", 2, &vars).expect("eval"), vec![3.0, 4.0]);
        assert!(matches!(
            eval("median(x)", 2, &vars),
            Err(ExprError::UnknownFunction(name)) if name == "median"
        ));
    }

    #[test]
    fn unknown_variables_and_bad_lengths_fail() {
        let vars = table(vec![("short", vec![1.0])]);
        assert!(matches!(
            eval("missing + 1", 2, &vars),
            Err(ExprError::UnknownVariable(name)) if name == "missing"
        ));
        assert!(matches!(
            eval("short * 2", 2, &vars),
            Err(ExprError::LengthMismatch {
                expected: 2,
                actual: 1,
                ..
            })
        ));
    }

    #[test]
    fn resolver_failures_carry_the_variable_name() {
        let expr = parse_expr("a.b + 1").expect("parse");
        let mut failing =
            |_: &str| -> Result<Option<Vec<f64>>, ResolveError> { Err("backend offline".into()) };
        let err = Calculator::new(1)
            .evaluate(&expr, &mut failing)
            .expect_err("must fail");
        assert!(matches!(&err, ExprError::Resolve { name, .. } if name == "a.b"));
        assert_eq!(err.to_string(), "failed to resolve variable a.b: backend offline");
    }
}
