#![forbid(unsafe_code)]

mod ast;
mod calc;
mod function;
mod lexer;
mod parser;

use thiserror::Error;

pub use ast::Expr;
pub use calc::{Calculator, ResolveError, Resolver};
pub use function::{NamedConstant, UnaryFunction};
pub use lexer::{Token, TokenKind, Tokenizer, tokenize};
pub use parser::{MAX_EXPR_DEPTH, parse_expr};

#[derive(Debug, Error)]
pub enum ExprError {
    #[error("parse error at offset {offset}: {message}")]
    Parse { offset: usize, message: String },
    #[error("unknown operator '{symbol}' at offset {offset}")]
    UnknownOperator { symbol: char, offset: usize },
    #[error("unbalanced parenthesis at offset {offset}")]
    UnbalancedParenthesis { offset: usize },
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    #[error("unknown variable: {0}")]
    UnknownVariable(String),
    #[error("variable {name} resolved to {actual} values, expected {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("failed to resolve variable {name}: {source}")]
    Resolve {
        name: String,
        #[source]
        source: ResolveError,
    },
}

/// Parses `formula` and evaluates it over `rows` rows in one step.
pub fn eval_str<R>(formula: &str, rows: usize, resolver: &mut R) -> Result<Vec<f64>, ExprError>
where
    R: Resolver + ?Sized,
{
    let expr = parse_expr(formula)?;
    Calculator::new(rows).evaluate(&expr, resolver)
}
