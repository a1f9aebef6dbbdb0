#![forbid(unsafe_code)]

mod builder;
mod definition;
mod view;

use thiserror::Error;
use tr_expr::ExprError;
use tr_reduce::ReduceError;

pub use builder::ViewBuilder;
pub use definition::{ColumnDefinition, ViewDefinition};
pub use view::{ColumnValues, View};

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("invalid view definition: {0}")]
    Definition(#[from] serde_json::Error),
    #[error("invalid row definition: {0}")]
    Rows(#[source] ReduceError),
    #[error("duplicate column name: {0}")]
    DuplicateColumn(String),
    #[error("column {column}: {source}")]
    Expr {
        column: String,
        #[source]
        source: ExprError,
    },
    #[error("column {column}: {source}")]
    Reduce {
        column: String,
        #[source]
        source: ReduceError,
    },
    #[error("column {column} holds text and cannot take numeric filters")]
    FiltersOnText { column: String },
}

impl ViewError {
    /// Name of the column that failed, when the failure belongs to one.
    #[must_use]
    pub fn column(&self) -> Option<&str> {
        match self {
            Self::Expr { column, .. }
            | Self::Reduce { column, .. }
            | Self::FiltersOnText { column } => Some(column),
            Self::DuplicateColumn(column) => Some(column),
            Self::Definition(_) | Self::Rows(_) => None,
        }
    }
}
