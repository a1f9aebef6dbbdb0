use tr_expr::{Calculator, ResolveError, TokenKind, parse_expr, tokenize};
use tr_filter::apply_chain;
use tr_reduce::{ReduceError, Reducer, ReducerRef, SeriesSource};

use crate::definition::{ColumnDefinition, ViewDefinition};
use crate::view::{ColumnValues, View};
use crate::ViewError;

/// Builds [`View`]s from definitions against one series source.
///
/// Columns are computed left to right; a formula may reference any column
/// declared before it by name. A column whose whole formula is a text-valued
/// reference (`time.ymd`, `sky.mode`) skips the calculator and yields text.
#[derive(Debug, Clone)]
pub struct ViewBuilder<S> {
    source: S,
}

impl<S: SeriesSource> ViewBuilder<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn build(&self, definition: &ViewDefinition) -> Result<View, ViewError> {
        if let Some(name) = definition.duplicate_column() {
            return Err(ViewError::DuplicateColumn(name.to_owned()));
        }

        let reducer = Reducer::new(&self.source, definition.rows, definition.timezone)
            .map_err(ViewError::Rows)?;
        let mut calculator = Calculator::new(reducer.row_count());
        let mut columns: Vec<(String, ColumnValues)> = Vec::with_capacity(definition.columns.len());

        #[cfg(feature = "tracing")]
        tracing::debug!(
            rows = reducer.row_count(),
            columns = definition.columns.len(),
            timezone = definition.timezone.name(),
            "building view"
        );

        for column in &definition.columns {
            let values = compute_column(column, &reducer, &mut calculator, &columns)?;

            #[cfg(feature = "tracing")]
            tracing::debug!(
                column = column.name.as_str(),
                kind = match values {
                    ColumnValues::Numeric(_) => "numeric",
                    ColumnValues::Text(_) => "text",
                },
                filters = column.filters.len(),
                "computed column"
            );

            columns.push((column.name.clone(), values));
        }

        Ok(View::new(reducer.timestamps(), columns))
    }
}

fn compute_column<S: SeriesSource>(
    column: &ColumnDefinition,
    reducer: &Reducer<S>,
    calculator: &mut Calculator,
    computed: &[(String, ColumnValues)],
) -> Result<ColumnValues, ViewError> {
    if let Some(text) = text_column(column, reducer, computed)? {
        if !column.filters.is_empty() {
            return Err(ViewError::FiltersOnText {
                column: column.name.clone(),
            });
        }
        return Ok(ColumnValues::Text(text));
    }

    let expr_error = |source| ViewError::Expr {
        column: column.name.clone(),
        source,
    };
    let expr = parse_expr(&column.calc).map_err(expr_error)?;
    let mut resolver = |name: &str| -> Result<Option<Vec<f64>>, ResolveError> {
        match lookup(computed, name) {
            Some(ColumnValues::Numeric(values)) => return Ok(Some(values.clone())),
            Some(ColumnValues::Text(_)) => {
                return Err(format!("column {name} holds text").into());
            }
            None => {}
        }
        match reducer.numeric(name) {
            Ok(values) => Ok(Some(values)),
            Err(ReduceError::UnknownField { .. }) => Ok(None),
            Err(err) => Err(Box::new(err)),
        }
    };
    let values = calculator
        .evaluate(&expr, &mut resolver)
        .map_err(expr_error)?;
    Ok(ColumnValues::Numeric(apply_chain(&column.filters, values)))
}

/// Text values when the whole formula is one text-valued name: an earlier
/// text column, a composite calendar format or a categorical `mode`.
fn text_column<S: SeriesSource>(
    column: &ColumnDefinition,
    reducer: &Reducer<S>,
    computed: &[(String, ColumnValues)],
) -> Result<Option<Vec<String>>, ViewError> {
    let tokens = tokenize(&column.calc);
    let [token] = tokens.as_slice() else {
        return Ok(None);
    };
    let TokenKind::Identifier(name) = &token.kind else {
        return Ok(None);
    };

    match lookup(computed, name) {
        Some(ColumnValues::Text(values)) => return Ok(Some(values.clone())),
        Some(ColumnValues::Numeric(_)) => return Ok(None),
        None => {}
    }
    if !ReducerRef::parse(name).is_some_and(|reference| reference.produces_text()) {
        return Ok(None);
    }
    reducer
        .text(name)
        .map(Some)
        .map_err(|source| ViewError::Reduce {
            column: column.name.clone(),
            source,
        })
}

fn lookup<'a>(computed: &'a [(String, ColumnValues)], name: &str) -> Option<&'a ColumnValues> {
    computed
        .iter()
        .find(|(column, _)| column == name)
        .map(|(_, values)| values)
}
