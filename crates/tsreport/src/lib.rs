#![forbid(unsafe_code)]

//! Time-series reports.
//!
//! A [`ViewDefinition`] names a row bucketing ([`RowDefinition`]) and a list of
//! columns. Each column is a formula over `tag.field` reducers (`temperature.mean`,
//! `sky.mode`, `time.month`) and earlier columns, followed by an optional
//! [`Filter`] chain. [`ViewBuilder`] evaluates the definition against a
//! [`SeriesSource`] and returns a [`View`] that renders as tab-separated text.

pub use tr_expr::{
    Calculator, Expr, ExprError, MAX_EXPR_DEPTH, NamedConstant, ResolveError, Resolver, Token,
    TokenKind, Tokenizer, UnaryFunction, eval_str, parse_expr, tokenize,
};
pub use tr_filter::{Filter, FilterError, WindowSize, apply_chain};
pub use tr_reduce::{
    CalendarField, CategoricalAggregate, CompositeFormat, MemorySource, NumericAggregate,
    ReduceError, Reducer, ReducerRef, SeriesSource, SourceError, TIME_TAG, TagSeries,
};
pub use tr_series::{
    COMPRESSION, CategoricalSignal, CategoricalSummary, Distribution,
    NumericSummary, NumericWindow, NumericalSignal, Observation, Segment, Series, SeriesError,
    Summary, Window,
};
pub use tr_types::{
    FeedId, Period, PeriodError, PeriodUnit, Point, RowDefinition, Timestamp, ValueKind,
};
pub use tr_view::{ColumnDefinition, ColumnValues, View, ViewBuilder, ViewDefinition, ViewError};
