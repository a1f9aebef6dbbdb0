#![forbid(unsafe_code)]

mod aggregate;
mod calendar;
mod source;

use chrono_tz::Tz;
use thiserror::Error;
use tr_series::{Observation, Segment, Series, SeriesError, Window};
use tr_types::{PeriodError, RowDefinition, Timestamp, ValueKind};

pub use aggregate::{CategoricalAggregate, NumericAggregate};
pub use calendar::{CalendarField, CompositeFormat};
pub use source::{MemorySource, SeriesSource, SourceError, TagSeries};

/// Tag naming the row timestamp itself, e.g. `time.month`.
pub const TIME_TAG: &str = "time";

#[derive(Debug, Error)]
pub enum ReduceError {
    #[error("unknown field: {name}")]
    UnknownField { name: String },
    #[error("aggregate {field} does not apply to {kind} series {tag}")]
    NotApplicable {
        tag: String,
        field: String,
        kind: ValueKind,
    },
    #[error("{name} produces text, not numbers")]
    NotNumeric { name: String },
    #[error("{name} produces numbers, not text")]
    NotText { name: String },
    #[error("source query for tag {tag} failed: {source}")]
    Source {
        tag: String,
        #[source]
        source: SourceError,
    },
    #[error(transparent)]
    Period(#[from] PeriodError),
    #[error(transparent)]
    Series(#[from] SeriesError),
}

/// A `tag.field` variable name, split at the last `.`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReducerRef<'a> {
    pub tag: &'a str,
    pub field: &'a str,
}

impl<'a> ReducerRef<'a> {
    /// `None` unless both sides of the last `.` are non-empty.
    #[must_use]
    pub fn parse(name: &'a str) -> Option<Self> {
        let (tag, field) = name.rsplit_once('.')?;
        if tag.is_empty() || field.is_empty() {
            return None;
        }
        Some(Self { tag, field })
    }

    #[must_use]
    pub fn is_time(&self) -> bool {
        self.tag == TIME_TAG
    }

    /// Whether the reference names an alphanumeric column: a composite calendar
    /// format on the row timestamp, or a categorical `mode`.
    #[must_use]
    pub fn produces_text(&self) -> bool {
        if self.is_time() {
            if self.field.parse::<CompositeFormat>().is_ok() {
                return true;
            }
            if self.field.parse::<CalendarField>().is_ok() {
                return false;
            }
        }
        self.field
            .parse::<CategoricalAggregate>()
            .is_ok_and(CategoricalAggregate::is_text)
    }
}

/// Resolves `tag.field` names to one value per row of a [`RowDefinition`].
///
/// Calendar fields of the reserved [`TIME_TAG`] win over a series with the
/// same tag; every other tag is queried from the source once per call over the
/// whole row range and reduced per row bucket.
pub struct Reducer<S> {
    source: S,
    rows: RowDefinition,
    tz: Tz,
    buckets: Vec<(Timestamp, Timestamp)>,
}

impl<S: SeriesSource> Reducer<S> {
    pub fn new(source: S, rows: RowDefinition, tz: Tz) -> Result<Self, ReduceError> {
        let buckets = rows.buckets(tz)?;
        Ok(Self {
            source,
            rows,
            tz,
            buckets,
        })
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.buckets.len()
    }

    #[must_use]
    pub fn timestamps(&self) -> Vec<Timestamp> {
        self.buckets.iter().map(|(start, _)| *start).collect()
    }

    #[must_use]
    pub fn rows(&self) -> &RowDefinition {
        &self.rows
    }

    #[must_use]
    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn numeric(&self, name: &str) -> Result<Vec<f64>, ReduceError> {
        let reference = ReducerRef::parse(name).ok_or_else(|| unknown(name))?;

        if reference.is_time() {
            if let Ok(field) = reference.field.parse::<CalendarField>() {
                self.trace(name, "calendar");
                return Ok(self
                    .buckets
                    .iter()
                    .map(|(start, _)| field.value(*start, self.tz))
                    .collect());
            }
            if reference.field.parse::<CompositeFormat>().is_ok() {
                return Err(ReduceError::NotNumeric {
                    name: name.to_owned(),
                });
            }
        }

        match self.query(reference.tag)? {
            None => Err(unknown(name)),
            Some(TagSeries::Numeric(series)) => {
                let Ok(aggregate) = reference.field.parse::<NumericAggregate>() else {
                    return Err(mismatch(reference, name, ValueKind::Numeric));
                };
                self.trace(name, "numeric");
                let segments = self.row_segments(&series)?;
                Ok(segments.iter().map(|s| aggregate.reduce(s)).collect())
            }
            Some(TagSeries::Categorical(series)) => {
                let Ok(aggregate) = reference.field.parse::<CategoricalAggregate>() else {
                    return Err(mismatch(reference, name, ValueKind::Categorical));
                };
                if aggregate.is_text() {
                    return Err(ReduceError::NotNumeric {
                        name: name.to_owned(),
                    });
                }
                self.trace(name, "categorical");
                let segments = self.row_segments(&series)?;
                Ok(segments.iter().map(|s| aggregate.reduce(s)).collect())
            }
        }
    }

    pub fn text(&self, name: &str) -> Result<Vec<String>, ReduceError> {
        let reference = ReducerRef::parse(name).ok_or_else(|| unknown(name))?;
        let not_text = || ReduceError::NotText {
            name: name.to_owned(),
        };

        if reference.is_time() {
            if let Ok(format) = reference.field.parse::<CompositeFormat>() {
                self.trace(name, "composite");
                return Ok(self
                    .buckets
                    .iter()
                    .map(|(start, _)| format.render(*start, self.tz))
                    .collect());
            }
            if reference.field.parse::<CalendarField>().is_ok() {
                return Err(not_text());
            }
        }

        match self.query(reference.tag)? {
            None => Err(unknown(name)),
            Some(TagSeries::Categorical(series)) => {
                match reference.field.parse::<CategoricalAggregate>() {
                    Ok(CategoricalAggregate::Mode) => {
                        self.trace(name, "mode");
                        let segments = self.row_segments(&series)?;
                        Ok(segments.iter().map(CategoricalAggregate::mode).collect())
                    }
                    Ok(_) => Err(not_text()),
                    Err(()) => Err(mismatch(reference, name, ValueKind::Categorical)),
                }
            }
            Some(TagSeries::Numeric(_)) => match reference.field.parse::<NumericAggregate>() {
                Ok(_) => Err(not_text()),
                Err(()) => Err(mismatch(reference, name, ValueKind::Numeric)),
            },
        }
    }

    fn query(&self, tag: &str) -> Result<Option<TagSeries>, ReduceError> {
        self.source
            .query(tag, self.rows.from, self.rows.to)
            .map_err(|source| ReduceError::Source {
                tag: tag.to_owned(),
                source,
            })
    }

    /// One segment per row bucket. A series bounded exactly by the row range is
    /// tiled directly; any other bounds fall back to one window per bucket.
    fn row_segments<'s, T>(&self, series: &'s Series<T>) -> Result<Vec<Segment<'s, T>>, ReduceError>
    where
        T: Observation,
    {
        if series.from() == self.rows.from && series.to() == self.rows.to {
            let segments = series.segments(self.rows.period, self.tz)?;
            if segments.len() == self.buckets.len() {
                return Ok(segments);
            }
        }
        Ok(self
            .buckets
            .iter()
            .map(|(start, end)| series.window(*start, *end))
            .collect())
    }

    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn trace(&self, name: &str, kind: &'static str) {
        #[cfg(feature = "tracing")]
        tracing::debug!(name, kind, rows = self.buckets.len(), "resolving reducer");
    }
}

fn unknown(name: &str) -> ReduceError {
    ReduceError::UnknownField {
        name: name.to_owned(),
    }
}

/// An aggregate known for the other series kind is not applicable; anything
/// else is an unknown field.
fn mismatch(reference: ReducerRef<'_>, name: &str, kind: ValueKind) -> ReduceError {
    let known = reference.field.parse::<NumericAggregate>().is_ok()
        || reference.field.parse::<CategoricalAggregate>().is_ok();
    if !known {
        return unknown(name);
    }
    ReduceError::NotApplicable {
        tag: reference.tag.to_owned(),
        field: reference.field.to_owned(),
        kind,
    }
}
