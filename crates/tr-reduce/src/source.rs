use std::collections::BTreeMap;
use std::error::Error;

use serde::{Deserialize, Serialize};
use tr_series::{Series, SeriesError, Window};
use tr_types::{Timestamp, ValueKind};

pub type SourceError = Box<dyn Error + Send + Sync>;

/// History of one tag, as answered by a [`SeriesSource`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "series", rename_all = "snake_case")]
pub enum TagSeries {
    Numeric(Series<f64>),
    Categorical(Series<String>),
}

impl TagSeries {
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Numeric(_) => ValueKind::Numeric,
            Self::Categorical(_) => ValueKind::Categorical,
        }
    }

    #[must_use]
    pub fn from(&self) -> Timestamp {
        match self {
            Self::Numeric(series) => series.from(),
            Self::Categorical(series) => series.from(),
        }
    }

    #[must_use]
    pub fn to(&self) -> Timestamp {
        match self {
            Self::Numeric(series) => series.to(),
            Self::Categorical(series) => series.to(),
        }
    }

    #[must_use]
    pub fn count(&self) -> usize {
        match self {
            Self::Numeric(series) => series.count(),
            Self::Categorical(series) => series.count(),
        }
    }

    /// Copies the readings inside `[from, to)` into a series bounded by exactly that range.
    pub fn slice(&self, from: Timestamp, to: Timestamp) -> Result<Self, SeriesError> {
        Ok(match self {
            Self::Numeric(series) => Self::Numeric(slice(series, from, to)?),
            Self::Categorical(series) => Self::Categorical(slice(series, from, to)?),
        })
    }
}

fn slice<T: tr_series::Observation>(
    series: &Series<T>,
    from: Timestamp,
    to: Timestamp,
) -> Result<Series<T>, SeriesError> {
    let inside = series
        .points()
        .iter()
        .filter(|p| p.instant() >= from && p.instant() < to)
        .cloned()
        .collect();
    Series::new(from, to, inside)
}

/// Range-query capability of the per-entity history store.
///
/// `Ok(None)` means the tag is unknown. A returned series should be bounded by
/// the queried range; readings outside it are ignored by the reducers.
pub trait SeriesSource {
    fn query(
        &self,
        tag: &str,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Option<TagSeries>, SourceError>;
}

impl<S: SeriesSource + ?Sized> SeriesSource for &S {
    fn query(
        &self,
        tag: &str,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Option<TagSeries>, SourceError> {
        (**self).query(tag, from, to)
    }
}

/// In-memory tag store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemorySource {
    tags: BTreeMap<String, TagSeries>,
}

impl MemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: impl Into<String>, series: TagSeries) -> Option<TagSeries> {
        self.tags.insert(tag.into(), series)
    }

    #[must_use]
    pub fn with(mut self, tag: impl Into<String>, series: TagSeries) -> Self {
        self.insert(tag, series);
        self
    }

    #[must_use]
    pub fn tags(&self) -> Vec<&str> {
        self.tags.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub fn get(&self, tag: &str) -> Option<&TagSeries> {
        self.tags.get(tag)
    }
}

impl SeriesSource for MemorySource {
    fn query(
        &self,
        tag: &str,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Option<TagSeries>, SourceError> {
        let Some(series) = self.tags.get(tag) else {
            return Ok(None);
        };
        Ok(Some(series.slice(from, to.max(from))?))
    }
}
