use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tr_filter::Filter;
use tr_types::RowDefinition;

use crate::ViewError;

/// One output column: a formula (or a bare `tag.field` shorthand) plus the
/// filters applied to its values in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub calc: String,
    #[serde(default)]
    pub filters: Vec<Filter>,
}

impl ColumnDefinition {
    #[must_use]
    pub fn new(name: impl Into<String>, calc: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            calc: calc.into(),
            filters: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewDefinition {
    pub rows: RowDefinition,
    pub columns: Vec<ColumnDefinition>,
    /// IANA zone driving calendar periods and calendar fields.
    #[serde(default = "utc", with = "tz_name")]
    pub timezone: Tz,
}

fn utc() -> Tz {
    Tz::UTC
}

impl ViewDefinition {
    #[must_use]
    pub fn new(rows: RowDefinition, columns: Vec<ColumnDefinition>) -> Self {
        Self {
            rows,
            columns,
            timezone: Tz::UTC,
        }
    }

    #[must_use]
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    /// Loads `{ "rows": {..}, "columns": [..], "timezone": ".." }`.
    pub fn from_json_str(input: &str) -> Result<Self, ViewError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn to_json_string(&self) -> Result<String, ViewError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// First column name used more than once, if any.
    #[must_use]
    pub fn duplicate_column(&self) -> Option<&str> {
        self.columns.iter().enumerate().find_map(|(i, column)| {
            self.columns[..i]
                .iter()
                .any(|earlier| earlier.name == column.name)
                .then_some(column.name.as_str())
        })
    }
}

mod tz_name {
    use chrono_tz::Tz;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(tz: &Tz, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(tz.name())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Tz, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse()
            .map_err(|_| de::Error::custom(format!("unknown time zone: {name}")))
    }
}
