use serde::Serialize;
use tr_types::Timestamp;

/// Values of one output column, one entry per row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum ColumnValues {
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

impl ColumnValues {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(values) => values.len(),
            Self::Text(values) => values.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            Self::Numeric(values) => Some(values),
            Self::Text(_) => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&[String]> {
        match self {
            Self::Text(values) => Some(values),
            Self::Numeric(_) => None,
        }
    }

    /// TSV cell for `row`: NaN and missing rows render empty; tabs and line
    /// breaks inside text become spaces.
    #[must_use]
    pub fn cell(&self, row: usize) -> String {
        match self {
            Self::Numeric(values) => match values.get(row) {
                Some(v) if !v.is_nan() => v.to_string(),
                _ => String::new(),
            },
            Self::Text(values) => values
                .get(row)
                .map(|text| text.replace(['\t', '\n', '\r'], " "))
                .unwrap_or_default(),
        }
    }
}

/// Finished report: row timestamps plus named columns in declared order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct View {
    timestamps: Vec<Timestamp>,
    columns: Vec<(String, ColumnValues)>,
}

impl View {
    pub(crate) fn new(timestamps: Vec<Timestamp>, columns: Vec<(String, ColumnValues)>) -> Self {
        Self {
            timestamps,
            columns,
        }
    }

    #[must_use]
    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.timestamps.len()
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnValues> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, values)| values)
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &ColumnValues)> {
        self.columns
            .iter()
            .map(|(name, values)| (name.as_str(), values))
    }

    /// One tab-separated line per row in column order, no header.
    #[must_use]
    pub fn render_tsv(&self) -> String {
        let mut out = String::new();
        for row in 0..self.row_count() {
            let cells: Vec<String> = self
                .columns
                .iter()
                .map(|(_, values)| values.cell(row))
                .collect();
            out.push_str(&cells.join("\t"));
            out.push('\n');
        }
        out
    }
}
