use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tr_series::{NumericWindow, Window};
use tr_types::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericAggregate {
    Count,
    Sum,
    Mean,
    Sd,
    Variance,
    First,
    Last,
    Min,
    Max,
    Range,
    Median,
    P25,
    P75,
    P90,
    P95,
    P99,
}

impl NumericAggregate {
    /// Reduces one window. Empty windows give 0 for `count`/`sum` and NaN otherwise.
    pub fn reduce<W>(self, window: &W) -> f64
    where
        W: Window<Value = f64> + ?Sized,
    {
        let value = |point: Option<&Point<f64>>| point.map_or(f64::NAN, |p| *p.value());
        match self.quantile() {
            Some(q) => window.distribution().quantile(q),
            None => {
                let summary = window.summary();
                match self {
                    Self::Count => summary.count() as f64,
                    Self::Sum => summary.sum(),
                    Self::Mean => summary.mean(),
                    Self::Sd => summary.sd(),
                    Self::Variance => summary.variance(),
                    Self::First => value(summary.first()),
                    Self::Last => value(summary.last()),
                    Self::Min => value(summary.min()),
                    Self::Max => value(summary.max()),
                    Self::Range => summary.range(),
                    Self::Median | Self::P25 | Self::P75 | Self::P90 | Self::P95 | Self::P99 => {
                        f64::NAN
                    }
                }
            }
        }
    }

    fn quantile(self) -> Option<f64> {
        let q = match self {
            Self::Median => 0.5,
            Self::P25 => 0.25,
            Self::P75 => 0.75,
            Self::P90 => 0.90,
            Self::P95 => 0.95,
            Self::P99 => 0.99,
            _ => return None,
        };
        Some(q)
    }
}

impl FromStr for NumericAggregate {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let aggregate = match s.to_ascii_lowercase().as_str() {
            "count" => Self::Count,
            "sum" => Self::Sum,
            "mean" | "average" | "avg" => Self::Mean,
            "sd" | "stddev" => Self::Sd,
            "variance" | "var" => Self::Variance,
            "first" => Self::First,
            "last" => Self::Last,
            "min" => Self::Min,
            "max" => Self::Max,
            "range" => Self::Range,
            "median" | "p50" => Self::Median,
            "p25" => Self::P25,
            "p75" => Self::P75,
            "p90" => Self::P90,
            "p95" => Self::P95,
            "p99" => Self::P99,
            _ => return Err(()),
        };
        Ok(aggregate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalAggregate {
    Count,
    Distinct,
    Entropy,
    /// Most frequent category; the only aggregate producing text.
    Mode,
}

impl CategoricalAggregate {
    #[must_use]
    pub fn is_text(self) -> bool {
        matches!(self, Self::Mode)
    }

    /// Numeric result; NaN for [`CategoricalAggregate::Mode`].
    pub fn reduce<W>(self, window: &W) -> f64
    where
        W: Window<Value = String> + ?Sized,
    {
        let summary = window.summary();
        match self {
            Self::Count => summary.count() as f64,
            Self::Distinct => summary.distinct() as f64,
            Self::Entropy => summary.entropy(),
            Self::Mode => f64::NAN,
        }
    }

    /// Most frequent category, empty when the window has no readings.
    pub fn mode<W>(window: &W) -> String
    where
        W: Window<Value = String> + ?Sized,
    {
        window.summary().mode().unwrap_or_default().to_owned()
    }
}

impl FromStr for CategoricalAggregate {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let aggregate = match s.to_ascii_lowercase().as_str() {
            "count" => Self::Count,
            "distinct" => Self::Distinct,
            "entropy" => Self::Entropy,
            "mode" => Self::Mode,
            _ => return Err(()),
        };
        Ok(aggregate)
    }
}
