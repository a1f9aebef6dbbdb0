#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FilterError {
    #[error("unknown filter: {0}")]
    UnknownFilter(String),
    #[error("filter {filter} expects {expected} argument(s), got {actual}")]
    Arity {
        filter: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("invalid parameter for {filter}: {reason}")]
    InvalidParameter { filter: &'static str, reason: String },
}

/// Trailing window length of a rolling filter; always greater than one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowSize(usize);

impl WindowSize {
    pub fn new(size: usize) -> Result<Self, FilterError> {
        if size <= 1 {
            return Err(FilterError::InvalidParameter {
                filter: "Rolling",
                reason: format!("window size must be > 1, got {size}"),
            });
        }
        Ok(Self(size))
    }

    #[must_use]
    pub fn get(self) -> usize {
        self.0
    }
}

/// A pure `[f64] -> Vec<f64>` transform. The output always has the input's length.
///
/// Text form is `Name` or `Name:arg`, e.g. `RollingAverage:3`, `Lag:2`,
/// `BinaryThreshold:0.5`; [`Filter`] parses from and displays back to it, and
/// serializes as that string.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Filter {
    RollingAverage(WindowSize),
    RollingMin(WindowSize),
    RollingMax(WindowSize),
    /// Sample standard deviation over the window.
    RollingStandardDeviation(WindowSize),
    Lag(usize),
    Lead(usize),
    CumulativeSum,
    Difference,
    MinMaxNormalization,
    ZScoreNormalization,
    BinaryThreshold(f64),
    Sin,
    Cos,
}

impl Filter {
    pub fn rolling_average(window: usize) -> Result<Self, FilterError> {
        WindowSize::new(window).map(Self::RollingAverage)
    }

    pub fn rolling_min(window: usize) -> Result<Self, FilterError> {
        WindowSize::new(window).map(Self::RollingMin)
    }

    pub fn rolling_max(window: usize) -> Result<Self, FilterError> {
        WindowSize::new(window).map(Self::RollingMax)
    }

    pub fn rolling_sd(window: usize) -> Result<Self, FilterError> {
        WindowSize::new(window).map(Self::RollingStandardDeviation)
    }

    pub fn binary_threshold(threshold: f64) -> Result<Self, FilterError> {
        if threshold.is_nan() {
            return Err(FilterError::InvalidParameter {
                filter: "BinaryThreshold",
                reason: "threshold must be a number".to_owned(),
            });
        }
        Ok(Self::BinaryThreshold(threshold))
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::RollingAverage(_) => "RollingAverage",
            Self::RollingMin(_) => "RollingMin",
            Self::RollingMax(_) => "RollingMax",
            Self::RollingStandardDeviation(_) => "RollingStandardDeviation",
            Self::Lag(_) => "Lag",
            Self::Lead(_) => "Lead",
            Self::CumulativeSum => "CumulativeSum",
            Self::Difference => "Difference",
            Self::MinMaxNormalization => "MinMaxNormalization",
            Self::ZScoreNormalization => "ZScoreNormalization",
            Self::BinaryThreshold(_) => "BinaryThreshold",
            Self::Sin => "Sin",
            Self::Cos => "Cos",
        }
    }

    #[must_use]
    pub fn apply(&self, values: &[f64]) -> Vec<f64> {
        match *self {
            Self::RollingAverage(window) => rolling(values, window, |w| {
                w.iter().sum::<f64>() / w.len() as f64
            }),
            Self::RollingMin(window) => rolling(values, window, |w| {
                w.iter().copied().fold(f64::INFINITY, f64::min)
            }),
            Self::RollingMax(window) => rolling(values, window, |w| {
                w.iter().copied().fold(f64::NEG_INFINITY, f64::max)
            }),
            Self::RollingStandardDeviation(window) => rolling(values, window, sample_sd),
            Self::Lag(periods) => (0..values.len())
                .map(|i| i.checked_sub(periods).map_or(f64::NAN, |j| values[j]))
                .collect(),
            Self::Lead(periods) => (0..values.len())
                .map(|i| {
                    i.checked_add(periods)
                        .and_then(|j| values.get(j).copied())
                        .unwrap_or(f64::NAN)
                })
                .collect(),
            Self::CumulativeSum => {
                let mut total = 0.0;
                values
                    .iter()
                    .map(|&v| {
                        if v.is_nan() {
                            return v;
                        }
                        total += v;
                        total
                    })
                    .collect()
            }
            Self::Difference => (0..values.len())
                .map(|i| match i {
                    0 => f64::NAN,
                    _ => values[i] - values[i - 1],
                })
                .collect(),
            Self::MinMaxNormalization => min_max(values),
            Self::ZScoreNormalization => z_score(values),
            Self::BinaryThreshold(threshold) => values
                .iter()
                .map(|&v| match v {
                    v if v.is_nan() => v,
                    v if v > threshold => 1.0,
                    _ => 0.0,
                })
                .collect(),
            Self::Sin => values.iter().map(|v| v.sin()).collect(),
            Self::Cos => values.iter().map(|v| v.cos()).collect(),
        }
    }
}

/// Runs `filters` left to right over `values`.
#[must_use]
pub fn apply_chain(filters: &[Filter], values: Vec<f64>) -> Vec<f64> {
    filters
        .iter()
        .fold(values, |current, filter| filter.apply(&current))
}

/// NaN until the window fills, and wherever the window holds a NaN.
fn rolling(values: &[f64], window: WindowSize, stat: impl Fn(&[f64]) -> f64) -> Vec<f64> {
    let size = window.get();
    (0..values.len())
        .map(|i| {
            if i + 1 < size {
                return f64::NAN;
            }
            let slice = &values[i + 1 - size..=i];
            if slice.iter().any(|v| v.is_nan()) {
                f64::NAN
            } else {
                stat(slice)
            }
        })
        .collect()
}

fn sample_sd(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if values.len() < 2 {
        return f64::NAN;
    }
    let mean = values.iter().sum::<f64>() / n;
    let squares: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    (squares / (n - 1.0)).sqrt()
}

fn min_max(values: &[f64]) -> Vec<f64> {
    let present = || values.iter().copied().filter(|v| !v.is_nan());
    let lo = present().fold(f64::INFINITY, f64::min);
    let hi = present().fold(f64::NEG_INFINITY, f64::max);
    let span = hi - lo;
    values
        .iter()
        .map(|&v| match v {
            v if v.is_nan() => v,
            _ if span == 0.0 => 0.0,
            v => (v - lo) / span,
        })
        .collect()
}

fn z_score(values: &[f64]) -> Vec<f64> {
    let present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    let sd = sample_sd(&present);
    if sd.is_nan() || sd == 0.0 {
        return vec![f64::NAN; values.len()];
    }
    let mean = present.iter().sum::<f64>() / present.len() as f64;
    values.iter().map(|v| (v - mean) / sd).collect()
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())?;
        match self {
            Self::RollingAverage(w)
            | Self::RollingMin(w)
            | Self::RollingMax(w)
            | Self::RollingStandardDeviation(w) => write!(f, ":{}", w.get()),
            Self::Lag(n) | Self::Lead(n) => write!(f, ":{n}"),
            Self::BinaryThreshold(t) => write!(f, ":{t}"),
            Self::CumulativeSum
            | Self::Difference
            | Self::MinMaxNormalization
            | Self::ZScoreNormalization
            | Self::Sin
            | Self::Cos => Ok(()),
        }
    }
}

impl FromStr for Filter {
    type Err = FilterError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut parts = text.trim().split(':');
        let name = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.map(str::trim).collect();

        let filter = match name {
            "RollingAverage" => Self::rolling_average(count_arg("RollingAverage", &args)?)?,
            "RollingMin" => Self::rolling_min(count_arg("RollingMin", &args)?)?,
            "RollingMax" => Self::rolling_max(count_arg("RollingMax", &args)?)?,
            "RollingStandardDeviation" | "RollingSd" => {
                Self::rolling_sd(count_arg("RollingStandardDeviation", &args)?)?
            }
            "Lag" => Self::Lag(count_arg("Lag", &args)?),
            "Lead" => Self::Lead(count_arg("Lead", &args)?),
            "BinaryThreshold" => {
                let raw = single_arg("BinaryThreshold", &args)?;
                let threshold = raw.parse().map_err(|_| FilterError::InvalidParameter {
                    filter: "BinaryThreshold",
                    reason: format!("expected a number, got {raw:?}"),
                })?;
                Self::binary_threshold(threshold)?
            }
            "CumulativeSum" => no_args(Self::CumulativeSum, &args)?,
            "Difference" => no_args(Self::Difference, &args)?,
            "MinMaxNormalization" => no_args(Self::MinMaxNormalization, &args)?,
            "ZScoreNormalization" | "ZScore" => no_args(Self::ZScoreNormalization, &args)?,
            "Sin" => no_args(Self::Sin, &args)?,
            "Cos" => no_args(Self::Cos, &args)?,
            other => return Err(FilterError::UnknownFilter(other.to_owned())),
        };
        Ok(filter)
    }
}

fn single_arg<'a>(filter: &'static str, args: &[&'a str]) -> Result<&'a str, FilterError> {
    match args {
        [only] => Ok(only),
        _ => Err(FilterError::Arity {
            filter,
            expected: 1,
            actual: args.len(),
        }),
    }
}

fn count_arg(filter: &'static str, args: &[&str]) -> Result<usize, FilterError> {
    let raw = single_arg(filter, args)?;
    raw.parse().map_err(|_| FilterError::InvalidParameter {
        filter,
        reason: format!("expected a non-negative integer, got {raw:?}"),
    })
}

fn no_args(filter: Filter, args: &[&str]) -> Result<Filter, FilterError> {
    if !args.is_empty() {
        return Err(FilterError::Arity {
            filter: filter.name(),
            expected: 0,
            actual: args.len(),
        });
    }
    Ok(filter)
}

impl TryFrom<String> for Filter {
    type Error = FilterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Filter> for String {
    fn from(filter: Filter) -> Self {
        filter.to_string()
    }
}
