use std::collections::HashMap;

use tr_types::Point;

/// A statistic built in one pass over a window's points.
pub trait Summary<T>: Default {
    fn observe(&mut self, point: &Point<T>);
}

/// Count, sum, Welford mean/variance and the extreme points of a numeric window.
///
/// `sum` is its own running accumulator rather than `mean * count`, so sums of
/// integral readings stay exact; the two may disagree in the last ulp.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NumericSummary {
    count: usize,
    sum: f64,
    mean: f64,
    m2: f64,
    first: Option<Point<f64>>,
    last: Option<Point<f64>>,
    min: Option<Point<f64>>,
    max: Option<Point<f64>>,
}

impl Summary<f64> for NumericSummary {
    fn observe(&mut self, point: &Point<f64>) {
        let value = *point.value();
        self.count += 1;
        self.sum += value;

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);

        if self.first.is_none() {
            self.first = Some(point.clone());
        }
        self.last = Some(point.clone());
        // strict comparisons: on ties the earliest point stays
        if self.min.as_ref().is_none_or(|min| value < *min.value()) {
            self.min = Some(point.clone());
        }
        if self.max.as_ref().is_none_or(|max| value > *max.value()) {
            self.max = Some(point.clone());
        }
    }
}

impl NumericSummary {
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// NaN when empty.
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.count == 0 { f64::NAN } else { self.mean }
    }

    /// Sample variance; NaN for fewer than two points.
    #[must_use]
    pub fn variance(&self) -> f64 {
        if self.count > 1 {
            self.m2 / (self.count - 1) as f64
        } else {
            f64::NAN
        }
    }

    #[must_use]
    pub fn sd(&self) -> f64 {
        self.variance().sqrt()
    }

    #[must_use]
    pub fn first(&self) -> Option<&Point<f64>> {
        self.first.as_ref()
    }

    #[must_use]
    pub fn last(&self) -> Option<&Point<f64>> {
        self.last.as_ref()
    }

    #[must_use]
    pub fn min(&self) -> Option<&Point<f64>> {
        self.min.as_ref()
    }

    #[must_use]
    pub fn max(&self) -> Option<&Point<f64>> {
        self.max.as_ref()
    }

    /// `max - min`, NaN when empty.
    #[must_use]
    pub fn range(&self) -> f64 {
        match (&self.min, &self.max) {
            (Some(min), Some(max)) => max.value() - min.value(),
            _ => f64::NAN,
        }
    }
}

/// Frequency table of a categorical window, kept in first-seen order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CategoricalSummary {
    count: usize,
    frequencies: Vec<(String, usize)>,
    slots: HashMap<String, usize>,
}

impl Summary<String> for CategoricalSummary {
    fn observe(&mut self, point: &Point<String>) {
        self.count += 1;
        match self.slots.get(point.value()) {
            Some(&slot) => self.frequencies[slot].1 += 1,
            None => {
                self.slots
                    .insert(point.value().clone(), self.frequencies.len());
                self.frequencies.push((point.value().clone(), 1));
            }
        }
    }
}

impl CategoricalSummary {
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn distinct(&self) -> usize {
        self.frequencies.len()
    }

    #[must_use]
    pub fn frequency(&self, category: &str) -> usize {
        self.slots
            .get(category)
            .map_or(0, |&slot| self.frequencies[slot].1)
    }

    /// `(category, occurrences)` in first-seen order.
    #[must_use]
    pub fn categories(&self) -> &[(String, usize)] {
        &self.frequencies
    }

    /// Most frequent category; ties go to the category seen first.
    #[must_use]
    pub fn mode(&self) -> Option<&str> {
        let mut best: Option<&(String, usize)> = None;
        for entry in &self.frequencies {
            if best.is_none_or(|b| entry.1 > b.1) {
                best = Some(entry);
            }
        }
        best.map(|(category, _)| category.as_str())
    }

    /// Shannon entropy in nats; 0 for an empty window.
    #[must_use]
    pub fn entropy(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let total = self.count as f64;
        self.frequencies
            .iter()
            .map(|(_, n)| {
                let share = *n as f64;
                share / total * (total / share).ln()
            })
            .sum()
    }
}
