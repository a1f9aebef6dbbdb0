#![forbid(unsafe_code)]

mod distribution;
mod summary;

use std::cell::OnceCell;
use std::ops::Range;

use chrono::TimeDelta;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tr_types::{Period, PeriodError, Point, Timestamp};

pub use distribution::{COMPRESSION, Distribution};
pub use summary::{CategoricalSummary, NumericSummary, Summary};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SeriesError {
    #[error("points must be sorted by instant; position {position} goes back in time")]
    Unsorted { position: usize },
    #[error("series bounds are inverted: from={from} is after to={to}")]
    InvertedBounds { from: Timestamp, to: Timestamp },
    #[error("cannot split a series into zero segments")]
    ZeroSegments,
    #[error(transparent)]
    Period(#[from] PeriodError),
}

/// A reading type that knows which single-pass summary describes it.
pub trait Observation: Clone + PartialEq {
    type Summary: Summary<Self>;
}

impl Observation for f64 {
    type Summary = NumericSummary;
}

impl Observation for String {
    type Summary = CategoricalSummary;
}

/// Read access shared by owned series and borrowed segments.
pub trait Window {
    type Value: Observation;

    fn from(&self) -> Timestamp;

    fn to(&self) -> Timestamp;

    fn points(&self) -> &[Point<Self::Value>];

    fn count(&self) -> usize {
        self.points().len()
    }

    fn is_empty(&self) -> bool {
        self.points().is_empty()
    }

    fn values(&self) -> Vec<Self::Value> {
        self.points().iter().map(|p| p.value().clone()).collect()
    }

    /// Distinct values in first-seen order.
    fn distinct(&self) -> Vec<Self::Value> {
        let mut out: Vec<Self::Value> = Vec::new();
        for point in self.points() {
            if !out.contains(point.value()) {
                out.push(point.value().clone());
            }
        }
        out
    }

    /// Computed on every call; nothing is cached.
    fn summary(&self) -> <Self::Value as Observation>::Summary {
        let mut summary = <Self::Value as Observation>::Summary::default();
        for point in self.points() {
            summary.observe(point);
        }
        summary
    }
}

pub trait NumericWindow: Window<Value = f64> {
    fn distribution(&self) -> Distribution {
        Distribution::from_values(self.points().iter().map(|p| *p.value()))
    }
}

impl<W: Window<Value = f64> + ?Sized> NumericWindow for W {}

/// An owned, time-bounded run of readings sorted by instant.
///
/// Deserialization goes through [`Series::new`], so a loaded series has the
/// same ordering and bounds guarantees as a constructed one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "RawSeries<T>",
    bound(deserialize = "T: Observation + Deserialize<'de>")
)]
pub struct Series<T> {
    from: Timestamp,
    to: Timestamp,
    points: Vec<Point<T>>,
}

#[derive(Deserialize)]
struct RawSeries<T> {
    from: Timestamp,
    to: Timestamp,
    points: Vec<Point<T>>,
}

impl<T: Observation> TryFrom<RawSeries<T>> for Series<T> {
    type Error = SeriesError;

    fn try_from(raw: RawSeries<T>) -> Result<Self, Self::Error> {
        Self::new(raw.from, raw.to, raw.points)
    }
}

pub type NumericalSignal = Series<f64>;
pub type CategoricalSignal = Series<String>;

impl<T: Observation> Series<T> {
    pub fn new(from: Timestamp, to: Timestamp, points: Vec<Point<T>>) -> Result<Self, SeriesError> {
        if from > to {
            return Err(SeriesError::InvertedBounds { from, to });
        }
        if let Some(position) = points
            .windows(2)
            .position(|pair| pair[1].instant() < pair[0].instant())
        {
            return Err(SeriesError::Unsorted {
                position: position + 1,
            });
        }
        Ok(Self { from, to, points })
    }

    /// Stable-sorts `points` by instant before building the series.
    pub fn from_unsorted(
        from: Timestamp,
        to: Timestamp,
        mut points: Vec<Point<T>>,
    ) -> Result<Self, SeriesError> {
        points.sort_by_key(Point::instant);
        Self::new(from, to, points)
    }

    /// A view over `[from, to)` clamped to this series' bounds.
    #[must_use]
    pub fn window(&self, from: Timestamp, to: Timestamp) -> Segment<'_, T> {
        let from = from.clamp(self.from, self.to);
        let to = to.clamp(from, self.to);
        Segment::new(self, from, to)
    }

    /// Tiles `[from, to)` with successive additions of `period`.
    pub fn segments(&self, period: Period, tz: Tz) -> Result<Vec<Segment<'_, T>>, SeriesError> {
        tile_by_period(self, self.from, self.to, period, tz)
    }

    /// Tiles `[from, to)` with `n` equal fixed durations.
    pub fn split(&self, n: usize) -> Result<Vec<Segment<'_, T>>, SeriesError> {
        tile_evenly(self, self.from, self.to, n)
    }
}

impl<T: Observation> Window for Series<T> {
    type Value = T;

    fn from(&self) -> Timestamp {
        self.from
    }

    fn to(&self) -> Timestamp {
        self.to
    }

    fn points(&self) -> &[Point<T>] {
        &self.points
    }
}

/// A borrowed sub-window of a [`Series`]. No points are copied: the index
/// range into the parent is found by binary search the first time it is needed.
#[derive(Debug, Clone)]
pub struct Segment<'a, T> {
    from: Timestamp,
    to: Timestamp,
    parent: &'a Series<T>,
    range: OnceCell<Range<usize>>,
}

impl<'a, T: Observation> Segment<'a, T> {
    fn new(parent: &'a Series<T>, from: Timestamp, to: Timestamp) -> Self {
        Self {
            from,
            to,
            parent,
            range: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn parent(&self) -> &'a Series<T> {
        self.parent
    }

    /// Index range of this segment within the parent's points.
    pub fn range(&self) -> Range<usize> {
        self.range
            .get_or_init(|| {
                let start = lower_bound(&self.parent.points, self.from);
                let end = lower_bound(&self.parent.points, self.to).max(start);
                start..end
            })
            .clone()
    }

    pub fn segments(&self, period: Period, tz: Tz) -> Result<Vec<Segment<'a, T>>, SeriesError> {
        tile_by_period(self.parent, self.from, self.to, period, tz)
    }

    pub fn split(&self, n: usize) -> Result<Vec<Segment<'a, T>>, SeriesError> {
        tile_evenly(self.parent, self.from, self.to, n)
    }
}

impl<T: Observation> Window for Segment<'_, T> {
    type Value = T;

    fn from(&self) -> Timestamp {
        self.from
    }

    fn to(&self) -> Timestamp {
        self.to
    }

    fn points(&self) -> &[Point<T>] {
        &self.parent.points[self.range()]
    }
}

/// First index whose instant is `>= boundary`.
fn lower_bound<T>(points: &[Point<T>], boundary: Timestamp) -> usize {
    points.partition_point(|point| point.instant() < boundary)
}

fn tile_by_period<T: Observation>(
    root: &Series<T>,
    from: Timestamp,
    to: Timestamp,
    period: Period,
    tz: Tz,
) -> Result<Vec<Segment<'_, T>>, SeriesError> {
    let mut out = Vec::new();
    let mut cursor = from;
    while cursor < to {
        let next = period.advance(cursor, tz)?;
        out.push(Segment::new(root, cursor, next.min(to)));
        cursor = next;
    }
    Ok(out)
}

fn tile_evenly<T: Observation>(
    root: &Series<T>,
    from: Timestamp,
    to: Timestamp,
    n: usize,
) -> Result<Vec<Segment<'_, T>>, SeriesError> {
    if n == 0 {
        return Err(SeriesError::ZeroSegments);
    }
    let span = i128::from((to - from).num_milliseconds());
    let parts = n as i128;
    let boundary = |k: usize| {
        if k == n {
            return to;
        }
        let offset = span * k as i128 / parts;
        // offset <= span, which already fits in i64 milliseconds
        from + TimeDelta::milliseconds(offset as i64)
    };
    Ok((0..n)
        .map(|k| Segment::new(root, boundary(k), boundary(k + 1)))
        .collect())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone, Utc};
    use chrono_tz::Tz;
    use proptest::prelude::*;
    use tr_types::{Point, Timestamp};

    use super::{NumericWindow, Series, SeriesError, Window};

    fn day(n: i64) -> Timestamp {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
            .single()
            .expect("valid date")
            + TimeDelta::days(n)
    }

    fn numeric(points: &[(i64, f64)]) -> Series<f64> {
        let points = points
            .iter()
            .map(|(d, v)| Point::new(1, day(*d), *v))
            .collect();
        Series::new(day(0), day(31), points).expect("series")
    }

    #[test]
    fn new_rejects_unsorted_points() {
        let err = Series::new(
            day(0),
            day(5),
            vec![Point::new(1, day(2), 1.0), Point::new(1, day(1), 2.0)],
        )
        .expect_err("must fail");
        assert_eq!(err, SeriesError::Unsorted { position: 1 });
    }

    #[test]
    fn deserialization_validates_like_new() {
        let inverted = r#"{"from":"2025-01-10T00:00:00Z","to":"2025-01-01T00:00:00Z","points":[]}"#;
        let err = serde_json::from_str::<Series<f64>>(inverted).expect_err("inverted bounds");
        assert!(err.to_string().contains("inverted"), "{err}");

        let unsorted = r#"{"from":"2025-01-01T00:00:00Z","to":"2025-01-10T00:00:00Z","points":[
            {"feed_id":1,"instant":"2025-01-03T00:00:00Z","value":1.0},
            {"feed_id":1,"instant":"2025-01-02T00:00:00Z","value":2.0}
        ]}"#;
        assert!(serde_json::from_str::<Series<f64>>(unsorted).is_err());

        let series = numeric(&[(1, 1.0), (4, 2.0)]);
        let json = serde_json::to_string(&series).expect("serialize");
        let back: Series<f64> = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, series);
        assert_eq!(back.window(day(2), day(9)).count(), 1);
    }

    #[test]
    fn from_unsorted_orders_points() {
        let series = Series::from_unsorted(
            day(0),
            day(5),
            vec![Point::new(1, day(3), 3.0), Point::new(1, day(1), 1.0)],
        )
        .expect("series");
        assert_eq!(series.values(), vec![1.0, 3.0]);
    }

    #[test]
    fn new_rejects_inverted_bounds() {
        let err = Series::<f64>::new(day(3), day(1), Vec::new()).expect_err("must fail");
        assert!(matches!(err, SeriesError::InvertedBounds { .. }));
    }

    #[test]
    fn weekly_segments_bucket_points_by_lower_bound() {
        let series = numeric(&[(10, 19.0), (12, 25.0), (28, 14.0)]);
        let segments = series
            .segments("7d".parse().expect("period"), Tz::UTC)
            .expect("segments");

        let counts: Vec<usize> = segments.iter().map(Window::count).collect();
        assert_eq!(counts, vec![0, 2, 0, 0, 1]);
        assert_eq!(segments[1].values(), vec![19.0, 25.0]);
        assert_eq!(segments[4].from(), day(28));
        assert_eq!(segments[4].to(), day(31));
    }

    #[test]
    fn point_on_boundary_belongs_to_later_segment() {
        let series = numeric(&[(7, 1.0)]);
        let segments = series
            .segments("7d".parse().expect("period"), Tz::UTC)
            .expect("segments");
        assert_eq!(segments[0].count(), 0);
        assert_eq!(segments[1].count(), 1);
    }

    #[test]
    fn empty_series_yields_empty_segments() {
        let series = numeric(&[]);
        let segments = series.split(4).expect("split");
        assert_eq!(segments.len(), 4);
        assert!(segments.iter().all(Window::is_empty));
    }

    #[test]
    fn split_divides_duration_evenly() {
        let series = Series::<f64>::new(day(0), day(4), Vec::new()).expect("series");
        let segments = series.split(4).expect("split");
        let bounds: Vec<_> = segments.iter().map(|s| (s.from(), s.to())).collect();
        assert_eq!(
            bounds,
            vec![
                (day(0), day(1)),
                (day(1), day(2)),
                (day(2), day(3)),
                (day(3), day(4))
            ]
        );
        assert_eq!(series.split(0).expect_err("zero"), SeriesError::ZeroSegments);
    }

    #[test]
    fn nested_segments_still_borrow_the_root() {
        let series = numeric(&[(1, 1.0), (2, 2.0), (9, 9.0)]);
        let week = series.window(day(0), day(7));
        let halves = week.split(7).expect("split");
        assert_eq!(halves[1].values(), vec![1.0]);
        assert_eq!(halves[2].values(), vec![2.0]);
        assert!(std::ptr::eq(halves[0].parent(), &series));
    }

    #[test]
    fn window_clamps_to_series_bounds() {
        let series = numeric(&[(1, 1.0), (30, 2.0)]);
        let window = series.window(day(-10), day(100));
        assert_eq!(window.from(), day(0));
        assert_eq!(window.to(), day(31));
        assert_eq!(window.count(), 2);
    }

    #[test]
    fn distinct_keeps_first_seen_order() {
        let series = Series::new(
            day(0),
            day(3),
            vec![
                Point::new(1, day(0), "rain".to_owned()),
                Point::new(1, day(1), "sun".to_owned()),
                Point::new(1, day(2), "rain".to_owned()),
            ],
        )
        .expect("series");
        assert_eq!(series.distinct(), vec!["rain".to_owned(), "sun".to_owned()]);
    }

    #[test]
    fn segment_summary_and_distribution_cover_only_its_range() {
        let series = numeric(&[(1, 1.0), (2, 3.0), (20, 100.0)]);
        let first_week = series.window(day(0), day(7));
        let summary = first_week.summary();
        assert_eq!(summary.count(), 2);
        assert_eq!(summary.sum(), 4.0);
        assert_eq!(first_week.distribution().max(), 3.0);
    }

    proptest! {
        #[test]
        fn segment_counts_sum_to_series_count(
            mut offsets in proptest::collection::vec(0_i64..(31 * 24), 0..200),
            hours in 1_u32..200,
        ) {
            offsets.sort_unstable();
            let points = offsets
                .iter()
                .map(|h| Point::new(1, day(0) + TimeDelta::hours(*h), *h as f64))
                .collect();
            let series = Series::new(day(0), day(31), points).expect("series");
            let period = format!("{hours}h").parse().expect("period");
            let segments = series.segments(period, Tz::UTC).expect("segments");
            let total: usize = segments.iter().map(Window::count).sum();
            prop_assert_eq!(total, series.count());
        }

        #[test]
        fn summary_ignores_declared_bounds(
            values in proptest::collection::vec(-1.0e6_f64..1.0e6, 0..64),
            pad in 0_i64..30,
        ) {
            let points: Vec<_> = values
                .iter()
                .enumerate()
                .map(|(i, v)| Point::new(1, day(0) + TimeDelta::minutes(i as i64), *v))
                .collect();
            let tight = Series::new(day(0), day(1), points.clone()).expect("tight");
            let wide = Series::new(day(-pad), day(1 + pad), points).expect("wide");
            prop_assert_eq!(tight.summary(), wide.summary());
        }
    }
}
