use chrono::{TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use tsreport::{
    ColumnDefinition, ColumnValues, ExprError, Filter, MemorySource, Point, RowDefinition, Series,
    TagSeries, Timestamp, ViewBuilder, ViewDefinition, ViewError,
};

fn day(n: i64) -> Timestamp {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
        .single()
        .expect("valid date")
        + TimeDelta::days(n)
}

fn weather() -> MemorySource {
    let temperature = Series::new(
        day(0),
        day(365),
        vec![
            Point::new(42, day(10), 19.0),
            Point::new(42, day(12), 25.0),
            Point::new(42, day(28), 14.0),
        ],
    )
    .expect("temperature");
    let sky = Series::new(
        day(0),
        day(365),
        vec![
            Point::new(42, day(12), "cloudy".to_owned()),
            Point::new(42, day(28), "rain".to_owned()),
        ],
    )
    .expect("sky");
    MemorySource::new()
        .with("temperature", TagSeries::Numeric(temperature))
        .with("sky", TagSeries::Categorical(sky))
}

const JANUARY: &str = r#"{
    "rows": { "from": "2025-01-01T00:00:00Z", "to": "2025-02-01T00:00:00Z", "period": "7d" },
    "columns": [
        { "name": "Sum", "calc": "temperature.sum" },
        { "name": "Sky", "calc": "sky.mode" }
    ]
}"#;

#[test]
fn weekly_january_report() {
    let definition = ViewDefinition::from_json_str(JANUARY).expect("definition");
    let view = ViewBuilder::new(weather()).build(&definition).expect("view");

    assert_eq!(view.row_count(), 5);
    assert_eq!(
        view.timestamps(),
        &[day(0), day(7), day(14), day(21), day(28)]
    );
    assert_eq!(
        view.column("Sum"),
        Some(&ColumnValues::Numeric(vec![0.0, 44.0, 0.0, 0.0, 14.0]))
    );
    assert_eq!(
        view.column("Sky").and_then(ColumnValues::as_text),
        Some(
            &[
                String::new(),
                "cloudy".to_owned(),
                String::new(),
                String::new(),
                "rain".to_owned(),
            ][..]
        )
    );
    assert_eq!(view.render_tsv(), "0\t\n44\tcloudy\n0\t\n0\t\n14\train\n");
}

#[test]
fn normalized_column_feeds_a_later_formula() {
    let definition = ViewDefinition::new(
        RowDefinition::new(day(0), day(35), "7d".parse().expect("period")),
        vec![
            ColumnDefinition::new("Mean", "temperature.mean"),
            ColumnDefinition::new("NormTemp", "temperature.max")
                .with_filter(Filter::MinMaxNormalization),
            ColumnDefinition::new("NewTemp", "NormTemp * 100"),
        ],
    );
    let view = ViewBuilder::new(weather()).build(&definition).expect("view");

    let norm = view
        .column("NormTemp")
        .and_then(ColumnValues::as_numeric)
        .expect("NormTemp");
    let scaled = view
        .column("NewTemp")
        .and_then(ColumnValues::as_numeric)
        .expect("NewTemp");
    assert_eq!(norm[1], 1.0);
    assert_eq!(norm[4], 0.0);
    for (n, s) in norm.iter().zip(scaled) {
        assert!((n.is_nan() && s.is_nan()) || n * 100.0 == *s);
    }
    assert_eq!(view.render_tsv().lines().nth(1), Some("22\t1\t100"));
}

#[test]
fn forward_reference_fails_the_view() {
    let definition = ViewDefinition::new(
        RowDefinition::new(day(0), day(35), "7d".parse().expect("period")),
        vec![
            ColumnDefinition::new("NewTemp", "NormTemp * 100"),
            ColumnDefinition::new("NormTemp", "temperature.max"),
        ],
    );
    let err = ViewBuilder::new(weather())
        .build(&definition)
        .expect_err("must fail");
    assert_eq!(err.column(), Some("NewTemp"));
    assert!(matches!(
        err,
        ViewError::Expr {
            source: ExprError::UnknownVariable(_),
            ..
        }
    ));
}

#[test]
fn monthly_rows_follow_the_calendar() {
    let definition = ViewDefinition::from_json_str(
        r#"{
            "rows": { "from": "2024-12-31T23:00:00Z", "to": "2025-04-30T22:00:00Z", "period": "1M" },
            "columns": [
                { "name": "Month", "calc": "time.ym" },
                { "name": "Readings", "calc": "temperature.count + sky.count" },
                { "name": "Running", "calc": "temperature.sum", "filters": ["CumulativeSum"] }
            ],
            "timezone": "Europe/Rome"
        }"#,
    )
    .expect("definition");
    assert_eq!(definition.timezone, Tz::Europe__Rome);

    let view = ViewBuilder::new(weather()).build(&definition).expect("view");
    assert_eq!(
        view.render_tsv(),
        "2025-01\t5\t58\n2025-02\t0\t58\n2025-03\t0\t58\n2025-04\t0\t58\n"
    );
}

#[test]
fn formulas_mix_reducers_functions_and_constants() {
    let definition = ViewDefinition::new(
        RowDefinition::new(day(7), day(14), "7d".parse().expect("period")),
        vec![
            ColumnDefinition::new("Spread", "temperature.max - temperature.min"),
            ColumnDefinition::new("Root", "sqrt(Spread + 3)!"),
            ColumnDefinition::new("Entropy", "round(sky.entropy * 1000)"),
            ColumnDefinition::new("Circle", "2 * PI % 3"),
        ],
    );
    let view = ViewBuilder::new(weather()).build(&definition).expect("view");
    assert_eq!(view.render_tsv(), format!("6\t6\t0\t{}\n", 2.0 * std::f64::consts::PI % 3.0));
}
