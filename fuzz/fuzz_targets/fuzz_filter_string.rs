#![no_main]

use libfuzzer_sys::fuzz_target;
use tsreport::Filter;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(filter) = text.parse::<Filter>() else {
        return;
    };

    // Display must parse back to the same filter.
    let reparsed: Filter = filter
        .to_string()
        .parse()
        .expect("displayed filter text must parse");
    assert_eq!(reparsed, filter);

    let values: Vec<f64> = data.iter().map(|b| f64::from(*b) - 128.0).collect();
    assert_eq!(filter.apply(&values).len(), values.len());
});
