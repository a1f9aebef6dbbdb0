#![no_main]

use libfuzzer_sys::fuzz_target;
use tsreport::{MemorySource, ViewBuilder, ViewDefinition};

fuzz_target!(|data: &[u8]| {
    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(definition) = ViewDefinition::from_json_str(json) else {
        return;
    };
    // Bound the row count so a tiny period over a huge range stays cheap.
    let shortest = definition
        .rows
        .period
        .fixed_duration()
        .map_or(28 * 86_400, |period| period.num_seconds().max(1));
    let span = definition.rows.to - definition.rows.from;
    if span.num_seconds() / shortest > 10_000 {
        return;
    }

    if let Ok(view) = ViewBuilder::new(MemorySource::new()).build(&definition) {
        let tsv = view.render_tsv();
        assert_eq!(tsv.lines().count(), view.row_count());
    }
});
