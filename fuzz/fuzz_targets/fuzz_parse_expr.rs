#![no_main]

use libfuzzer_sys::fuzz_target;
use tsreport::{Calculator, ResolveError, parse_expr};

fuzz_target!(|data: &[u8]| {
    let Ok(formula) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(expr) = parse_expr(formula) else {
        return;
    };

    // The canonical form must be stable and every parsed tree must evaluate
    // without panicking when every variable resolves.
    let _ = expr.to_string();
    let mut resolver =
        |_: &str| -> Result<Option<Vec<f64>>, ResolveError> { Ok(Some(vec![1.5, -2.0, 0.0])) };
    if let Ok(values) = Calculator::new(3).evaluate(&expr, &mut resolver) {
        assert_eq!(values.len(), 3);
    }
});
