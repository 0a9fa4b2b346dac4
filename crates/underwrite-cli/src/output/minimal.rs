use serde_json::Value;

/// Result paths checked in order; the first non-null one is printed.
const PRIORITY_PATHS: [&str; 8] = [
    "metrics.irr",
    "base.irr",
    "summary.irr_p50",
    "stamp_duty",
    "metrics.npv",
    "base.npv",
    "summary.npv_p50",
    "irr",
];

/// Print just the headline number: IRR when it exists, NPV otherwise.
pub fn print_minimal(value: &Value) {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match headline(result) {
        Some((path, val)) if path.contains("npv") => println!("npv: {}", format_minimal(val)),
        Some((_, val)) => println!("{}", format_minimal(val)),
        None => println!("null"),
    }
}

fn headline(result: &Value) -> Option<(&'static str, &Value)> {
    PRIORITY_PATHS.iter().find_map(|path| {
        let val = path
            .split('.')
            .try_fold(result, |node, key| node.as_object()?.get(key))?;
        (!val.is_null()).then_some((*path, val))
    })
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_irr_preferred() {
        let result = json!({ "metrics": { "irr": 0.11, "npv": 5.0 } });
        assert_eq!(headline(&result), Some(("metrics.irr", &json!(0.11))));
    }

    #[test]
    fn test_falls_back_to_npv_when_irr_null() {
        let result = json!({ "metrics": { "irr": null, "npv": -12.5 } });
        assert_eq!(headline(&result), Some(("metrics.npv", &json!(-12.5))));
    }

    #[test]
    fn test_monte_carlo_median() {
        let result = json!({ "summary": { "irr_p50": 0.07 }, "simulations": [] });
        assert_eq!(headline(&result).map(|(p, _)| p), Some("summary.irr_p50"));
    }
}
