pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// True for a non-empty array whose first element is an object, i.e. a row
/// series such as `monthly_cash_flows` or `scenarios`.
pub(crate) fn is_row_series(value: &Value) -> bool {
    matches!(value, Value::Array(arr) if matches!(arr.first(), Some(Value::Object(_))))
}

/// Flatten nested objects into dotted `(path, leaf)` pairs. Row series are
/// skipped; callers render them separately.
pub(crate) fn flatten_fields(prefix: &str, value: &Value, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_fields(&path, val, out);
            }
        }
        v if is_row_series(v) => {}
        v => out.push((prefix.to_string(), v.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_skips_row_series() {
        let value = json!({
            "metrics": { "irr": 0.1, "npv": null },
            "initial_equity": 80750.0,
            "monthly_cash_flows": [{ "month": 0 }],
        });
        let mut out = Vec::new();
        flatten_fields("", &value, &mut out);
        let keys: Vec<&str> = out.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["initial_equity", "metrics.irr", "metrics.npv"]);
    }
}
