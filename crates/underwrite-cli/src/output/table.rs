use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::{flatten_fields, is_row_series};

/// Format output as tables: one Field/Value table for the scalar result
/// fields, then one table per row series.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result(result);
                print_footer(map);
            } else {
                print_result(value);
            }
        }
        Value::Array(arr) => print_rows(arr),
        _ => println!("{value}"),
    }
}

fn print_result(result: &Value) {
    let mut fields = Vec::new();
    flatten_fields("", result, &mut fields);
    if !fields.is_empty() {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in &fields {
            builder.push_record([key.clone(), format_value(val)]);
        }
        println!("{}", Table::from(builder));
    }

    if let Value::Object(map) = result {
        for (key, val) in map {
            if let Value::Array(rows) = val {
                if is_row_series(val) {
                    println!("\n{key}:");
                    print_rows(rows);
                }
            }
        }
    }
}

fn print_footer(envelope: &serde_json::Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {w}");
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {meth}");
    }
}

fn print_rows(arr: &[Value]) {
    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            println!("{}", format_value(item));
        }
        return;
    };

    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(headers.clone());
    for map in arr.iter().filter_map(Value::as_object) {
        let row: Vec<String> = headers
            .iter()
            .map(|h| map.get(h).map(format_value).unwrap_or_default())
            .collect();
        builder.push_record(row);
    }
    println!("{}", Table::from(builder));
}

/// Integers print as-is, other numbers to four decimal places.
fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() != 0.0 => format!("{f:.4}"),
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => arr.iter().map(format_value).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&json!(0.123456)), "0.1235");
        assert_eq!(format_value(&json!(61)), "61");
        assert_eq!(format_value(&json!(250000.0)), "250000.0");
        assert_eq!(format_value(&Value::Null), "-");
        assert_eq!(format_value(&json!([50, 100])), "50, 100");
    }
}
