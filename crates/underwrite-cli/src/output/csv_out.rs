use serde_json::Value;
use std::io;

use super::{flatten_fields, is_row_series};

/// Row series exported in preference to the scalar fields, in order.
const PRIMARY_SERIES: [&str; 3] = ["scenarios", "simulations", "monthly_cash_flows"];

/// Write output as CSV to stdout.
///
/// The primary row series of the result (stress rows, simulation paths or
/// monthly cash flows) becomes the table; otherwise a two-column
/// `field,value` listing of the flattened result is written.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match primary_series(result) {
        Some(rows) => write_rows(&mut wtr, rows),
        None => {
            let mut fields = Vec::new();
            flatten_fields("", result, &mut fields);
            let _ = wtr.write_record(["field", "value"]);
            for (key, val) in &fields {
                let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
            }
        }
    }

    let _ = wtr.flush();
}

fn primary_series(result: &Value) -> Option<&[Value]> {
    if is_row_series(result) {
        return result.as_array().map(Vec::as_slice);
    }
    let map = result.as_object()?;
    PRIMARY_SERIES
        .iter()
        .filter_map(|key| map.get(*key))
        .find(|v| is_row_series(v))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
}

fn write_rows<W: io::Write>(wtr: &mut csv::Writer<W>, rows: &[Value]) {
    let Some(Value::Object(first)) = rows.first() else {
        return;
    };
    let headers: Vec<&str> = first.keys().map(String::as_str).collect();
    let _ = wtr.write_record(&headers);

    for map in rows.iter().filter_map(Value::as_object) {
        let row: Vec<String> = headers
            .iter()
            .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
            .collect();
        let _ = wtr.write_record(&row);
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scenarios_preferred_over_scalars() {
        let result = json!({
            "base": { "irr": 0.1 },
            "scenarios": [{ "label": "Rate shock +50bp", "irr": null }],
        });
        let rows = primary_series(&result).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_rows_written_with_empty_nulls() {
        let rows = vec![
            json!({ "label": "a", "irr": 0.05 }),
            json!({ "label": "b", "irr": null }),
        ];
        let mut wtr = csv::Writer::from_writer(Vec::new());
        write_rows(&mut wtr, &rows);
        let text = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
        // serde_json maps iterate in key order
        assert_eq!(text, "irr,label\n0.05,a\n,b\n");
    }

    #[test]
    fn test_scalar_result_has_no_series() {
        assert!(primary_series(&json!({ "stamp_duty": 2500.0 })).is_none());
    }
}
