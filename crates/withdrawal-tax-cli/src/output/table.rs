use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{flatten_fields, format_scalar, is_record_array};

/// Format output as tables using the tabled crate: one Field/Value table for
/// the scalar results, then one table per list of records.
pub fn print_table(value: &Value) {
    print!("{}", render_table(value));
}

pub fn render_table(value: &Value) -> String {
    let mut out = String::new();
    match value {
        Value::Object(map) => {
            match map.get("result") {
                Some(Value::Object(result)) => push_result_tables(&mut out, result),
                _ => push_field_table(&mut out, map),
            }
            push_envelope_notes(&mut out, map);
        }
        Value::Array(arr) => push_record_table(&mut out, arr),
        other => {
            out.push_str(&format_scalar(other));
            out.push('\n');
        }
    }
    out
}

fn push_result_tables(out: &mut String, result: &Map<String, Value>) {
    let (lists, scalars): (Vec<_>, Vec<_>) = flatten_fields(result)
        .into_iter()
        .partition(|(_, v)| is_record_array(v));

    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in &scalars {
        builder.push_record([key.as_str(), &format_cell(val)]);
    }
    out.push_str(&Table::from(builder).to_string());
    out.push('\n');

    for (key, val) in lists {
        if let Value::Array(items) = val {
            out.push_str(&format!("\n{}:\n", key));
            push_record_table(out, &items);
        }
    }
}

fn push_field_table(out: &mut String, map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in flatten_fields(map) {
        builder.push_record([key, format_cell(&val)]);
    }
    out.push_str(&Table::from(builder).to_string());
    out.push('\n');
}

fn push_record_table(out: &mut String, arr: &[Value]) {
    let rows: Vec<Vec<(String, Value)>> = arr
        .iter()
        .filter_map(Value::as_object)
        .map(flatten_fields)
        .collect();

    let Some(first) = rows.first() else {
        out.push_str("(empty)\n");
        return;
    };

    let headers: Vec<String> = first.iter().map(|(k, _)| k.clone()).collect();
    let mut builder = Builder::default();
    builder.push_record(headers.clone());
    for row in &rows {
        builder.push_record(headers.iter().map(|h| {
            row.iter()
                .find(|(k, _)| k == h)
                .map(|(_, v)| format_cell(v))
                .unwrap_or_default()
        }));
    }
    out.push_str(&Table::from(builder).to_string());
    out.push('\n');
}

fn push_envelope_notes(out: &mut String, envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            out.push_str("\nWarnings:\n");
            for w in warnings.iter().filter_map(Value::as_str) {
                out.push_str(&format!("  - {}\n", w));
            }
        }
    }
    if let Some(Value::String(meth)) = envelope.get("methodology") {
        out.push_str(&format!("\nMethodology: {}\n", meth));
    }
}

fn format_cell(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::Array(arr) => arr.iter().map(format_cell).collect::<Vec<_>>().join(", "),
        other => format_scalar(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_lists_get_their_own_table() {
        let value = json!({
            "result": {
                "overall_beta": "0.95",
                "by_account": [
                    { "account_type": "roth", "value": "100", "beta": null }
                ]
            },
            "warnings": ["No beta for BND, using 1.0"],
            "methodology": "Portfolio beta"
        });
        let out = render_table(&value);
        assert!(out.contains("overall_beta"));
        assert!(out.contains("by_account:"));
        assert!(out.contains("account_type"));
        assert!(out.contains("No beta for BND"));
        assert!(out.contains("Methodology: Portfolio beta"));
    }
}
