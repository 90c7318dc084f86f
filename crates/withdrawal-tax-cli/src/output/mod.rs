pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod report;
pub mod table;

use crate::OutputFormat;
use serde_json::{Map, Value};

/// Rendering switches that only some formats honour.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Include per-band tax attribution in the text report.
    pub breakdown: bool,
}

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value, options: RenderOptions) {
    match format {
        OutputFormat::Report => print!("{}", report::render_report(value, options)),
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Flatten nested objects into dotted keys (`tax.total_federal_tax`).
/// Arrays are left whole.
pub fn flatten_fields(map: &Map<String, Value>) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    flatten_into("", map, &mut out);
    out
}

fn flatten_into(prefix: &str, map: &Map<String, Value>, out: &mut Vec<(String, Value)>) {
    for (key, val) in map {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match val {
            Value::Object(inner) => flatten_into(&name, inner, out),
            other => out.push((name, other.clone())),
        }
    }
}

/// Scalar rendering shared by the table, CSV and minimal formats.
pub fn format_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// True for a non-empty array whose items are all objects.
pub fn is_record_array(value: &Value) -> bool {
    matches!(value, Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_object))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_uses_dotted_keys() {
        let value = json!({
            "total": "10",
            "tax": { "ordinary_tax": "1", "breakdown": { "ordinary": [] } },
            "holdings": [{ "ticker": "VYM" }]
        });
        let fields = flatten_fields(value.as_object().unwrap());
        let names: Vec<&str> = fields.iter().map(|(k, _)| k.as_str()).collect();
        assert!(names.contains(&"tax.ordinary_tax"));
        assert!(names.contains(&"tax.breakdown.ordinary"));
        assert!(names.contains(&"holdings"));
        assert!(names.contains(&"total"));
    }

    #[test]
    fn test_record_array_detection() {
        assert!(is_record_array(&json!([{ "a": 1 }])));
        assert!(!is_record_array(&json!([])));
        assert!(!is_record_array(&json!([1, 2])));
    }
}
