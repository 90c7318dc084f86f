use serde_json::Value;

use super::format_scalar;

/// Key answer per command, most specific first.
const PRIORITY_PATHS: &[&[&str]] = &[
    &["tax", "total_federal_tax"],
    &["total_federal_tax"],
    &["overall_beta"],
    &["standard_deduction"],
];

/// Print just the key answer value from the output.
pub fn print_minimal(value: &Value) {
    println!("{}", render_minimal(value));
}

/// Look for the well-known result fields in order of priority, then fall
/// back to the first field in the result object.
pub fn render_minimal(value: &Value) -> String {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    for path in PRIORITY_PATHS {
        let found = path
            .iter()
            .try_fold(result_obj, |v, key| v.get(*key))
            .filter(|v| !v.is_null());
        if let Some(val) = found {
            return format_scalar(val);
        }
    }

    if let Value::Object(map) = result_obj {
        if let Some((key, val)) = map.iter().next() {
            return format!("{}: {}", key, format_scalar(val));
        }
    }
    format_scalar(result_obj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_estimate_reports_total_tax() {
        let value = json!({ "result": { "ss_annual": "0", "tax": { "total_federal_tax": "3085.83" } } });
        assert_eq!(render_minimal(&value), "3085.83");
    }

    #[test]
    fn test_beta_reports_overall_beta() {
        let value = json!({ "result": { "by_account": [], "overall_beta": "0.97" } });
        assert_eq!(render_minimal(&value), "0.97");
    }

    #[test]
    fn test_falls_back_to_first_field() {
        let value = json!({ "result": { "alpha": 1 } });
        assert_eq!(render_minimal(&value), "alpha: 1");
    }
}
