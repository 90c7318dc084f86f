use serde_json::{Map, Value};
use std::io;

use super::{flatten_fields, format_scalar, is_record_array};

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());
    if let Err(e) = write_csv(&mut wtr, value) {
        eprintln!("CSV output error: {}", e);
    }
}

/// Scalar results become `field,value` rows with dotted names. A lone list
/// of records (holdings, bracket slices) is written as a regular table
/// instead when the caller passes the list itself.
pub fn write_csv<W: io::Write>(wtr: &mut csv::Writer<W>, value: &Value) -> csv::Result<()> {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => write_fields(wtr, result)?,
            _ => write_fields(wtr, map)?,
        },
        Value::Array(arr) if is_record_array(value) => write_records(wtr, arr)?,
        Value::Array(arr) => {
            for item in arr {
                wtr.write_record([format_scalar(item)])?;
            }
        }
        other => wtr.write_record([format_scalar(other)])?,
    }
    wtr.flush()?;
    Ok(())
}

fn write_fields<W: io::Write>(wtr: &mut csv::Writer<W>, map: &Map<String, Value>) -> csv::Result<()> {
    wtr.write_record(["field", "value"])?;
    for (key, val) in flatten_fields(map) {
        wtr.write_record([key, format_scalar(&val)])?;
    }
    Ok(())
}

fn write_records<W: io::Write>(wtr: &mut csv::Writer<W>, arr: &[Value]) -> csv::Result<()> {
    let rows: Vec<Vec<(String, Value)>> = arr
        .iter()
        .filter_map(Value::as_object)
        .map(flatten_fields)
        .collect();
    let Some(first) = rows.first() else {
        return Ok(());
    };

    let headers: Vec<String> = first.iter().map(|(k, _)| k.clone()).collect();
    wtr.write_record(&headers)?;
    for row in &rows {
        wtr.write_record(headers.iter().map(|h| {
            row.iter()
                .find(|(k, _)| k == h)
                .map(|(_, v)| format_scalar(v))
                .unwrap_or_default()
        }))?;
    }
    Ok(())
}
