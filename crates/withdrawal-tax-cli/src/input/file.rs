use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use withdrawal_tax_core::portfolio::HoldingRecord;

/// Read a JSON file and deserialise into a typed struct.
pub fn read_json<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let value = read_json_value(path)?;
    serde_json::from_value(value).map_err(|e| format!("Failed to parse '{}': {}", path, e).into())
}

/// Read a JSON file as a generic serde_json::Value.
pub fn read_json_value(path: &str) -> Result<Value, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    let value: Value = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?;
    Ok(value)
}

pub fn is_csv(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

/// Read holding rows from a CSV file with a header line.
pub fn read_csv_records(path: &str) -> Result<Vec<HoldingRecord>, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let file = fs::File::open(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    parse_csv_records(file)
        .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e).into())
}

/// Every cell is handed over as text; blank cells count as absent and
/// unknown columns are ignored.
pub fn parse_csv_records<R: Read>(reader: R) -> Result<Vec<HoldingRecord>, Box<dyn std::error::Error>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let mut records = Vec::new();
    for (i, row) in rdr.records().enumerate() {
        let row = row?;
        let fields: Map<String, Value> = headers
            .iter()
            .zip(row.iter())
            .filter(|(_, cell)| !cell.is_empty())
            .map(|(h, cell)| (h.clone(), Value::String(cell.to_string())))
            .collect();
        if fields.is_empty() {
            continue;
        }
        let record: HoldingRecord = serde_json::from_value(Value::Object(fields))
            .map_err(|e| format!("row {}: {}", i + 2, e))?;
        records.push(record);
    }
    Ok(records)
}

/// Resolve and validate the path, preventing directory traversal.
fn resolve_path(path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.exists() {
        return Err(format!("File not found: {}", canonical.display()).into());
    }

    if !canonical.is_file() {
        return Err(format!("Not a file: {}", canonical.display()).into());
    }

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use withdrawal_tax_core::portfolio::{parse_records, AccountType, DividendTaxType, RawValue};

    const PORTFOLIO_CSV: &str = "\
ticker,account_type,shares,price,market_value,cost_basis,cap_gain_method,annual_yield_pct,dividend_type
VYM,brokerage,500,120,,41000,fifo,,
bnd, Deferred ,\"1,000\",,$73000,,,3.8,interest
FXAIX,roth,100,,\"27,000\",,,1.2,
";

    #[test]
    fn test_csv_rows_become_records() {
        let records = parse_csv_records(PORTFOLIO_CSV.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].ticker.as_deref(), Some("VYM"));
        assert_eq!(records[0].yield_pct, None);
        assert_eq!(records[1].shares, Some(RawValue::Text("1,000".to_string())));
    }

    #[test]
    fn test_csv_records_parse_to_holdings() {
        let records = parse_csv_records(PORTFOLIO_CSV.as_bytes()).unwrap();
        let holdings = parse_records(records).unwrap();
        assert_eq!(holdings[1].ticker, "BND");
        assert_eq!(holdings[1].account_type, AccountType::Deferred);
        assert_eq!(holdings[1].shares, dec!(1000));
        assert_eq!(holdings[1].market_value, Some(dec!(73000)));
        assert_eq!(holdings[1].dividend_tax_type, Some(DividendTaxType::Interest));
        assert_eq!(holdings[2].market_value, Some(dec!(27000)));
    }

    #[test]
    fn test_blank_lines_skipped() {
        let csv = "ticker,account_type,shares\nVTI,roth,3\n,,\n";
        let records = parse_csv_records(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_csv_extension_detection() {
        assert!(is_csv("portfolio.CSV"));
        assert!(is_csv("/tmp/p.csv"));
        assert!(!is_csv("portfolio.json"));
        assert!(!is_csv("portfolio"));
    }
}
