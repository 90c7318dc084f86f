use serde_json::Value;
use std::io::{self, Read};

/// Whatever was piped on stdin.
#[derive(Debug, PartialEq)]
pub enum Piped {
    Json(Value),
    /// Anything that does not start like JSON is treated as CSV text.
    Csv(String),
}

/// Read piped stdin. Returns None when stdin is a TTY or empty.
pub fn read_stdin() -> Result<Option<Piped>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    classify(&buffer)
}

fn classify(buffer: &str) -> Result<Option<Piped>, Box<dyn std::error::Error>> {
    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        let value: Value = serde_json::from_str(trimmed)
            .map_err(|e| format!("Failed to parse JSON from stdin: {}", e))?;
        return Ok(Some(Piped::Json(value)));
    }
    Ok(Some(Piped::Csv(trimmed.to_string())))
}

/// Piped JSON only; CSV is rejected.
pub fn read_stdin_json() -> Result<Option<Value>, Box<dyn std::error::Error>> {
    match read_stdin()? {
        Some(Piped::Json(value)) => Ok(Some(value)),
        Some(Piped::Csv(_)) => Err("expected JSON on stdin".into()),
        None => Ok(None),
    }
}
