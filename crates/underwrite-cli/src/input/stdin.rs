use serde_json::Value;
use std::io::{self, Read};

/// Piped request body, if any. `None` when stdin is a terminal or empty.
///
/// JSON is tried first; anything else is parsed as YAML.
pub fn read_stdin() -> Result<Option<Value>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    parse_body(&buffer)
}

fn parse_body(body: &str) -> Result<Option<Value>, Box<dyn std::error::Error>> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match serde_json::from_str(trimmed) {
        Ok(value) => Ok(Some(value)),
        Err(json_err) => serde_yaml::from_str(trimmed)
            .map(Some)
            .map_err(|_| format!("stdin is neither valid JSON nor YAML: {json_err}").into()),
    }
}
