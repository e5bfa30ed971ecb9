use serde_json::Value;
use std::io::{self, Read};

/// JSON piped on stdin, or `None` when stdin is a terminal or empty.
pub fn read_stdin() -> Result<Option<Value>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    parse_piped(&buffer)
}

fn parse_piped(buffer: &str) -> Result<Option<Value>, Box<dyn std::error::Error>> {
    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(trimmed)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_input_is_none() {
        assert!(parse_piped("  \n").unwrap().is_none());
    }

    #[test]
    fn test_json_input_parsed() {
        let value = parse_piped(r#"{"last_fcf": "1000"}"#).unwrap().unwrap();
        assert_eq!(value["last_fcf"], "1000");
        assert!(parse_piped("not json").is_err());
    }
}
