use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Read a JSON file and deserialise into a typed struct.
pub fn read_json<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let value = read_json_value(path)?;
    serde_json::from_value(value).map_err(|e| format!("Invalid input in '{path}': {e}").into())
}

/// Read a JSON file as a generic serde_json::Value.
pub fn read_json_value(path: &str) -> Result<Value, Box<dyn std::error::Error>> {
    let resolved = resolve_path(path)?;
    let contents = fs::read_to_string(&resolved)
        .map_err(|e| format!("Failed to read '{}': {e}", resolved.display()))?;
    serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse '{}': {e}", resolved.display()).into())
}

fn resolve_path(path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let resolved = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !resolved.exists() {
        return Err(format!("File not found: {}", resolved.display()).into());
    }
    if !resolved.is_file() {
        return Err(format!("Not a file: {}", resolved.display()).into());
    }
    Ok(resolved)
}
