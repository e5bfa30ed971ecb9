use serde_json::Value;

/// Print just the key answer value from the output.
///
/// Looks for the headline result fields in order of priority, then falls
/// back to the first field in the result object.
pub fn print_minimal(value: &Value) {
    println!("{}", minimal_answer(value));
}

fn minimal_answer(value: &Value) -> String {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let Value::Object(map) = result_obj else {
        return format_minimal(result_obj);
    };

    // A valuation without shares outstanding has no per-share answer
    if let Some(Value::Null) = map.get("intrinsic_value_per_share") {
        return "not available".to_string();
    }

    let priority_keys = [
        "intrinsic_value_per_share",
        "base_case_value",
        "enterprise_value",
        "wacc",
    ];
    for key in &priority_keys {
        if let Some(val) = map.get(*key) {
            if !val.is_null() && !val.is_object() {
                return format_minimal(val);
            }
        }
    }

    match map.iter().next() {
        Some((key, val)) => format!("{key}: {}", format_minimal(val)),
        None => String::new(),
    }
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
