use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use intrinsic_core::valuation::{SensitivityGrid, ValuationOutput};

use super::format::format_percent;
use super::valuation::{render_grid, render_valuation};

/// Format output as a table using the tabled crate.
///
/// Valuations and sensitivity grids get a dedicated layout; anything else
/// is printed as a field/value listing of the `result` envelope.
pub fn print_table(value: &Value) {
    let Value::Object(envelope) = value else {
        println!("{value}");
        return;
    };
    let Some(result) = envelope.get("result") else {
        print_fields(envelope);
        return;
    };

    if let Ok(valuation) = serde_json::from_value::<ValuationOutput>(result.clone()) {
        println!("{}", render_valuation(&valuation));
    } else if let Ok(grid) = serde_json::from_value::<SensitivityGrid>(result.clone()) {
        println!("{}", render_grid(&grid));
    } else if let Value::Object(fields) = result {
        print_fields(fields);
    } else {
        println!("{}", format_value("", result));
    }

    print_notes(envelope);
}

fn print_fields(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.clone(), format_value(key, val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_notes(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {w}");
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {meth}");
    }
}

/// Rates print as percentages; everything else as-is.
fn format_value(key: &str, value: &Value) -> String {
    match value {
        Value::String(s) if is_rate_field(key) => s
            .parse::<rust_decimal::Decimal>()
            .map(format_percent)
            .unwrap_or_else(|_| s.clone()),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "not available".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(|v| format_value("", v)).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

fn is_rate_field(key: &str) -> bool {
    matches!(
        key,
        "wacc"
            | "cost_of_equity"
            | "after_tax_cost_of_debt"
            | "cost_of_debt"
            | "cost_of_debt_pretax"
            | "equity_weight"
            | "debt_weight"
            | "tax_rate"
            | "discount_rate_used"
            | "terminal_value_pct"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rate_fields_print_as_percent() {
        assert_eq!(format_value("wacc", &Value::String("0.081789".into())), "8.18%");
        assert_eq!(format_value("tax_rate", &Value::String("0.21".into())), "21.00%");
        assert_eq!(format_value("equity", &Value::String("700".into())), "700");
        assert_eq!(format_value("beta", &Value::Null), "not available");
    }

    #[test]
    fn test_arrays_are_joined() {
        let value = serde_json::json!(["beta", "cash"]);
        assert_eq!(format_value("unavailable", &value), "beta, cash");
    }
}
