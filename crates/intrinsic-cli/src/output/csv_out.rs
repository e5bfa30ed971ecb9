use serde_json::Value;
use std::io::{self, Write};

use intrinsic_core::valuation::SensitivityGrid;

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());
    let _ = write_csv(&mut wtr, value);
    let _ = wtr.flush();
}

/// A sensitivity grid becomes a matrix (one row per terminal growth rate);
/// any other result becomes `field,value` pairs.
fn write_csv<W: Write>(wtr: &mut csv::Writer<W>, value: &Value) -> csv::Result<()> {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Ok(grid) = serde_json::from_value::<SensitivityGrid>(result.clone()) {
        return write_grid(wtr, &grid);
    }

    match result {
        Value::Object(map) => {
            wtr.write_record(["field", "value"])?;
            for (key, val) in map {
                wtr.write_record([key.as_str(), &format_csv_value(val)])?;
            }
        }
        _ => wtr.write_record([&format_csv_value(result)])?,
    }
    Ok(())
}

fn write_grid<W: Write>(wtr: &mut csv::Writer<W>, grid: &SensitivityGrid) -> csv::Result<()> {
    let mut header = vec!["terminal_growth".to_string()];
    header.extend(grid.discount_rate_values.iter().map(|r| r.to_string()));
    wtr.write_record(&header)?;

    for (i, tg) in grid.terminal_growth_values.iter().enumerate() {
        let mut row = vec![tg.to_string()];
        row.extend(
            (0..grid.discount_rate_values.len())
                .map(|j| grid.intrinsic_value(i, j).map(|v| v.to_string()).unwrap_or_default()),
        );
        wtr.write_record(&row)?;
    }
    Ok(())
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
