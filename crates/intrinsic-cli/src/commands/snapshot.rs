use clap::Args;
use serde_json::Value;
use std::time::Instant;

use intrinsic_core::with_metadata;

use super::data::build_provider;

/// Arguments for commands that take only a ticker
#[derive(Args)]
pub struct TickerArgs {
    /// Ticker symbol (e.g. AAPL)
    pub ticker: String,
}

pub fn run_snapshot(args: TickerArgs, data: Option<&str>) -> Result<Value, Box<dyn std::error::Error>> {
    let provider = build_provider(data)?;

    let start = Instant::now();
    let snapshot = provider.fetch(&args.ticker);
    let warnings = snapshot
        .unavailable
        .iter()
        .map(|field| format!("{field} unavailable; defaulted to 0"))
        .collect();
    let elapsed = start.elapsed().as_micros() as u64;

    let output = with_metadata(
        "Financial snapshot (most recent annual statements)",
        &serde_json::json!({ "ticker": snapshot.ticker }),
        warnings,
        elapsed,
        snapshot,
    );
    Ok(serde_json::to_value(output)?)
}
