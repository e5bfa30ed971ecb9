use tracing::info;

use intrinsic_core::provider::{FinancialDataProvider, FmpSource, SnapshotAdapter, StaticSource};

use crate::input;

/// Offline statements from `--data <file>`, otherwise the FMP API.
pub fn build_provider(
    data: Option<&str>,
) -> Result<Box<dyn FinancialDataProvider>, Box<dyn std::error::Error>> {
    match data {
        Some(path) => {
            let source = StaticSource::from_json_value(input::file::read_json_value(path)?)?;
            info!(path, companies = source.len(), "using offline statements");
            Ok(Box::new(SnapshotAdapter::new(source)))
        }
        None => {
            let source = FmpSource::from_env()?;
            info!("using Financial Modeling Prep API");
            Ok(Box::new(SnapshotAdapter::new(source)))
        }
    }
}
