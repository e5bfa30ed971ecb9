//! Financial Modeling Prep (FMP) statement source.
//!
//! Uses the blocking `reqwest` client: one request per statement family,
//! no async runtime. Set `FMP_API_KEY` in the environment or a `.env` file;
//! `FMP_BASE_URL` overrides the API root.

use reqwest::blocking::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::env;
use std::time::Duration;
use tracing::debug;

use crate::error::ValuationError;
use crate::ValuationResult;

use super::adapter::StatementSource;
use super::statements::{BalanceSheet, CashFlowStatement, CompanyProfile, IncomeStatement};

/// Base URL for the FMP stable API.
const FMP_BASE_URL: &str = "https://financialmodelingprep.com/stable";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Blocking FMP API client.
#[derive(Debug, Clone)]
pub struct FmpSource {
    client: Client,
    api_key: String,
    base_url: String,
}

impl FmpSource {
    /// Create a new source with the given API key and default timeout.
    pub fn new(api_key: impl Into<String>) -> ValuationResult<Self> {
        Self::with_timeout(api_key, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> ValuationResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: FMP_BASE_URL.to_string(),
        })
    }

    /// Create a source from `FMP_API_KEY` (and optional `FMP_BASE_URL`).
    ///
    /// Loads a `.env` file first if one is present.
    pub fn from_env() -> ValuationResult<Self> {
        // Missing .env is fine
        let _ = dotenvy::dotenv();

        let api_key = env::var("FMP_API_KEY")
            .map_err(|_| ValuationError::Provider("FMP_API_KEY environment variable not set".into()))?;
        let source = Self::new(api_key)?;
        Ok(match env::var("FMP_BASE_URL") {
            Ok(url) if !url.trim().is_empty() => source.with_base_url(url),
            _ => source,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build a URL with the API key.
    fn url(&self, endpoint: &str) -> String {
        if endpoint.contains('?') {
            format!("{}/{endpoint}&apikey={}", self.base_url, self.api_key)
        } else {
            format!("{}/{endpoint}?apikey={}", self.base_url, self.api_key)
        }
    }

    /// Make a GET request and parse the JSON response.
    fn get<T: DeserializeOwned>(&self, endpoint: &str) -> ValuationResult<T> {
        debug!(endpoint, "FMP request");
        let response = self.client.get(self.url(endpoint)).send()?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ValuationError::Provider("FMP rate limit exceeded".into()));
        }

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().unwrap_or_default();
            return Err(ValuationError::Provider(format!("HTTP {status}: {text}")));
        }

        let text = response.text()?;
        if text.contains("\"Error Message\"") {
            return Err(ValuationError::Provider(text));
        }

        Ok(serde_json::from_str(&text)?)
    }

    /// Fetch a list endpoint and keep the most recent (first) entry.
    fn latest<T: DeserializeOwned>(&self, endpoint: &str, what: &str) -> ValuationResult<T> {
        let rows: Vec<T> = self.get(endpoint)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ValuationError::unavailable(what, format!("empty response from {what}")))
    }

    fn statement_endpoint(name: &str, ticker: &str) -> String {
        format!("{name}?symbol={}&period=annual&limit=1", ticker.to_uppercase())
    }
}

impl StatementSource for FmpSource {
    fn profile(&self, ticker: &str) -> ValuationResult<CompanyProfile> {
        let endpoint = format!("profile?symbol={}", ticker.to_uppercase());
        let raw: FmpProfile = self.latest(&endpoint, "profile")?;
        Ok(CompanyProfile {
            market_cap: to_decimal(raw.market_cap),
            beta: to_decimal(raw.beta),
        })
    }

    fn income_statement(&self, ticker: &str) -> ValuationResult<IncomeStatement> {
        let endpoint = Self::statement_endpoint("income-statement", ticker);
        let raw: FmpIncomeStatement = self.latest(&endpoint, "income_statement")?;
        Ok(IncomeStatement {
            income_tax_expense: to_decimal(raw.income_tax_expense),
            income_before_tax: to_decimal(raw.income_before_tax),
            interest_expense: to_decimal(raw.interest_expense),
            weighted_average_shares_diluted: to_decimal(raw.weighted_average_shs_out_dil),
        })
    }

    fn balance_sheet(&self, ticker: &str) -> ValuationResult<BalanceSheet> {
        let endpoint = Self::statement_endpoint("balance-sheet-statement", ticker);
        let raw: FmpBalanceSheet = self.latest(&endpoint, "balance_sheet")?;
        Ok(BalanceSheet {
            total_debt: to_decimal(raw.total_debt),
            cash_and_cash_equivalents: to_decimal(raw.cash_and_cash_equivalents),
            cash_and_short_term_investments: to_decimal(raw.cash_and_short_term_investments),
        })
    }

    fn cash_flow(&self, ticker: &str) -> ValuationResult<CashFlowStatement> {
        let endpoint = Self::statement_endpoint("cash-flow-statement", ticker);
        let raw: FmpCashFlow = self.latest(&endpoint, "cash_flow")?;
        Ok(CashFlowStatement {
            free_cash_flow: to_decimal(raw.free_cash_flow),
            operating_cash_flow: to_decimal(raw.operating_cash_flow),
            capital_expenditure: to_decimal(raw.capital_expenditure),
        })
    }

    fn shares_outstanding(&self, ticker: &str) -> ValuationResult<Decimal> {
        let endpoint = format!("shares-float?symbol={}", ticker.to_uppercase());
        let raw: FmpSharesFloat = self.latest(&endpoint, "shares_outstanding")?;
        to_decimal(raw.outstanding_shares).ok_or_else(|| {
            ValuationError::unavailable("shares_outstanding", "outstandingShares not reported")
        })
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FmpProfile {
    #[serde(default, alias = "mktCap")]
    market_cap: Option<f64>,
    #[serde(default)]
    beta: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FmpIncomeStatement {
    #[serde(default)]
    income_tax_expense: Option<f64>,
    #[serde(default)]
    income_before_tax: Option<f64>,
    #[serde(default)]
    interest_expense: Option<f64>,
    #[serde(default)]
    weighted_average_shs_out_dil: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FmpBalanceSheet {
    #[serde(default)]
    total_debt: Option<f64>,
    #[serde(default)]
    cash_and_cash_equivalents: Option<f64>,
    #[serde(default)]
    cash_and_short_term_investments: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FmpCashFlow {
    #[serde(default)]
    free_cash_flow: Option<f64>,
    #[serde(default)]
    operating_cash_flow: Option<f64>,
    #[serde(default)]
    capital_expenditure: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FmpSharesFloat {
    #[serde(default)]
    outstanding_shares: Option<f64>,
}

fn to_decimal(value: Option<f64>) -> Option<Decimal> {
    value.and_then(|v| Decimal::try_from(v).ok())
}
