//! Line-oriented valuation session.
//!
//! Each round prompts for a ticker, then for FCF (billions), WACC, growth
//! and terminal growth (percent). Pressing enter accepts the bracketed
//! default. `quit`, `exit` or EOF ends the session.

use colored::Colorize;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::io::{self, BufRead, Write};

use intrinsic_core::provider::{normalize_ticker, CachedProvider, FinancialDataProvider};
use intrinsic_core::valuation::CapmAssumptions;

use crate::input::params::{
    self, PercentRange, DEFAULT_GROWTH_PERCENT, DEFAULT_TERMINAL_GROWTH_PERCENT,
    FALLBACK_WACC_PERCENT,
};
use crate::output::valuation::render_valuation;

use super::data::build_provider;
use super::valuation::{usable_wacc, value_with_inputs};

pub fn run_interactive(data: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let provider = CachedProvider::new(build_provider(data)?);
    let stdin = io::stdin();
    let stdout = io::stdout();
    Session::new(&provider, CapmAssumptions::default()).run(stdin.lock(), stdout.lock())?;
    Ok(())
}

/// Fetched FCF per ticker, in billions, for the lifetime of one session.
#[derive(Debug, Default)]
pub struct FcfDefaults {
    by_ticker: HashMap<String, Decimal>,
}

impl FcfDefaults {
    pub fn get_or_insert_with(&mut self, ticker: &str, fetch: impl FnOnce() -> Decimal) -> Decimal {
        *self
            .by_ticker
            .entry(normalize_ticker(ticker))
            .or_insert_with(fetch)
    }
}

enum Answer {
    Quit,
    Default,
    Value(Decimal),
}

pub struct Session<'a, P> {
    provider: &'a P,
    assumptions: CapmAssumptions,
    fcf_defaults: FcfDefaults,
}

impl<'a, P: FinancialDataProvider> Session<'a, P> {
    pub fn new(provider: &'a P, assumptions: CapmAssumptions) -> Self {
        Self {
            provider,
            assumptions,
            fcf_defaults: FcfDefaults::default(),
        }
    }

    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, mut out: W) -> io::Result<()> {
        writeln!(
            out,
            "intrinsic {} | enter a ticker, or `quit` to exit",
            env!("CARGO_PKG_VERSION")
        )?;

        loop {
            write!(out, "\nTicker: ")?;
            out.flush()?;
            let Some(line) = read_line(&mut input)? else {
                break;
            };
            if is_quit(&line) {
                break;
            }
            if line.is_empty() {
                continue;
            }
            if !self.value_round(&line, &mut input, &mut out)? {
                break;
            }
        }
        Ok(())
    }

    /// One valuation. Returns `false` when the user quit mid-round.
    fn value_round<R: BufRead, W: Write>(
        &mut self,
        ticker: &str,
        input: &mut R,
        out: &mut W,
    ) -> io::Result<bool> {
        let snapshot = self.provider.fetch(ticker);
        for field in &snapshot.unavailable {
            writeln!(out, "note: {field} unavailable for {}; using 0", snapshot.ticker)?;
        }

        let fcf_default = self
            .fcf_defaults
            .get_or_insert_with(&snapshot.ticker, || {
                params::fcf_to_billions(snapshot.free_cash_flow)
            });
        let wacc_default = usable_wacc(&snapshot, &self.assumptions)
            .map(params::rate_to_percent)
            .unwrap_or(FALLBACK_WACC_PERCENT);

        let fcf = match ask(
            input,
            out,
            "Free cash flow (billions)",
            fcf_default,
            params::fcf_from_billions,
        )? {
            Answer::Quit => return Ok(false),
            Answer::Default => None,
            Answer::Value(v) => Some(v),
        };
        let wacc = match ask(input, out, "WACC %", wacc_default, in_range(params::WACC))? {
            Answer::Quit => return Ok(false),
            Answer::Default => None,
            Answer::Value(v) => Some(v),
        };
        let growth = match ask(
            input,
            out,
            "Growth rate %",
            DEFAULT_GROWTH_PERCENT,
            in_range(params::GROWTH),
        )? {
            Answer::Quit => return Ok(false),
            Answer::Default => params::percent_to_rate(DEFAULT_GROWTH_PERCENT),
            Answer::Value(v) => v,
        };
        let terminal_growth = match ask(
            input,
            out,
            "Terminal growth %",
            DEFAULT_TERMINAL_GROWTH_PERCENT,
            in_range(params::TERMINAL_GROWTH),
        )? {
            Answer::Quit => return Ok(false),
            Answer::Default => params::percent_to_rate(DEFAULT_TERMINAL_GROWTH_PERCENT),
            Answer::Value(v) => v,
        };

        match value_with_inputs(
            &snapshot,
            &self.assumptions,
            fcf,
            wacc,
            growth,
            terminal_growth,
        ) {
            Ok(output) => {
                writeln!(out, "\n{}", render_valuation(&output.result))?;
                for w in &output.warnings {
                    writeln!(out, "  - {w}")?;
                }
            }
            Err(e) => writeln!(out, "{}: {e}", "error".red().bold())?,
        }
        Ok(true)
    }
}

fn in_range(range: PercentRange) -> impl Fn(Decimal) -> Result<Decimal, String> {
    move |percent| range.to_rate(percent)
}

/// Prompt until the answer is empty, a quit word, or a value `convert`
/// accepts.
fn ask<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    label: &str,
    default: Decimal,
    convert: impl Fn(Decimal) -> Result<Decimal, String>,
) -> io::Result<Answer> {
    loop {
        write!(out, "{label} [{}]: ", default.round_dp(2).normalize())?;
        out.flush()?;
        let Some(line) = read_line(input)? else {
            return Ok(Answer::Quit);
        };
        if is_quit(&line) {
            return Ok(Answer::Quit);
        }
        if line.is_empty() {
            return Ok(Answer::Default);
        }
        match line.parse::<Decimal>() {
            Ok(value) => match convert(value) {
                Ok(converted) => return Ok(Answer::Value(converted)),
                Err(msg) => writeln!(out, "{msg}")?,
            },
            Err(_) => writeln!(out, "not a number: {line}")?,
        }
    }
}

fn read_line<R: BufRead>(input: &mut R) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn is_quit(line: &str) -> bool {
    line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit")
}
