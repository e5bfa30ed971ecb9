mod commands;
mod input;
mod output;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::snapshot::TickerArgs;
use commands::valuation::{DcfArgs, ValueArgs, WaccArgs};

/// Single-company intrinsic value from discounted free cash flow
#[derive(Parser)]
#[command(
    name = "intrinsic",
    version,
    about = "Single-company DCF valuation",
    long_about = "Fetches a company's financial snapshot, derives WACC via CAPM, \
                  runs a 5-year free cash flow DCF with a Gordon growth terminal value, \
                  and reports intrinsic value per share with a 3x3 sensitivity grid."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Offline JSON statements file used instead of the FMP API
    #[arg(long, global = true)]
    data: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and print the financial snapshot for a ticker
    Snapshot(TickerArgs),
    /// Calculate WACC for a ticker (CAPM cost of equity)
    Wacc(WaccArgs),
    /// Run a standalone DCF with no data fetch
    Dcf(DcfArgs),
    /// Full valuation: enterprise value, intrinsic value per share, sensitivity grid
    Value(ValueArgs),
    /// Terminal growth x discount rate sensitivity grid only
    Sensitivity(ValueArgs),
    /// Prompt for tickers and parameters until EOF or `quit`
    Interactive,
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn fail(e: Box<dyn std::error::Error>) -> ! {
    eprintln!("{}: {}", "error".red().bold(), e);
    process::exit(1);
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let data = cli.data.as_deref();
    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Snapshot(args) => commands::snapshot::run_snapshot(args, data),
        Commands::Wacc(args) => commands::valuation::run_wacc(args, data),
        Commands::Dcf(args) => commands::valuation::run_dcf(args),
        Commands::Value(args) => commands::valuation::run_value(args, data),
        Commands::Sensitivity(args) => commands::valuation::run_sensitivity(args, data),
        Commands::Interactive => {
            if let Err(e) = commands::interactive::run_interactive(data) {
                fail(e);
            }
            return;
        }
        Commands::Version => {
            println!("intrinsic {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => fail(e),
    }
}
