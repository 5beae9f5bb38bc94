use std::path::PathBuf;

use chrono::{Days, Local, NaiveDate};
use clap::Parser;
use itinerary_tools::dates::DateRange;
use itinerary_tools::export::DEFAULT_EXPORT_DIR;
use itinerary_tools::providers::{self, REGISTRY};
use itinerary_tools::{Result, ToolError, config, logging, runner};

const DEFAULT_START_OFFSET_DAYS: u64 = 2;
const DEFAULT_END_OFFSET_DAYS: u64 = 7;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            // Help and version go to stdout and are not failures.
            let code = if error.use_stderr() { 1 } else { 0 };
            let _ = error.print();
            std::process::exit(code);
        }
    };
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    logging::init()?;
    config::load_dotenv();

    if cli.list_available_integrations {
        list_integrations();
        return Ok(());
    }

    let names = requested_names(&cli.integrations);
    if names.is_empty() {
        return Err(ToolError::NoIntegrations);
    }
    let integrations = providers::resolve(&names)?;

    let range = travel_range(Local::now().date_naive(), cli.start_date, cli.end_date);

    runner::run_batch(&integrations, &range, &cli.output_dir, |integration| {
        integration.check_config()
    })?;
    Ok(())
}

fn list_integrations() {
    println!("Available integrations:");
    for integration in REGISTRY {
        let marker = if integration.ready() { "" } else { " [not-ready]" };
        println!("- {}{marker}", integration.name());
    }
}

/// Trimmed integration names, blanks dropped.
fn requested_names(raw: &[String]) -> Vec<&str> {
    raw.iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Fills in missing bounds relative to `today`.
fn travel_range(today: NaiveDate, start: Option<NaiveDate>, end: Option<NaiveDate>) -> DateRange {
    let start = start.unwrap_or_else(|| days_from(today, DEFAULT_START_OFFSET_DAYS));
    let end = end.unwrap_or_else(|| days_from(today, DEFAULT_END_OFFSET_DAYS));
    DateRange::new(start, end)
}

fn days_from(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_add_days(Days::new(days)).unwrap_or(date)
}

fn parse_date(raw: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("'{raw}' is not a valid YYYY-MM-DD date: {err}"))
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Export bus itineraries and fares from provider APIs to spreadsheets."
)]
struct Cli {
    /// Integrations to run, comma-separated or repeated.
    #[arg(short, long, value_delimiter = ',', num_args = 1..)]
    integrations: Vec<String>,

    /// First travel date (YYYY-MM-DD). Defaults to two days from today.
    #[arg(short, long, value_parser = parse_date)]
    start_date: Option<NaiveDate>,

    /// Last travel date (YYYY-MM-DD). Defaults to seven days from today.
    #[arg(short, long, value_parser = parse_date)]
    end_date: Option<NaiveDate>,

    /// Print the available integrations and exit.
    #[arg(short = 'l', long)]
    list_available_integrations: bool,

    /// Directory the workbooks are written to.
    #[arg(short, long, default_value = DEFAULT_EXPORT_DIR)]
    output_dir: PathBuf,
}
