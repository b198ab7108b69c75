use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use sheet_summary::open_spreadsheet;
use sheet_summary::request::parse_columns_argument;
use sheet_summary::request::summarize_workbook;
use sheet_summary::request::AnalysisRequest;
use sheet_summary::request::ErrorResponse;
use sheet_summary::request::InputError;
use sheet_summary::Criteria;
use sheet_summary::SheetSummaryError;
use sheet_summary::DEFAULT_HEADER_SCAN_ROWS;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "sheet-summary")]
#[command(about = "Sum and average columns of an Excel workbook, located by fuzzy header match")]
#[command(version)]
#[command(after_help = "\
Examples:
  sheet-summary prices.xlsx --columns price --columns quantity
  sheet-summary prices.xlsx --columns '[\"current usd\", \"price\"]' --sheet Data
  sheet-summary legacy.xls --list-sheets")]
struct Cli {
    /// Workbook to analyze (.xlsx or .xls)
    file: PathBuf,

    /// Column to summarize; repeatable, or a JSON list of names
    #[arg(long, short = 'c')]
    columns: Vec<String>,

    /// Sheet to analyze instead of the active one
    #[arg(long, short = 's', env = "SHEET_SUMMARY_SHEET")]
    sheet: Option<String>,

    /// Number of leading rows searched for the header
    #[arg(long, env = "SHEET_SUMMARY_HEADER_SCAN_ROWS", default_value_t = DEFAULT_HEADER_SCAN_ROWS)]
    header_scan_rows: usize,

    /// Treat formula error cells (#DIV/0!, #N/A, ...) as empty
    #[arg(long)]
    error_as_empty: bool,

    /// Print the sheet names of the workbook and exit
    #[arg(long)]
    list_sheets: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Log progress to stderr
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    let bytes = std::fs::read(&cli.file).with_context(|| format!("Failed to read {}", cli.file.display()))?;
    let file_name = cli
        .file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    if cli.list_sheets {
        return match open_spreadsheet(&file_name, bytes) {
            Ok(spreadsheet) => print_json(&spreadsheet.sheet_names(), cli.pretty),
            Err(e) => print_error(&e, cli.pretty),
        };
    }

    let columns = match parse_columns(&cli.columns) {
        Ok(columns) => columns,
        Err(e) => return print_error(&e.into(), cli.pretty),
    };
    let request = match AnalysisRequest::new(&file_name, bytes, columns, cli.sheet.clone()) {
        Ok(request) => request,
        Err(e) => return print_error(&e.into(), cli.pretty),
    };
    let criteria = Criteria {
        header_scan_rows: cli.header_scan_rows,
        error_as_empty: cli.error_as_empty,
        ..Criteria::default()
    };
    match summarize_workbook(request, &criteria) {
        Ok(report) => print_json(&report, cli.pretty),
        Err(e) => print_error(&e, cli.pretty),
    }
}

fn parse_columns(arguments: &[String]) -> Result<Vec<String>, InputError> {
    let mut columns = Vec::new();
    for argument in arguments {
        columns.extend(parse_columns_argument(argument)?);
    }
    Ok(columns)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<ExitCode> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(ExitCode::SUCCESS)
}

fn print_error(error: &SheetSummaryError, pretty: bool) -> anyhow::Result<ExitCode> {
    log::debug!("Request failed: {}", error);
    print_json(&ErrorResponse::from(error), pretty)?;
    Ok(ExitCode::from(ErrorResponse::exit_code(error.kind())))
}
