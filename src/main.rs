//! bookpress - book interior composer

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use bookpress::{
    BookInput, BookPress, BookPressBuilder, StyleConfig, build_book, inspect_pdf_path,
    print_compatibility_issues,
};

#[derive(Parser)]
#[command(name = "bookpress")]
#[command(version, about = "Compose a book interior PDF with a resolved contents page", long_about = None)]
#[command(after_help = "EXAMPLES:
    bookpress compose book.json interior.pdf           Compose one book
    bookpress job payload.json --out-dir ./out         Run the PDF stage on a payload
    bookpress inspect interior.pdf                     Show page, link and outline counts")]
struct Cli {
    /// Style configuration (JSON)
    #[arg(long, global = true, value_name = "FILE")]
    style: Option<PathBuf>,

    /// Write a JSONL debug log
    #[arg(long, global = true, value_name = "FILE")]
    debug_log: Option<PathBuf>,

    /// Write a JSONL perf log
    #[arg(long, global = true, value_name = "FILE")]
    perf_log: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compose a book described by a JSON file
    Compose {
        #[arg(value_name = "BOOK")]
        input: PathBuf,

        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Print the compose report as JSON
        #[arg(long)]
        report: bool,
    },
    /// Run the PDF stage on a pipeline payload
    Job {
        #[arg(value_name = "PAYLOAD")]
        payload: PathBuf,

        #[arg(long, value_name = "DIR", default_value = ".")]
        out_dir: PathBuf,
    },
    /// Inspect a produced PDF
    Inspect {
        #[arg(value_name = "PDF")]
        input: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match &cli.command {
        Command::Compose {
            input,
            output,
            report,
        } => compose(&cli, input, output, *report),
        Command::Job { payload, out_dir } => job(&cli, payload, out_dir),
        Command::Inspect { input } => inspect(input),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn press(cli: &Cli) -> Result<BookPress, String> {
    let mut builder: BookPressBuilder = BookPress::builder();
    if let Some(path) = &cli.style {
        builder = builder.style(StyleConfig::from_path(path).map_err(|e| e.to_string())?);
    }
    if let Some(path) = &cli.debug_log {
        builder = builder.debug_log(path);
    }
    if let Some(path) = &cli.perf_log {
        builder = builder.perf_log(path);
    }
    builder.build().map_err(|e| e.to_string())
}

fn read_json(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))
}

fn compose(cli: &Cli, input: &Path, output: &Path, print_report: bool) -> Result<(), String> {
    let raw = read_json(input)?;
    let book_input = BookInput::from_json(&raw).map_err(|e| e.to_string())?;
    let book = build_book(&book_input).map_err(|e| e.to_string())?;
    let press = press(cli)?;
    let report = press
        .compose_with_report(&book, output)
        .map_err(|e| e.to_string())?;
    if print_report {
        let json = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
        println!("{json}");
    } else {
        println!(
            "{}: {} pages, {} contents entries",
            report.output.display(),
            report.page_count,
            report.page_map.len()
        );
    }
    for anchor in &report.missing_anchors {
        eprintln!("warning: no page number for {anchor}");
    }
    Ok(())
}

fn job(cli: &Cli, payload: &Path, out_dir: &Path) -> Result<(), String> {
    let raw = read_json(payload)?;
    let event: serde_json::Value = serde_json::from_str(&raw).map_err(|e| e.to_string())?;
    let press = press(cli)?;
    let result = press.run_job(event, out_dir).map_err(|e| e.to_string())?;
    let json = serde_json::to_string_pretty(&result).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

fn inspect(input: &Path) -> Result<(), String> {
    let report = inspect_pdf_path(input).map_err(|e| e.to_string())?;
    let json = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
    println!("{json}");
    let issues = print_compatibility_issues(&report);
    if issues.is_empty() {
        return Ok(());
    }
    let codes: Vec<&str> = issues.iter().map(|code| code.as_str()).collect();
    Err(format!("not usable as a print interior: {}", codes.join(", ")))
}
