//! Cellgraph CLI - evaluate and edit JSON sheets

use anyhow::{Context, Result};
use cellgraph::prelude::*;
use cellgraph::ExplainTrace;
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::Level;

#[derive(Parser)]
#[command(name = "cellgraph")]
#[command(author, version, about = "Spreadsheet formula evaluation tool")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate every formula in a sheet
    Eval {
        /// Sheet file (JSON)
        input: PathBuf,

        /// Print results as JSON
        #[arg(long)]
        json: bool,

        /// Include explain traces
        #[arg(long)]
        explain: bool,
    },

    /// Evaluate a single cell
    Cell {
        /// Sheet file (JSON)
        input: PathBuf,

        /// Cell address, e.g. B3
        address: String,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Include the explain trace
        #[arg(long)]
        explain: bool,
    },

    /// Apply an edit and print the recomputed cells
    Edit {
        /// Sheet file (JSON)
        input: PathBuf,

        /// Cell address, e.g. B3
        address: String,

        /// New contents as typed: blank clears, `=` starts a formula
        raw: String,

        /// Print results as JSON
        #[arg(long)]
        json: bool,

        /// Save the edited sheet back to the input file
        #[arg(short, long)]
        write: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Eval {
            input,
            json,
            explain,
        } => eval_sheet(&input, json, explain),
        Commands::Cell {
            input,
            address,
            json,
            explain,
        } => eval_single(&input, &address, json, explain),
        Commands::Edit {
            input,
            address,
            raw,
            json,
            write,
        } => edit_cell(&input, &address, &raw, json, write),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();
}

fn load_sheet(path: &Path) -> Result<Sheet> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    let sheet: Sheet = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse sheet '{}'", path.display()))?;
    tracing::info!(
        name = %sheet.name,
        cells = sheet.cells.len(),
        "loaded sheet"
    );
    Ok(sheet)
}

fn parse_address(text: &str) -> Result<CellAddress> {
    CellAddress::parse(text.trim()).with_context(|| format!("Invalid cell address '{}'", text))
}

fn eval_sheet(input: &Path, json: bool, explain: bool) -> Result<()> {
    let mut sheet = load_sheet(input)?;
    let mut engine = FormulaEngine::with_options(CalculationOptions { explain });
    let results = engine.evaluate_sheet(&mut sheet);

    if json {
        return print_json(&results);
    }

    let mut out = io::stdout().lock();
    print_results(&mut out, &results)?;
    if results.error_count() > 0 {
        tracing::info!(errors = results.error_count(), "sheet has errors");
    }
    Ok(())
}

fn eval_single(input: &Path, address: &str, json: bool, explain: bool) -> Result<()> {
    let address = parse_address(address)?;
    let sheet = load_sheet(input)?;
    if !sheet.is_valid_address(address) {
        tracing::warn!(cell = %address, "address is outside the sheet extent");
    }

    let engine = FormulaEngine::with_options(CalculationOptions { explain });
    let eval = engine.evaluate_cell(&sheet, address);

    if json {
        return print_json(&eval);
    }

    let mut out = io::stdout().lock();
    print_line(&mut out, address, &eval.result)?;
    if let Some(trace) = &eval.explain {
        print_trace(&mut out, trace)?;
    }
    Ok(())
}

fn edit_cell(input: &Path, address: &str, raw: &str, json: bool, write: bool) -> Result<()> {
    let address = parse_address(address)?;
    let mut sheet = load_sheet(input)?;
    if !sheet.is_valid_address(address) {
        tracing::warn!(cell = %address, "editing outside the sheet extent");
    }

    let mut engine = FormulaEngine::new();
    engine.evaluate_sheet(&mut sheet);

    let edit = EditCommand::classify(raw);
    tracing::info!(cell = %address, edit = ?edit, "applying edit");
    let recalc = engine.update_cell(&mut sheet, address, edit.into_cell());

    if json {
        print_json(&recalc.results)?;
    } else {
        let mut out = io::stdout().lock();
        for cell in &recalc.order {
            if let Some(result) = recalc.results.get(*cell) {
                print_line(&mut out, *cell, result)?;
            }
        }
    }

    if write {
        let text = serde_json::to_string_pretty(&sheet).context("Failed to serialize sheet")?;
        std::fs::write(input, text)
            .with_context(|| format!("Failed to write '{}'", input.display()))?;
        eprintln!("Wrote '{}'", input.display());
    }

    Ok(())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize results")?;
    println!("{}", text);
    Ok(())
}

fn print_results(out: &mut impl Write, results: &EvalResults) -> Result<()> {
    for (address, result) in results.iter() {
        print_line(out, *address, result)?;
        if let Some(trace) = results.explain.get(address) {
            print_trace(out, trace)?;
        }
    }
    Ok(())
}

fn print_line(out: &mut impl Write, address: CellAddress, result: &EvalResult) -> Result<()> {
    match result.error() {
        Some(err) => writeln!(out, "{}\t{}\t{}", address, result, err.message)?,
        None => writeln!(out, "{}\t{}", address, result)?,
    }
    Ok(())
}

fn print_trace(out: &mut impl Write, trace: &[ExplainTrace]) -> Result<()> {
    for step in trace {
        for range in &step.ranges {
            writeln!(out, "  {} expands {}", step.cell, range)?;
        }
        for dep in &step.dependencies {
            writeln!(out, "  {} reads {} = {}", step.cell, dep, step.value)?;
        }
    }
    Ok(())
}
