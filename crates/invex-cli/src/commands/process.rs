//! Process command - extract data from a single invoice text file.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{debug, info};

use invex_core::{ExtractionResult, InvoiceEngine};

use super::config;
use super::export::{OutputFormat, format_result};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input text file, or `-` for stdin
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Show extraction confidence scores
    #[arg(long)]
    show_confidence: bool,

    /// Report arithmetic validation issues
    #[arg(long)]
    validate: bool,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = config::load(config_path)?;

    let text = read_input(&args.input)?;
    info!("Processing {}", args.input.display());

    let engine = InvoiceEngine::new(config);
    let result = engine.process(&text)?;

    if args.validate {
        report_validation(&result);
    }

    let output = format_result(&result, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        eprintln!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.show_confidence {
        report_confidence(&result);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn read_input(input: &Path) -> anyhow::Result<String> {
    if input.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }

    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }
    Ok(fs::read_to_string(input)?)
}

fn report_validation(result: &ExtractionResult) {
    let validation = &result.math_validation;
    match validation.calculations_correct {
        Some(true) => eprintln!("{} Totals are consistent", style("✓").green()),
        Some(false) => eprintln!(
            "{} Totals do not add up (discrepancy {}, tolerance {})",
            style("✗").red(),
            validation.discrepancy.unwrap_or_default(),
            validation.tolerance_used.unwrap_or_default()
        ),
        None => eprintln!(
            "{} Not enough amounts to check totals",
            style("ℹ").blue()
        ),
    }

    if validation.line_items_match_subtotal == Some(false) {
        eprintln!("{} Line items do not sum to the subtotal", style("✗").red());
    }
    for index in &validation.inconsistent_line_items {
        if let Some(item) = result.line_items.get(*index) {
            eprintln!(
                "{} Line item {} ({}): quantity × unit price does not match the line total",
                style("✗").red(),
                index + 1,
                item.description
            );
        }
    }
    if !result.missing_required_fields.is_empty() {
        eprintln!(
            "{} Missing required fields: {}",
            style("!").yellow(),
            result.missing_required_fields.join(", ")
        );
    }
}

fn report_confidence(result: &ExtractionResult) {
    eprintln!();
    eprintln!(
        "{} Overall confidence: {:.1}%",
        style("ℹ").blue(),
        result.overall_confidence * 100.0
    );
    for (field, confidence) in &result.field_confidence {
        eprintln!("  {:<18} {:>5.1}%", field, confidence * 100.0);
    }
}
