//! Process command - extract fields from a single invoice document.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::info;

use fapiao_core::extract::{InvoiceParser, LayoutInvoiceParser};
use fapiao_core::models::record::InvoiceRecord;
use fapiao_core::source::{PageSource, PageSources};

use super::load_config;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input invoice (PDF or JSON page dump)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Report missing or malformed fields
    #[arg(long)]
    validate: bool,

    /// Show layout statistics
    #[arg(long)]
    show_stats: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let source = PageSources::from_config(&config.source);
    let parser = LayoutInvoiceParser::from_config(&config)?;

    let page = source.load(&args.input)?;
    let result = parser.parse(&page)?;

    if args.show_stats {
        eprintln!(
            "{} {} rulings, {} cross points, {} cells, {} regions, {} text lines",
            style("ℹ").blue(),
            result.stats.rulings,
            result.stats.cross_points,
            result.stats.cells,
            result.stats.regions,
            result.stats.text_lines
        );
    }

    if args.validate {
        let issues = result.record.validate();
        if !issues.is_empty() {
            eprintln!("{}", style("Validation issues:").yellow());
            for issue in &issues {
                eprintln!("  - {}", issue);
            }
        }
    }

    let output = format_record(&result.record, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        eprintln!(
            "{} Output written to {} in {:?}",
            style("✓").green(),
            output_path.display(),
            start.elapsed()
        );
    } else {
        println!("{}", output);
    }

    Ok(())
}

fn format_record(record: &InvoiceRecord, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(record)?),
        OutputFormat::Csv => format_record_csv(record),
        OutputFormat::Text => Ok(format_record_text(record)),
    }
}

fn format_record_csv(record: &InvoiceRecord) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "invoice_number",
        "issue_date",
        "amount_in_words",
        "amount_in_figures",
    ])?;
    wtr.write_record([
        record.invoice_number.as_deref().unwrap_or(""),
        record.issue_date.as_deref().unwrap_or(""),
        record.amount_in_words.as_deref().unwrap_or(""),
        &record
            .amount_in_figures
            .map(|a| a.to_string())
            .unwrap_or_default(),
    ])?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_record_text(record: &InvoiceRecord) -> String {
    let field = |value: Option<&str>| value.unwrap_or("-").to_string();
    let mut output = String::new();

    output.push_str(&format!("Invoice number: {}\n", field(record.invoice_number.as_deref())));
    output.push_str(&format!("Issue date:     {}\n", field(record.issue_date.as_deref())));
    if let Some(date) = record.issue_date_parsed() {
        output.push_str(&format!("                ({})\n", date));
    }
    output.push_str(&format!("Total (words):  {}\n", field(record.amount_in_words.as_deref())));
    output.push_str(&format!(
        "Total:          {}\n",
        record
            .amount_in_figures
            .map(|a| format!("{:.2}", a))
            .unwrap_or_else(|| "-".to_string())
    ));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn record() -> InvoiceRecord {
        InvoiceRecord {
            invoice_number: Some("12345678".to_string()),
            issue_date: Some("2023年5月1日".to_string()),
            amount_in_words: None,
            amount_in_figures: Some(Decimal::new(1000000, 2)),
        }
    }

    #[test]
    fn test_format_csv() {
        let csv = format_record_csv(&record()).unwrap();
        assert_eq!(
            csv,
            "invoice_number,issue_date,amount_in_words,amount_in_figures\n12345678,2023年5月1日,,10000.00\n"
        );
    }

    #[test]
    fn test_format_text() {
        let text = format_record_text(&record());
        assert!(text.contains("Invoice number: 12345678"));
        assert!(text.contains("(2023-05-01)"));
        assert!(text.contains("Total (words):  -"));
        assert!(text.contains("Total:          10000.00"));
    }
}
