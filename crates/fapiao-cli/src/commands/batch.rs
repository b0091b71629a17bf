//! Batch processing command for a directory of invoice documents.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::{Args, ValueEnum};
use console::style;
use glob::{glob_with, MatchOptions, Pattern};
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Format, Workbook};
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error};

use fapiao_core::batch::{extract_document, BatchReport, DocumentOutcome};
use fapiao_core::error::SkipReason;
use fapiao_core::extract::LayoutInvoiceParser;
use fapiao_core::source::PageSources;

use super::load_config;

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input directory, searched recursively
    #[arg(short, long, required = true)]
    path: PathBuf,

    /// Output spreadsheet (default: result.xlsx or result.csv)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Spreadsheet format
    #[arg(short, long, value_enum, default_value = "xlsx")]
    format: SpreadsheetFormat,

    /// Number of documents processed concurrently
    #[arg(short = 'j', long)]
    jobs: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SpreadsheetFormat {
    /// Excel workbook with one sheet
    Xlsx,
    /// Comma-separated values
    Csv,
}

impl SpreadsheetFormat {
    fn default_output(self) -> PathBuf {
        match self {
            SpreadsheetFormat::Xlsx => PathBuf::from("result.xlsx"),
            SpreadsheetFormat::Csv => PathBuf::from("result.csv"),
        }
    }
}

/// Sheet holding one row per extracted invoice.
const SHEET_NAME: &str = "发票";

const COLUMNS: [&str; 5] = [
    "file",
    "invoice_number",
    "issue_date",
    "amount_in_words",
    "amount_in_figures",
];

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.path.is_dir() {
        anyhow::bail!("Input directory not found: {}", args.path.display());
    }

    let files = discover_files(&args.path, &config.batch.extensions)?;
    if files.is_empty() {
        anyhow::bail!(
            "No files with extension(s) {} found under {}",
            config.batch.extensions.join(", "),
            args.path.display()
        );
    }

    let total = files.len();
    let rule = "_".repeat(50);
    println!("{}", rule);
    println!("Total {} file(s) to parse.", total);
    println!("{}", rule);

    let jobs = args.jobs.unwrap_or(config.batch.jobs).max(1);
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.format.default_output());
    let source = Arc::new(PageSources::from_config(&config.source));
    let parser = Arc::new(LayoutInvoiceParser::from_config(&config)?);

    let progress = ProgressBar::new(total as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    // Single writer: only the collector touches the report.
    let (tx, mut rx) = mpsc::channel::<(usize, DocumentOutcome)>(jobs * 2);
    let collector_progress = progress.clone();
    let collector = tokio::spawn(async move {
        let mut report = BatchReport::new();
        while let Some((index, outcome)) = rx.recv().await {
            collector_progress.set_message(outcome.path().display().to_string());
            if let DocumentOutcome::Skipped { path, message, .. } = &outcome {
                collector_progress.suspend(|| {
                    eprintln!(
                        "{} File error: {}\t{}\tSkip...",
                        style("✗").red(),
                        path.display(),
                        message
                    )
                });
            }
            report.record(index, outcome);
            collector_progress.inc(1);
        }
        report
    });

    let semaphore = Arc::new(Semaphore::new(jobs));
    for (index, path) in files.into_iter().enumerate() {
        let permit = semaphore.clone().acquire_owned().await?;
        let source = Arc::clone(&source);
        let parser = Arc::clone(&parser);
        let tx = tx.clone();

        tokio::spawn(async move {
            let task_path = path.clone();
            let outcome = tokio::task::spawn_blocking(move || {
                extract_document(source.as_ref(), parser.as_ref(), &task_path)
            })
            .await
            .unwrap_or_else(|e| {
                error!("Worker for {} failed: {}", path.display(), e);
                DocumentOutcome::Skipped {
                    path,
                    reason: SkipReason::Other,
                    message: e.to_string(),
                }
            });

            if tx.send((index, outcome)).await.is_err() {
                error!("Batch collector stopped early");
            }
            drop(permit);
        });
    }
    drop(tx);

    let report = collector.await?;
    progress.finish_and_clear();

    println!("{}", rule);
    println!("Finish parsing, save data to {}", output.display());
    match args.format {
        SpreadsheetFormat::Xlsx => write_workbook(&output, &report)?,
        SpreadsheetFormat::Csv => write_spreadsheet(&output, &report)?,
    }
    debug!("Wrote {} rows to {}", report.processed(), output.display());

    let summary = format!(
        "JOB DONE. ({}/{} Extracted!)",
        report.processed(),
        report.total()
    );
    println!("{}", rule);
    println!("{:>50}", style(summary).green());
    println!("{:>50}", "_".repeat(20));
    println!(
        "{:>50}",
        format!("Total Amount: {:.2}", report.total_amount())
    );
    if report.skipped() > 0 {
        println!(
            "{:>50}",
            style(format!("{} skipped", report.skipped())).red()
        );
    }
    debug!("Batch finished in {:?}", start.elapsed());

    Ok(())
}

/// Files under `dir` (recursively) with one of `extensions`, sorted.
fn discover_files(dir: &Path, extensions: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };
    let root = Pattern::escape(&dir.to_string_lossy());

    let mut files = Vec::new();
    for ext in extensions {
        let pattern = format!("{}/**/*.{}", root, ext.trim_start_matches('.'));
        files.extend(
            glob_with(&pattern, options)?
                .filter_map(|r| r.ok())
                .filter(|p| p.is_file()),
        );
    }

    files.sort();
    files.dedup();
    Ok(files)
}

/// Workbook with one row per extracted document and a trailing total row.
/// Amounts are written as numbers.
fn write_workbook(path: &Path, report: &BatchReport) -> anyhow::Result<()> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let money = Format::new().set_num_format("0.00");

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;
    for (col, title) in COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &header)?;
    }

    let mut row = 1u32;
    for (file, result) in report.extracted() {
        let record = &result.record;
        sheet.write_string(row, 0, file.display().to_string())?;
        let text = [
            &record.invoice_number,
            &record.issue_date,
            &record.amount_in_words,
        ];
        for (col, value) in text.into_iter().enumerate() {
            if let Some(value) = value {
                sheet.write_string(row, col as u16 + 1, value.as_str())?;
            }
        }
        if let Some(amount) = record.amount_in_figures.and_then(|a| a.to_f64()) {
            sheet.write_number_with_format(row, 4, amount, &money)?;
        }
        row += 1;
    }

    sheet.write_string_with_format(row, 0, "TOTAL", &header)?;
    let total = report.total_amount().to_f64().unwrap_or_default();
    sheet.write_number_with_format(row, 4, total, &money)?;
    sheet.set_column_width(0, 40)?;

    workbook.save(path)?;
    Ok(())
}

/// One row per extracted document plus a trailing total row.
fn write_spreadsheet(path: &Path, report: &BatchReport) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record(COLUMNS)?;

    for (file, result) in report.extracted() {
        let record = &result.record;
        wtr.write_record([
            file.display().to_string().as_str(),
            record.invoice_number.as_deref().unwrap_or(""),
            record.issue_date.as_deref().unwrap_or(""),
            record.amount_in_words.as_deref().unwrap_or(""),
            &record
                .amount_in_figures
                .map(|a| a.to_string())
                .unwrap_or_default(),
        ])?;
    }

    wtr.write_record([
        "TOTAL",
        "",
        "",
        "",
        &format!("{:.2}", report.total_amount()),
    ])?;

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook, Data, Reader, Xlsx};
    use fapiao_core::extract::ExtractionResult;
    use fapiao_core::layout::LayoutStats;
    use fapiao_core::models::record::InvoiceRecord;
    use rust_decimal::Decimal;
    use std::fs;

    #[test]
    fn test_discover_files_recursive() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("b.json"), "{}").unwrap();
        fs::write(dir.path().join("nested").join("a.JSON"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let files = discover_files(dir.path(), &["json".to_string()]).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"b.json".to_string()));
        assert!(names.contains(&"a.JSON".to_string()));
    }

    fn sample_report() -> BatchReport {
        let mut report = BatchReport::new();
        for (index, amount) in [(0usize, 1250i64), (1, 250)] {
            report.record(
                index,
                DocumentOutcome::Extracted {
                    path: PathBuf::from(format!("doc{}.json", index)),
                    result: ExtractionResult {
                        record: InvoiceRecord {
                            invoice_number: Some(format!("{}", index)),
                            issue_date: None,
                            amount_in_words: None,
                            amount_in_figures: Some(Decimal::new(amount, 2)),
                        },
                        warnings: Vec::new(),
                        stats: LayoutStats::default(),
                        processing_time_ms: 0,
                    },
                },
            );
        }
        report.record(
            2,
            DocumentOutcome::Skipped {
                path: PathBuf::from("bad.json"),
                reason: SkipReason::LayoutUnderdetermined,
                message: "layout".to_string(),
            },
        );
        report
    }

    #[test]
    fn test_write_spreadsheet_with_total() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.csv");

        write_spreadsheet(&output, &sample_report()).unwrap();
        let content = fs::read_to_string(&output).unwrap();
        let rows: Vec<&str> = content.lines().collect();

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1], "doc0.json,0,,,12.50");
        assert_eq!(rows[2], "doc1.json,1,,,2.50");
        assert_eq!(rows[3], "TOTAL,,,,15.00");
    }

    #[test]
    fn test_write_workbook_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.xlsx");

        write_workbook(&output, &sample_report()).unwrap();

        let mut workbook: Xlsx<_> = open_workbook(&output).unwrap();
        assert_eq!(workbook.sheet_names(), vec![SHEET_NAME.to_string()]);
        let range = workbook.worksheet_range(SHEET_NAME).unwrap();

        assert_eq!(range.height(), 4);
        assert_eq!(
            range.get_value((0, 4)),
            Some(&Data::String("amount_in_figures".to_string()))
        );
        assert_eq!(
            range.get_value((1, 0)),
            Some(&Data::String("doc0.json".to_string()))
        );
        assert_eq!(
            range.get_value((1, 1)),
            Some(&Data::String("0".to_string()))
        );
        assert_eq!(range.get_value((1, 4)), Some(&Data::Float(12.5)));
        assert_eq!(range.get_value((2, 4)), Some(&Data::Float(2.5)));
        assert_eq!(
            range.get_value((3, 0)),
            Some(&Data::String("TOTAL".to_string()))
        );
        assert_eq!(range.get_value((3, 4)), Some(&Data::Float(15.0)));
    }

    #[test]
    fn test_default_output_follows_format() {
        assert_eq!(
            SpreadsheetFormat::Xlsx.default_output(),
            PathBuf::from("result.xlsx")
        );
        assert_eq!(
            SpreadsheetFormat::Csv.default_output(),
            PathBuf::from("result.csv")
        );
    }
}
