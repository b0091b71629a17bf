//! Per-document outcomes and the batch accumulator.

use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{FapiaoError, SkipReason};
use crate::extract::{ExtractionResult, InvoiceParser};
use crate::source::PageSource;

/// What happened to one document.
#[derive(Debug, Clone)]
pub enum DocumentOutcome {
    Extracted {
        path: PathBuf,
        result: ExtractionResult,
    },
    Skipped {
        path: PathBuf,
        reason: SkipReason,
        message: String,
    },
}

impl DocumentOutcome {
    pub fn path(&self) -> &Path {
        match self {
            DocumentOutcome::Extracted { path, .. } | DocumentOutcome::Skipped { path, .. } => path,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, DocumentOutcome::Skipped { .. })
    }

    fn from_error(path: PathBuf, err: FapiaoError) -> Self {
        DocumentOutcome::Skipped {
            path,
            reason: err.skip_reason(),
            message: err.to_string(),
        }
    }
}

/// Run one document's full pipeline. Every failure becomes a skip.
pub fn extract_document<S, P>(source: &S, parser: &P, path: &Path) -> DocumentOutcome
where
    S: PageSource + ?Sized,
    P: InvoiceParser + ?Sized,
{
    let page = match source.load(path) {
        Ok(page) => page,
        Err(e) => {
            warn!("Skipping {}: {}", path.display(), e);
            return DocumentOutcome::from_error(path.to_path_buf(), e.into());
        }
    };

    match parser.parse(&page) {
        Ok(result) => {
            info!("Extracted {}", path.display());
            DocumentOutcome::Extracted {
                path: path.to_path_buf(),
                result,
            }
        }
        Err(e) => {
            warn!("Skipping {}: {}", path.display(), e);
            DocumentOutcome::from_error(path.to_path_buf(), e)
        }
    }
}

/// Collects outcomes for a batch; owned by a single writer.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    entries: Vec<(usize, DocumentOutcome)>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of the document at input position `index`.
    pub fn record(&mut self, index: usize, outcome: DocumentOutcome) {
        self.entries.push((index, outcome));
    }

    /// Outcomes in input order.
    pub fn entries(&self) -> Vec<&DocumentOutcome> {
        let mut sorted: Vec<&(usize, DocumentOutcome)> = self.entries.iter().collect();
        sorted.sort_by_key(|(index, _)| *index);
        sorted.into_iter().map(|(_, outcome)| outcome).collect()
    }

    /// Extracted documents in input order.
    pub fn extracted(&self) -> Vec<(&Path, &ExtractionResult)> {
        self.entries()
            .into_iter()
            .filter_map(|outcome| match outcome {
                DocumentOutcome::Extracted { path, result } => Some((path.as_path(), result)),
                DocumentOutcome::Skipped { .. } => None,
            })
            .collect()
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }

    pub fn processed(&self) -> usize {
        self.total() - self.skipped()
    }

    pub fn skipped(&self) -> usize {
        self.entries.iter().filter(|(_, o)| o.is_skipped()).count()
    }

    /// Sum of the amount in figures over extracted documents.
    pub fn total_amount(&self) -> Decimal {
        self.extracted()
            .into_iter()
            .filter_map(|(_, result)| result.record.amount_in_figures)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::LayoutInvoiceParser;
    use crate::source::JsonPageSource;
    use std::fs;
    use std::str::FromStr;

    const GOOD: &str = r#"{
        "words": [
            {"text": "发票号码：00112233", "x0": 300.0, "x1": 400.0, "top": 20.0, "bottom": 30.0},
            {"text": "价税合计", "x0": 10.0, "x1": 60.0, "top": 60.0, "bottom": 70.0},
            {"text": "伍元整(小写)¥5.00", "x0": 110.0, "x1": 200.0, "top": 60.0, "bottom": 70.0}
        ],
        "lines": [
            {"x0": 0.0, "top": 50.0, "bottom": 50.0, "width": 400.0, "height": 0.0},
            {"x0": 0.0, "top": 80.0, "bottom": 80.0, "width": 400.0, "height": 0.0},
            {"x0": 0.0, "top": 90.0, "bottom": 90.0, "width": 20.0, "height": 0.0},
            {"x0": 0.0, "top": 95.0, "bottom": 95.0, "width": 10.0, "height": 0.0},
            {"x0": 0.0, "top": 50.0, "bottom": 80.0, "width": 0.0, "height": 30.0},
            {"x0": 100.0, "top": 50.0, "bottom": 80.0, "width": 0.0, "height": 30.0},
            {"x0": 400.0, "top": 50.0, "bottom": 80.0, "width": 0.0, "height": 30.0}
        ]
    }"#;

    const TWO_RULINGS: &str = r#"{
        "words": [{"text": "发票号码：1", "x0": 0.0, "x1": 10.0, "top": 0.0, "bottom": 10.0}],
        "lines": [
            {"x0": 0.0, "top": 50.0, "bottom": 50.0, "width": 400.0, "height": 0.0},
            {"x0": 0.0, "top": 80.0, "bottom": 80.0, "width": 400.0, "height": 0.0},
            {"x0": 0.0, "top": 50.0, "bottom": 80.0, "width": 0.0, "height": 30.0}
        ]
    }"#;

    #[test]
    fn test_batch_skips_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let paths = vec![
            dir.path().join("a.json"),
            dir.path().join("b.json"),
            dir.path().join("c.json"),
            dir.path().join("d.json"),
        ];
        fs::write(&paths[0], GOOD).unwrap();
        fs::write(&paths[1], TWO_RULINGS).unwrap();
        fs::write(&paths[2], "{ broken").unwrap();
        fs::write(&paths[3], GOOD).unwrap();

        let source = JsonPageSource::new();
        let parser = LayoutInvoiceParser::new();
        let mut report = BatchReport::new();
        // Record out of order, as concurrent workers would.
        for (index, path) in paths.iter().enumerate().rev() {
            report.record(index, extract_document(&source, &parser, path));
        }

        assert_eq!(report.total(), 4);
        assert_eq!(report.processed(), 2);
        assert_eq!(report.skipped(), 2);
        assert_eq!(report.total_amount(), Decimal::from_str("10.00").unwrap());

        let entries = report.entries();
        assert_eq!(entries[0].path(), paths[0].as_path());
        match entries[1] {
            DocumentOutcome::Skipped { reason, .. } => {
                assert_eq!(*reason, SkipReason::LayoutUnderdetermined)
            }
            other => panic!("expected skip, got {:?}", other),
        }
        match entries[2] {
            DocumentOutcome::Skipped { reason, .. } => {
                assert_eq!(*reason, SkipReason::InputUnreadable)
            }
            other => panic!("expected skip, got {:?}", other),
        }

        let (_, first) = report.extracted()[0];
        assert_eq!(first.record.invoice_number.as_deref(), Some("00112233"));
        assert_eq!(first.record.amount_in_words.as_deref(), Some("伍元整"));
    }

    #[test]
    fn test_empty_report() {
        let report = BatchReport::new();
        assert_eq!(report.total(), 0);
        assert_eq!(report.total_amount(), Decimal::ZERO);
    }
}
