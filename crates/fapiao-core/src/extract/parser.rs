//! Layout-driven invoice parser.

use std::time::Instant;

use tracing::{debug, info, warn};

use super::amounts::AmountSplitter;
use super::rules::{FieldExtractor, LabeledExtractor, SiblingMatcher};
use super::{InvoiceParser, Result};
use crate::layout::{LayoutStats, PageLayout, RegionKey, RegionText};
use crate::models::config::{AbsoluteField, FapiaoConfig, LayoutConfig, SiblingField};
use crate::models::page::Page;
use crate::models::record::InvoiceRecord;

/// Result of invoice extraction.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// Extracted fields.
    pub record: InvoiceRecord,
    /// Extraction warnings.
    pub warnings: Vec<String>,
    /// Layout counts for diagnostics.
    pub stats: LayoutStats,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Parser combining grid reconstruction with label rules.
pub struct LayoutInvoiceParser {
    layout: LayoutConfig,
    absolute: Vec<LabeledExtractor>,
    siblings: Vec<SiblingMatcher>,
    splitter: AmountSplitter,
}

impl LayoutInvoiceParser {
    /// Create a parser with the default rules.
    pub fn new() -> Self {
        Self::from_config(&FapiaoConfig::default())
            .expect("default extraction rules compile")
    }

    /// Create a parser from configuration.
    pub fn from_config(config: &FapiaoConfig) -> Result<Self> {
        let rules = &config.extraction;
        let absolute = rules
            .absolute_rules
            .iter()
            .map(LabeledExtractor::compile)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let siblings = rules.sibling_rules.iter().map(SiblingMatcher::new).collect();
        let splitter = AmountSplitter::new(&rules.figures_marker, &rules.words_marker)?;

        Ok(Self {
            layout: config.layout.clone(),
            absolute,
            siblings,
            splitter,
        })
    }

    /// Override layout tolerances.
    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }

    fn apply_absolute(
        &self,
        region: &RegionText,
        record: &mut InvoiceRecord,
        warnings: &mut Vec<String>,
    ) {
        for line in region.lines.iter() {
            for extractor in &self.absolute {
                let values = extractor.extract_all(&line.text);
                if values.len() > 1 {
                    warn!(
                        "Label for {} matched {} times on line at {}",
                        extractor.field.name(),
                        values.len(),
                        line.baseline
                    );
                    warnings.push(format!(
                        "Label for {} matched {} times on one line, using the first",
                        extractor.field.name(),
                        values.len()
                    ));
                }
                if let Some(value) = values.into_iter().next() {
                    debug!("{} = {} (line at {})", extractor.field.name(), value, line.baseline);
                    match extractor.field {
                        AbsoluteField::InvoiceNumber => record.invoice_number = Some(value),
                        AbsoluteField::IssueDate => record.issue_date = Some(value),
                    }
                }
            }
        }
    }

    fn apply_sibling(
        &self,
        layout: &PageLayout,
        region: &RegionText,
        record: &mut InvoiceRecord,
        warnings: &mut Vec<String>,
    ) -> Result<()> {
        let content = region.content();

        for matcher in &self.siblings {
            if !matcher.matches(&content) {
                continue;
            }

            let Some(value_cell) = next_cell_right(layout, region) else {
                warn!("No value cell right of '{}'", matcher.label());
                warnings.push(format!(
                    "No value cell right of label '{}'",
                    matcher.label()
                ));
                continue;
            };

            match matcher.field {
                SiblingField::GrandTotal => {
                    let pair = self.splitter.split(&value_cell.content())?;
                    debug!("grand total = {} / {}", pair.words, pair.figures);
                    record.amount_in_words = Some(pair.words);
                    record.amount_in_figures = Some(pair.figures);
                }
            }
        }

        Ok(())
    }
}

impl Default for LayoutInvoiceParser {
    fn default() -> Self {
        Self::new()
    }
}

impl InvoiceParser for LayoutInvoiceParser {
    fn parse(&self, page: &Page) -> Result<ExtractionResult> {
        let start = Instant::now();
        let mut warnings = Vec::new();

        info!(
            "Parsing page with {} tokens and {} segments",
            page.tokens.len(),
            page.segments.len()
        );

        let layout = PageLayout::analyze(page, &self.layout)?;
        let mut record = InvoiceRecord::new();

        for region in &layout.regions {
            match region.key {
                RegionKey::Free { .. } => {
                    self.apply_absolute(region, &mut record, &mut warnings)
                }
                RegionKey::Cell { .. } => {
                    self.apply_sibling(&layout, region, &mut record, &mut warnings)?
                }
            }
        }

        for field in record.missing_fields() {
            warnings.push(format!("Could not extract {}", field));
        }

        debug!(
            "Extracted {:?} with {} warnings from {} regions",
            record.invoice_number,
            warnings.len(),
            layout.stats.regions
        );

        Ok(ExtractionResult {
            record,
            warnings,
            stats: layout.stats,
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// The cell immediately right of `label` among the non-empty cells of its row.
pub fn next_cell_right<'a>(layout: &'a PageLayout, label: &RegionText) -> Option<&'a RegionText> {
    let RegionKey::Cell { row, rect } = label.key else {
        return None;
    };

    let row_cells = layout.row_cells(row);
    if row_cells.len() < 2 {
        return None;
    }

    let position = row_cells
        .iter()
        .position(|r| r.key.cell().map(|c| c.left()) == Some(rect.left()))?;
    row_cells.get(position + 1).copied()
}
