//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{FapiaoError, Result};

/// Main configuration for the fapiao pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FapiaoConfig {
    /// Grid reconstruction tolerances.
    pub layout: LayoutConfig,

    /// Field rules.
    pub extraction: ExtractionConfig,

    /// Page source settings.
    pub source: SourceConfig,

    /// Batch processing settings.
    pub batch: BatchConfig,
}

/// Geometric tolerances, in page units.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Slack when testing whether a vertical and a horizontal ruling meet.
    pub intersection_tolerance: f64,

    /// Number of shortest horizontal segments discarded as noise.
    pub noise_hlines: usize,

    /// Vertical radius for joining a free token to an existing cluster.
    pub cluster_tolerance: i64,

    /// Baseline radius for merging tokens in free-text regions.
    pub free_text_line_tolerance: i64,

    /// Baseline radius for merging tokens inside cells.
    pub cell_line_tolerance: i64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            intersection_tolerance: 1.0,
            noise_hlines: 2,
            cluster_tolerance: 2,
            free_text_line_tolerance: 1,
            cell_line_tolerance: 3,
        }
    }
}

/// Field found anywhere in free text by its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsoluteField {
    InvoiceNumber,
    IssueDate,
}

impl AbsoluteField {
    pub fn name(&self) -> &'static str {
        match self {
            AbsoluteField::InvoiceNumber => "invoice_number",
            AbsoluteField::IssueDate => "issue_date",
        }
    }
}

/// Field read from the cell right of its label cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiblingField {
    /// Amount in words and in figures, split on the figures marker.
    GrandTotal,
}

impl SiblingField {
    pub fn name(&self) -> &'static str {
        match self {
            SiblingField::GrandTotal => "grand_total",
        }
    }
}

/// `field` is taken from a free-text line containing `label`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbsoluteRule {
    pub field: AbsoluteField,
    pub label: String,
}

/// `field` is the next cell right of the cell containing `label`, same row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiblingRule {
    pub field: SiblingField,
    pub label: String,
}

/// Field rule configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Free-text rules, applied to every free-text line.
    pub absolute_rules: Vec<AbsoluteRule>,

    /// Cell navigation rules.
    pub sibling_rules: Vec<SiblingRule>,

    /// Regex separating the amount in words from the amount in figures.
    pub figures_marker: String,

    /// Regex stripped from the start of the amount in words.
    pub words_marker: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            absolute_rules: vec![
                AbsoluteRule {
                    field: AbsoluteField::InvoiceNumber,
                    label: "发票号码".to_string(),
                },
                AbsoluteRule {
                    field: AbsoluteField::IssueDate,
                    label: "开票日期".to_string(),
                },
            ],
            sibling_rules: vec![SiblingRule {
                field: SiblingField::GrandTotal,
                label: "价税合计".to_string(),
            }],
            figures_marker: r"[(（]小写[)）]".to_string(),
            words_marker: r"^\s*[(（]大写[)）]".to_string(),
        }
    }
}

/// Word grouping for documents read from PDF content streams.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Largest horizontal gap between glyphs of one word.
    pub word_x_tolerance: f64,

    /// Largest difference in glyph tops within one text line.
    pub word_y_tolerance: f64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            word_x_tolerance: 8.0,
            word_y_tolerance: 3.0,
        }
    }
}

/// Batch processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// File extensions picked up by directory discovery.
    pub extensions: Vec<String>,

    /// Documents processed concurrently.
    pub jobs: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["pdf".to_string(), "json".to_string()],
            jobs: 4,
        }
    }
}

impl FapiaoConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| FapiaoError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
