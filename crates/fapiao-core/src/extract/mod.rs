//! Invoice field extraction module.
//!
//! Absolute fields are matched in free-text lines by label; sibling fields
//! are read from the cell right of a label cell in the same grid row.

pub mod amounts;
mod parser;
pub mod patterns;
pub mod rules;

pub use parser::{next_cell_right, ExtractionResult, LayoutInvoiceParser};

use crate::models::page::Page;

/// Result type for extraction operations.
pub type Result<T> = crate::error::Result<T>;

/// Trait for invoice parsing.
pub trait InvoiceParser {
    /// Reconstruct the page layout and extract one record.
    fn parse(&self, page: &Page) -> Result<ExtractionResult>;
}
