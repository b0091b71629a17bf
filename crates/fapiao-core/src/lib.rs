//! Core library for grid-layout invoice extraction.
//!
//! This crate provides:
//! - Ruling normalization and cell reconstruction from line segments
//! - Token assignment to cells and free-text clusters, baseline line merging
//! - Rule-based field extraction (label matches and sibling-cell navigation)
//! - PDF and JSON page sources and a batch accumulator

pub mod batch;
pub mod error;
pub mod extract;
pub mod layout;
pub mod models;
pub mod source;

pub use batch::{extract_document, BatchReport, DocumentOutcome};
pub use error::{FapiaoError, Result, SkipReason};
pub use extract::{ExtractionResult, InvoiceParser, LayoutInvoiceParser};
pub use layout::{CellRect, PageLayout, RegionKey};
pub use models::{FapiaoConfig, InvoiceRecord, Page, Segment, Token};
pub use source::{JsonPageSource, PageSource, PageSources, PdfPageSource};
