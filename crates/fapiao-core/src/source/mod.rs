//! Page sources: the external text/graphics layer of a document.

mod json;
mod pdf;

pub use json::{parse_page_dump, JsonPageSource};
pub use pdf::{parse_pdf, PdfPageSource};

use std::path::Path;

use crate::error::SourceError;
use crate::models::config::SourceConfig;
use crate::models::page::{Page, Segment, Token};

/// Result type for source operations.
pub type Result<T> = std::result::Result<T, SourceError>;

/// Trait for loading the first page of a document as tokens and segments.
pub trait PageSource {
    /// Whether this source can read the given path.
    fn supports(&self, path: &Path) -> bool;

    /// Load the page.
    fn load(&self, path: &Path) -> Result<Page>;
}

/// Build the page from its word, line and rect layers. Rectangle edges
/// stand in for rulings when the page has no drawn lines.
pub(crate) fn assemble_page(
    words: Vec<Token>,
    lines: Vec<Segment>,
    rects: Vec<Segment>,
) -> Result<Page> {
    let segments = if lines.is_empty() { rects } else { lines };
    let page = Page::new(words, segments);
    if page.is_empty() {
        return Err(SourceError::EmptyPage);
    }
    Ok(page)
}

/// Dispatches each path to the first source that supports it.
pub struct PageSources {
    sources: Vec<Box<dyn PageSource + Send + Sync>>,
}

impl PageSources {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// PDF documents, then JSON page dumps.
    pub fn from_config(config: &SourceConfig) -> Self {
        Self::new()
            .with(PdfPageSource::from_config(config))
            .with(JsonPageSource::new())
    }

    pub fn with(mut self, source: impl PageSource + Send + Sync + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }
}

impl Default for PageSources {
    fn default() -> Self {
        Self::from_config(&SourceConfig::default())
    }
}

impl PageSource for PageSources {
    fn supports(&self, path: &Path) -> bool {
        self.sources.iter().any(|s| s.supports(path))
    }

    fn load(&self, path: &Path) -> Result<Page> {
        match self.sources.iter().find(|s| s.supports(path)) {
            Some(source) => source.load(path),
            None => Err(SourceError::UnsupportedFormat(
                path.extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("")
                    .to_string(),
            )),
        }
    }
}
