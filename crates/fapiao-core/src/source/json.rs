//! Page dumps in the word/line/rect JSON shape of common PDF text layers.

use serde::Deserialize;
use std::path::Path;
use tracing::{debug, trace};

use super::{assemble_page, PageSource, Result};
use crate::error::SourceError;
use crate::models::page::{Page, Segment, Token};

/// Loads `.json` page dumps.
#[derive(Debug, Clone, Default)]
pub struct JsonPageSource;

impl JsonPageSource {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DumpFile {
    Document { pages: Vec<PageDump> },
    Page(PageDump),
}

#[derive(Debug, Default, Deserialize)]
struct PageDump {
    #[serde(default)]
    words: Vec<Token>,
    #[serde(default)]
    lines: Vec<SegmentDump>,
    #[serde(default)]
    rects: Vec<SegmentDump>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct SegmentDump {
    x0: f64,
    top: f64,
    bottom: f64,
    width: f64,
    height: f64,
}

impl From<SegmentDump> for Segment {
    fn from(s: SegmentDump) -> Self {
        Segment::from_layer(s.x0, s.top, s.bottom, s.width, s.height)
    }
}

/// Parse a page dump; only the first page is used.
pub fn parse_page_dump(content: &str) -> Result<Page> {
    let dump: DumpFile =
        serde_json::from_str(content).map_err(|e| SourceError::Parse(e.to_string()))?;

    let page = match dump {
        DumpFile::Document { pages } => pages.into_iter().next().ok_or(SourceError::NoPages)?,
        DumpFile::Page(page) => page,
    };

    trace!(
        "Page dump: {} words, {} lines, {} rects",
        page.words.len(),
        page.lines.len(),
        page.rects.len()
    );

    assemble_page(
        page.words,
        page.lines.into_iter().map(Segment::from).collect(),
        page.rects.into_iter().map(Segment::from).collect(),
    )
}

impl PageSource for JsonPageSource {
    fn supports(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"))
    }

    fn load(&self, path: &Path) -> Result<Page> {
        if !self.supports(path) {
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_string();
            return Err(SourceError::UnsupportedFormat(ext));
        }

        let content = std::fs::read_to_string(path).map_err(|e| SourceError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let page = parse_page_dump(&content)?;
        debug!(
            "Loaded {}: {} tokens, {} segments",
            path.display(),
            page.tokens.len(),
            page.segments.len()
        );
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_single_page() {
        let page = parse_page_dump(
            r#"{
                "words": [{"text": "发票", "x0": 1.0, "x1": 9.0, "top": 2.0, "bottom": 12.0, "upright": true}],
                "lines": [{"x0": 0.0, "x1": 100.0, "top": 5.0, "bottom": 5.0, "width": 100.0, "height": 0.0}],
                "rects": [{"x0": 0.0, "top": 0.0, "bottom": 50.0, "width": 100.0, "height": 50.0}]
            }"#,
        )
        .unwrap();

        assert_eq!(page.tokens, vec![Token::new("发票", 1.0, 9.0, 2.0, 12.0)]);
        assert_eq!(page.segments, vec![Segment::horizontal(0.0, 100.0, 5.0)]);
    }

    #[test]
    fn test_rects_used_without_lines() {
        let page = parse_page_dump(
            r#"{"pages": [
                {"words": [], "lines": [], "rects": [{"x0": 0.0, "top": 0.0, "bottom": 50.0, "width": 100.0, "height": 50.0}]},
                {"words": [], "lines": []}
            ]}"#,
        )
        .unwrap();

        assert_eq!(page.segments.len(), 1);
        assert!(page.segments[0].is_horizontal() && page.segments[0].is_vertical());
    }

    #[test]
    fn test_empty_page_is_unreadable() {
        assert!(matches!(parse_page_dump("{}"), Err(SourceError::EmptyPage)));
        assert!(matches!(
            parse_page_dump(r#"{"pages": []}"#),
            Err(SourceError::NoPages)
        ));
        assert!(matches!(parse_page_dump("not json"), Err(SourceError::Parse(_))));
    }

    #[test]
    fn test_load_rejects_other_extensions() {
        let source = JsonPageSource::new();
        assert!(matches!(
            source.load(Path::new("invoice.pdf")),
            Err(SourceError::UnsupportedFormat(ext)) if ext == "pdf"
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonPageSource::new();
        assert!(matches!(
            source.load(&dir.path().join("missing.json")),
            Err(SourceError::Read { .. })
        ));
    }
}
