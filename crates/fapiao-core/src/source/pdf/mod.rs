//! PDF documents read with lopdf: glyphs grouped into words, plus the
//! drawn lines and rectangles of the first page.

mod content;
mod fonts;

use std::path::Path;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace};

use self::content::{Glyph, Interpreter, Matrix};
use super::{assemble_page, PageSource, Result};
use crate::error::SourceError;
use crate::models::config::SourceConfig;
use crate::models::page::{Page, Token};

/// US Letter height when no MediaBox is found.
const DEFAULT_PAGE_HEIGHT: f64 = 792.0;

/// Loads `.pdf` documents.
#[derive(Debug, Clone)]
pub struct PdfPageSource {
    x_tolerance: f64,
    y_tolerance: f64,
}

impl PdfPageSource {
    pub fn new() -> Self {
        Self::from_config(&SourceConfig::default())
    }

    pub fn from_config(config: &SourceConfig) -> Self {
        Self {
            x_tolerance: config.word_x_tolerance,
            y_tolerance: config.word_y_tolerance,
        }
    }
}

impl Default for PdfPageSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PageSource for PdfPageSource {
    fn supports(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
    }

    fn load(&self, path: &Path) -> Result<Page> {
        let data = std::fs::read(path).map_err(|e| SourceError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let page = parse_pdf(&data, self.x_tolerance, self.y_tolerance)?;
        debug!(
            "Loaded {}: {} tokens, {} segments",
            path.display(),
            page.tokens.len(),
            page.segments.len()
        );
        Ok(page)
    }
}

/// Read the first page of a PDF held in memory.
pub fn parse_pdf(data: &[u8], x_tolerance: f64, y_tolerance: f64) -> Result<Page> {
    let mut doc = Document::load_mem(data).map_err(|e| SourceError::Parse(e.to_string()))?;

    if doc.is_encrypted() {
        if doc.decrypt("").is_err() {
            return Err(SourceError::Encrypted);
        }
        debug!("Decrypted PDF with empty password");
    }

    let page_id = *doc.get_pages().values().next().ok_or(SourceError::NoPages)?;

    let page_height = inherited(&doc, page_id, b"MediaBox")
        .and_then(|o| o.as_array().ok())
        .and_then(|a| match a.iter().map(number).collect::<Option<Vec<_>>>()?.as_slice() {
            [_, y0, _, y1] => Some((y1 - y0).abs()),
            _ => None,
        })
        .unwrap_or(DEFAULT_PAGE_HEIGHT);

    let raw = doc
        .get_page_content(page_id)
        .map_err(|e| SourceError::Parse(e.to_string()))?;
    let content = Content::decode(&raw).map_err(|e| SourceError::Parse(e.to_string()))?;

    let resources = inherited(&doc, page_id, b"Resources").and_then(|o| o.as_dict().ok());

    let mut interpreter = Interpreter::new(&doc, page_height);
    interpreter.run(&content, resources, Matrix::identity());
    let objects = interpreter.finish();

    trace!(
        "PDF page: {} glyphs, {} lines, {} rects",
        objects.glyphs.len(),
        objects.lines.len(),
        objects.rects.len()
    );

    let words = group_words(objects.glyphs, x_tolerance, y_tolerance);
    assemble_page(words, objects.lines, objects.rects)
}

/// Group glyphs into words: glyphs whose tops lie within `y_tolerance` of
/// their neighbour share a line; within a line a whitespace glyph or a gap
/// wider than `x_tolerance` starts a new word.
fn group_words(mut glyphs: Vec<Glyph>, x_tolerance: f64, y_tolerance: f64) -> Vec<Token> {
    glyphs.sort_by(|a, b| a.top.total_cmp(&b.top));

    let mut lines: Vec<Vec<Glyph>> = Vec::new();
    let mut last_top = f64::NEG_INFINITY;
    for glyph in glyphs {
        match lines.last_mut() {
            Some(line) if glyph.top - last_top <= y_tolerance => {
                last_top = glyph.top;
                line.push(glyph);
            }
            _ => {
                last_top = glyph.top;
                lines.push(vec![glyph]);
            }
        }
    }

    let mut words = Vec::new();
    for mut line in lines {
        line.sort_by(|a, b| a.x0.total_cmp(&b.x0));

        let mut current: Option<Token> = None;
        for glyph in line {
            if glyph.text.trim().is_empty() {
                words.extend(current.take());
                continue;
            }
            match current.as_mut() {
                Some(word) if glyph.x0 - word.x1 <= x_tolerance => {
                    word.text.push_str(&glyph.text);
                    word.x1 = word.x1.max(glyph.x1);
                    word.top = word.top.min(glyph.top);
                    word.bottom = word.bottom.max(glyph.bottom);
                }
                _ => {
                    words.extend(current.take());
                    current = Some(Token::new(glyph.text, glyph.x0, glyph.x1, glyph.top, glyph.bottom));
                }
            }
        }
        words.extend(current);
    }

    words
}

/// Look up a page attribute, following `Parent` links.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node: &Dictionary = doc.get_dictionary(page_id).ok()?;
    for _ in 0..32 {
        if let Ok(value) = node.get(key) {
            return Some(resolve(doc, value));
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    doc.dereference(object).map(|(_, o)| o).unwrap_or(object)
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}
