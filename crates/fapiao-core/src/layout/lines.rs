//! Baseline merging of tokens into left-to-right text lines.

use std::cmp::Ordering;

use super::regions::symmetric_offsets;
use crate::models::page::Token;

/// Tokens sharing a baseline, concatenated left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLine {
    /// Baseline of the token that opened the line.
    pub baseline: i64,
    pub text: String,
}

/// Text lines of one region, in creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextLines {
    lines: Vec<TextLine>,
}

impl TextLines {
    pub fn iter(&self) -> impl Iterator<Item = &TextLine> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines ordered top to bottom.
    pub fn top_to_bottom(&self) -> Vec<&TextLine> {
        let mut sorted: Vec<&TextLine> = self.lines.iter().collect();
        sorted.sort_by_key(|l| l.baseline);
        sorted
    }

    /// All lines joined top to bottom with no separator.
    pub fn joined(&self) -> String {
        self.top_to_bottom()
            .into_iter()
            .map(|l| l.text.as_str())
            .collect()
    }

    fn find_mut(&mut self, baseline: i64) -> Option<&mut TextLine> {
        self.lines.iter_mut().find(|l| l.baseline == baseline)
    }
}

/// Merge tokens whose baselines lie within `tolerance` (inclusive) of an
/// existing line; tokens are visited by ascending left edge.
pub fn merge_lines(tokens: &[Token], tolerance: i64) -> TextLines {
    let mut ordered: Vec<&Token> = tokens.iter().collect();
    ordered.sort_by(|a, b| a.x0.partial_cmp(&b.x0).unwrap_or(Ordering::Equal));

    let mut lines = TextLines::default();

    for token in ordered {
        let bottom = token.baseline();
        let existing = symmetric_offsets(tolerance)
            .map(|d| bottom + d)
            .find(|key| lines.lines.iter().any(|l| l.baseline == *key));

        match existing.and_then(|key| lines.find_mut(key)) {
            Some(line) => line.text.push_str(&token.text),
            None => lines.lines.push(TextLine {
                baseline: bottom,
                text: token.text.clone(),
            }),
        }
    }

    lines
}
