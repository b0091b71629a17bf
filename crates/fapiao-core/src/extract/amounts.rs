//! Grand total splitting: amount in words, amount in figures.

use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

use super::patterns::{AMOUNT_FIGURES, CURRENCY_PREFIX};
use crate::error::ExtractionError;

/// Grand total read from a value cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountPair {
    pub words: String,
    pub figures: Decimal,
}

/// Splits value cell text on the figures marker.
#[derive(Debug, Clone)]
pub struct AmountSplitter {
    figures_marker: Regex,
    words_marker: Regex,
}

impl AmountSplitter {
    pub fn new(figures_marker: &str, words_marker: &str) -> Result<Self, ExtractionError> {
        let compile = |pattern: &str, field: &str| {
            Regex::new(pattern).map_err(|e| ExtractionError::Pattern {
                field: field.to_string(),
                reason: e.to_string(),
            })
        };
        Ok(Self {
            figures_marker: compile(figures_marker, "figures_marker")?,
            words_marker: compile(words_marker, "words_marker")?,
        })
    }

    /// Text before the marker is the amount in words; the text after it,
    /// minus its currency symbol, must parse as a number.
    pub fn split(&self, text: &str) -> Result<AmountPair, ExtractionError> {
        let mut parts = self.figures_marker.split(text);
        let words = parts.next().unwrap_or_default();
        let figures = parts.next().unwrap_or_default();

        let words = self.words_marker.replace(words, "").trim().to_string();
        let figures = parse_figures(figures).ok_or_else(|| ExtractionError::Parse {
            field: "amount_in_figures".to_string(),
            value: figures.to_string(),
        })?;

        Ok(AmountPair { words, figures })
    }
}

/// Parse `¥10,000.00`-style figures.
pub fn parse_figures(s: &str) -> Option<Decimal> {
    let stripped = CURRENCY_PREFIX.replace(s, "");
    let trimmed = stripped.trim();
    if !AMOUNT_FIGURES.is_match(trimmed) {
        return None;
    }
    Decimal::from_str(&trimmed.replace(',', "")).ok()
}
