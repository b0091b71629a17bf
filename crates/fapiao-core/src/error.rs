//! Error types for the fapiao-core library.

use thiserror::Error;

/// Main error type for the fapiao library.
#[derive(Error, Debug)]
pub enum FapiaoError {
    /// The page layer could not be read.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// Ruling lines do not determine a grid.
    #[error("layout error: {0}")]
    Layout(#[from] LayoutError),

    /// Field extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while loading the text/graphics layer of a document.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Failed to read the document from disk.
    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    /// The document or page dump is not well-formed.
    #[error("failed to parse document: {0}")]
    Parse(String),

    /// The file extension is not handled by this source.
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// The PDF is encrypted and does not open with an empty password.
    #[error("document is encrypted")]
    Encrypted,

    /// The document has no pages.
    #[error("document has no pages")]
    NoPages,

    /// The page carries neither text tokens nor line segments.
    #[error("page has no extractable text or line layer")]
    EmptyPage,
}

/// Errors raised while reconstructing the grid.
#[derive(Error, Debug)]
pub enum LayoutError {
    /// Not enough rulings survive filtering to build a grid.
    #[error("layout underdetermined: {horizontal} horizontal (need {required}), {vertical} vertical rulings")]
    Underdetermined {
        horizontal: usize,
        vertical: usize,
        required: usize,
    },
}

/// Errors related to invoice field extraction.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// A numeric field could not be parsed.
    #[error("failed to parse {field}: {value:?}")]
    Parse { field: String, value: String },

    /// A configured label could not be compiled into a pattern.
    #[error("invalid pattern for {field}: {reason}")]
    Pattern { field: String, reason: String },
}

/// Why a document was skipped by the batch layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The document could not be opened or has no text/line layer.
    InputUnreadable,
    /// Too few rulings to build a grid.
    LayoutUnderdetermined,
    /// The amount in figures is not a number.
    NumericParseFailure,
    /// Anything else.
    Other,
}

impl SkipReason {
    /// Short label for reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::InputUnreadable => "input unreadable",
            SkipReason::LayoutUnderdetermined => "layout underdetermined",
            SkipReason::NumericParseFailure => "numeric parse failure",
            SkipReason::Other => "other",
        }
    }
}

impl FapiaoError {
    /// Classify this error for the batch skip counter.
    pub fn skip_reason(&self) -> SkipReason {
        match self {
            FapiaoError::Source(_) | FapiaoError::Io(_) | FapiaoError::Json(_) => {
                SkipReason::InputUnreadable
            }
            FapiaoError::Layout(_) => SkipReason::LayoutUnderdetermined,
            FapiaoError::Extraction(ExtractionError::Parse { .. }) => {
                SkipReason::NumericParseFailure
            }
            FapiaoError::Extraction(_) | FapiaoError::Config(_) => SkipReason::Other,
        }
    }
}

/// Result type for the fapiao library.
pub type Result<T> = std::result::Result<T, FapiaoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_reason_classification() {
        let err: FapiaoError = SourceError::EmptyPage.into();
        assert_eq!(err.skip_reason(), SkipReason::InputUnreadable);

        let err: FapiaoError = LayoutError::Underdetermined {
            horizontal: 0,
            vertical: 2,
            required: 3,
        }
        .into();
        assert_eq!(err.skip_reason(), SkipReason::LayoutUnderdetermined);

        let err: FapiaoError = ExtractionError::Parse {
            field: "amount_in_figures".to_string(),
            value: "abc".to_string(),
        }
        .into();
        assert_eq!(err.skip_reason(), SkipReason::NumericParseFailure);
    }

    #[test]
    fn test_layout_error_message() {
        let err = LayoutError::Underdetermined {
            horizontal: 2,
            vertical: 4,
            required: 3,
        };
        assert_eq!(
            err.to_string(),
            "layout underdetermined: 2 horizontal (need 3), 4 vertical rulings"
        );
    }
}
