//! Structured error types for the folio layout engine.
//!
//! [`FolioError`] covers the fatal sources: document parsing, fonts, file I/O
//! and PDF generation. [`LayoutError`] covers the conditions the layout engine
//! recovers from on its own and never lets escape a placement.

use std::path::PathBuf;

use thiserror::Error;

/// The unified error type returned by all public folio API functions.
#[derive(Debug, Error)]
pub enum FolioError {
    /// JSON input failed to parse as a valid sheet document.
    #[error("Failed to parse document: {source}{}", format_hint(.hint))]
    ParseError {
        source: serde_json::Error,
        hint: String,
    },
    /// The document parsed but describes something that cannot be laid out.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// A font could not be loaded, parsed, or embedded.
    #[error("Font error: {0}")]
    FontError(String),
    /// Reading the input or writing the output failed.
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// PDF generation failed.
    #[error("Render error: {0}")]
    RenderError(String),
}

fn format_hint(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {hint}")
    }
}

impl From<serde_json::Error> for FolioError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the sheet schema. Check field names and types.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input, is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        FolioError::ParseError { source: e, hint }
    }
}

/// Conditions raised while searching for a layout.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum LayoutError {
    /// An optimization candidate cannot be realized. `badness` grows with how
    /// far the candidate is from being valid, so the search can steer away.
    #[error("bad layout parameters (badness {badness:.3})")]
    BadParameters { badness: f64 },
    /// Content cannot be placed into the width it was given.
    #[error("not enough space: needed {needed:.1}pt, had {available:.1}pt")]
    TooSmall { needed: f64, available: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_carries_hint() {
        let err: FolioError = serde_json::from_str::<serde_json::Value>("{\"a\": 1,}")
            .unwrap_err()
            .into();
        let msg = err.to_string();
        assert!(msg.starts_with("Failed to parse document"));
        assert!(msg.contains("Hint: Check for trailing commas"));
    }

    #[test]
    fn eof_hint() {
        let err: FolioError = serde_json::from_str::<serde_json::Value>("{\"a\": ")
            .unwrap_err()
            .into();
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn too_small_message() {
        let err = LayoutError::TooSmall {
            needed: 40.0,
            available: 12.5,
        };
        assert_eq!(err.to_string(), "not enough space: needed 40.0pt, had 12.5pt");
    }
}
