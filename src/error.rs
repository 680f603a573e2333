//! Structured error types for the export pipeline.
//!
//! Every failure the pipeline can hit is caught at the orchestrator and
//! returned as an [`ExportError`]. The presentation layer decides how to show
//! it; [`ExportError::user_message`] gives the text the invoice UI used to
//! alert with.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Shown for every failure after the pipeline has started.
pub const PRINT_FALLBACK_MESSAGE: &str =
    "Failed to generate PDF. Please try the Print option and save as PDF.";

/// Shown when there is nothing to export yet.
pub const MISSING_SURFACE_MESSAGE: &str =
    "Invoice preview not found. Please click Preview first.";

/// The unified error type returned by the export API.
#[derive(Error, Debug)]
pub enum ExportError {
    /// The render surface is missing or not shown yet. Nothing was touched.
    #[error("Render surface unavailable: {0}")]
    Precondition(String),

    /// The rasterizer failed or returned a malformed bitmap.
    #[error("Capture failed: {0}")]
    Capture(String),

    /// Page geometry cannot produce a usable page (capacity below one pixel,
    /// non-positive dimensions, ...).
    #[error("Invalid page geometry: {0}")]
    Geometry(String),

    /// Image encoding or saving the document failed.
    #[error("Write failed: {0}")]
    Write(String),

    /// Page spec JSON failed to parse.
    #[error("Failed to parse page spec: {source}{}", hint_suffix(.hint))]
    Config {
        source: serde_json::Error,
        hint: String,
    },

    /// The caller's cancel token tripped between two bands.
    #[error("Export cancelled after {pages} page(s)")]
    Cancelled { pages: usize },
}

fn hint_suffix(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl ExportError {
    /// Human-readable alert text for the end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            ExportError::Precondition(_) => MISSING_SURFACE_MESSAGE,
            ExportError::Cancelled { .. } => "PDF export was cancelled.",
            _ => PRINT_FALLBACK_MESSAGE,
        }
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the page spec schema. Check field names and types.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input, is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        ExportError::Config { source: e, hint }
    }
}

impl From<image::ImageError> for ExportError {
    fn from(e: image::ImageError) -> Self {
        ExportError::Write(format!("image encoding failed: {}", e))
    }
}

impl From<std::io::Error> for ExportError {
    fn from(e: std::io::Error) -> Self {
        ExportError::Write(e.to_string())
    }
}
