//! Text extraction: turns an uploaded résumé file into plain text.
//!
//! Extraction is synchronous and CPU-bound; the job runner calls it through
//! `tokio::task::spawn_blocking`.

use std::path::Path;

use thiserror::Error;

/// File extensions the extractor understands. Anything else found in an
/// uploaded archive is not treated as a résumé.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt"];

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to extract text from PDF {path}: {message}")]
    Pdf { path: String, message: String },

    #[error("unsupported file type: {0}")]
    Unsupported(String),

    #[error("no text could be extracted from {0}")]
    Empty(String),
}

pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String, ExtractError>;
}

/// Returns true when the file's extension is one the extractor handles.
pub fn is_supported(path: &Path) -> bool {
    extension_of(path)
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// PDF via `pdf-extract`, `.txt` read as UTF-8.
pub struct DocumentExtractor;

impl TextExtractor for DocumentExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        let display = path.display().to_string();
        let text = match extension_of(path).as_deref() {
            Some("pdf") => pdf_extract::extract_text(path).map_err(|e| ExtractError::Pdf {
                path: display.clone(),
                message: e.to_string(),
            })?,
            Some("txt") => std::fs::read_to_string(path).map_err(|source| ExtractError::Io {
                path: display.clone(),
                source,
            })?,
            _ => return Err(ExtractError::Unsupported(display)),
        };

        if text.trim().is_empty() {
            return Err(ExtractError::Empty(display));
        }
        Ok(text)
    }
}
