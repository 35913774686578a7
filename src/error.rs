use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("document unreadable: {0}")]
    DocumentUnreadable(String),

    #[error("PDF rendering failed on page {page}: {reason}")]
    PdfRendering { page: usize, reason: String },

    #[error("image processing error: {0}")]
    ImageProcessing(String),

    #[error("table detection failed on page {page}: {reason}")]
    TableDetection { page: usize, reason: String },

    #[error("table formatting failed: {0}")]
    TableFormatting(String),

    #[error("vision endpoint returned status {status}: {body}")]
    RemoteService { status: u16, body: String },

    #[error("vision transport error: {0}")]
    Transport(String),

    #[error("vision response parsing failed: {0}")]
    ResponseParsing(String),

    #[error("missing credential: {0} is not set")]
    MissingCredential(&'static str),

    #[error("CSV write failed at {path}: {reason}")]
    WriteFailure { path: PathBuf, reason: String },
}
