use thiserror::Error;

pub mod config;
pub mod convert;
pub mod parser;
pub mod render;
pub mod types;

pub use config::{ConfigError, LayoutConfig};
pub use convert::{Converter, PageTables};
pub use types::*;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("PDF conversion requires the `{feature}` feature, which this build does not include")]
    MissingDependency { feature: &'static str },
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

const ACCEPTED_EXTENSIONS: &[&str] = &["pdf"];
const ACCEPTED_MIME_PREFIXES: &[&str] = &["application/pdf", "application/x-pdf"];

/// Convert PDF bytes to Markdown with the default calibration.
pub fn convert(bytes: &[u8]) -> Result<String, PdfError> {
    Converter::new(LayoutConfig::default())
        .convert(bytes)
        .map(|c| c.markdown)
}

/// Whether an input looks like a PDF by its extension (with or without the
/// leading dot) or its MIME type.  Both checks are case-insensitive.
pub fn accepts(extension: Option<&str>, mimetype: Option<&str>) -> bool {
    let by_extension = extension.is_some_and(|ext| {
        let ext = ext.trim_start_matches('.');
        ACCEPTED_EXTENSIONS
            .iter()
            .any(|accepted| ext.eq_ignore_ascii_case(accepted))
    });
    let by_mimetype = mimetype.is_some_and(|mime| {
        let mime = mime.to_ascii_lowercase();
        ACCEPTED_MIME_PREFIXES
            .iter()
            .any(|prefix| mime.starts_with(prefix))
    });
    by_extension || by_mimetype
}
