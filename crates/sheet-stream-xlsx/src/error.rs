//! XLSX error types

use thiserror::Error;

/// Result type for XLSX operations
pub type XlsxResult<T> = std::result::Result<T, XlsxError>;

/// Errors that can occur while reading an XLSX package
#[derive(Debug, Error)]
pub enum XlsxError {
    /// IO error, including failures of the temporary copies
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP error
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// XML error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Invalid search pattern
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Missing required part (no workbook means no sheets)
    #[error("Missing required part: {0}")]
    MissingPart(String),

    /// A declared sheet maps to no worksheet part, neither through the
    /// relationships part nor by position
    #[error("Could not resolve worksheet part for sheet '{name}' (index {index})")]
    SheetNotResolved { name: String, index: usize },

    /// A named entry could not be opened
    #[error("Entry not found in package: {0}")]
    EntryNotFound(String),

    /// Entry uses a compression method the stream reader cannot decode
    #[error("Unsupported compression method {method} for entry {entry}")]
    UnsupportedCompression { entry: String, method: String },

    /// Invalid file format
    #[error("Invalid XLSX format: {0}")]
    InvalidFormat(String),
}
