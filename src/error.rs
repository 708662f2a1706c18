//! Error types for the odsv library.

use std::fmt;
use std::io;
use thiserror::Error;

/// Result type alias for odsv operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during spreadsheet extraction.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error reading the ZIP container.
    #[error("ZIP archive error: {0}")]
    ZipArchive(String),

    /// The file format could not be determined.
    #[error("Unknown file format")]
    UnknownFormat,

    /// The file is a recognized container, but not an OpenDocument spreadsheet.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The payload contains no `<office:spreadsheet>` section.
    #[error("No <office:spreadsheet> section found")]
    MissingSpreadsheet,

    /// Invalid extraction configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// External conversion to .ods failed.
    #[error("Conversion failed: {0}")]
    Convert(String),
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::ZipArchive(err.to_string())
    }
}

/// A non-fatal condition noticed during extraction.
///
/// Diagnostics are collected on the scan report and never change the
/// emitted output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The payload does not start with an XML declaration line.
    MissingXmlDeclaration,
    /// An entity reference with an unrecognized name; the uppercased name
    /// was substituted into the cell value.
    UnknownEntity(String),
    /// A sheet pattern that is not a valid regular expression; only exact
    /// name equality was applied for it.
    InvalidPattern(String),
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MissingXmlDeclaration => {
                write!(f, "payload does not start with an XML declaration")
            }
            Diagnostic::UnknownEntity(name) => {
                write!(f, "unrecognized entity reference &{};", name)
            }
            Diagnostic::InvalidPattern(pattern) => {
                write!(f, "sheet pattern {:?} is not a valid regex", pattern)
            }
        }
    }
}
