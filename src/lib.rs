//! # odsv
//!
//! OpenDocument spreadsheet extraction to delimited text.
//!
//! This library reads `.ods` (and flat `.fods`) spreadsheets and emits
//! their rows as separator-joined lines, one logical output stream per
//! selected sheet. The heart of it is a single-pass tag scanner over the
//! spreadsheet markup that reconstructs rows and columns, including the
//! run-length-encoded empty rows and cells the format compresses away.
//!
//! ## Quick Start
//!
//! ```no_run
//! use odsv::{extract_to_string, ExtractOptions};
//!
//! // First sheet as tab-separated text
//! let tsv = extract_to_string("budget.ods", &ExtractOptions::new())?;
//! println!("{}", tsv);
//!
//! // One CSV file per matching sheet
//! let options = ExtractOptions::new()
//!     .with_separator(',')
//!     .with_sheet_pattern("Project.*")
//!     .with_output_template("out_<SHEET>.csv");
//! let report = odsv::extract_file("budget.ods", &options)?;
//! eprintln!("{} sheets, {} rows", report.sheets_emitted, report.rows_emitted);
//! # Ok::<(), odsv::Error>(())
//! ```

pub mod container;
pub mod convert;
pub mod detect;
pub mod error;
pub mod options;
pub mod scanner;
pub mod sheet;

// Re-exports
pub use container::OdsContainer;
pub use detect::{detect_format_from_bytes, detect_format_from_path, FormatType};
pub use error::{Diagnostic, Error, Result};
pub use options::ExtractOptions;
pub use scanner::ScanReport;
pub use sheet::{SheetFilter, SHEET_PLACEHOLDER};

use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Extract a spreadsheet payload that is already in memory.
///
/// Validates the payload, then scans it. Rows go to per-sheet files or a
/// fixed file when the options' output template says so, otherwise to
/// `fallback`.
pub fn extract_from_str(
    content: &str,
    options: &ExtractOptions,
    fallback: &mut dyn Write,
) -> Result<ScanReport> {
    options.validate()?;

    let mut diagnostics = Vec::new();
    container::validate_payload(content, &mut diagnostics)?;

    let mut output = sheet::OutputTarget::new(&options.output_template, fallback)?;
    let mut report = scanner::scan(content, options, &mut output)?;

    diagnostics.append(&mut report.diagnostics);
    report.diagnostics = diagnostics;
    Ok(report)
}

/// Extract a spreadsheet file, writing rows per the options.
///
/// With an empty output template rows go to stdout; a template with the
/// [`SHEET_PLACEHOLDER`] token produces one file per selected sheet.
///
/// # Example
///
/// ```no_run
/// use odsv::{extract_file, ExtractOptions};
///
/// let report = extract_file("data.ods", &ExtractOptions::new())?;
/// eprintln!("{} rows", report.rows_emitted);
/// # Ok::<(), odsv::Error>(())
/// ```
pub fn extract_file(path: impl AsRef<Path>, options: &ExtractOptions) -> Result<ScanReport> {
    let content = container::load_payload(path.as_ref())?;
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    extract_from_str(&content, options, &mut lock)
}

/// Extract a spreadsheet file into a single in-memory string.
///
/// The options' output template is ignored; everything the selection
/// produces lands in the returned string.
pub fn extract_to_string(path: impl AsRef<Path>, options: &ExtractOptions) -> Result<String> {
    let content = container::load_payload(path.as_ref())?;
    extract_str_to_string(&content, options)
}

/// Extract an in-memory payload into a single string.
pub fn extract_str_to_string(content: &str, options: &ExtractOptions) -> Result<String> {
    let mut single = options.clone();
    single.output_template.clear();

    let mut buffer: Vec<u8> = Vec::new();
    extract_from_str(content, &single, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| Error::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
}

/// Read a file's raw markup payload without scanning it.
///
/// Convenience wrapper over format detection and container unpacking.
pub fn read_payload(path: impl AsRef<Path>) -> Result<String> {
    container::load_payload(path.as_ref())
}

/// Extract a flat `.fods` file that needs no container unpacking.
pub fn extract_flat_file(path: impl AsRef<Path>, options: &ExtractOptions) -> Result<ScanReport> {
    let content = container::decode_xml_bytes(&fs::read(path.as_ref())?)?;
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    extract_from_str(&content, options, &mut lock)
}
