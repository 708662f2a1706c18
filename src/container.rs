//! ZIP container abstraction for OpenDocument spreadsheets.

use crate::detect::{detect_format_from_bytes, FormatType};
use crate::error::{Diagnostic, Error, Result};
use std::cell::RefCell;
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

/// Archive entry holding the spreadsheet markup.
pub const CONTENT_ENTRY: &str = "content.xml";

/// Marker that must be present in the payload for extraction to proceed.
pub const SPREADSHEET_MARKER: &str = "<office:spreadsheet";

/// Container abstraction over an `.ods` ZIP archive.
///
/// Provides access to the inner markup payload the scanner consumes.
pub struct OdsContainer {
    archive: RefCell<zip::ZipArchive<Cursor<Vec<u8>>>>,
}

impl OdsContainer {
    /// Open an `.ods` container from a file path.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use odsv::container::OdsContainer;
    ///
    /// let container = OdsContainer::open("sheet.ods")?;
    /// let payload = container.content_xml()?;
    /// # Ok::<(), odsv::Error>(())
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_bytes(fs::read(path.as_ref())?)
    }

    /// Create a container from a byte vector.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let archive = zip::ZipArchive::new(Cursor::new(data))?;
        Ok(Self {
            archive: RefCell::new(archive),
        })
    }

    /// Check if an entry exists in the archive.
    pub fn exists(&self, name: &str) -> bool {
        self.archive.borrow().file_names().any(|n| n == name)
    }

    /// Read an archive entry and decode it as XML text.
    pub fn read_xml(&self, name: &str) -> Result<String> {
        let mut archive = self.archive.borrow_mut();
        let mut file = archive
            .by_name(name)
            .map_err(|_| Error::ZipArchive(format!("missing entry {name}")))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        decode_xml_bytes(&bytes)
    }

    /// Read the spreadsheet markup payload (`content.xml`).
    pub fn content_xml(&self) -> Result<String> {
        self.read_xml(CONTENT_ENTRY)
    }
}

impl std::fmt::Debug for OdsContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OdsContainer")
            .field("entries", &self.archive.borrow().len())
            .finish()
    }
}

/// Load the markup payload for any supported input file.
///
/// Packaged `.ods` archives yield their `content.xml`; flat `.fods`
/// documents are read directly.
pub fn load_payload(path: impl AsRef<Path>) -> Result<String> {
    let data = fs::read(path.as_ref())?;
    match detect_format_from_bytes(&data)? {
        FormatType::Ods => OdsContainer::from_bytes(data)?.content_xml(),
        FormatType::FlatOds => decode_xml_bytes(&data),
    }
}

/// Check the payload before scanning.
///
/// A missing XML declaration line is only worth a diagnostic; a missing
/// `<office:spreadsheet>` marker means there is nothing to extract.
pub fn validate_payload(content: &str, diagnostics: &mut Vec<Diagnostic>) -> Result<()> {
    if !content.starts_with("<?xml") {
        diagnostics.push(Diagnostic::MissingXmlDeclaration);
    }
    if !content.contains(SPREADSHEET_MARKER) {
        return Err(Error::MissingSpreadsheet);
    }
    Ok(())
}

/// Decode XML bytes, honoring a UTF-8 or UTF-16 byte order mark.
///
/// OpenDocument payloads are normally UTF-8; UTF-16 shows up in files
/// written by third-party tools.
pub fn decode_xml_bytes(bytes: &[u8]) -> Result<String> {
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8(rest.to_vec())
            .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)));
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        return decode_utf16(rest, u16::from_le_bytes);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return decode_utf16(rest, u16::from_be_bytes);
    }
    // No BOM: assume UTF-8, tolerating stray bytes.
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

fn decode_utf16(bytes: &[u8], combine: fn([u8; 2]) -> u16) -> Result<String> {
    let len = bytes.len() & !1;
    let units = (0..len)
        .step_by(2)
        .map(|i| combine([bytes[i], bytes[i + 1]]));
    char::decode_utf16(units)
        .collect::<std::result::Result<String, _>>()
        .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}
