//! Input format detection.

use crate::error::{Error, Result};
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

/// ZIP file magic bytes: PK\x03\x04
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// OLE compound file magic bytes (legacy .xls/.doc).
const OLE_MAGIC: [u8; 4] = [0xD0, 0xCF, 0x11, 0xE0];

/// Declared mimetype of an OpenDocument spreadsheet.
const ODS_MIMETYPE: &str = "application/vnd.oasis.opendocument.spreadsheet";

/// Supported input format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatType {
    /// Packaged OpenDocument spreadsheet (.ods)
    Ods,
    /// Flat single-file OpenDocument spreadsheet (.fods)
    FlatOds,
}

impl FormatType {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            FormatType::Ods => "ods",
            FormatType::FlatOds => "fods",
        }
    }
}

impl std::fmt::Display for FormatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatType::Ods => write!(f, "OpenDocument Spreadsheet"),
            FormatType::FlatOds => write!(f, "Flat OpenDocument Spreadsheet"),
        }
    }
}

/// Detect the format of a file on disk.
pub fn detect_format_from_path(path: impl AsRef<Path>) -> Result<FormatType> {
    let data = fs::read(path.as_ref())?;
    detect_format_from_bytes(&data)
}

/// Detect the format from raw bytes.
///
/// Recognized-but-unsupported containers (OOXML, legacy OLE, foreign
/// OpenDocument types) are reported distinctly from unknown data so the
/// caller can decide to shell out for conversion.
pub fn detect_format_from_bytes(data: &[u8]) -> Result<FormatType> {
    if data.len() >= 4 && data[..4] == ZIP_MAGIC {
        return detect_zip_format(data);
    }
    if data.len() >= 4 && data[..4] == OLE_MAGIC {
        return Err(Error::UnsupportedFormat(
            "legacy OLE compound document".to_string(),
        ));
    }
    // A flat document is bare XML with an office root element.
    let head = String::from_utf8_lossy(&data[..data.len().min(4096)]);
    let trimmed = head.trim_start_matches('\u{feff}').trim_start();
    if trimmed.starts_with("<?xml") || trimmed.starts_with("<office:") {
        return Ok(FormatType::FlatOds);
    }
    Err(Error::UnknownFormat)
}

fn detect_zip_format(data: &[u8]) -> Result<FormatType> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))?;

    let mimetype = match archive.by_name("mimetype") {
        Ok(mut file) => {
            let mut s = String::new();
            file.read_to_string(&mut s).ok();
            Some(s)
        }
        Err(_) => None,
    };

    if let Some(mime) = mimetype {
        let mime = mime.trim();
        if mime == ODS_MIMETYPE {
            return Ok(FormatType::Ods);
        }
        if mime.starts_with("application/vnd.oasis.opendocument") {
            return Err(Error::UnsupportedFormat(mime.to_string()));
        }
    }

    // No mimetype entry: fall back to the archive layout.
    if archive.file_names().any(|n| n == "content.xml") {
        return Ok(FormatType::Ods);
    }
    if archive
        .file_names()
        .any(|n| n == "[Content_Types].xml" || n.starts_with("xl/"))
    {
        return Err(Error::UnsupportedFormat("Office Open XML".to_string()));
    }
    Err(Error::UnknownFormat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn zip_with(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut buffer = Vec::new();
        let mut writer = ZipWriter::new(Cursor::new(&mut buffer));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (name, content) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
        buffer
    }

    #[test]
    fn test_detect_ods_by_mimetype() {
        let data = zip_with(&[("mimetype", ODS_MIMETYPE), ("content.xml", "<x/>")]);
        assert_eq!(detect_format_from_bytes(&data).unwrap(), FormatType::Ods);
    }

    #[test]
    fn test_detect_ods_by_layout() {
        let data = zip_with(&[("content.xml", "<x/>")]);
        assert_eq!(detect_format_from_bytes(&data).unwrap(), FormatType::Ods);
    }

    #[test]
    fn test_detect_flat_ods() {
        let data = b"<?xml version=\"1.0\"?>\n<office:document/>";
        assert_eq!(
            detect_format_from_bytes(data).unwrap(),
            FormatType::FlatOds
        );
    }

    #[test]
    fn test_detect_foreign_opendocument() {
        let data = zip_with(&[
            ("mimetype", "application/vnd.oasis.opendocument.text"),
            ("content.xml", "<x/>"),
        ]);
        assert!(matches!(
            detect_format_from_bytes(&data),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_detect_ooxml_is_unsupported() {
        let data = zip_with(&[("[Content_Types].xml", "<Types/>"), ("xl/workbook.xml", "<x/>")]);
        assert!(matches!(
            detect_format_from_bytes(&data),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_detect_ole_is_unsupported() {
        let data = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
        assert!(matches!(
            detect_format_from_bytes(&data),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_detect_unknown() {
        assert!(matches!(
            detect_format_from_bytes(b"plain,csv,data"),
            Err(Error::UnknownFormat)
        ));
    }

    #[test]
    fn test_format_type_display() {
        assert_eq!(FormatType::Ods.extension(), "ods");
        assert_eq!(FormatType::FlatOds.extension(), "fods");
        assert_eq!(FormatType::Ods.to_string(), "OpenDocument Spreadsheet");
    }
}
