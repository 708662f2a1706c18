//! Shell-out conversion of foreign spreadsheet formats to `.ods`.
//!
//! Formats this library cannot read directly (`.xlsx`, `.xls`, `.csv`, ...)
//! are handed to an installed office suite for conversion into a scratch
//! directory. There is no algorithmic content here, just process plumbing.

use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Converter binary invoked for foreign formats.
const CONVERTER: &str = "soffice";

/// A converted `.ods` file in a scratch directory.
///
/// The directory is exclusively owned by this run and removed when the
/// value is dropped.
#[derive(Debug)]
pub struct ConvertedOds {
    /// Held for its Drop, which deletes the scratch directory.
    _dir: TempDir,
    path: PathBuf,
}

impl ConvertedOds {
    /// Path of the converted `.ods` file. Valid for the lifetime of this
    /// value; the scratch directory goes away on drop.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Convert a foreign spreadsheet file to `.ods` via the office suite.
///
/// Runs `soffice --headless --convert-to ods` into a fresh scratch
/// directory. Stale output at the expected target path is removed first;
/// if that removal fails the conversion aborts.
pub fn convert_to_ods(input: impl AsRef<Path>) -> Result<ConvertedOds> {
    let input = input.as_ref();
    let stem = input
        .file_stem()
        .ok_or_else(|| Error::Convert(format!("no file name in {}", input.display())))?;

    let dir = TempDir::new()?;
    let target = dir.path().join(stem).with_extension("ods");
    if target.exists() {
        fs::remove_file(&target)?;
    }

    let status = Command::new(CONVERTER)
        .args(["--headless", "--convert-to", "ods", "--outdir"])
        .arg(dir.path())
        .arg(input)
        .status()
        .map_err(|e| Error::Convert(format!("cannot run {CONVERTER}: {e}")))?;

    if !status.success() {
        return Err(Error::Convert(format!("{CONVERTER} exited with {status}")));
    }
    if !target.exists() {
        return Err(Error::Convert(format!(
            "{CONVERTER} produced no output for {}",
            input.display()
        )));
    }

    Ok(ConvertedOds {
        _dir: dir,
        path: target,
    })
}
