//! Sheet selection and output stream routing.

use crate::error::{Diagnostic, Result};
use regex::Regex;
use std::fs::File;
use std::io::Write;

/// Placeholder token in the output template, replaced by the sheet name.
pub const SHEET_PLACEHOLDER: &str = "<SHEET>";

/// Sheet-name markers LibreOffice uses for internal helper sheets
/// (anonymous database ranges, built-in names, formula-compatibility
/// artifacts). Skipped under default selection.
const INTERNAL_SHEET_MARKERS: [&str; 3] =
    ["__Anonymous_Sheet", "__Builtin_Names", "__Formula_Compat"];

/// Decides which sheets are wanted.
///
/// Each caller-supplied pattern is accepted either as an anchored regular
/// expression over the full sheet name or by exact string equality. `-`
/// and `+` are escaped first so names like `C++ Summary` match literally.
/// With no patterns, the default policy takes every sheet except internal
/// helper sheets.
#[derive(Debug)]
pub struct SheetFilter {
    patterns: Vec<(String, Option<Regex>)>,
}

impl SheetFilter {
    /// Build a filter from the caller's pattern list.
    ///
    /// Patterns that fail to compile as a regex fall back to exact
    /// equality and are reported as a diagnostic.
    pub fn new(patterns: &[String], diagnostics: &mut Vec<Diagnostic>) -> Self {
        let compiled = patterns
            .iter()
            .filter(|p| !p.is_empty())
            .map(|p| {
                let escaped = p.replace('+', "\\+").replace('-', "\\-");
                let regex = match Regex::new(&format!("^(?:{escaped})$")) {
                    Ok(re) => Some(re),
                    Err(_) => {
                        diagnostics.push(Diagnostic::InvalidPattern(p.clone()));
                        None
                    }
                };
                (p.clone(), regex)
            })
            .collect();
        Self { patterns: compiled }
    }

    /// Whether no patterns were supplied (default selection policy).
    pub fn is_default(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Decide whether a sheet with this name is wanted.
    pub fn accepts(&self, name: &str) -> bool {
        if self.is_default() {
            return !INTERNAL_SHEET_MARKERS.iter().any(|m| name.contains(m));
        }
        self.patterns.iter().any(|(pattern, regex)| {
            pattern == name || regex.as_ref().is_some_and(|re| re.is_match(name))
        })
    }
}

/// The stream rows are written to, switched at sheet transitions.
///
/// Three shapes, decided by the output template:
/// - empty template: everything goes to the caller's fallback writer
/// - template without placeholder: one file, opened up front
/// - template with `<SHEET>`: one file per selected sheet, the previous
///   one dropped when the next sheet opens
pub struct OutputTarget<'w> {
    template: String,
    single: Option<File>,
    per_sheet: Option<File>,
    fallback: &'w mut dyn Write,
}

impl<'w> OutputTarget<'w> {
    /// Set up the target for a template. Opening a fixed destination file
    /// fails fast here, before any scanning happens.
    pub fn new(template: &str, fallback: &'w mut dyn Write) -> Result<Self> {
        let single = if !template.is_empty() && !template.contains(SHEET_PLACEHOLDER) {
            Some(File::create(template)?)
        } else {
            None
        };
        Ok(Self {
            template: template.to_string(),
            single,
            per_sheet: None,
            fallback,
        })
    }

    /// Whether the template produces one file per sheet.
    pub fn has_placeholder(&self) -> bool {
        self.template.contains(SHEET_PLACEHOLDER)
    }

    /// Called when a sheet is selected; opens its per-sheet file if the
    /// template asks for one.
    pub fn select_sheet(&mut self, name: &str) -> Result<()> {
        if self.has_placeholder() {
            let path = self.template.replace(SHEET_PLACEHOLDER, name);
            self.per_sheet = Some(File::create(path)?);
        }
        Ok(())
    }

    /// The writer rows currently go to.
    pub fn writer(&mut self) -> &mut dyn Write {
        if let Some(file) = self.per_sheet.as_mut() {
            return file;
        }
        if let Some(file) = self.single.as_mut() {
            return file;
        }
        self.fallback
    }
}
