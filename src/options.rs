//! Extraction options configuration.

use crate::error::{Error, Result};

/// Default column separator (tab).
pub const DEFAULT_SEPARATOR: char = '\t';

/// Default quoting delimiter.
pub const DEFAULT_DELIMITER: char = '"';

/// Options controlling how sheets are selected and rows are emitted.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Character placed between columns.
    pub separator: char,

    /// Character used to quote values that contain the separator or the
    /// delimiter itself.
    pub delimiter: char,

    /// Sheet-name patterns. Each is accepted as an anchored regex match or
    /// exact name equality. Empty means default selection: first sheet only,
    /// skipping internal helper sheets.
    pub sheet_patterns: Vec<String>,

    /// Output path template. May contain the `<SHEET>` placeholder to
    /// produce one file per selected sheet. Empty means the caller's
    /// default stream.
    pub output_template: String,

    /// Report diagnostics verbosely. Never changes emitted content.
    pub verbose: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR,
            delimiter: DEFAULT_DELIMITER,
            sheet_patterns: Vec::new(),
            output_template: String::new(),
            verbose: false,
        }
    }
}

impl ExtractOptions {
    /// Create options with defaults (tab-separated, quote-delimited).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the column separator.
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// Set the quoting delimiter.
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Add a sheet-name pattern.
    pub fn with_sheet_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.sheet_patterns.push(pattern.into());
        self
    }

    /// Set the output path template.
    pub fn with_output_template(mut self, template: impl Into<String>) -> Self {
        self.output_template = template.into();
        self
    }

    /// Enable verbose diagnostics.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Check the configuration once up front.
    ///
    /// The separator and delimiter must differ, otherwise quoted values
    /// could not be told apart from column boundaries.
    pub fn validate(&self) -> Result<()> {
        if self.separator == self.delimiter {
            return Err(Error::Config(format!(
                "separator and delimiter are both {:?}",
                self.separator
            )));
        }
        Ok(())
    }
}
