//! odsv CLI - OpenDocument spreadsheet extraction tool
//!
//! Emits the rows of an .ods/.fods spreadsheet as delimited text. Foreign
//! formats are converted through an installed office suite first.

use clap::Parser;
use colored::*;
use odsv::{convert, Error, ExtractOptions};
use std::path::PathBuf;

/// Extract OpenDocument spreadsheets to delimited text
#[derive(Parser)]
#[command(
    name = "odsv",
    version,
    about = "Extract spreadsheet rows as delimited text",
    long_about = "odsv - OpenDocument spreadsheet extraction tool.\n\n\
                  Reads .ods and flat .fods spreadsheets and writes their rows as\n\
                  separator-joined lines. Other spreadsheet formats are converted\n\
                  via soffice when it is installed."
)]
struct Cli {
    /// Input spreadsheet file
    input: PathBuf,

    /// Output path; may contain <SHEET> for one file per sheet (default: stdout)
    #[arg(short, long)]
    output: Option<String>,

    /// Column separator character (\t for tab)
    #[arg(short, long, default_value = "\\t", value_parser = parse_char)]
    separator: char,

    /// Quoting delimiter character
    #[arg(short, long, default_value = "\"", value_parser = parse_char)]
    delimiter: char,

    /// Sheet name or wildcard pattern to extract; repeatable
    #[arg(short = 'S', long = "sheet", value_name = "PATTERN")]
    sheets: Vec<String>,

    /// Never invoke soffice for foreign formats
    #[arg(long)]
    no_convert: bool,

    /// Print a summary after extraction
    #[arg(short, long)]
    verbose: bool,
}

/// Parse a single-character option, accepting `\t` for tab.
fn parse_char(s: &str) -> Result<char, String> {
    if s == "\\t" || s == "tab" {
        return Ok('\t');
    }
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(format!("expected a single character, got {s:?}")),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> odsv::Result<()> {
    let mut options = ExtractOptions::new()
        .with_separator(cli.separator)
        .with_delimiter(cli.delimiter)
        .with_verbose(cli.verbose);
    if let Some(output) = &cli.output {
        options = options.with_output_template(output.clone());
    }
    for pattern in &cli.sheets {
        options = options.with_sheet_pattern(pattern.clone());
    }
    options.validate()?;

    let report = match odsv::extract_file(&cli.input, &options) {
        Err(Error::UnsupportedFormat(what)) if !cli.no_convert => {
            if cli.verbose {
                eprintln!(
                    "{} {} is {}, converting via soffice",
                    "!".yellow().bold(),
                    cli.input.display(),
                    what
                );
            }
            let converted = convert::convert_to_ods(&cli.input)?;
            odsv::extract_file(converted.path(), &options)?
        }
        other => other?,
    };

    for diag in &report.diagnostics {
        eprintln!("{}: {}", "Warning".yellow().bold(), diag);
    }

    if cli.verbose {
        eprintln!(
            "{} {} sheet(s), {} row(s)",
            "✓".green().bold(),
            report.sheets_emitted,
            report.rows_emitted
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_char() {
        assert_eq!(parse_char(","), Ok(','));
        assert_eq!(parse_char("\\t"), Ok('\t'));
        assert_eq!(parse_char("tab"), Ok('\t'));
        assert!(parse_char("ab").is_err());
        assert!(parse_char("").is_err());
    }
}
