//! Tag scanner and row reconstructor.
//!
//! The spreadsheet payload is one flat markup stream. This module walks it
//! left to right with a naive `<`/`>` bracket match, recognizing only the
//! handful of constructs that carry table structure: sheet starts
//! (`table:name="..."`), row boundaries (`:table-row`), cell boundaries
//! (`:table-cell`), and paragraph content (`text:p`). Everything else is
//! skipped without any well-formedness checking; the payload writer emits a
//! narrow, predictable dialect and a real XML parser would only add ways
//! to reject it.
//!
//! Empty rows and cells are run-length encoded in the payload via repeat
//! attributes. Their expansion is deferred: repeat counts accumulate as
//! pending counters and are materialized as blank lines or separators only
//! when later content forces them. Pending counts still unflushed when the
//! sheet ends are dropped, so trailing blank rows and columns never reach
//! the output.

use crate::error::{Diagnostic, Result};
use crate::options::ExtractOptions;
use crate::sheet::{OutputTarget, SheetFilter};
use std::io::Write;

const ROWS_REPEATED: &str = "table:number-rows-repeated=\"";
const COLS_REPEATED: &str = "table:number-columns-repeated=\"";

/// Summary of one extraction pass.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Number of sheets whose rows were emitted.
    pub sheets_emitted: usize,
    /// Number of output lines written, blank lines included.
    pub rows_emitted: usize,
    /// Non-fatal conditions noticed along the way.
    pub diagnostics: Vec<Diagnostic>,
}

/// Forward-only cursor over the payload text.
struct TagCursor<'a> {
    doc: &'a str,
    pos: usize,
}

impl<'a> TagCursor<'a> {
    fn new(doc: &'a str) -> Self {
        Self { doc, pos: 0 }
    }

    /// Locate the next `<...>` tag and return its inner text. A bare
    /// bracket match: embedded `>` inside attribute values is not treated
    /// specially, matching what the payload writer produces.
    fn next_tag(&mut self) -> Option<&'a str> {
        let open = self.doc[self.pos..].find('<')? + self.pos;
        let close = self.doc[open + 1..].find('>')? + open + 1;
        self.pos = close + 1;
        Some(&self.doc[open + 1..close])
    }

    /// Take the raw content of the paragraph that was just opened.
    ///
    /// The closing marker is the last `</text:` occurrence before the next
    /// `<text:p` opening (or end of payload). Searching for the last close
    /// rather than the first steps over nested span markup inside the
    /// paragraph instead of mistaking it for the end of the cell.
    fn paragraph_text(&mut self) -> &'a str {
        let start = self.pos;
        let boundary = self.doc[start..]
            .find("<text:p")
            .map_or(self.doc.len(), |i| start + i);

        let mut close = None;
        let mut search = start;
        while let Some(i) = self.doc[search..boundary].find("</text:") {
            close = Some(search + i);
            search += i + "</text:".len();
        }

        match close {
            Some(at) => {
                self.pos = self.doc[at..]
                    .find('>')
                    .map_or(self.doc.len(), |g| at + g + 1);
                &self.doc[start..at]
            }
            None => {
                // No close before the next paragraph; take what is there.
                self.pos = boundary;
                &self.doc[start..boundary]
            }
        }
    }
}

/// Per-sheet reconstruction state.
#[derive(Default)]
struct RowState {
    taking: bool,
    pending_rows: u32,
    pending_cells: u32,
    line: String,
}

impl RowState {
    fn reset(&mut self) {
        self.pending_rows = 0;
        self.pending_cells = 0;
        self.line.clear();
    }
}

/// Scan the payload and emit delimited rows for every selected sheet.
///
/// One forward pass; the cursor only looks ahead within the current
/// paragraph. The output target is switched at sheet transitions when the
/// template carries the `<SHEET>` placeholder.
pub fn scan(
    doc: &str,
    options: &ExtractOptions,
    output: &mut OutputTarget<'_>,
) -> Result<ScanReport> {
    options.validate()?;

    let mut report = ScanReport::default();
    let filter = SheetFilter::new(&options.sheet_patterns, &mut report.diagnostics);
    let mut cursor = TagCursor::new(doc);
    let mut state = RowState::default();

    while let Some(tag) = cursor.next_tag() {
        if let Some(name) = sheet_name(tag) {
            // In default single-output mode only the first sheet is wanted.
            if report.sheets_emitted >= 1 && !output.has_placeholder() && filter.is_default() {
                break;
            }
            state.taking = filter.accepts(name);
            if state.taking {
                state.reset();
                report.sheets_emitted += 1;
                output.select_sheet(name)?;
            }
            continue;
        }

        if !state.taking {
            continue;
        }

        if tag.contains(":table-row") {
            if is_closing(tag) {
                if state.line.is_empty() {
                    // Might be trailing; hold off until content follows.
                    state.pending_rows += 1;
                } else {
                    for _ in 0..state.pending_rows {
                        writeln!(output.writer())?;
                        report.rows_emitted += 1;
                    }
                    state.pending_rows = 0;
                    writeln!(output.writer(), "{}", state.line)?;
                    report.rows_emitted += 1;
                    state.line.clear();
                }
                state.pending_cells = 0;
            }
            state.pending_rows += repeat_count(tag, ROWS_REPEATED).saturating_sub(1);
        } else if tag.contains(":table-cell") {
            if is_closing(tag) {
                state.pending_cells += repeat_count(tag, COLS_REPEATED);
            }
        } else if tag == "text:p" {
            // Cells skipped so far in this row now need their separators.
            for _ in 0..state.pending_cells {
                state.line.push(options.separator);
            }
            state.pending_cells = 0;

            let raw = cursor.paragraph_text();
            let value = normalize_cell(raw, options, &mut report.diagnostics);
            state.line.push_str(&value);
        }
    }

    Ok(report)
}

/// Extract the sheet name from a sheet-start tag, if this is one.
fn sheet_name(tag: &str) -> Option<&str> {
    let at = tag.find("table:name=\"")?;
    let rest = &tag[at + "table:name=\"".len()..];
    let end = rest.find('"')?;
    Some(&rest[..end])
}

/// A tag is closing or self-closing when its inner text starts or ends
/// with a slash.
fn is_closing(tag: &str) -> bool {
    tag.starts_with('/') || tag.ends_with('/')
}

/// Parse a repeat attribute, defaulting to one occurrence.
fn repeat_count(tag: &str, attr: &str) -> u32 {
    let Some(at) = tag.find(attr) else {
        return 1;
    };
    let digits: String = tag[at + attr.len()..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().unwrap_or(1)
}

/// Turn a paragraph's raw content into an emittable cell value: strip
/// leftover markup, decode entities, then quote for the configured
/// separator and delimiter.
fn normalize_cell(
    raw: &str,
    options: &ExtractOptions,
    diagnostics: &mut Vec<Diagnostic>,
) -> String {
    let stripped = strip_markup(raw);
    let decoded = decode_entities(&stripped, diagnostics);
    quote_value(&decoded, options.separator, options.delimiter)
}

/// Remove embedded `<...>` spans, shortest match first, until none remain.
fn strip_markup(raw: &str) -> String {
    let mut value = raw.to_string();
    while let Some(open) = value.find('<') {
        match value[open..].find('>') {
            Some(close) => value.replace_range(open..open + close + 1, ""),
            None => break,
        }
    }
    value
}

/// Decode `&name;` entity references. Unrecognized names are substituted
/// with the uppercased name and reported, not treated as fatal.
fn decode_entities(value: &str, diagnostics: &mut Vec<Diagnostic>) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp + 1..];
        let Some(semi) = tail.find(';') else {
            // Stray ampersand with no terminator; keep it literal.
            out.push('&');
            rest = tail;
            continue;
        };
        let name = &tail[..semi];
        match name {
            "amp" => out.push('&'),
            "lt" => out.push('<'),
            "gt" => out.push('>'),
            "apos" => out.push('\''),
            "quot" => out.push('"'),
            _ => {
                out.push_str(&name.to_uppercase());
                diagnostics.push(Diagnostic::UnknownEntity(name.to_string()));
            }
        }
        rest = &tail[semi + 1..];
    }
    out.push_str(rest);
    out
}

/// Double embedded delimiters; wrap the value in delimiters when any
/// doubling happened or the value contains the separator.
fn quote_value(value: &str, separator: char, delimiter: char) -> String {
    let mut escaped = String::with_capacity(value.len());
    let mut doubled = false;
    for ch in value.chars() {
        escaped.push(ch);
        if ch == delimiter {
            escaped.push(ch);
            doubled = true;
        }
    }
    if doubled || value.contains(separator) {
        let mut quoted = String::with_capacity(escaped.len() + 2);
        quoted.push(delimiter);
        quoted.push_str(&escaped);
        quoted.push(delimiter);
        quoted
    } else {
        escaped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_str(doc: &str, options: &ExtractOptions) -> (String, ScanReport) {
        let mut sink: Vec<u8> = Vec::new();
        let mut output = OutputTarget::new("", &mut sink).unwrap();
        let report = scan(doc, options, &mut output).unwrap();
        drop(output);
        (String::from_utf8(sink).unwrap(), report)
    }

    fn sheet(name: &str, rows: &str) -> String {
        format!("<table:table table:name=\"{name}\" table:style-name=\"ta1\">{rows}</table:table>")
    }

    fn row(cells: &str) -> String {
        format!("<table:table-row table:style-name=\"ro1\">{cells}</table:table-row>")
    }

    fn cell(text: &str) -> String {
        format!("<table:table-cell office:value-type=\"string\"><text:p>{text}</text:p></table:table-cell>")
    }

    #[test]
    fn test_basic_rows_and_cells() {
        let doc = sheet("Sheet1", &(row(&(cell("a") + &cell("b"))) + &row(&cell("c"))));
        let (out, report) = scan_str(&doc, &ExtractOptions::new());
        assert_eq!(out, "a\tb\nc\n");
        assert_eq!(report.sheets_emitted, 1);
        assert_eq!(report.rows_emitted, 2);
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn test_trailing_blank_cells_dropped() {
        let doc = sheet(
            "Sheet1",
            &row(&(cell("a") + "<table:table-cell/><table:table-cell/>")),
        );
        let (out, _) = scan_str(&doc, &ExtractOptions::new());
        assert_eq!(out, "a\n");
    }

    #[test]
    fn test_interior_blank_cells_become_separators() {
        let doc = sheet(
            "Sheet1",
            &row(&(cell("a") + "<table:table-cell/>" + &cell("c"))),
        );
        let (out, _) = scan_str(&doc, &ExtractOptions::new());
        assert_eq!(out, "a\t\tc\n");
    }

    #[test]
    fn test_repeated_blank_cells_before_content() {
        let doc = sheet(
            "Sheet1",
            &row(&("<table:table-cell table:number-columns-repeated=\"3\"/>".to_string()
                + &cell("x"))),
        );
        let (out, _) = scan_str(&doc, &ExtractOptions::new());
        assert_eq!(out, "\t\t\tx\n");
    }

    #[test]
    fn test_repeated_blank_cells_at_row_end_dropped() {
        let doc = sheet(
            "Sheet1",
            &row(&(cell("x")
                + "<table:table-cell table:number-columns-repeated=\"1000\"/>")),
        );
        let (out, _) = scan_str(&doc, &ExtractOptions::new());
        assert_eq!(out, "x\n");
    }

    #[test]
    fn test_interior_blank_rows_emitted() {
        let doc = sheet(
            "Sheet1",
            &(row(&cell("top"))
                + "<table:table-row table:number-rows-repeated=\"2\"/>"
                + &row(&cell("bottom"))),
        );
        let (out, _) = scan_str(&doc, &ExtractOptions::new());
        assert_eq!(out, "top\n\n\nbottom\n");
    }

    #[test]
    fn test_trailing_blank_rows_dropped() {
        let doc = sheet(
            "Sheet1",
            &(row(&cell("only"))
                + &row("<table:table-cell/>")
                + "<table:table-row table:number-rows-repeated=\"500\"/>"),
        );
        let (out, report) = scan_str(&doc, &ExtractOptions::new());
        assert_eq!(out, "only\n");
        assert_eq!(report.rows_emitted, 1);
    }

    #[test]
    fn test_leading_blank_rows_emitted() {
        let doc = sheet("Sheet1", &(row("<table:table-cell/>") + &row(&cell("x"))));
        let (out, _) = scan_str(&doc, &ExtractOptions::new());
        assert_eq!(out, "\nx\n");
    }

    #[test]
    fn test_nested_span_inside_paragraph() {
        let doc = sheet(
            "Sheet1",
            &row(
                "<table:table-cell><text:p>Hello <text:span text:style-name=\"T1\">World</text:span>!</text:p></table:table-cell>",
            ),
        );
        let (out, _) = scan_str(&doc, &ExtractOptions::new());
        assert_eq!(out, "Hello World!\n");
    }

    #[test]
    fn test_entity_decoding() {
        let doc = sheet("Sheet1", &row(&cell("a &amp; b &lt;c&gt; &apos;&quot;")));
        let options = ExtractOptions::new().with_delimiter('\'');
        let (out, report) = scan_str(&doc, &options);
        assert_eq!(out, "'a & b <c> ''\"'\n");
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn test_unknown_entity_uppercased_with_diagnostic() {
        let doc = sheet("Sheet1", &row(&cell("x &foo; y")));
        let (out, report) = scan_str(&doc, &ExtractOptions::new());
        assert_eq!(out, "x FOO y\n");
        assert_eq!(
            report.diagnostics,
            vec![Diagnostic::UnknownEntity("foo".to_string())]
        );
    }

    #[test]
    fn test_value_with_separator_is_quoted() {
        let doc = sheet("Sheet1", &row(&cell("a\tb")));
        let (out, _) = scan_str(&doc, &ExtractOptions::new());
        assert_eq!(out, "\"a\tb\"\n");
    }

    #[test]
    fn test_value_with_delimiter_is_doubled_and_quoted() {
        let doc = sheet("Sheet1", &row(&cell("say \"hi\"")));
        let (out, _) = scan_str(&doc, &ExtractOptions::new());
        assert_eq!(out, "\"say \"\"hi\"\"\"\n");
    }

    #[test]
    fn test_plain_value_unquoted() {
        assert_eq!(quote_value("plain", '\t', '"'), "plain");
    }

    #[test]
    fn test_quote_round_trip() {
        // Doubling-rule decode restores the original.
        let original = "a\"b\"\"c";
        let quoted = quote_value(original, '\t', '"');
        let inner = quoted.strip_prefix('"').unwrap().strip_suffix('"').unwrap();
        assert_eq!(inner.replace("\"\"", "\""), original);
    }

    #[test]
    fn test_default_selection_stops_after_first_sheet() {
        let doc = sheet("First", &row(&cell("1"))) + &sheet("Second", &row(&cell("2")));
        let (out, report) = scan_str(&doc, &ExtractOptions::new());
        assert_eq!(out, "1\n");
        assert_eq!(report.sheets_emitted, 1);
    }

    #[test]
    fn test_default_selection_skips_internal_sheet() {
        let doc = sheet("__Anonymous_Sheet__", &row(&cell("hidden")))
            + &sheet("Data", &row(&cell("visible")));
        let (out, _) = scan_str(&doc, &ExtractOptions::new());
        assert_eq!(out, "visible\n");
    }

    #[test]
    fn test_pattern_selection_spans_sheets() {
        let doc = sheet("Project1", &row(&cell("p1")))
            + &sheet("Project2", &row(&cell("p2")))
            + &sheet("Summary", &row(&cell("s")));
        let options = ExtractOptions::new().with_sheet_pattern("Project.*");
        let (out, report) = scan_str(&doc, &options);
        assert_eq!(out, "p1\np2\n");
        assert_eq!(report.sheets_emitted, 2);
    }

    #[test]
    fn test_sheet_switch_resets_pending_counters() {
        // Pending blank rows from the first sheet must not leak into the
        // second sheet's output.
        let doc = sheet(
            "Project1",
            &(row(&cell("p1")) + "<table:table-row table:number-rows-repeated=\"9\"/>"),
        ) + &sheet("Project2", &row(&cell("p2")));
        let options = ExtractOptions::new().with_sheet_pattern("Project.*");
        let (out, _) = scan_str(&doc, &options);
        assert_eq!(out, "p1\np2\n");
    }

    #[test]
    fn test_unrelated_markup_ignored() {
        let doc = format!(
            "<?xml version=\"1.0\"?><office:document-content><office:body><office:spreadsheet>{}</office:spreadsheet></office:body></office:document-content>",
            sheet("Sheet1", &row(&cell("a")))
        );
        let (out, _) = scan_str(&doc, &ExtractOptions::new());
        assert_eq!(out, "a\n");
    }

    #[test]
    fn test_multiple_paragraphs_concatenate() {
        let doc = sheet(
            "Sheet1",
            &row("<table:table-cell><text:p>one</text:p><text:p>two</text:p></table:table-cell>"),
        );
        let (out, _) = scan_str(&doc, &ExtractOptions::new());
        assert_eq!(out, "onetwo\n");
    }

    #[test]
    fn test_unterminated_tag_ends_scan() {
        let doc = sheet("Sheet1", &row(&cell("a"))) + "<table:table-row";
        let (out, _) = scan_str(&doc, &ExtractOptions::new());
        assert_eq!(out, "a\n");
    }

    #[test]
    fn test_repeat_count_parsing() {
        assert_eq!(
            repeat_count("table:table-cell table:number-columns-repeated=\"12\"/", COLS_REPEATED),
            12
        );
        assert_eq!(repeat_count("table:table-cell/", COLS_REPEATED), 1);
        assert_eq!(
            repeat_count("table:table-row table:number-rows-repeated=\"bad\"/", ROWS_REPEATED),
            1
        );
    }

    #[test]
    fn test_sheet_name_extraction() {
        assert_eq!(
            sheet_name("table:table table:name=\"Budget\" table:style-name=\"ta1\""),
            Some("Budget")
        );
        assert_eq!(sheet_name("table:table-row"), None);
    }
}
