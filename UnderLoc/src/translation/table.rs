//! Edit tables for translators
//!
//! Delimited text that opens in any spreadsheet application. Columns are
//! located by header name:
//!
//! | Column        | Written when          | On read                      |
//! |---------------|-----------------------|------------------------------|
//! | `File`        | paths were requested  | optional                     |
//! | `Variable`    | variables mode        | optional, key recomputed     |
//! | `Name`        | variables mode        | optional                     |
//! | `Original`    | always                | required                     |
//! | `Translation` | always                | required                     |
//!
//! # Example
//!
//! ```csv
//! Original,Translation
//! "Hello there,\nfriend.",
//! Goodbye for now,Bis bald
//! ```
//!
//! Quoting follows RFC 4180. Field contents are never trimmed.

use std::fs;
use std::path::Path;

use super::key::{normalize_line_breaks, stable_key};
use super::{ExtractionMode, TextCategory, TextEntry, TranslationTable};
use crate::error::{Error, Result};

pub const COLUMN_FILE: &str = "File";
pub const COLUMN_KEY: &str = "Variable";
pub const COLUMN_NAME: &str = "Name";
pub const COLUMN_ORIGINAL: &str = "Original";
pub const COLUMN_TRANSLATION: &str = "Translation";

const LINE_END: &str = "\r\n";

/// Delimited text flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableFormat {
    /// Comma-separated values
    #[default]
    Csv,
    /// Tab-separated values
    Tsv,
}

impl TableFormat {
    /// Pick the format from a file extension; anything but `.tsv` is CSV
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        match path.as_ref().extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => Self::Tsv,
            _ => Self::Csv,
        }
    }

    /// Get the file extension for this format
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Tsv => "tsv",
            Self::Csv => "csv",
        }
    }

    /// Get the delimiter character
    #[must_use]
    pub fn delimiter(&self) -> char {
        match self {
            Self::Tsv => '\t',
            Self::Csv => ',',
        }
    }
}

/// Which optional columns a table has
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TableLayout {
    pub include_file: bool,
    pub include_key: bool,
    pub include_name: bool,
}

impl TableLayout {
    /// Columns written for `mode`
    pub fn for_mode(mode: ExtractionMode, include_file: bool) -> Self {
        let variables = mode == ExtractionMode::Variables;
        Self {
            include_file,
            include_key: variables,
            include_name: variables,
        }
    }

    fn headers(self) -> Vec<&'static str> {
        let mut headers = Vec::with_capacity(5);
        if self.include_file {
            headers.push(COLUMN_FILE);
        }
        if self.include_key {
            headers.push(COLUMN_KEY);
        }
        if self.include_name {
            headers.push(COLUMN_NAME);
        }
        headers.push(COLUMN_ORIGINAL);
        headers.push(COLUMN_TRANSLATION);
        headers
    }
}

/// Write `table` to disk; the format follows the extension
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_table<P: AsRef<Path>>(
    path: P,
    table: &TranslationTable,
    layout: TableLayout,
) -> Result<usize> {
    let format = TableFormat::from_path(&path);
    fs::write(path, serialize_table(table, layout, format))?;
    Ok(table.len())
}

/// Render `table` as delimited text
#[must_use]
pub fn serialize_table(table: &TranslationTable, layout: TableLayout, format: TableFormat) -> String {
    let delimiter = format.delimiter();
    let mut out = String::new();
    push_row(&mut out, layout.headers(), delimiter);

    for entry in table.iter() {
        let mut fields = Vec::with_capacity(5);
        if layout.include_file {
            fields.push(entry.file.as_deref().unwrap_or_default());
        }
        if layout.include_key {
            fields.push(entry.key.as_str());
        }
        if layout.include_name {
            fields.push(entry.name.as_deref().unwrap_or_default());
        }
        fields.push(entry.original.as_str());
        fields.push(entry.translation.as_str());
        push_row(&mut out, fields, delimiter);
    }
    out
}

/// Read a table from disk; the format follows the extension
///
/// Rows without a key get one computed from `Original` with `category`.
///
/// # Errors
/// Returns [`Error::MissingColumn`] or [`Error::TableParse`] for malformed tables.
pub fn read_table<P: AsRef<Path>>(
    path: P,
    category: TextCategory,
) -> Result<(TranslationTable, TableLayout)> {
    let format = TableFormat::from_path(&path);
    let content = fs::read_to_string(path)?;
    parse_table(&content, format, category)
}

/// Parse delimited text into a table
///
/// # Errors
/// Returns [`Error::MissingColumn`] or [`Error::TableParse`] for malformed tables.
pub fn parse_table(
    content: &str,
    format: TableFormat,
    category: TextCategory,
) -> Result<(TranslationTable, TableLayout)> {
    let sheet = Sheet::parse(content, format.delimiter())?;
    let original = sheet.require(COLUMN_ORIGINAL)?;
    let translation = sheet.require(COLUMN_TRANSLATION)?;
    let file = sheet.column(COLUMN_FILE);
    let key = sheet.column(COLUMN_KEY);
    let name = sheet.column(COLUMN_NAME);

    let layout = TableLayout {
        include_file: file.is_some(),
        include_key: key.is_some(),
        include_name: name.is_some(),
    };
    let width = [Some(original), Some(translation), file, key, name]
        .into_iter()
        .flatten()
        .max()
        .unwrap_or_default()
        + 1;

    let mut table = TranslationTable::new();
    for (line, row) in &sheet.rows {
        if row.len() < width {
            return Err(Error::TableParse {
                line: *line,
                message: format!("expected {width} fields, found {}", row.len()),
            });
        }

        let text = normalize_line_breaks(&row[original]);
        let entry_key = key
            .map(|index| row[index].as_str())
            .filter(|value| !value.trim().is_empty())
            .map_or_else(|| stable_key(&text, category), ToString::to_string);
        let optional = |index: Option<usize>| {
            index
                .map(|index| row[index].clone())
                .filter(|value| !value.is_empty())
        };

        table.insert(TextEntry {
            key: entry_key,
            original: text,
            translation: row[translation].clone(),
            file: optional(file),
            name: optional(name),
        });
    }

    Ok((table, layout))
}

/// Write every translation of a table to a text file, one per line
///
/// Line breaks inside a translation are written as the `\n` escape so the
/// line count always equals the row count.
///
/// # Errors
/// Returns an error if the table cannot be read or lacks a `Translation` column.
pub fn export_translation_column<P: AsRef<Path>, Q: AsRef<Path>>(
    table_path: P,
    output: Q,
) -> Result<usize> {
    let format = TableFormat::from_path(&table_path);
    let sheet = Sheet::parse(&fs::read_to_string(table_path)?, format.delimiter())?;
    let column = sheet.require(COLUMN_TRANSLATION)?;

    let lines: Vec<String> = sheet
        .rows
        .iter()
        .map(|(_, row)| normalize_line_breaks(row.get(column).map_or("", String::as_str)))
        .collect();
    fs::write(output, lines.join("\n"))?;
    Ok(lines.len())
}

/// Replace the `Translation` column of a table, in place, with the lines of
/// a text file
///
/// # Errors
/// Returns [`Error::TranslationCountMismatch`] if the line count differs from
/// the row count; the table is left untouched in that case.
pub fn insert_translation_column<P: AsRef<Path>, Q: AsRef<Path>>(
    table_path: P,
    input: Q,
) -> Result<usize> {
    let format = TableFormat::from_path(&table_path);
    let mut sheet = Sheet::parse(&fs::read_to_string(&table_path)?, format.delimiter())?;
    let column = sheet.require(COLUMN_TRANSLATION)?;

    let text = fs::read_to_string(input)?;
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() != sheet.rows.len() {
        return Err(Error::TranslationCountMismatch {
            rows: sheet.rows.len(),
            lines: lines.len(),
        });
    }

    for ((_, row), line) in sheet.rows.iter_mut().zip(&lines) {
        if row.len() <= column {
            row.resize(column + 1, String::new());
        }
        row[column] = (*line).to_string();
    }

    fs::write(table_path, sheet.render(format.delimiter()))?;
    Ok(lines.len())
}

/// Rewrite a table with canonical quoting and CRLF line endings
///
/// Rows are copied as they are, without key checks, so tables written by
/// other tools can be cleaned up before they are merged. Converts between
/// CSV and TSV when the extensions differ.
///
/// # Errors
/// Returns an error if the input cannot be parsed or the output cannot be written.
pub fn normalize_table<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> Result<usize> {
    let sheet = Sheet::parse(
        &fs::read_to_string(&input)?,
        TableFormat::from_path(&input).delimiter(),
    )?;
    let rendered = sheet.render(TableFormat::from_path(&output).delimiter());
    fs::write(output, rendered)?;
    tracing::debug!("Normalized {} rows", sheet.rows.len());
    Ok(sheet.rows.len())
}

/// Header plus data rows, each row tagged with the line it starts on
struct Sheet {
    header: Vec<String>,
    rows: Vec<(usize, Vec<String>)>,
}

impl Sheet {
    fn parse(content: &str, delimiter: char) -> Result<Self> {
        let mut rows = parse_delimited(content, delimiter)?.into_iter();
        let Some((_, header)) = rows.next() else {
            return Err(Error::MissingColumn(COLUMN_ORIGINAL));
        };
        Ok(Self {
            header,
            rows: rows.collect(),
        })
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h.trim() == name)
    }

    fn require(&self, name: &'static str) -> Result<usize> {
        self.column(name).ok_or(Error::MissingColumn(name))
    }

    fn render(&self, delimiter: char) -> String {
        let mut out = String::new();
        push_row(&mut out, self.header.iter().map(String::as_str), delimiter);
        for (_, row) in &self.rows {
            push_row(&mut out, row.iter().map(String::as_str), delimiter);
        }
        out
    }
}

// ============================================================================
// Helper functions
// ============================================================================

fn push_row<'a>(out: &mut String, fields: impl IntoIterator<Item = &'a str>, delimiter: char) {
    for (index, field) in fields.into_iter().enumerate() {
        if index > 0 {
            out.push(delimiter);
        }
        out.push_str(&escape_field(field, delimiter));
    }
    out.push_str(LINE_END);
}

/// Quote a field if it holds the delimiter, a quote or a line break
fn escape_field(text: &str, delimiter: char) -> String {
    if text.contains(delimiter) || text.contains(['"', '\n', '\r']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

/// Split delimited text into rows of fields.
///
/// Quoted fields may span lines. Blank lines are skipped. A leading BOM is
/// ignored. Each row is returned with its 1-based starting line.
fn parse_delimited(content: &str, delimiter: char) -> Result<Vec<(usize, Vec<String>)>> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut line = 1;
    let mut row_line = 1;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => {
                    if c == '\n' {
                        line += 1;
                    }
                    field.push(c);
                }
            }
            continue;
        }

        match c {
            '"' if field.is_empty() && !quoted => {
                in_quotes = true;
                quoted = true;
            }
            c if c == delimiter => {
                row.push(std::mem::take(&mut field));
                quoted = false;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                if !(row.len() == 1 && row[0].is_empty() && !quoted) {
                    rows.push((row_line, std::mem::take(&mut row)));
                }
                row.clear();
                quoted = false;
                line += 1;
                row_line = line;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(Error::TableParse {
            line: row_line,
            message: "unterminated quoted field".to_string(),
        });
    }
    if !field.is_empty() || !row.is_empty() || quoted {
        row.push(field);
        rows.push((row_line, row));
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_delimited_quoting() {
        let rows = parse_delimited("a,\"b,c\",\"say \"\"hi\"\"\"\r\n\"multi\nline\",x,\n", ',').unwrap();
        assert_eq!(
            rows,
            vec![
                (1, vec!["a".to_string(), "b,c".to_string(), "say \"hi\"".to_string()]),
                (2, vec!["multi\nline".to_string(), "x".to_string(), String::new()]),
            ]
        );
    }

    #[test]
    fn test_blank_lines_and_bom() {
        let rows = parse_delimited("\u{feff}h1\th2\n\nv1\tv2", '\t').unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].1, vec!["h1", "h2"]);
        assert_eq!(rows[1], (3, vec!["v1".to_string(), "v2".to_string()]));
    }

    #[test]
    fn test_unterminated_quote() {
        let err = parse_delimited("Original,Translation\n\"open,", ',').unwrap_err();
        assert!(matches!(err, Error::TableParse { line: 2, .. }));
    }

    #[test]
    fn test_whitespace_is_preserved() {
        let mut table = TranslationTable::new();
        table.insert(TextEntry::new("  padded text  ", TextCategory::English).with_translation(" x "));

        let layout = TableLayout::default();
        let text = serialize_table(&table, layout, TableFormat::Csv);
        let (parsed, parsed_layout) = parse_table(&text, TableFormat::Csv, TextCategory::English).unwrap();

        assert_eq!(parsed_layout, layout);
        let entry = parsed.iter().next().unwrap();
        assert_eq!(entry.original, "  padded text  ");
        assert_eq!(entry.translation, " x ");
        assert_eq!(entry.key, stable_key("  padded text  ", TextCategory::English));
    }

    #[test]
    fn test_variables_layout_round_trip() {
        let mut table = TranslationTable::new();
        table.insert(
            TextEntry::new("Rusty sword, \"used\"", TextCategory::Variable)
                .with_name(Some("title".to_string()))
                .with_file(Some("items/sword.udlg".to_string())),
        );
        let layout = TableLayout::for_mode(ExtractionMode::Variables, true);
        let text = serialize_table(&table, layout, TableFormat::Tsv);
        assert!(text.starts_with("File\tVariable\tName\tOriginal\tTranslation\r\n"));

        let (parsed, parsed_layout) = parse_table(&text, TableFormat::Tsv, TextCategory::Variable).unwrap();
        assert_eq!(parsed_layout, layout);
        assert_eq!(parsed, table);
    }

    #[test]
    fn test_missing_column() {
        let err = parse_table("File,Original\nx,y\n", TableFormat::Csv, TextCategory::English).unwrap_err();
        assert!(matches!(err, Error::MissingColumn("Translation")));
    }

    #[test]
    fn test_short_row() {
        let err = parse_table(
            "Original,Translation\nfine,row\nshort\n",
            TableFormat::Csv,
            TextCategory::English,
        )
        .unwrap_err();
        assert!(matches!(err, Error::TableParse { line: 3, .. }));
    }

    #[test]
    fn test_blank_key_is_recomputed() {
        let (table, _) = parse_table(
            "Variable,Original,Translation\n,Hello there,Hallo\n",
            TableFormat::Csv,
            TextCategory::Variable,
        )
        .unwrap();
        let entry = table.iter().next().unwrap();
        assert_eq!(entry.key, stable_key("Hello there", TextCategory::Variable));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(TableFormat::from_path("a/b.TSV"), TableFormat::Tsv);
        assert_eq!(TableFormat::from_path("a/b.csv"), TableFormat::Csv);
        assert_eq!(TableFormat::from_path("a/b"), TableFormat::Csv);
    }

    #[test]
    fn test_translation_column_export_and_insert() {
        let dir = tempfile::tempdir().unwrap();
        let table_path = dir.path().join("dialog.csv");
        let text_path = dir.path().join("translations.txt");
        fs::write(
            &table_path,
            "Original,Translation\nHello there,\"Hallo\nda\"\nGoodbye for now,\n",
        )
        .unwrap();

        assert_eq!(export_translation_column(&table_path, &text_path).unwrap(), 2);
        assert_eq!(fs::read_to_string(&text_path).unwrap(), "Hallo\\nda\n");

        fs::write(&text_path, "Hallo\nBis bald\n").unwrap();
        assert_eq!(insert_translation_column(&table_path, &text_path).unwrap(), 2);
        let (table, _) = read_table(&table_path, TextCategory::English).unwrap();
        let translations: Vec<_> = table.iter().map(|e| e.translation.as_str()).collect();
        assert_eq!(translations, vec!["Hallo", "Bis bald"]);

        fs::write(&text_path, "only one\n").unwrap();
        assert!(matches!(
            insert_translation_column(&table_path, &text_path),
            Err(Error::TranslationCountMismatch { rows: 2, lines: 1 })
        ));
    }

    #[test]
    fn test_normalize_converts_to_tsv() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("exe_texts.csv");
        let output = dir.path().join("exe_texts.tsv");
        fs::write(&input, "\u{feff}Original,Translation\n\"a, b\",\n\"tab\there\",x\n").unwrap();

        assert_eq!(normalize_table(&input, &output).unwrap(), 2);
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "Original\tTranslation\r\na, b\t\r\n\"tab\there\"\tx\r\n"
        );
    }
}
