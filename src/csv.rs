//! Delimited-text decoding and encoding.
//!
//! The decoder is a single left-to-right scan with one `in_quotes` flag:
//!
//! - Outside quotes, `"` opens a quoted section, the delimiter ends the
//!   field, and `\r`, `\r\n` or `\n` end both the field and the row.
//! - Inside quotes, `""` decodes to one literal `"`, a lone `"` closes the
//!   section, and everything else (delimiters and newlines included) is
//!   literal.
//!
//! Decoding is total: unterminated quotes and ragged rows are absorbed, never
//! reported. The first row is the header; later rows are zipped against it
//! positionally.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::mem::take;

use crate::record::{Dataset, Record};

/// What to do with header columns a short row does not reach.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RaggedPolicy {
    /// Leave the column out of the record; `Record::get` returns `None`.
    #[default]
    OmitMissing,
    /// Insert the column with an empty string value.
    FillEmpty,
}

/// Decoder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    pub delimiter: char,
    pub ragged: RaggedPolicy,
    /// Drop lines that decode to a single empty field (blank lines).
    pub skip_blank_lines: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            ragged: RaggedPolicy::OmitMissing,
            skip_blank_lines: false,
        }
    }
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn ragged(mut self, ragged: RaggedPolicy) -> Self {
        self.ragged = ragged;
        self
    }

    pub fn skip_blank_lines(mut self, skip: bool) -> Self {
        self.skip_blank_lines = skip;
        self
    }
}

/* ---------------- Decoding ---------------- */

/// Split text into rows of fields.
///
/// A trailing newline does not produce an empty final row. An unterminated
/// quote runs to the end of input and is flushed as the last field.
pub fn parse_rows(text: &str, delimiter: char) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next(); // doubled quote
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(ch);
            }
            continue;
        }

        match ch {
            '"' => in_quotes = true,
            c if c == delimiter => row.push(take(&mut field)),
            '\r' | '\n' => {
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                row.push(take(&mut field));
                rows.push(take(&mut row));
            }
            _ => field.push(ch),
        }
    }

    if !field.is_empty() || in_quotes || !row.is_empty() {
        row.push(field);
    }
    if !row.is_empty() {
        rows.push(row);
    }

    rows
}

fn is_blank(row: &[String]) -> bool {
    row.len() == 1 && row[0].is_empty()
}

/// Unique header columns in first-seen order, each paired with the index of
/// its last occurrence so a repeated column takes the later field.
fn header_slots(header: Vec<String>) -> Vec<(String, usize)> {
    let mut seen: HashMap<String, usize> = HashMap::with_capacity(header.len());
    let mut slots: Vec<(String, usize)> = Vec::with_capacity(header.len());
    for (idx, column) in header.into_iter().enumerate() {
        match seen.get(&column) {
            Some(&slot) => slots[slot].1 = idx,
            None => {
                seen.insert(column.clone(), slots.len());
                slots.push((column, idx));
            }
        }
    }
    slots
}

fn row_to_record(slots: &[(String, usize)], mut row: Vec<String>, ragged: RaggedPolicy) -> Record {
    let mut record = Record::with_capacity(slots.len());
    for (column, idx) in slots {
        match (row.get_mut(*idx), ragged) {
            (Some(value), _) => record.push(column.clone(), take(value)),
            (None, RaggedPolicy::FillEmpty) => record.push(column.clone(), String::new()),
            (None, RaggedPolicy::OmitMissing) => {}
        }
    }
    record
}

/// Decode text into a dataset using the first row as the header.
///
/// Fields beyond the header width are dropped. Empty input yields an empty
/// dataset with no columns.
pub fn decode(text: &str, options: &DecodeOptions) -> Dataset {
    let mut rows = parse_rows(text, options.delimiter);
    if options.skip_blank_lines {
        rows.retain(|row| !is_blank(row));
    }

    let mut rows = rows.into_iter();
    let Some(header) = rows.next() else {
        log::debug!("decode: empty input");
        return Dataset::default();
    };

    let width = header.len();
    let slots = header_slots(header);
    let mut ragged = 0usize;
    let records: Vec<Record> = rows
        .map(|row| {
            if row.len() != width {
                ragged += 1;
            }
            row_to_record(&slots, row, options.ragged)
        })
        .collect();

    if ragged > 0 {
        log::debug!(
            "decode: {ragged} of {} rows differ from header width {}",
            records.len(),
            width
        );
    }
    log::debug!("decode: {} columns, {} records", slots.len(), records.len());

    let columns = slots.into_iter().map(|(column, _)| column).collect();
    Dataset::new(columns, records)
}

/// Decode comma-separated text with default options.
pub fn parse(text: &str) -> Dataset {
    decode(text, &DecodeOptions::default())
}

/* ---------------- Encoding ---------------- */

fn needs_quotes(field: &str, delimiter: char) -> bool {
    field.contains(delimiter) || field.contains(['"', '\n', '\r'])
}

fn write_field(out: &mut String, field: &str, delimiter: char) {
    if needs_quotes(field, delimiter) {
        let _ = write!(out, "\"{}\"", field.replace('"', "\"\""));
    } else {
        out.push_str(field);
    }
}

fn write_row<'a>(out: &mut String, fields: impl IntoIterator<Item = &'a str>, delimiter: char) {
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            out.push(delimiter);
        }
        write_field(out, field, delimiter);
    }
    out.push('\n');
}

/// Encode a header line plus one line per record.
///
/// Each record is written in `columns` order; missing fields are written
/// empty. Writes nothing when `columns` is empty.
pub fn encode_records<'a>(
    columns: &[String],
    records: impl IntoIterator<Item = &'a Record>,
    delimiter: char,
) -> String {
    let mut out = String::new();
    if columns.is_empty() {
        return out;
    }

    write_row(&mut out, columns.iter().map(String::as_str), delimiter);
    for record in records {
        write_row(
            &mut out,
            columns.iter().map(|c| record.get(c).unwrap_or("")),
            delimiter,
        );
    }
    out
}

/// Encode a whole dataset.
pub fn encode(dataset: &Dataset, delimiter: char) -> String {
    encode_records(dataset.columns(), dataset.records(), delimiter)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(ds: &Dataset, column: &str) -> Vec<Option<String>> {
        ds.iter()
            .map(|r| r.get(column).map(str::to_string))
            .collect()
    }

    #[test]
    fn test_parse_simple() {
        let ds = parse("a,b\n1,2\n3,4");
        assert_eq!(ds.columns(), ["a", "b"]);
        assert_eq!(
            ds.records(),
            [
                Record::from_pairs([("a", "1"), ("b", "2")]),
                Record::from_pairs([("a", "3"), ("b", "4")]),
            ]
        );
    }

    #[test]
    fn test_quoted_delimiter_and_newline() {
        let ds = parse("a,b\n\"x,y\nz\",2");
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.records()[0].get("a"), Some("x,y\nz"));
        assert_eq!(ds.records()[0].get("b"), Some("2"));
    }

    #[test]
    fn test_doubled_quote() {
        let ds = parse("a\n\"he said \"\"hi\"\"\"");
        assert_eq!(ds.records()[0].get("a"), Some("he said \"hi\""));
    }

    #[test]
    fn test_crlf_matches_lf() {
        assert_eq!(parse("a\r\n1\r\n2"), parse("a\n1\n2"));
        assert_eq!(parse("a\r\n1\r\n2").len(), 2);
    }

    #[test]
    fn test_bare_cr_ends_row() {
        assert_eq!(parse_rows("a\r1\r2", ','), vec![vec!["a"], vec!["1"], vec!["2"]]);
    }

    #[test]
    fn test_trailing_newline_is_not_a_row() {
        assert_eq!(parse_rows("a,b\n1,2\n", ','), vec![vec!["a", "b"], vec!["1", "2"]]);
        assert_eq!(parse("a,b\n1,2\r\n").len(), 1);
    }

    #[test]
    fn test_trailing_delimiter_keeps_empty_field() {
        assert_eq!(parse_rows("a,", ','), vec![vec!["a", ""]]);
    }

    #[test]
    fn test_unterminated_quote_is_flushed() {
        assert_eq!(parse_rows("a\n\"xyz", ','), vec![vec!["a"], vec!["xyz"]]);
        assert_eq!(parse_rows("a\n\"", ','), vec![vec!["a"], vec![""]]);
        assert_eq!(parse_rows("a\n\"x\ny", ','), vec![vec!["a"], vec!["x\ny"]]);
    }

    #[test]
    fn test_quote_opens_mid_field() {
        assert_eq!(parse_rows("ab\"c,d\"e", ','), vec![vec!["abc,de"]]);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_rows("", ',').is_empty());
        let ds = parse("");
        assert!(ds.is_empty());
        assert!(ds.columns().is_empty());
    }

    #[test]
    fn test_header_only() {
        let ds = parse("a,b\n");
        assert_eq!(ds.columns(), ["a", "b"]);
        assert!(ds.is_empty());
    }

    #[test]
    fn test_custom_delimiter() {
        let ds = decode("a;b\n1,5;2", &DecodeOptions::new().delimiter(';'));
        assert_eq!(ds.records()[0].get("a"), Some("1,5"));
        assert_eq!(ds.records()[0].get("b"), Some("2"));

        let tsv = decode("a\tb\nx\ty", &DecodeOptions::new().delimiter('\t'));
        assert_eq!(values(&tsv, "b"), vec![Some("y".to_string())]);
    }

    #[test]
    fn test_short_row_omits_missing() {
        let ds = parse("a,b,c\n1");
        let r = &ds.records()[0];
        assert_eq!(r.get("a"), Some("1"));
        assert_eq!(r.get("b"), None);
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn test_short_row_fill_empty() {
        let ds = decode(
            "a,b,c\n1",
            &DecodeOptions::new().ragged(RaggedPolicy::FillEmpty),
        );
        let r = &ds.records()[0];
        assert_eq!(r.get("b"), Some(""));
        assert_eq!(r.get("c"), Some(""));
    }

    #[test]
    fn test_long_row_drops_extra() {
        let ds = parse("a\n1,2,3");
        assert_eq!(ds.records()[0], Record::from_pairs([("a", "1")]));
    }

    #[test]
    fn test_blank_middle_line() {
        let ds = parse("a,b\n1,2\n\n3,4");
        assert_eq!(
            values(&ds, "a"),
            vec![Some("1".into()), Some("".into()), Some("3".into())]
        );

        let skipped = decode("a,b\n1,2\n\n3,4", &DecodeOptions::new().skip_blank_lines(true));
        assert_eq!(skipped.len(), 2);
    }

    #[test]
    fn test_duplicate_header_column() {
        let ds = parse("a,a\n1,2");
        assert_eq!(ds.columns(), ["a"]);
        assert_eq!(ds.records()[0].get("a"), Some("2"));
    }

    #[test]
    fn test_duplicate_header_column_short_row() {
        // The later `a` has no field in this row, so it leaves the column out.
        let ds = parse("a,b,a\n1,2");
        assert_eq!(ds.columns(), ["a", "b"]);
        assert_eq!(ds.records()[0].get("a"), None);
        assert_eq!(ds.records()[0].get("b"), Some("2"));

        let filled = decode("a,b,a\n1,2", &DecodeOptions::new().ragged(RaggedPolicy::FillEmpty));
        assert_eq!(filled.records()[0].get("a"), Some(""));
    }

    #[test]
    fn test_wide_header_decodes_every_column() {
        let width = 5000;
        let header: Vec<String> = (0..width).map(|i| format!("c{i}")).collect();
        let row: Vec<String> = (0..width).map(|i| i.to_string()).collect();
        let text = format!("{}\n{}\n{}\n", header.join(","), row.join(","), row.join(","));

        let ds = parse(&text);
        assert_eq!(ds.columns().len(), width);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.records()[1].len(), width);
        assert_eq!(ds.records()[1].get("c0"), Some("0"));
        assert_eq!(ds.records()[1].get("c4999"), Some("4999"));
    }

    #[test]
    fn test_decode_is_deterministic() {
        let text = "x,\"y\nz\"\r\n1,\"2\"\"\"\n\"open";
        assert_eq!(parse(text), parse(text));
    }

    #[test]
    fn test_encode_quotes_when_needed() {
        let ds = Dataset::new(
            vec!["name".into(), "note".into()],
            vec![Record::from_pairs([("name", "a,b"), ("note", "say \"hi\"\nnow")])],
        );
        assert_eq!(
            encode(&ds, ','),
            "name,note\n\"a,b\",\"say \"\"hi\"\"\nnow\"\n"
        );
    }

    #[test]
    fn test_encode_missing_field_is_empty() {
        let ds = parse("a,b\n1");
        assert_eq!(encode(&ds, ','), "a,b\n1,\n");
    }

    #[test]
    fn test_encode_then_decode() {
        let text = "id,label\n1,\"x,y\"\n2,\"line\nbreak\"\n3,\"q\"\"uote\"\n";
        let ds = parse(text);
        assert_eq!(parse(&encode(&ds, ',')), ds);
        assert_eq!(encode(&ds, ','), text);
    }
}
