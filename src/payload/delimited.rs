//! Delimited text parsing for payload files.
//!
//! Rows always come back as sequences of strings. With `columns: true` the
//! first row is read as the header and left out of the result; ragged rows
//! are rejected unless `relaxColumnCount` is set.

use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Parse options accepted under a payload descriptor's `options` key.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CsvOptions {
    pub delimiter: Option<char>,
    pub columns: bool,
    pub from_line: Option<usize>,
    pub skip_empty_lines: bool,
    pub trim: bool,
    pub comment: Option<char>,
    pub quote: Option<char>,
    pub relax_column_count: bool,
}

impl CsvOptions {
    pub fn from_map(options: &Map<String, Value>) -> Result<Self, String> {
        let parsed = CsvOptions::deserialize(Value::Object(options.clone())).map_err(|e| e.to_string())?;
        for (key, c) in [
            ("delimiter", parsed.delimiter),
            ("comment", parsed.comment),
            ("quote", parsed.quote),
        ] {
            if let Some(c) = c {
                if !c.is_ascii() {
                    return Err(format!("{key} must be a single ASCII character, got '{c}'"));
                }
            }
        }
        if parsed.from_line == Some(0) {
            return Err("fromLine is 1-based".to_string());
        }
        Ok(parsed)
    }
}

pub fn parse_rows(text: &str, options: &CsvOptions) -> Result<Vec<Vec<String>>, csv::Error> {
    let mut builder = ReaderBuilder::new();
    builder
        .has_headers(options.columns)
        .flexible(options.relax_column_count)
        .trim(if options.trim { Trim::All } else { Trim::None })
        .comment(options.comment.map(|c| c as u8));
    if let Some(delimiter) = options.delimiter {
        builder.delimiter(delimiter as u8);
    }
    if let Some(quote) = options.quote {
        builder.quote(quote as u8);
    }

    let source = skip_lines(text, options.from_line.unwrap_or(1).saturating_sub(1));
    let mut reader = builder.from_reader(source.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if options.skip_empty_lines && record.iter().all(str::is_empty) {
            continue;
        }
        rows.push(record.iter().map(str::to_owned).collect());
    }
    Ok(rows)
}

fn skip_lines(text: &str, count: usize) -> &str {
    let mut rest = text;
    for _ in 0..count {
        match rest.find('\n') {
            Some(i) => rest = &rest[i + 1..],
            None => return "",
        }
    }
    rest
}
