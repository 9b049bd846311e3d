//! Parser for a single reStructuredText "simple table" with a name.
//!
//! The table must look like this (everything in angle brackets varies):
//!
//! ```text
//! Table[<name>]: <caption>
//! =============  ==========  =========
//! <field>        <field>     <field>
//! =============  ==========  =========
//! <value>        <value>     <value>
//! ...
//! =============  ==========  =========
//! ```
//!
//! All three rules must be identical apart from trailing whitespace. Each run
//! of `=` marks the character range of one field, and data is only read from
//! inside those ranges. Rows must fit on one line; lines made of whitespace
//! and dashes are skipped. Field names must be single words.
//!
//! ```
//! use recsql::convert::Converter;
//! use recsql::text_table;
//! let text = "Table[t]: demo\n===  ===\na    b\n===  ===\n1    x\n===  ===\n";
//! let parsed = text_table::parse(text, &Converter::default()).unwrap();
//! assert_eq!(parsed.tablename, "t");
//! assert_eq!(parsed.names, vec!["a", "b"]);
//! ```

use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use crate::convert::Converter;
use crate::error::{RecsqlError, Result};
use crate::recarray::RecArray;
use crate::value::Record;

lazy_static! {
    static ref TABLE: Regex = Regex::new(concat!(
        r"(?ms)",
        r"^[ \t]*Table(?:\[(?P<name>\w*)\])?:[ \t]*(?P<title>[^\n]*?)[ \t]*$",
        r"\n+",
        r"^(?P<toprule>[ \t]*==+[ \t=]+)[ \t]*$",
        r"\n+",
        r"^(?P<fields>[\w \t]+?)$",
        r"\n+",
        r"^(?P<midrule>[ \t]*==+[ \t=]+)[ \t]*$",
        r"\n+",
        r"(?P<data>.*?)",
        r"\n+",
        r"^(?P<botrule>[ \t]*==+[ \t=]+)[ \t]*$",
    ))
    .unwrap();
    static ref EMPTY_ROW: Regex = Regex::new(r"^[-\s]*$").unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTable {
    /// Empty when the header has no `[name]`.
    pub tablename: String,
    pub caption: String,
    pub names: Vec<String>,
    /// Inclusive `(first, last)` character columns of each field.
    pub fields: Vec<(usize, usize)>,
    pub records: Vec<Record>,
}

impl ParsedTable {
    /// Typed columns for the records. Fields that hold composite values in
    /// some rows become object columns.
    pub fn recarray(&self) -> Result<RecArray> {
        RecArray::from_records(self.records.clone(), &self.names)
            .or_else(|_| RecArray::from_records_lenient(self.records.clone(), &self.names))
    }
}

pub fn parse(text: &str, converter: &Converter) -> Result<ParsedTable> {
    let text = text.replace("\r\n", "\n");
    let captures = TABLE
        .captures(&text)
        .ok_or_else(|| RecsqlError::parse("table cannot be parsed"))?;
    let group = |name: &str| captures.name(name).map(|m| m.as_str()).unwrap_or("");

    let (names, fields) = parse_fields(
        group("toprule"),
        group("midrule"),
        group("botrule"),
        group("fields"),
    )?;

    let mut records = Vec::new();
    for line in group("data").split('\n') {
        if EMPTY_ROW.is_match(line) {
            continue;
        }
        let chars: Vec<char> = line.chars().collect();
        let record: Record = fields
            .iter()
            .map(|&(first, last)| converter.convert(&slice(&chars, first, last)))
            .collect();
        records.push(record);
    }

    Ok(ParsedTable {
        tablename: group("name").to_owned(),
        caption: group("title").to_owned(),
        names,
        fields,
        records,
    })
}

pub fn parse_file<P: AsRef<Path>>(path: P, converter: &Converter) -> Result<ParsedTable> {
    let text = std::fs::read_to_string(path)?;
    parse(&text, converter)
}

/// Names and character ranges of the fields, taken from the rules.
fn parse_fields(
    toprule: &str,
    midrule: &str,
    botrule: &str,
    header: &str,
) -> Result<(Vec<String>, Vec<(usize, usize)>)> {
    // leading whitespace stays, it shifts the columns
    let rule = toprule.trim_end();
    if rule != midrule.trim_end() || rule != botrule.trim_end() {
        return Err(RecsqlError::parse(
            "rules differ from each other (check white space)",
        ));
    }
    let names: Vec<String> = header.split_whitespace().map(str::to_owned).collect();
    let nfields = rule.split_whitespace().count();
    if nfields != names.len() {
        return Err(count_mismatch(names.len(), nfields));
    }

    let chars: Vec<char> = rule.chars().collect();
    let mut fields = Vec::with_capacity(nfields);
    let mut is_field = rule.starts_with('=');
    let mut first = 0;
    for (c, &ch) in chars.iter().enumerate() {
        if !is_field && ch == '=' {
            first = c;
            is_field = true;
        }
        if is_field && (ch == ' ' || c == chars.len() - 1) {
            fields.push((first, c));
            is_field = false;
        }
    }
    if fields.len() != names.len() {
        return Err(count_mismatch(names.len(), fields.len()));
    }
    Ok((names, fields))
}

fn count_mismatch(names: usize, fields: usize) -> RecsqlError {
    RecsqlError::parse(format!(
        "count mismatch: number of field names ({}) does not match number of fields ({})",
        names, fields
    ))
}

/// Characters `first..=last` of a line; short lines give a short or empty slice.
fn slice(chars: &[char], first: usize, last: usize) -> String {
    let end = (last + 1).min(chars.len());
    let start = first.min(end);
    chars[start..end].iter().collect()
}
