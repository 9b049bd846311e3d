//! Reads a CSV file into the `(tablename, names, records)` triple a table is
//! built from.
//!
//! The first row always holds the column names. Rows whose fields are all
//! empty are skipped, and every other field goes through a [`Converter`].

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::convert::Converter;
use crate::error::Result;
use crate::value::Record;

pub const DEFAULT_TABLENAME: &str = "CSV";

#[derive(Debug, Clone, PartialEq)]
pub struct CsvTable {
    pub tablename: String,
    pub names: Vec<String>,
    pub records: Vec<Record>,
}

pub fn read_csv<R: Read>(reader: R, converter: &Converter) -> Result<CsvTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let mut rows = reader.records();

    let names = match rows.next() {
        Some(header) => header?
            .iter()
            .enumerate()
            .map(|(i, name)| make_identifier(name, i))
            .collect(),
        None => Vec::new(),
    };

    let mut records = Vec::new();
    for row in rows {
        let row = row?;
        if row.iter().all(str::is_empty) {
            continue;
        }
        records.push(row.iter().map(|field| converter.convert(field)).collect());
    }

    Ok(CsvTable {
        tablename: DEFAULT_TABLENAME.to_owned(),
        names,
        records,
    })
}

pub fn parse_file<P: AsRef<Path>>(path: P, converter: &Converter) -> Result<CsvTable> {
    read_csv(File::open(path)?, converter)
}

/// Turns a header field into something usable as a column name: characters
/// outside `[A-Za-z0-9_]` become `_`, a leading digit gets an `N` prefix and
/// an empty header is replaced by the column index.
pub fn make_identifier(name: &str, index: usize) -> String {
    let name = if name.is_empty() {
        index.to_string()
    } else {
        name.to_owned()
    };
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if cleaned.starts_with(|c: char| c.is_ascii_digit()) {
        format!("N{}", cleaned)
    } else {
        cleaned
    }
}
