//! Writes typed record collections out as CSV or as a LaTeX `tabular`.

use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::recarray::RecArray;
use crate::value::Value;

fn render(value: &Value, empty: &str) -> String {
    match value {
        Value::Null => empty.to_owned(),
        other => other.to_string(),
    }
}

/// Header row with the field names, then one row per record. Nulls are
/// written as empty fields.
pub fn rec2csv<P: AsRef<Path>>(array: &RecArray, path: P) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(array.names())?;
    for record in array.records() {
        writer.write_record(record.iter().map(|v| render(v, "")))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn rec2latex<P: AsRef<Path>>(array: &RecArray, path: P, empty: &str) -> Result<()> {
    fs::write(path, s_rec2latex(array, empty))?;
    Ok(())
}

/// One centered column per field; nulls are replaced by `empty`.
pub fn s_rec2latex(array: &RecArray, empty: &str) -> String {
    let mut latex = String::new();
    latex.push_str(&format!("\\begin{{tabular}}{{{}}}\n", "c".repeat(array.names().len())));
    latex.push_str("\\hline\n");
    latex.push_str(&array.names().join(" & "));
    latex.push_str("\\\\\n\\hline\n");
    for record in array.records() {
        let row: Vec<String> = record.iter().map(|v| render(v, empty)).collect();
        latex.push_str(&row.join(" & "));
        latex.push_str("\\\\\n");
    }
    latex.push_str("\\hline\n\\end{tabular}\n");
    latex
}
