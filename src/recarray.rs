//! Columnar record collections.
//!
//! A [`RecArray`] keeps one homogeneously typed [`Column`] per field name.
//! Integers are always `i64`, the width SQLite itself uses.

use std::collections::HashSet;

use crate::error::{RecsqlError, Result};
use crate::value::{Kind, Record, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Float,
    Boolean,
    Text,
    Object,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Integer(Vec<i64>),
    Float(Vec<f64>),
    Boolean(Vec<bool>),
    Text(Vec<String>),
    Object(Vec<Value>),
}

impl Column {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Column::Integer(_) => ColumnType::Integer,
            Column::Float(_) => ColumnType::Float,
            Column::Boolean(_) => ColumnType::Boolean,
            Column::Text(_) => ColumnType::Text,
            Column::Object(_) => ColumnType::Object,
        }
    }
    pub fn len(&self) -> usize {
        match self {
            Column::Integer(v) => v.len(),
            Column::Float(v) => v.len(),
            Column::Boolean(v) => v.len(),
            Column::Text(v) => v.len(),
            Column::Object(v) => v.len(),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn get(&self, row: usize) -> Option<Value> {
        match self {
            Column::Integer(v) => v.get(row).map(|i| Value::Integer(*i)),
            Column::Float(v) => v.get(row).map(|f| Value::Float(*f)),
            Column::Boolean(v) => v.get(row).map(|b| Value::Bool(*b)),
            Column::Text(v) => v.get(row).map(|s| Value::Text(s.clone())),
            Column::Object(v) => v.get(row).cloned(),
        }
    }
    fn build(column_type: ColumnType, values: Vec<Value>) -> Column {
        match column_type {
            ColumnType::Integer => Column::Integer(values.iter().filter_map(Value::as_i64).collect()),
            ColumnType::Float => Column::Float(values.iter().filter_map(Value::as_f64).collect()),
            ColumnType::Boolean => Column::Boolean(
                values
                    .iter()
                    .filter_map(|v| match v {
                        Value::Bool(b) => Some(*b),
                        _ => None,
                    })
                    .collect(),
            ),
            ColumnType::Text => Column::Text(
                values
                    .into_iter()
                    .filter_map(|v| match v {
                        Value::Text(s) => Some(s),
                        _ => None,
                    })
                    .collect(),
            ),
            ColumnType::Object => Column::Object(values),
        }
    }
}

/// Column typing rules. Strict typing promotes mixed integers and floats to
/// floats, lenient typing only accepts an exact common kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Typing {
    Strict,
    Lenient,
}

fn scalar_type(kind: Kind) -> ColumnType {
    match kind {
        Kind::Integer => ColumnType::Integer,
        Kind::Float => ColumnType::Float,
        Kind::Bool => ColumnType::Boolean,
        Kind::Text => ColumnType::Text,
        Kind::Null | Kind::Blob | Kind::Sequence => ColumnType::Object,
    }
}

fn column_type<'a>(mut values: impl Iterator<Item = &'a Value>, typing: Typing) -> ColumnType {
    let first = match values.next() {
        Some(v) => v.kind(),
        None => return ColumnType::Object,
    };
    let mut numeric = matches!(first, Kind::Integer | Kind::Float);
    let mut uniform = true;
    for value in values {
        let kind = value.kind();
        if kind != first {
            uniform = false;
        }
        if !matches!(kind, Kind::Integer | Kind::Float) {
            numeric = false;
        }
    }
    if uniform {
        scalar_type(first)
    } else if typing == Typing::Strict && numeric {
        ColumnType::Float
    } else {
        ColumnType::Object
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecArray {
    names: Vec<String>,
    columns: Vec<Column>,
    rows: usize,
}

impl RecArray {
    /// Builds the columnar form of `records`.
    ///
    /// Fails when the names are not unique, when a record does not have one
    /// value per name, or when a record holds a composite (sequence) value.
    pub fn from_records<S: AsRef<str>>(records: Vec<Record>, names: &[S]) -> Result<RecArray> {
        Self::check(&records, names, Typing::Strict)?;
        Ok(Self::build(records, names, Typing::Strict))
    }

    /// Like [`RecArray::from_records`] but accepts composite values: a column
    /// whose rows do not all share one kind becomes an `Object` column.
    pub fn from_records_lenient<S: AsRef<str>>(records: Vec<Record>, names: &[S]) -> Result<RecArray> {
        Self::check(&records, names, Typing::Lenient)?;
        Ok(Self::build(records, names, Typing::Lenient))
    }

    fn check<S: AsRef<str>>(records: &[Record], names: &[S], typing: Typing) -> Result<()> {
        let mut seen = HashSet::new();
        for name in names {
            if !seen.insert(name.as_ref().to_lowercase()) {
                return Err(RecsqlError::Validation(format!(
                    "duplicate field name '{}'",
                    name.as_ref()
                )));
            }
        }
        for (i, record) in records.iter().enumerate() {
            if record.len() != names.len() {
                return Err(RecsqlError::Validation(format!(
                    "record {} has {} values but there are {} fields",
                    i,
                    record.len(),
                    names.len()
                )));
            }
            if typing == Typing::Strict {
                if let Some(col) = record.iter().position(|v| matches!(v, Value::Sequence(_))) {
                    return Err(RecsqlError::Validation(format!(
                        "record {} holds a composite value in field '{}'",
                        i,
                        names[col].as_ref()
                    )));
                }
            }
        }
        Ok(())
    }

    fn build<S: AsRef<str>>(records: Vec<Record>, names: &[S], typing: Typing) -> RecArray {
        let rows = records.len();
        let types: Vec<ColumnType> = (0..names.len())
            .map(|c| column_type(records.iter().map(|r| &r[c]), typing))
            .collect();
        let mut values: Vec<Vec<Value>> = (0..names.len()).map(|_| Vec::with_capacity(rows)).collect();
        for record in records {
            for (c, value) in record.into_iter().enumerate() {
                values[c].push(value);
            }
        }
        let columns = types
            .into_iter()
            .zip(values)
            .map(|(t, v)| Column::build(t, v))
            .collect();
        RecArray {
            names: names.iter().map(|n| n.as_ref().to_owned()).collect(),
            columns,
            rows,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
    pub fn len(&self) -> usize {
        self.rows
    }
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
    pub fn dtype(&self) -> Vec<(&str, ColumnType)> {
        self.names
            .iter()
            .zip(&self.columns)
            .map(|(n, c)| (n.as_str(), c.column_type()))
            .collect()
    }
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.columns[i])
    }
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }
    pub fn get(&self, row: usize, column: usize) -> Option<Value> {
        self.columns.get(column).and_then(|c| c.get(row))
    }
    pub fn record(&self, row: usize) -> Option<Record> {
        if row >= self.rows {
            return None;
        }
        self.columns.iter().map(|c| c.get(row)).collect()
    }
    pub fn records(&self) -> Vec<Record> {
        (0..self.rows).filter_map(|r| self.record(r)).collect()
    }
}

/// What a query hands back: typed columns when they could be built, plain
/// records otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Typed(RecArray),
    Rows(Vec<Record>),
}

impl QueryResult {
    pub fn len(&self) -> usize {
        match self {
            QueryResult::Typed(a) => a.len(),
            QueryResult::Rows(r) => r.len(),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn is_typed(&self) -> bool {
        matches!(self, QueryResult::Typed(_))
    }
    pub fn typed(&self) -> Option<&RecArray> {
        match self {
            QueryResult::Typed(a) => Some(a),
            QueryResult::Rows(_) => None,
        }
    }
    pub fn get(&self, row: usize, column: usize) -> Option<Value> {
        match self {
            QueryResult::Typed(a) => a.get(row, column),
            QueryResult::Rows(r) => r.get(row).and_then(|rec| rec.get(column)).cloned(),
        }
    }
    pub fn records(&self) -> Vec<Record> {
        match self {
            QueryResult::Typed(a) => a.records(),
            QueryResult::Rows(r) => r.clone(),
        }
    }
    pub fn into_records(self) -> Vec<Record> {
        match self {
            QueryResult::Typed(a) => a.records(),
            QueryResult::Rows(r) => r,
        }
    }

    /// Typed columns when `records` allow it, the untouched records when not.
    pub(crate) fn typed_or_rows<S: AsRef<str>>(records: Vec<Record>, names: &[S]) -> QueryResult {
        match RecArray::check(&records, names, Typing::Strict) {
            Ok(()) => QueryResult::Typed(RecArray::build(records, names, Typing::Strict)),
            Err(e) => {
                tracing::debug!(reason = %e, "returning untyped rows");
                QueryResult::Rows(records)
            }
        }
    }
}
