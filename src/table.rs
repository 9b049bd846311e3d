//! Table handles: a named relation in a [`Store`] together with a private
//! cache of query results.
//!
//! Every query string may use `__self__` for the table's own name. Results
//! come back as a [`QueryResult`], typed where the rows allow it.
//!
//! ```
//! use recsql::{Store, Table, TableOptions, Value};
//! let store = Store::open_in_memory().unwrap();
//! let mut t = Table::create(
//!     &store,
//!     "points",
//!     &["x", "y"],
//!     vec![vec![Value::from(1), Value::from(2.5)]],
//!     TableOptions::default(),
//! )
//! .unwrap();
//! let r = t.sql("SELECT x FROM __self__ WHERE y > 2").unwrap();
//! assert_eq!(r.get(0, 0), Some(Value::Integer(1)));
//! t.close().unwrap();
//! ```

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use rusqlite::{params_from_iter, Statement};
use tracing::{debug, info, warn};

use crate::cache::QueryCache;
use crate::convert::{Converter, Mode};
use crate::csv_table;
use crate::error::{RecsqlError, Result};
use crate::recarray::{QueryResult, RecArray};
use crate::settings::DEFAULT_CACHE_SIZE;
use crate::store::{quote_identifier, Store, MASTER_TABLE, MERGE_TABLE, SELF_ALIAS};
use crate::text_table;
use crate::value::{OpaqueType, Record, Value};

lazy_static! {
    // positional or named parameters; such queries are never cached
    static ref PLACEHOLDER: Regex = Regex::new(r"\?|[:@$][A-Za-z_]").unwrap();
    static ref SELECT_FROM: Regex = Regex::new(r"(?is)^\s*SELECT.*FROM").unwrap();
}

const COUNT_ROWS: &str = "SELECT COUNT() AS length FROM __self__";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableOptions {
    /// Number of query results the handle keeps.
    pub cache_size: NonZeroUsize,
}

impl Default for TableOptions {
    fn default() -> Self {
        TableOptions {
            cache_size: NonZeroUsize::new(DEFAULT_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

/// How [`Table::from_file`] reads a file.
#[derive(Debug, Clone)]
pub struct FileOptions {
    /// Overrides the name found in the file.
    pub name: Option<String>,
    pub converter: Converter,
}

impl Default for FileOptions {
    fn default() -> Self {
        // fields are never split when reading files
        FileOptions {
            name: None,
            converter: Converter::new(Mode::Singlet),
        }
    }
}

/// Name and decoding of one result column.
struct ColumnSpec {
    name: String,
    opaque: Option<OpaqueType>,
}

/// `name [Object]` style aliases select opaque decoding for computed columns.
fn split_opaque_suffix(name: &str) -> (String, Option<OpaqueType>) {
    if let Some(stripped) = name.trim_end().strip_suffix(']') {
        if let Some(open) = stripped.rfind('[') {
            if let Some(opaque) = OpaqueType::from_declared(&stripped[open + 1..]) {
                return (stripped[..open].trim_end().to_owned(), Some(opaque));
            }
        }
    }
    (name.to_owned(), None)
}

/// Every non-null value of an opaque column is stored as JSON text, so that
/// decoding gives back scalars like `"42"` or `"true"` unchanged.
fn encode_opaque(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        other => Value::Text(other.to_json().to_string()),
    }
}

fn column_specs(statement: &Statement<'_>) -> Vec<ColumnSpec> {
    statement
        .columns()
        .into_iter()
        .map(|column| {
            let (name, suffix) = split_opaque_suffix(column.name());
            let opaque = suffix.or_else(|| column.decl_type().and_then(OpaqueType::from_declared));
            ColumnSpec { name, opaque }
        })
        .collect()
}

/// A bare condition becomes `SELECT * FROM __self__ WHERE <condition>`.
fn wrap_select(expression: &str) -> String {
    if SELECT_FROM.is_match(expression) {
        expression.to_owned()
    } else {
        format!("SELECT * FROM {} WHERE {}", SELF_ALIAS, expression)
    }
}

fn check_name(name: &str, staging: bool) -> Result<()> {
    if name.is_empty() {
        return Err(RecsqlError::Validation("table name must not be empty".to_owned()));
    }
    if name == MASTER_TABLE || name == SELF_ALIAS || (name == MERGE_TABLE && !staging) {
        return Err(RecsqlError::Validation(format!(
            "name = {} is reserved, choose another one",
            name
        )));
    }
    Ok(())
}

fn check_columns<S: AsRef<str>>(columns: &[S], records: &[Record]) -> Result<()> {
    if columns.is_empty() {
        return Err(RecsqlError::Validation("a table needs at least one column".to_owned()));
    }
    let mut seen = HashSet::new();
    for column in columns {
        let column = column.as_ref();
        if column.trim().is_empty() {
            return Err(RecsqlError::Validation("column names must not be empty".to_owned()));
        }
        if column.eq_ignore_ascii_case(SELF_ALIAS) {
            return Err(RecsqlError::Validation(format!(
                "column name {} is reserved",
                SELF_ALIAS
            )));
        }
        if !seen.insert(column.to_lowercase()) {
            return Err(RecsqlError::Validation(format!(
                "duplicate column name '{}'",
                column
            )));
        }
    }
    if let Some((i, record)) = records
        .iter()
        .enumerate()
        .find(|(_, r)| r.len() != columns.len())
    {
        return Err(RecsqlError::Validation(format!(
            "record {} has {} values but there are {} columns",
            i,
            record.len(),
            columns.len()
        )));
    }
    Ok(())
}

// ------------- Table -------------
#[derive(Debug)]
pub struct Table {
    name: String,
    columns: Vec<String>,
    store: Store,
    cache: QueryCache<QueryResult>,
    closed: bool,
}

impl Table {
    /// Binds to a relation that already exists in `store`.
    pub fn open(store: &Store, name: &str, options: TableOptions) -> Result<Table> {
        check_name(name, false)?;
        let existing = store.with_connection(|c| {
            let statement = c.prepare(&format!("SELECT * FROM {} WHERE 0", quote_identifier(name)))?;
            let columns: Vec<String> = statement
                .column_names()
                .into_iter()
                .map(str::to_owned)
                .collect();
            Ok(columns)
        });
        let columns = match existing {
            Ok(columns) => columns,
            Err(RecsqlError::Store(e)) if e.to_string().contains("no such table") => {
                let tables = store.table_names()?;
                return Err(RecsqlError::Validation(format!(
                    "provide the name of an existing table, not '{}'; this database contains tables {:?}",
                    name, tables
                )));
            }
            Err(e) => return Err(e),
        };
        store.add_connection_counter(1)?;
        debug!(table = name, columns = columns.len(), "bound to existing table");
        Ok(Table::handle(store, name, columns, options))
    }

    /// Creates the relation `name` and loads `records` into it.
    pub fn create<S: AsRef<str>>(
        store: &Store,
        name: &str,
        columns: &[S],
        records: Vec<Record>,
        options: TableOptions,
    ) -> Result<Table> {
        Table::materialize(store, name, columns, records, options, false)
    }

    pub fn from_recarray(
        store: &Store,
        name: &str,
        array: &RecArray,
        options: TableOptions,
    ) -> Result<Table> {
        Table::create(store, name, array.names(), array.records(), options)
    }

    /// Parses a text table and loads it under the name from its `Table[name]` header.
    pub fn from_text(
        store: &Store,
        text: &str,
        converter: &Converter,
        options: TableOptions,
    ) -> Result<Table> {
        let parsed = text_table::parse(text, converter)?;
        if parsed.tablename.is_empty() {
            return Err(RecsqlError::Validation(
                "the text table has no name, use a 'Table[name]: caption' header".to_owned(),
            ));
        }
        Table::create(store, &parsed.tablename, &parsed.names, parsed.records, options)
    }

    /// Loads a file, picking the reader from its suffix: `rst` and `txt` are
    /// text tables, `csv` is comma separated.
    pub fn from_file<P: AsRef<Path>>(
        store: &Store,
        path: P,
        file_options: &FileOptions,
        options: TableOptions,
    ) -> Result<Table> {
        let path = path.as_ref();
        let suffix = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        let (tablename, names, records) = match suffix.as_str() {
            "rst" | "txt" => {
                let parsed = text_table::parse_file(path, &file_options.converter)?;
                (parsed.tablename, parsed.names, parsed.records)
            }
            "csv" => {
                let parsed = csv_table::parse_file(path, &file_options.converter)?;
                (parsed.tablename, parsed.names, parsed.records)
            }
            other => {
                return Err(RecsqlError::Validation(format!(
                    "cannot read '{}': unknown file suffix '{}' (expected rst, txt or csv)",
                    path.display(),
                    other
                )));
            }
        };
        let name = file_options.name.clone().unwrap_or(tablename);
        Table::create(store, &name, &names, records, options)
    }

    fn handle(store: &Store, name: &str, columns: Vec<String>, options: TableOptions) -> Table {
        Table {
            name: name.to_owned(),
            columns,
            store: store.clone(),
            cache: QueryCache::new(options.cache_size),
            closed: false,
        }
    }

    fn materialize<S: AsRef<str>>(
        store: &Store,
        name: &str,
        columns: &[S],
        records: Vec<Record>,
        options: TableOptions,
        staging: bool,
    ) -> Result<Table> {
        check_name(name, staging)?;
        check_columns(columns, &records)?;

        // columns holding composite values are declared opaque so they decode on the way out
        let opaque: Vec<bool> = (0..columns.len())
            .map(|c| records.iter().any(|r| matches!(r[c], Value::Sequence(_))))
            .collect();
        let definitions: Vec<String> = columns
            .iter()
            .zip(&opaque)
            .map(|(column, &opaque)| {
                let quoted = quote_identifier(column.as_ref());
                if opaque {
                    format!("{} {}", quoted, OpaqueType::OBJECT)
                } else {
                    quoted
                }
            })
            .collect();
        let quoted: Vec<String> = columns
            .iter()
            .map(|c| quote_identifier(c.as_ref()))
            .collect();
        let create = format!(
            "CREATE {}TABLE {} ({})",
            if staging { "TEMPORARY " } else { "" },
            quote_identifier(name),
            definitions.join(", ")
        );
        let insert = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(name),
            quoted.join(", "),
            vec!["?"; columns.len()].join(", ")
        );

        store.with_connection(|c| {
            let tx = c.unchecked_transaction()?;
            tx.execute_batch(&create)?;
            {
                let mut statement = tx.prepare(&insert)?;
                for record in &records {
                    let encoded = record.iter().zip(&opaque).map(|(value, &opaque)| {
                        if opaque { encode_opaque(value) } else { value.clone() }
                    });
                    statement.execute(params_from_iter(encoded))?;
                }
            }
            tx.commit()?;
            Ok(())
        })?;
        store.add_connection_counter(1)?;
        info!(table = name, rows = records.len(), temporary = staging, "created table");

        let columns = columns.iter().map(|c| c.as_ref().to_owned()).collect();
        Ok(Table::handle(store, name, columns, options))
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
    pub fn ncol(&self) -> usize {
        self.columns.len()
    }
    pub fn store(&self) -> &Store {
        &self.store
    }
    pub fn cache(&self) -> &QueryCache<QueryResult> {
        &self.cache
    }
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(RecsqlError::Closed)
        } else {
            Ok(())
        }
    }

    /// Runs `sql` against the store.
    ///
    /// Results of parameter-free queries are cached under the query text when
    /// `use_cache` is set. Any statement that changed rows, or that mentions
    /// `DELETE`, empties the cache. An empty result is always returned as
    /// untyped rows and never cached. With `as_typed` the rows are turned
    /// into a [`RecArray`] when possible.
    pub fn execute(
        &mut self,
        sql: &str,
        params: Option<&[Value]>,
        as_typed: bool,
        use_cache: bool,
    ) -> Result<QueryResult> {
        self.ensure_open()?;
        let sql = sql.replace(SELF_ALIAS, &self.name);
        let cacheable = use_cache && params.is_none() && !PLACEHOLDER.is_match(&sql);
        if cacheable {
            if let Some(hit) = self.cache.get(&sql) {
                debug!(table = %self.name, query = %sql, "query cache hit");
                return Ok(hit.clone());
            }
        }

        let (names, records, changed) = self.run(&sql, params)?;
        if changed || sql.to_uppercase().contains("DELETE") {
            if !self.cache.is_empty() {
                debug!(table = %self.name, entries = self.cache.len(), "query cache invalidated");
            }
            self.cache.clear();
        }
        if records.is_empty() {
            return Ok(QueryResult::Rows(Vec::new()));
        }

        let result = if as_typed {
            QueryResult::typed_or_rows(records, &names)
        } else {
            QueryResult::Rows(records)
        };
        if cacheable {
            self.cache.insert(sql, result.clone());
        }
        Ok(result)
    }

    fn run(&self, sql: &str, params: Option<&[Value]>) -> Result<(Vec<String>, Vec<Record>, bool)> {
        self.store.with_connection(|c| {
            let mut statement = c.prepare(sql)?;
            let specs = column_specs(&statement);
            let readonly = statement.readonly();
            let mut rows = match params {
                Some(params) => statement.query(params_from_iter(params.iter()))?,
                None => statement.query([])?,
            };
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                let mut record = Vec::with_capacity(specs.len());
                for (i, spec) in specs.iter().enumerate() {
                    let raw = row.get_ref(i)?;
                    record.push(match spec.opaque {
                        Some(opaque) => opaque.decode(raw),
                        None => Value::convert(raw),
                    });
                }
                records.push(record);
            }
            drop(rows);
            let changed = !readonly && c.changes() > 0;
            let names = specs.into_iter().map(|s| s.name).collect();
            Ok((names, records, changed))
        })
    }

    /// Typed, cached query.
    pub fn sql(&mut self, sql: &str) -> Result<QueryResult> {
        self.execute(sql, None, true, true)
    }

    /// Typed query with bound parameters; never cached.
    pub fn sql_params(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.execute(sql, Some(params), true, true)
    }

    /// `SELECT <fields> FROM __self__ <clauses...>`
    pub fn select(&mut self, fields: &str, clauses: &[&str]) -> Result<QueryResult> {
        let sql = format!("SELECT {} FROM {} {}", fields, SELF_ALIAS, clauses.join(" "));
        self.sql(sql.trim_end())
    }

    /// Runs a full `SELECT ... FROM ...` statement, or a bare condition on
    /// this table's rows.
    pub fn select_where(&mut self, expression: &str) -> Result<QueryResult> {
        self.sql(&wrap_select(expression))
    }

    /// Stores the result of a selection as a table of its own and returns a
    /// handle to it.
    ///
    /// Only the text up to the first `;` is used, and a bare condition is
    /// wrapped like in [`Table::select_where`]. Without `name` the new table
    /// is called `selection_<hash of the query>`, so repeating a selection
    /// binds to the table made the first time. An existing table is only
    /// replaced when `force` is set.
    pub fn selection(
        &mut self,
        sql: &str,
        params: Option<&[Value]>,
        name: Option<&str>,
        force: bool,
    ) -> Result<Table> {
        self.ensure_open()?;
        let scrubbed = sql.split(';').next().unwrap_or_default().trim();
        let select = wrap_select(scrubbed).replace(SELF_ALIAS, &self.name);
        let newname = match name {
            Some(name) => name.to_owned(),
            None => format!("selection_{}", blake3::hash(select.as_bytes()).to_hex()),
        };
        if newname == SELF_ALIAS || newname == self.name {
            return Err(RecsqlError::Validation(format!(
                "table name '{}' cannot refer to the parent table itself",
                newname
            )));
        }
        check_name(&newname, false)?;

        let mut exists = self.store.has_table(&newname)?;
        if exists && force {
            self.store.with_connection(|c| {
                c.execute_batch(&format!("DROP TABLE {}", quote_identifier(&newname)))?;
                Ok(())
            })?;
            debug!(table = %newname, "dropped selection for re-creation");
            exists = false;
        }
        if !exists {
            let create = format!("CREATE TABLE {} AS {}", quote_identifier(&newname), select);
            self.store.with_connection(|c| {
                match params {
                    Some(params) => c.execute(&create, params_from_iter(params.iter()))?,
                    None => c.execute(&create, [])?,
                };
                Ok(())
            })?;
            info!(table = %newname, parent = %self.name, "created selection");
        }
        Table::open(
            &self.store,
            &newname,
            TableOptions {
                cache_size: self.cache.capacity(),
            },
        )
    }

    /// Appends `records` to this table and returns how many rows were added.
    ///
    /// The records are staged in a temporary table and copied over with
    /// `INSERT OR ABORT`, so a constraint violation leaves the table as it
    /// was.
    pub fn merge<S: AsRef<str>>(&mut self, records: Vec<Record>, columns: &[S]) -> Result<usize> {
        self.ensure_open()?;
        let before = self.current_row_count()?;
        let drop_staging = format!("DROP TABLE IF EXISTS {}", quote_identifier(MERGE_TABLE));
        self.store.with_connection(|c| {
            c.execute_batch(&drop_staging)?;
            Ok(())
        })?;
        let mut staging = Table::materialize(
            &self.store,
            MERGE_TABLE,
            columns,
            records,
            TableOptions::default(),
            true,
        )?;
        let staged = staging.current_row_count()?;

        self.execute(
            &format!(
                "INSERT OR ABORT INTO {} SELECT * FROM {}",
                quote_identifier(&self.name),
                quote_identifier(MERGE_TABLE)
            ),
            None,
            false,
            false,
        )?;
        let inserted = self.current_row_count()?.saturating_sub(before);
        if inserted != staged {
            return Err(RecsqlError::Integrity(format!(
                "merged {} of {} staged records into {}",
                inserted, staged, self.name
            )));
        }

        staging.close()?;
        self.store.with_connection(|c| {
            c.execute_batch(&drop_staging)?;
            Ok(())
        })?;
        debug!(table = %self.name, inserted, "merged records");
        Ok(inserted)
    }

    pub fn merge_recarray(&mut self, array: &RecArray) -> Result<usize> {
        self.merge(array.records(), array.names())
    }

    /// Copies all rows of the table `name` into this one.
    pub fn merge_table(&mut self, name: &str) -> Result<usize> {
        let before = self.current_row_count()?;
        self.execute(
            &format!(
                "INSERT OR ABORT INTO {} SELECT * FROM {}",
                quote_identifier(&self.name),
                quote_identifier(name)
            ),
            None,
            false,
            false,
        )?;
        Ok(self.current_row_count()?.saturating_sub(before))
    }

    pub fn sql_index<S: AsRef<str>>(&mut self, index_name: &str, columns: &[S], unique: bool) -> Result<()> {
        if columns.is_empty() {
            return Err(RecsqlError::Validation(
                "provide a list of column names for an index".to_owned(),
            ));
        }
        let columns: Vec<String> = columns.iter().map(|c| quote_identifier(c.as_ref())).collect();
        let sql = format!(
            "CREATE {}INDEX {} ON {} ({})",
            if unique { "UNIQUE " } else { "" },
            quote_identifier(index_name),
            quote_identifier(&self.name),
            columns.join(", ")
        );
        self.execute(&sql, None, false, false)?;
        Ok(())
    }

    /// Minimum and maximum of `column` over all rows.
    pub fn limits(&mut self, column: &str) -> Result<(Value, Value)> {
        let column = quote_identifier(column);
        let result = self.select(&format!("min({c}), max({c})", c = column), &[])?;
        Ok((
            result.get(0, 0).unwrap_or(Value::Null),
            result.get(0, 1).unwrap_or(Value::Null),
        ))
    }

    pub fn has_table(&self, name: &str) -> Result<bool> {
        self.store.has_table(name)
    }

    /// Number of rows, answered from the cache when possible.
    pub fn row_count(&mut self) -> Result<usize> {
        let result = self.sql(COUNT_ROWS)?;
        self.count_from(&result)
    }

    // bypasses the cache so writes through other handles are seen
    fn current_row_count(&mut self) -> Result<usize> {
        let result = self.execute(COUNT_ROWS, None, true, false)?;
        self.count_from(&result)
    }

    fn count_from(&self, result: &QueryResult) -> Result<usize> {
        let count = result
            .get(0, 0)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| RecsqlError::Integrity(format!("no row count for {}", self.name)))?;
        usize::try_from(count)
            .map_err(|_| RecsqlError::Integrity(format!("negative row count for {}", self.name)))
    }

    /// The whole table.
    pub fn recarray(&mut self) -> Result<QueryResult> {
        self.select("*", &[])
    }

    pub fn connection_count(&self) -> Result<i64> {
        self.store.connection_count()
    }

    /// Commits pending work. An in-memory store cannot be saved to disk.
    pub fn save(&self) -> Result<()> {
        if self.store.is_memory() {
            warn!(table = %self.name, "in-memory store: open the store with a dbfile to save to disk");
        }
        self.store.commit()
    }

    /// Releases the handle. The last handle on an in-memory store drops its
    /// table; the last handle on a file store commits and closes the
    /// connection. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.cache.clear();
        if self.store.is_closed() {
            return Ok(());
        }
        let remaining = self.store.add_connection_counter(-1)?;
        if remaining <= 0 {
            if self.store.is_memory() {
                let drop_table = format!("DROP TABLE IF EXISTS {}", quote_identifier(&self.name));
                self.store.with_connection(|c| {
                    c.execute_batch(&drop_table)?;
                    Ok(())
                })?;
            } else {
                self.store.close()?;
            }
        }
        debug!(table = %self.name, remaining, "closed table handle");
        Ok(())
    }
}

impl Drop for Table {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(table = %self.name, error = %e, "closing table handle failed");
        }
    }
}
