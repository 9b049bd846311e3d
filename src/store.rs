// used for persistence
use rusqlite::{params, Connection};

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::error::{RecsqlError, Result};
use crate::functions;
use crate::settings::Settings;

/// Our own book-keeping table, one per database.
pub const MASTER_TABLE: &str = "recsql_master";
/// Staging table used while merging records into a table.
pub const MERGE_TABLE: &str = "__tmp_merge_table";
/// Stands for the table's own name inside query text.
pub const SELF_ALIAS: &str = "__self__";

/// Quotes a name the engine writes into SQL by itself.
///
/// Every table, column and index name that is interpolated into generated
/// statements passes through here.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

// ------------- Store -------------
// A connection shared by any number of table handles. The handles count
// themselves in the book-keeping table so the last one to close knows it may
// tear things down.
#[derive(Clone, Debug)]
pub struct Store {
    inner: Arc<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    connection: Mutex<Option<Connection>>,
    dbfile: Option<PathBuf>,
}

impl Store {
    pub fn open_in_memory() -> Result<Store> {
        Self::bootstrap(Connection::open_in_memory()?, None)
    }
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Store> {
        let path = path.as_ref().to_path_buf();
        Self::bootstrap(Connection::open(&path)?, Some(path))
    }
    pub fn from_settings(settings: &Settings) -> Result<Store> {
        match &settings.dbfile {
            Some(path) => Self::open(path),
            None => Self::open_in_memory(),
        }
    }
    fn bootstrap(connection: Connection, dbfile: Option<PathBuf>) -> Result<Store> {
        connection.execute_batch(&format!(
            "
            create table if not exists {master} (
                name primary key,
                value
            );
            insert or replace into {master} (name, value) values ('connection_counter', 0);
            ",
            master = MASTER_TABLE
        ))?;
        functions::register(&connection)?;
        info!(dbfile = ?dbfile, "opened store");
        Ok(Store {
            inner: Arc::new(StoreInner {
                connection: Mutex::new(Some(connection)),
                dbfile,
            }),
        })
    }
    pub fn is_memory(&self) -> bool {
        self.inner.dbfile.is_none()
    }
    pub fn dbfile(&self) -> Option<&Path> {
        self.inner.dbfile.as_deref()
    }
    pub fn is_closed(&self) -> bool {
        self.inner
            .connection
            .lock()
            .map(|c| c.is_none())
            .unwrap_or(true)
    }
    /// Runs `f` against the open connection.
    pub fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let guard = self
            .inner
            .connection
            .lock()
            .map_err(|e| RecsqlError::Lock(e.to_string()))?;
        match guard.as_ref() {
            Some(connection) => f(connection),
            None => Err(RecsqlError::Closed),
        }
    }
    pub fn has_table(&self, name: &str) -> Result<bool> {
        self.with_connection(|c| {
            let found: i64 = c.query_row(
                "
                select count(*) from (
                    select name from sqlite_master where type = 'table' and name = ?1
                    union all
                    select name from sqlite_temp_master where type = 'table' and name = ?1
                )
                ",
                params![name],
                |r| r.get(0),
            )?;
            Ok(found > 0)
        })
    }
    pub fn table_names(&self) -> Result<Vec<String>> {
        self.with_connection(|c| {
            let mut statement =
                c.prepare("select name from sqlite_master where type = 'table' order by name")?;
            let names = statement
                .query_map([], |r| r.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(names)
        })
    }
    /// Number of table handles currently using this store.
    pub fn connection_count(&self) -> Result<i64> {
        self.with_connection(|c| {
            let count = c.query_row(
                &format!(
                    "select value from {} where name = 'connection_counter'",
                    MASTER_TABLE
                ),
                [],
                |r| r.get(0),
            )?;
            Ok(count)
        })
    }
    pub(crate) fn add_connection_counter(&self, increment: i64) -> Result<i64> {
        self.with_connection(|c| {
            c.execute(
                &format!(
                    "update {} set value = value + ?1 where name = 'connection_counter'",
                    MASTER_TABLE
                ),
                params![increment],
            )?;
            Ok(())
        })?;
        self.connection_count()
    }
    /// Commits anything pending. Statements run in autocommit mode, so this
    /// only matters when a transaction was opened through raw SQL.
    pub fn commit(&self) -> Result<()> {
        self.with_connection(|c| {
            if !c.is_autocommit() {
                c.execute_batch("commit")?;
            }
            Ok(())
        })
    }
    /// Commits and closes the connection. Later use of the store fails with
    /// [`RecsqlError::Closed`].
    pub fn close(&self) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }
        self.commit()?;
        let mut guard = self
            .inner
            .connection
            .lock()
            .map_err(|e| RecsqlError::Lock(e.to_string()))?;
        if let Some(connection) = guard.take() {
            if let Err((connection, e)) = connection.close() {
                *guard = Some(connection);
                return Err(e.into());
            }
            debug!(dbfile = ?self.inner.dbfile, "closed store");
        }
        Ok(())
    }
}
