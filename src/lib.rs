//! recsql – typed records on top of SQLite.
//!
//! Records go into a relation of an embedded SQLite database and come back
//! out of SQL queries as typed, columnar collections. Data can be loaded from
//! record vectors, from CSV files, or from a plain-text table in the
//! reStructuredText "simple table" layout:
//!
//! ```text
//! Table[laureates]: Nobel laureates
//! =====  ==========  ========
//! year   name        field
//! =====  ==========  ========
//! 1903   Curie       physics
//! 1911   Curie       chemistry
//! =====  ==========  ========
//! ```
//!
//! ## Modules
//! * [`infer`] – Classifies a raw token as integer, float or text.
//! * [`convert`] – The field [`convert::Converter`]: inference, sentinel
//!   mapping (`x`, `---`, ...) and optional splitting into sequences.
//! * [`text_table`] – Parser for the text table layout above.
//! * [`csv_table`] – The same for CSV files.
//! * [`value`] / [`recarray`] – [`Value`], records and the columnar [`RecArray`].
//! * [`cache`] – The bounded first-in-first-out [`cache::QueryCache`].
//! * [`store`] – The shared SQLite connection and its book-keeping.
//! * [`table`] – [`Table`] handles that run (and cache) queries.
//! * [`functions`] – Extra SQL functions (`sqrt`, `regexp`, `median`, ...).
//! * [`export`] – CSV and LaTeX output.
//! * [`settings`] – Configuration file and environment.
//!
//! ## Quick Start
//! ```
//! use recsql::{Converter, Store, Table, TableOptions, Value};
//! let text = "Table[laureates]: Nobel laureates
//! =====  ==========  ========
//! year   name        field
//! =====  ==========  ========
//! 1903   Curie       physics
//! 1911   Curie       chemistry
//! =====  ==========  ========
//! ";
//! let store = Store::open_in_memory().unwrap();
//! let mut t = Table::from_text(&store, text, &Converter::default(), TableOptions::default()).unwrap();
//! let r = t.select_where("field = 'chemistry'").unwrap();
//! assert_eq!(r.get(0, 0), Some(Value::Integer(1911)));
//! assert_eq!(t.row_count().unwrap(), 2);
//! ```

pub mod cache;
pub mod convert;
pub mod csv_table;
pub mod error;
pub mod export;
pub mod functions;
pub mod infer;
pub mod recarray;
pub mod settings;
pub mod store;
pub mod table;
pub mod text_table;
pub mod value;

pub use convert::{Converter, Mode, Separator};
pub use error::{RecsqlError, Result};
pub use recarray::{Column, ColumnType, QueryResult, RecArray};
pub use settings::Settings;
pub use store::Store;
pub use table::{FileOptions, Table, TableOptions};
pub use value::{Record, Value};
