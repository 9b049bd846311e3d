//! Runtime settings.
//!
//! Read from an optional `recsql.toml` in the working directory (or an
//! explicitly given file) and then from `RECSQL_*` environment variables,
//! later sources winning:
//!
//! ```toml
//! dbfile = "laureates.db"   # leave out for an in-memory store
//! cache_size = 5
//! conversion = "singlet"    # off | simple | singlet | fancy | text
//! separator = "whitespace"  # or any literal, only used by "fancy"
//! percent = false
//! ```

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::convert::{Converter, Mode, Separator};
use crate::error::{RecsqlError, Result};
use crate::table::TableOptions;

pub const DEFAULT_CACHE_SIZE: usize = 5;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub dbfile: Option<PathBuf>,
    pub cache_size: usize,
    pub conversion: Mode,
    pub separator: Option<String>,
    pub percent: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            dbfile: None,
            cache_size: DEFAULT_CACHE_SIZE,
            conversion: Mode::Simple,
            separator: None,
            percent: false,
        }
    }
}

impl Settings {
    /// Loads `path` if given (it must then exist), otherwise `recsql.toml` if
    /// present, and layers the environment on top.
    pub fn load(path: Option<&Path>) -> Result<Settings> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name("recsql").required(false),
        };
        let settings = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix("RECSQL").try_parsing(true))
            .build()?
            .try_deserialize::<Settings>()?;
        Ok(settings)
    }

    pub fn converter(&self) -> Converter {
        let separator = self
            .separator
            .as_deref()
            .map(Separator::parse)
            .unwrap_or(Separator::None);
        Converter::new(self.conversion)
            .with_separator(separator)
            .with_percent(self.percent)
    }

    pub fn table_options(&self) -> Result<TableOptions> {
        let cache_size = NonZeroUsize::new(self.cache_size)
            .ok_or_else(|| RecsqlError::Config("cache_size must be at least 1".to_owned()))?;
        Ok(TableOptions { cache_size })
    }
}
