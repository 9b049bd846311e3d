use std::path::PathBuf;
use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use recsql::{FileOptions, QueryResult, Settings, Store, Table};

fn print_result(result: &QueryResult) {
    for record in result.records() {
        let fields: Vec<String> = record.iter().map(|v| v.to_string()).collect();
        println!("{}", fields.join("\t"));
    }
}

fn run(path: PathBuf, queries: Vec<String>) -> recsql::Result<()> {
    let settings = Settings::load(None)?;
    let store = Store::from_settings(&settings)?;
    let file_options = FileOptions {
        name: None,
        converter: settings.converter(),
    };
    let mut table = Table::from_file(&store, &path, &file_options, settings.table_options()?)?;
    info!(table = table.name(), columns = table.ncol(), "loaded {}", path.display());
    if queries.is_empty() {
        print_result(&table.recarray()?);
    }
    for query in &queries {
        print_result(&table.sql(query)?);
    }
    table.close()
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let path = match args.next() {
        Some(path) => PathBuf::from(path),
        None => {
            eprintln!("usage: recsql <file.rst|file.txt|file.csv> [SQL ...]");
            return ExitCode::from(2);
        }
    };
    match run(path, args.collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
