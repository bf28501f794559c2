use crudlayer::config::{self, Config};
use crudlayer::core::db::{self, Database, StatementHandle, Value};
use crudlayer::core::Result;
use std::process::ExitCode;
use tracing::info;

const USAGE: &str = "usage: crudlayer [--config FILE] <db_path> <sql> [params...]";

fn main() -> ExitCode {
    // Initialize the logging system using tracing subscriber
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(mut args: Vec<String>) -> Result<()> {
    let mut config = match args.first().map(String::as_str) {
        Some("--config") => {
            if args.len() < 2 {
                return Err(crudlayer::core::DalError::Config(USAGE.to_string()));
            }
            let path = args.remove(1);
            args.remove(0);
            config::load_config(path)?
        }
        _ => match config::default_config_path() {
            Some(path) if path.exists() => config::load_config(path)?,
            _ => Config::default(),
        },
    };

    if args.len() < 2 {
        return Err(crudlayer::core::DalError::Config(USAGE.to_string()));
    }
    config.database.path = args.remove(0);
    let sql = args.remove(0);
    let params: Vec<Value> = args.iter().map(|arg| parse_param(arg)).collect();

    info!(path = %config.database.path, "Starting crudlayer...");
    let conn = db::connect(&config.database)?;
    let database = Database::with_table_options(&conn, config.schema.table_options());

    let mut stmt = database.query(&sql, &params)?;
    if stmt.column_names().is_empty() {
        println!("affected: {}", stmt.row_count());
        println!("last_insert_id: {}", database.last_insert_id(None)?);
    } else {
        for row in stmt.fetch_all()? {
            println!("{}", serde_json::to_string(&row)?);
        }
    }
    Ok(())
}

/// Integer-looking arguments bind as integers, everything else as text.
fn parse_param(arg: &str) -> Value {
    arg.parse::<i64>()
        .map(Value::Integer)
        .unwrap_or_else(|_| Value::from(arg))
}
