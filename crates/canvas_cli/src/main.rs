//! CLI smoke entry point.
//!
//! # Responsibility
//! - Open the configured database, apply migrations and print a short report.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Every setting can come from a flag or its `CANVAS_*` environment variable.
//! Without an owner the nil UUID is used, which sees only global rows.

use canvas_core::config::DEFAULT_BUSY_TIMEOUT_MS;
use canvas_core::db::migrations::{current_version, latest_version};
use canvas_core::{
    init_logging_from_config, open_db_from_config, ConfigError, CoreConfig, ObjectModel,
};
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "canvas_cli")]
#[command(about = "Open a canvas database and print a dashboard report")]
struct Args {
    /// SQLite database file; in-memory when omitted
    #[arg(long, env = "CANVAS_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Log level: trace, debug, info, warn or error
    #[arg(long, env = "CANVAS_LOG_LEVEL")]
    log_level: Option<String>,

    /// Absolute directory for rolling log files; file logging is off when omitted
    #[arg(long, env = "CANVAS_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// How long to wait on a locked database, in milliseconds
    #[arg(long, env = "CANVAS_BUSY_TIMEOUT_MS", default_value_t = DEFAULT_BUSY_TIMEOUT_MS)]
    busy_timeout_ms: u64,

    /// Caller whose dashboard is reported
    owner: Option<Uuid>,
}

impl Args {
    fn core_config(&self) -> Result<CoreConfig, ConfigError> {
        let defaults = CoreConfig::default();
        CoreConfig {
            db_path: self.db_path.clone(),
            log_level: self.log_level.clone().unwrap_or(defaults.log_level),
            log_dir: self.log_dir.clone(),
            busy_timeout_ms: self.busy_timeout_ms,
        }
        .validated()
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let config = args.core_config()?;
    let file_logging = init_logging_from_config(&config)?;
    let owner = args.owner.unwrap_or_else(Uuid::nil);

    let conn = open_db_from_config(&config)?;
    let model = ObjectModel::try_new(&conn)?;
    let stats = model.dashboard.dashboard_stats(owner)?;
    log::info!(
        "event=cli_report module=cli status=ok owner={owner} file_logging={file_logging}"
    );

    println!("canvas_core ping={}", canvas_core::ping());
    println!("canvas_core version={}", canvas_core::core_version());
    println!(
        "schema version={}/{}",
        current_version(&conn)?,
        latest_version()
    );
    match &config.db_path {
        Some(path) => println!("database={}", path.display()),
        None => println!("database=:memory:"),
    }
    println!("owner={owner}");
    println!("total_records={}", stats.total_records);
    println!("active_objects={}", stats.active_objects);
    println!("fields_count={}", stats.fields_count);
    println!("applications_count={}", stats.applications_count);
    Ok(())
}
