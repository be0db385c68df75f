#[macro_use]
extern crate log;

use std::io::{ErrorKind, Write};
use std::path::Path;
use std::sync::Arc;
use std::{env, fs, thread};

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use env_logger::Env;
use structopt::StructOpt;
use toml::Value;

use crate::args::{get_default_parallelism, Args, Command};
use crate::common::helpers::print_error_chain;
use crate::common::schema::Row;
use crate::config::Config;
use crate::migrate::migration_options::MigrationOptions;
use crate::migrate::migration_report::PlanStatus;
use crate::migrate::migrator::SchemaMigrator;
use crate::migrate::verifier::SchemaVerifier;
use crate::store::{FileStateStore, StateStore};

mod args;
mod common;
mod config;
mod error;
mod migrate;
mod migrations;
mod schemas;
mod state;
mod store;
mod validator;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    if let Err(errors) = init().await.with_context(|| "Command failed") {
        print_error_chain(&errors);
        std::process::exit(1);
    }

    Ok(())
}

async fn init() -> Result<()> {
    let options = Args::from_args();

    initialize_logger(options.verbose, options.quiet);

    let config = load_config(&options.config).context("Failed to load config file")?;
    let store = FileStateStore::new(config.state().path.clone());

    debug!("Using state file {}", store.path().display());

    match options.command {
        Command::Migrate { target } => {
            let target = target.or_else(|| config.settings().target.clone());
            run_migrate(&store, target).await
        }
        Command::Show => run_show(&store).await,
        Command::Verify { parallelism } => {
            let parallelism = parallelism
                .or(config.settings().parallelism)
                .unwrap_or_else(get_default_parallelism);
            run_verify(&store, parallelism).await
        }
        Command::Insert { table, row } => run_insert(&store, &table, &row).await,
        Command::Update {
            table,
            index,
            changes,
        } => run_update(&store, &table, index, &changes).await,
    }
}

async fn run_migrate(store: &impl StateStore, target: Option<String>) -> Result<()> {
    let state = store.load().await?;

    let migrator = SchemaMigrator::new(migrations::all(), MigrationOptions { target });
    let (state, report) = migrator.run(&state).context("Migration failed")?;

    if report.applied.is_empty() {
        info!("No migrations to apply");
        return Ok(());
    }

    store.save(&state).await.context("Failed to save schema state")?;

    Ok(())
}

async fn run_show(store: &impl StateStore) -> Result<()> {
    let state = store.load().await?;
    let migrator = SchemaMigrator::new(migrations::all(), MigrationOptions::default());

    info!("Schema version: {}", state.version);
    for entry in migrator.plan(&state) {
        let mark = match entry.status {
            PlanStatus::Applied => "[X]",
            PlanStatus::Pending => "[ ]",
        };
        info!("{} {}", mark, entry.key);
    }

    Ok(())
}

async fn run_verify(store: &impl StateStore, parallelism: usize) -> Result<()> {
    let state = Arc::new(store.load().await?);

    let reports = SchemaVerifier::new(parallelism).run(state).await?;

    let mut violations = 0;
    for report in &reports {
        for violation in &report.violations {
            warn!(
                "{} row {} column {}: {}",
                report.table, violation.row, violation.column, violation.reason
            );
        }
        violations += report.violations.len();
    }

    if violations > 0 {
        return Err(anyhow!("{} stored values violate the current schema", violations));
    }

    info!("All stored rows satisfy the current schema");

    Ok(())
}

async fn run_insert(store: &impl StateStore, table: &str, row: &str) -> Result<()> {
    let row = parse_row(row)?;

    let state = store.load().await?;
    let state = state
        .insert_row(table, row)
        .with_context(|| format!("Failed to insert into {}", table))?;

    store.save(&state).await.context("Failed to save schema state")?;

    info!(
        "Row inserted into {}, rows stored: {}",
        table,
        state.rows(table)?.len()
    );

    Ok(())
}

async fn run_update(
    store: &impl StateStore,
    table: &str,
    index: usize,
    changes: &str,
) -> Result<()> {
    let changes = parse_row(changes)?;

    let state = store.load().await?;
    let state = state
        .update_row(table, index, changes)
        .with_context(|| format!("Failed to update row {} of {}", index, table))?;

    store.save(&state).await.context("Failed to save schema state")?;

    info!("Row {} of {} updated", index, table);

    Ok(())
}

fn parse_row(content: &str) -> Result<Row> {
    match serde_json::from_str::<serde_json::Value>(content).context("Row is not valid JSON")? {
        serde_json::Value::Object(row) => Ok(row),
        other => Err(anyhow!("Row must be a JSON object, got {}", other)),
    }
}

fn initialize_logger(verbose: bool, quiet: bool) {
    // Set the `RUST_LOG` environment variable to control the logging level

    if quiet {
        env::set_var("RUST_LOG", "warn");
    } else {
        env::set_var("RUST_LOG", if verbose { "debug" } else { "info" });
    }

    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let timestamp = Local::now().format("%H:%M:%S");

            writeln!(
                buf,
                "{} {:<5} [{}] - {}",
                timestamp,
                record.level(),
                thread::current().name().unwrap_or("<unnamed>"),
                record.args()
            )
        })
        .init();
}

fn load_config(path: &Path) -> Result<Config> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Config::default());
        }
        Err(err) => return Err(err.into()),
    };
    let value = content.parse::<Value>()?;
    let config = Config::from_toml(value)?;
    Ok(config)
}
