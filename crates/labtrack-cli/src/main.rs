//! # labtrack CLI
//!
//! Operator utilities for tracked instrument configuration: register
//! instruments, apply versioned updates, and capture snapshots.

use anyhow::{Context, Result};
use labtrack_core::{ConfigMap, ConfigTracker, UpdateOutcome};
use labtrack_store::{DocumentStore, MemoryStore, RetryStore, SqliteStore};
use serde::Serialize;
use std::env;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod config;

use config::{CliConfig, StoreKind};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        print_help();
        return Ok(());
    }

    let cli = CliConfig::from_env()?;
    match cli.store {
        StoreKind::Sqlite => {
            let store = SqliteStore::open(&cli.db_path)
                .with_context(|| format!("failed to open {}", cli.db_path.display()))?;
            let tracker = ConfigTracker::new(Arc::new(RetryStore::new(store)));
            run(&tracker, &cli.user, &args).await
        }
        StoreKind::Memory => {
            let tracker = ConfigTracker::new(Arc::new(RetryStore::new(MemoryStore::new())));
            run(&tracker, &cli.user, &args).await
        }
    }
}

#[allow(clippy::too_many_lines)]
async fn run<S: DocumentStore>(
    tracker: &ConfigTracker<S>,
    user: &str,
    args: &[String],
) -> Result<()> {
    match args[0].as_str() {
        "instruments" => {
            for (id, instrument) in tracker.list_instruments().await? {
                println!(
                    "{id}\t{}\t{}\t{}",
                    instrument.name,
                    instrument.kind,
                    instrument.location.as_deref().unwrap_or("-")
                );
            }
        }
        "create" => {
            require(args, 4, "create <id> <name> <kind> [location]");
            let location = args.get(4).cloned();
            let instrument = tracker
                .create_instrument(&args[1], &args[2], &args[3], location)
                .await?;
            print_json(&instrument)?;
        }
        "config" => {
            require(args, 2, "config <id>");
            let config = tracker.get_config(&args[1]).await?;
            print_json(&config)?;
        }
        "set" => {
            require(args, 3, "set <id> <json> [comment]");
            let data = parse_config(&args[2])?;
            let comment = args.get(3).map(String::as_str).unwrap_or_default();
            match tracker.update_config(&args[1], data, user, comment).await? {
                UpdateOutcome::Committed(version_id) => {
                    println!("committed version {version_id}");
                }
                UpdateOutcome::NoOp => println!("no changes"),
            }
        }
        "versions" => {
            require(args, 2, "versions <id>");
            for version_id in tracker.list_versions(&args[1]).await? {
                println!("{version_id}");
            }
        }
        "version" => {
            require(args, 3, "version <id> <version-id>");
            let version_id = Uuid::parse_str(&args[2]).context("invalid version id")?;
            let version = tracker.get_version(&args[1], version_id).await?;
            print_json(&version)?;
        }
        "snapshot" => {
            require(args, 3, "snapshot <id> <name> [description]");
            let description = args.get(3).map(String::as_str).unwrap_or_default();
            let snapshot = tracker
                .create_snapshot(&args[1], &args[2], description, user)
                .await?;
            print_json(&snapshot)?;
        }
        "snapshots" => {
            require(args, 2, "snapshots <id>");
            for name in tracker.list_snapshots(&args[1]).await? {
                println!("{name}");
            }
        }
        "show-snapshot" => {
            require(args, 3, "show-snapshot <id> <name>");
            let snapshot = tracker.get_snapshot(&args[1], &args[2]).await?;
            print_json(&snapshot)?;
        }
        "repair" => {
            require(args, 2, "repair <id>");
            match tracker.repair(&args[1]).await? {
                Some(version_id) => println!("projections rebuilt from version {version_id}"),
                None => println!("version log is empty; nothing to rebuild"),
            }
        }
        "help" | "--help" | "-h" => {
            print_help();
        }
        cmd => {
            eprintln!("Unknown command: {cmd}");
            print_help();
            std::process::exit(1);
        }
    }

    Ok(())
}

fn require(args: &[String], count: usize, usage: &str) {
    if args.len() < count {
        eprintln!("Usage: labtrack {usage}");
        std::process::exit(1);
    }
}

fn parse_config(raw: &str) -> Result<ConfigMap> {
    let value: serde_json::Value = serde_json::from_str(raw).context("invalid JSON")?;
    match value {
        serde_json::Value::Object(map) => Ok(map),
        _ => anyhow::bail!("configuration must be a JSON object"),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_help() {
    println!(
        r#"labtrack CLI

USAGE:
    labtrack <COMMAND> [ARGS]

COMMANDS:
    instruments                          List registered instruments
    create <id> <name> <kind> [location] Register a new instrument
    config <id>                          Show current configuration
    set <id> <json> [comment]            Apply a configuration update
    versions <id>                        List version ids in commit order
    version <id> <version-id>            Show one version record
    snapshot <id> <name> [description]   Capture a named snapshot
    snapshots <id>                       List snapshot names
    show-snapshot <id> <name>            Show one snapshot record
    repair <id>                          Rebuild projections from the version log
    help                                 Show this help message

ENVIRONMENT:
    LABTRACK_STORE     "sqlite" (default) or "memory"
    LABTRACK_DB_PATH   Database path (default ./labtrack.db)
    LABTRACK_USER      Identity recorded on mutating operations

EXAMPLES:
    labtrack create sensor-1 "Sensor" temperature lab-2
    labtrack set sensor-1 '{{"threshold": 5}}' "initial limits"
    labtrack snapshot sensor-1 baseline "known-good state"
"#
    );
}
