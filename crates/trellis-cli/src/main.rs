//! Trellis CLI — inspect and maintain application state stores.
//!
//! Reads the same TRELLIS_* settings as the application (a `.env` file is honoured);
//! `--namespace`, `--backend` and `--state-dir` override them.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use trellis_cli::{
    export_namespace, import_namespace, init_tracing, list_keys, parse_value, GateSummary,
};
use trellis_core::{Config, StorageBackend};
use trellis_restore::VersionGate;
use trellis_storage::open_state_db;

#[derive(Parser)]
#[command(name = "trellis", about = "Trellis state store CLI")]
struct Cli {
    /// Namespace to operate on (overrides TRELLIS_NAMESPACE)
    #[arg(long, global = true)]
    namespace: Option<String>,

    /// Storage backend: local or memory (overrides TRELLIS_STORAGE_BACKEND)
    #[arg(long, global = true)]
    backend: Option<StorageBackend>,

    /// State directory of the local backend (overrides TRELLIS_STATE_DIR)
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the keys of the namespace
    Keys {
        /// Show a preview of each value
        #[arg(long)]
        values: bool,
        /// Preview length in characters
        #[arg(long, default_value = "60")]
        width: usize,
    },
    /// Print the value stored under a key
    Get { key: String },
    /// Store a JSON value under a key
    Set {
        key: String,
        value: String,
        /// Store the value as a plain string instead of parsing it as JSON
        #[arg(long)]
        string: bool,
    },
    /// Delete a key
    Remove { key: String },
    /// Delete every key of the namespace
    Clear,
    /// Print every entry of the namespace as one JSON object
    Export,
    /// Load entries from a JSON object file (as written by `export`)
    Import {
        file: PathBuf,
        /// Clear the namespace first
        #[arg(long)]
        replace: bool,
    },
    /// Validate the version record, resetting the namespace on mismatch
    Gate {
        /// Version to validate against (defaults to TRELLIS_APP_VERSION)
        #[arg(long)]
        version: Option<String>,
        /// Report what would happen without writing
        #[arg(long)]
        dry_run: bool,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = Config::from_env().context("Failed to load configuration")?;

    if let Some(namespace) = &cli.namespace {
        config.namespace = namespace.clone();
    }
    if let Some(backend) = cli.backend {
        config.storage_backend = backend;
    }
    if let Some(dir) = &cli.state_dir {
        config.state_dir = Some(dir.clone());
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(config.log_filter());

    let store = open_state_db(&config)
        .await
        .with_context(|| format!("Failed to open namespace {}", config.namespace()))?;

    match cli.command {
        Commands::Keys { values, width } => {
            let keys = list_keys(&store, values, width).await?;
            print_json(&keys)?;
        }
        Commands::Get { key } => {
            let value = store
                .fetch(&key)
                .await?
                .with_context(|| format!("No value stored under {}", key))?;
            print_json(&value)?;
        }
        Commands::Set { key, value, string } => {
            let value = parse_value(&value, string)?;
            store.save(&key, &value).await?;
            print_json(&serde_json::json!({ "success": true, "key": key }))?;
        }
        Commands::Remove { key } => {
            store.remove(&key).await?;
            print_json(&serde_json::json!({ "success": true, "key": key }))?;
        }
        Commands::Clear => {
            store.clear().await?;
            print_json(
                &serde_json::json!({ "success": true, "namespace": config.namespace() }),
            )?;
        }
        Commands::Export => {
            print_json(&export_namespace(&store).await?)?;
        }
        Commands::Import { file, replace } => {
            let raw = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let data: serde_json::Value =
                serde_json::from_str(&raw).context("Import file is not valid JSON")?;
            let imported = import_namespace(&store, &data, replace).await?;
            print_json(&serde_json::json!({ "success": true, "imported": imported }))?;
        }
        Commands::Gate { version, dry_run } => {
            let version = version.unwrap_or_else(|| config.app_version().to_string());
            let gate = VersionGate::new(version.as_str());

            let outcome = if dry_run {
                gate.inspect(&store).await
            } else {
                gate.open(store.clone()).await?.outcome
            };
            print_json(&GateSummary::new(&store, &version, dry_run, &outcome))?;
        }
    }

    Ok(())
}
