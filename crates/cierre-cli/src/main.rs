mod close_cmd;
mod config;
mod data;
mod summary_cmd;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use cierre_store::memory::MemoryStore;

#[derive(Parser)]
#[command(name = "cierre", about = "Application closure and cost reconciliation")]
struct Cli {
    /// Path to the JSON data snapshot (overrides CIERRE_DATA env var)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a cierre config file pointing at a data snapshot
    Init {
        /// Path to the JSON data snapshot
        #[arg(long, default_value = config::DEFAULT_DATA_PATH)]
        data_path: PathBuf,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// List the applications in the snapshot
    List,
    /// Show actual usage, planned comparison, and labor for an application
    Summary {
        /// Application id or name fragment
        application: String,
    },
    /// Close an application: confirm dates, review figures, and commit
    Close {
        /// Application id or name fragment
        application: String,
        /// Actual start date (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
        /// Actual end date (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,
        /// Free-form observations recorded on the closure
        #[arg(long)]
        observations: Option<String>,
        /// Name recorded as the closing operator
        #[arg(long, default_value = "cli")]
        closed_by: String,
        /// Commit the closure; without this flag the command is a dry run
        #[arg(long)]
        yes: bool,
    },
}

/// Execute the `cierre init` command: write the config file.
fn cmd_init(data_path: &PathBuf, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        data: config::DataSection {
            path: data_path.clone(),
        },
    };
    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  data.path = {}", data_path.display());

    Ok(())
}

/// Execute the `cierre list` command.
fn cmd_list(snapshot: &cierre_store::snapshot::Snapshot) {
    if snapshot.applications.is_empty() {
        println!("No applications in snapshot.");
        return;
    }
    for app in &snapshot.applications {
        println!(
            "{}  {:<30} {:<14} {}  {} to {}",
            app.id, app.name, app.kind, app.state, app.planned_start, app.planned_end
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("CIERRE_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Commands::Init { data_path, force } = &cli.command {
        return cmd_init(data_path, *force);
    }

    let data_path = config::resolve_data_path(cli.data.as_ref());
    let snapshot = data::load_snapshot(&data_path)?;

    match cli.command {
        Commands::Init { .. } => unreachable!("handled above"),
        Commands::List => {
            cmd_list(&snapshot);
        }
        Commands::Summary { application } => {
            let app = data::resolve_application(&snapshot, &application)?.clone();
            let store = Arc::new(MemoryStore::from_snapshot(snapshot));
            summary_cmd::run_summary(&store, &app).await?;
        }
        Commands::Close {
            application,
            start,
            end,
            observations,
            closed_by,
            yes,
        } => {
            let app_id = data::resolve_application(&snapshot, &application)?.id;
            let store = Arc::new(MemoryStore::from_snapshot(snapshot));
            close_cmd::run_close(
                store,
                app_id,
                start,
                end,
                observations,
                &closed_by,
                yes,
                &data_path,
            )
            .await?;
        }
    }

    Ok(())
}
