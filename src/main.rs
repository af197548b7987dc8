mod alerts;
mod api;
mod config;
mod db;
mod docs;
mod html;
mod invoice;
mod legacy;
mod pipeline;
mod roadmap;
mod schedule;

use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Production operations hub: tasks, series, sponsors and crew over HTTP.
#[derive(Debug, Parser)]
#[command(name = "prodhubd", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Listen address, overrides PRODHUB_BIND
    #[arg(long, global = true)]
    bind: Option<SocketAddr>,

    /// SQLite database file, overrides PRODHUB_DB
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Copy rows from the older production and pipeline databases
    ImportLegacy {
        #[arg(long)]
        production_db: Option<PathBuf>,
        #[arg(long)]
        pipeline_db: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("prodhubd error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing()?;

    let mut config = Config::try_load()?;
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::ImportLegacy {
            production_db,
            pipeline_db,
        } => import_legacy(&config, production_db, pipeline_db),
    }
}

fn init_tracing() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("prodhubd=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))
}

/// Prints one JSON line to stdout and flushes it.
fn emit(value: &serde_json::Value) -> anyhow::Result<()> {
    let mut stdout = io::stdout();
    writeln!(stdout, "{}", value)?;
    stdout.flush()?;
    Ok(())
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let conn = db::open_db(&config.db_path)?;
    info!(db = %config.db_path.display(), "database ready");

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    let addr = listener.local_addr()?;
    info!(%addr, "listening");

    let state = api::AppState::new(conn, config);
    let app = api::build_router(state);

    emit(&serde_json::json!({ "listening": addr.to_string() }))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    info!("server stopped");
    Ok(())
}

fn import_legacy(
    config: &Config,
    production_db: Option<PathBuf>,
    pipeline_db: Option<PathBuf>,
) -> anyhow::Result<()> {
    let conn = db::open_db(&config.db_path)?;
    let summary = legacy::import(&conn, production_db.as_deref(), pipeline_db.as_deref())?;
    info!(db = %config.db_path.display(), "legacy import finished");
    emit(&summary)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!(%error, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(error) => {
                tracing::error!(%error, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn import_flags_parse() {
        let cli = Cli::parse_from([
            "prodhubd",
            "--db",
            "/tmp/x.db",
            "import-legacy",
            "--pipeline-db",
            "/tmp/p.db",
        ]);
        assert_eq!(cli.db.as_deref(), Some(std::path::Path::new("/tmp/x.db")));
        match cli.command {
            Some(Command::ImportLegacy {
                production_db,
                pipeline_db,
            }) => {
                assert!(production_db.is_none());
                assert_eq!(pipeline_db, Some(PathBuf::from("/tmp/p.db")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
