mod config;

use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};

use bastion_api::{AppStateInner, SessionOptions};
use bastion_db::Database;

use crate::config::Config;

const SESSION_SWEEP_PERIOD: Duration = Duration::from_secs(60);

/// Bastion web service.
///
/// With no flags it serves. The bootstrap flags act on the database and exit.
#[derive(Parser, Debug)]
#[command(name = "bastion")]
#[command(version, about, long_about = None)]
struct Args {
    /// Drop and recreate the schema, then exit.
    #[arg(long, conflicts_with = "promote")]
    reset_db: bool,

    /// Grant admin to an existing account, then exit.
    #[arg(long, value_name = "USERNAME")]
    promote: Option<String>,
}

#[derive(Debug)]
enum Command {
    Serve,
    ResetDb,
    Promote(String),
}

impl Args {
    fn command(self) -> Command {
        match (self.reset_db, self.promote) {
            (true, _) => Command::ResetDb,
            (false, Some(username)) => Command::Promote(username),
            (false, None) => Command::Serve,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse arguments
    let command = Args::parse().command();

    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "bastion=debug,bastion_api=debug,bastion_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;
    let db = Database::open(&config.db_path, config.pool)?;

    match command {
        Command::ResetDb => {
            info!("Cleaning database");
            if let Err(e) = db.reset() {
                error!("Database reset failed: {}", e);
                std::process::exit(2);
            }
            info!("Database cleaned, tables: {}", db.table_names()?.join(", "));
            return Ok(());
        }
        Command::Promote(username) => {
            if let Err(e) = db.promote(&username) {
                error!("Promoting {} failed: {}", username, e);
                std::process::exit(2);
            }
            return Ok(());
        }
        Command::Serve => {}
    }

    if config.development {
        warn!("Development mode: session cookie sent without the Secure flag");
    }

    let state = AppStateInner::new(
        db,
        SessionOptions {
            secure: !config.development,
            idle: config.session_idle,
        },
    );
    let sweep = bastion_api::session::spawn_expiry_sweep(state.sessions.clone(), SESSION_SWEEP_PERIOD);
    let app = bastion_api::router(state);

    info!("Bastion listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweep.abort();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(signal) => signal,
                Err(e) => {
                    warn!("Could not install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    info!("Received Ctrl+C, shutting down...");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
