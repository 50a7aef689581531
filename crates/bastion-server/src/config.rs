use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use bastion_db::PoolOptions;

/// Server configuration, read from the environment (and `.env` if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub pool: PoolOptions,
    /// `BASTION_ENV=development` turns off the `Secure` cookie flag so the
    /// app works over plain http on localhost.
    pub development: bool,
    /// Idle time before a session expires.
    pub session_idle: time::Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let db_path = var_or("BASTION_DB_PATH", "bastion.db").into();
        let host = var_or("BASTION_HOST", "0.0.0.0");
        let port: u16 = var_or("BASTION_PORT", "3000")
            .parse()
            .context("BASTION_PORT must be a port number")?;
        let pool_size: usize = var_or("BASTION_POOL_SIZE", "4")
            .parse()
            .context("BASTION_POOL_SIZE must be a positive integer")?;
        let timeout_ms: u64 = var_or("BASTION_DB_TIMEOUT_MS", "5000")
            .parse()
            .context("BASTION_DB_TIMEOUT_MS must be a number of milliseconds")?;
        let idle_minutes: i64 = var_or("BASTION_SESSION_IDLE_MINUTES", "720")
            .parse()
            .context("BASTION_SESSION_IDLE_MINUTES must be a number of minutes")?;
        let development = var_or("BASTION_ENV", "production").eq_ignore_ascii_case("development");

        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .context("BASTION_HOST/BASTION_PORT do not form a socket address")?;

        Ok(Self {
            db_path,
            addr,
            pool: PoolOptions {
                size: pool_size.max(1),
                timeout: Duration::from_millis(timeout_ms),
            },
            development,
            session_idle: time::Duration::minutes(idle_minutes.max(1)),
        })
    }
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.into())
}
