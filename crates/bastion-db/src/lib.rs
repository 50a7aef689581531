pub mod error;
pub mod migrations;
pub mod models;
pub mod queries;

use std::ops::Deref;
use std::path::Path;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use rusqlite::Connection;
use tracing::{info, trace, warn};

pub use error::{DbError, Result};
pub use queries::quote_identifier;

const DEFAULT_POOL_SIZE: usize = 4;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
pub struct PoolOptions {
    /// Number of connections opened up front.
    pub size: usize,
    /// Bound on both waiting for an idle connection and SQLite's busy wait.
    pub timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            size: DEFAULT_POOL_SIZE,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Pooled handle to the relational store. Cheap to clone.
#[derive(Clone)]
pub struct Database {
    pool: Arc<Pool>,
}

struct Pool {
    idle: Mutex<Vec<Connection>>,
    available: Condvar,
    timeout: Duration,
}

impl Database {
    pub fn open(path: &Path, options: PoolOptions) -> Result<Self> {
        let size = options.size.max(1);
        let mut conns = Vec::with_capacity(size);
        for _ in 0..size {
            conns.push(open_connection(path, options.timeout)?);
        }

        migrations::create(&conns[0])?;

        info!(
            "Database opened at {} ({} pooled connections)",
            path.display(),
            size
        );
        Ok(Self {
            pool: Arc::new(Pool {
                idle: Mutex::new(conns),
                available: Condvar::new(),
                timeout: options.timeout,
            }),
        })
    }

    /// Check out a connection, waiting up to the pool timeout.
    ///
    /// The connection goes back to the pool when the guard drops, on every
    /// exit path.
    pub fn acquire(&self) -> Result<PooledConnection> {
        let deadline = Instant::now() + self.pool.timeout;
        let mut idle = self.pool.idle.lock().map_err(|_| DbError::Poisoned)?;

        loop {
            if let Some(conn) = idle.pop() {
                return Ok(PooledConnection {
                    conn: Some(conn),
                    pool: Arc::clone(&self.pool),
                });
            }

            let now = Instant::now();
            if now >= deadline {
                warn!("Timed out waiting for a pooled database connection");
                return Err(DbError::Unavailable);
            }

            let (guard, _) = self
                .pool
                .available
                .wait_timeout(idle, deadline - now)
                .map_err(|_| DbError::Poisoned)?;
            idle = guard;
        }
    }

    /// Run `f` on a pooled connection outside any explicit transaction.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.acquire()?;
        f(&conn)
    }

    /// Run `f` inside one transaction on one connection: commit on `Ok`,
    /// roll back on `Err`.
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.acquire()?;
        conn.begin()?;

        match f(&conn) {
            Ok(value) => {
                conn.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = conn.rollback() {
                    warn!("Rollback after failed transaction also failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}

/// A connection checked out of the pool.
pub struct PooledConnection {
    conn: Option<Connection>,
    pool: Arc<Pool>,
}

impl PooledConnection {
    pub fn begin(&self) -> Result<()> {
        trace!("BEGIN IMMEDIATE");
        self.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    /// Commit the open transaction. A failed commit is rolled back before the
    /// error is returned so nothing is left half-applied.
    pub fn commit(&self) -> Result<()> {
        trace!("COMMIT");
        if let Err(e) = self.execute_batch("COMMIT") {
            if let Err(rollback_err) = self.execute_batch("ROLLBACK") {
                warn!("Rollback after failed commit also failed: {}", rollback_err);
            }
            return Err(e.into());
        }
        Ok(())
    }

    pub fn rollback(&self) -> Result<()> {
        trace!("ROLLBACK");
        self.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn
            .as_ref()
            .expect("pooled connection is only taken on drop")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };

        if !conn.is_autocommit() {
            warn!("Connection released inside an open transaction, rolling back");
            if let Err(e) = conn.execute_batch("ROLLBACK") {
                warn!("Rollback on release failed: {}", e);
            }
        }

        match self.pool.idle.lock() {
            Ok(mut idle) => {
                idle.push(conn);
                self.pool.available.notify_one();
            }
            Err(e) => warn!("Pool lock poisoned, discarding connection: {}", e),
        }
    }
}

fn open_connection(path: &Path, busy_timeout: Duration) -> Result<Connection> {
    let conn = Connection::open(path)?;

    conn.busy_timeout(busy_timeout)?;
    // WAL mode for concurrent reads
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    Ok(conn)
}
