use rusqlite::Connection;
use tracing::{info, warn};

use crate::Result;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS person (
        id      INTEGER PRIMARY KEY AUTOINCREMENT,
        name    TEXT NOT NULL,
        mail    TEXT NOT NULL,
        age     INTEGER
    );

    CREATE TABLE IF NOT EXISTS \"user\" (
        username    TEXT NOT NULL PRIMARY KEY CHECK (length(username) <= 64),
        password    TEXT NOT NULL,
        admin       INTEGER NOT NULL DEFAULT 0,
        personId    INTEGER NOT NULL REFERENCES person(id)
    );

    CREATE TABLE IF NOT EXISTS friends (
        p1  INTEGER NOT NULL REFERENCES person(id),
        p2  INTEGER NOT NULL REFERENCES person(id),
        PRIMARY KEY (p1, p2),
        CHECK (p1 <> p2)
    );

    CREATE INDEX IF NOT EXISTS idx_friends_p2 ON friends(p2);

    CREATE TABLE IF NOT EXISTS forum (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        username    TEXT NOT NULL REFERENCES \"user\"(username),
        ts          TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
        message     TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_forum_ts ON forum(ts, id);
";

/// Create any missing tables. Safe to run on every start.
pub fn create(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    info!("Database schema ready");
    Ok(())
}

/// Drop every application table and recreate the schema.
///
/// Tables are dropped children first so foreign keys stay satisfied. Callers
/// run this inside a transaction.
pub fn reset(conn: &Connection) -> Result<()> {
    warn!("Dropping all application tables");
    conn.execute_batch(
        "
        DROP TABLE IF EXISTS forum;
        DROP TABLE IF EXISTS friends;
        DROP TABLE IF EXISTS \"user\";
        DROP TABLE IF EXISTS person;
        ",
    )?;

    create(conn)
}
