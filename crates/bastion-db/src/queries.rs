use rusqlite::types::ValueRef;
use rusqlite::{Connection, params};
use serde_json::{Map, Value};
use tracing::{debug, info, trace};

use crate::models::{
    ForumRow, FriendOutcome, FriendTarget, LoginRow, NewAccount, NewPerson, PersonRow,
};
use crate::{Database, DbError, Result, migrations};

/// Columns never included in table dumps.
const REDACTED_COLUMNS: &[&str] = &["password"];

impl Database {
    // -- Persons --

    pub fn insert_person(&self, person: &NewPerson<'_>) -> Result<PersonRow> {
        self.with_conn(|conn| {
            let id = insert_person_row(conn, person)?;
            query_person(conn, id)?.ok_or(DbError::NotFound("person"))
        })
    }

    pub fn list_persons(&self) -> Result<Vec<PersonRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name, mail, age FROM person ORDER BY id")?;
            let rows = stmt
                .query_map([], person_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_persons(&self) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM person", [], |row| row.get(0))?)
        })
    }

    // -- Accounts --

    /// Insert the person and its account in one transaction. Returns the new
    /// person id. A duplicate username leaves no person row behind.
    pub fn create_account(&self, account: &NewAccount<'_>) -> Result<i64> {
        self.with_transaction(|conn| {
            let person_id = insert_person_row(conn, &account.person)?;
            conn.execute(
                "INSERT INTO \"user\" (username, password, admin, personId) VALUES (?1, ?2, 0, ?3)",
                params![account.username, account.password_hash, person_id],
            )?;
            Ok(person_id)
        })
    }

    pub fn find_login(&self, username: &str) -> Result<Option<LoginRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT u.personId, u.password, u.admin, p.name, p.mail, p.age
                 FROM \"user\" AS u
                 INNER JOIN person AS p ON u.personId = p.id
                 WHERE u.username = ?1",
                [username],
                |row| {
                    Ok(LoginRow {
                        person_id: row.get(0)?,
                        password_hash: row.get(1)?,
                        is_admin: row.get::<_, i64>(2)? != 0,
                        name: row.get(3)?,
                        mail: row.get(4)?,
                        age: row.get(5)?,
                    })
                },
            )
            .optional()
        })
    }

    /// Grant admin rights. Runs as its own transaction.
    pub fn promote(&self, username: &str) -> Result<()> {
        self.with_transaction(|conn| {
            let changed =
                conn.execute("UPDATE \"user\" SET admin = 1 WHERE username = ?1", [username])?;
            if changed == 0 {
                return Err(DbError::NotFound("account"));
            }
            info!("Account {} promoted to admin", username);
            Ok(())
        })
    }

    // -- Friends --

    /// Add a symmetric friendship edge. Adding an existing edge, in either
    /// orientation, is a no-op.
    pub fn add_friend(&self, own_id: i64, target: FriendTarget<'_>) -> Result<FriendOutcome> {
        self.with_conn(|conn| {
            let other_id = match target {
                FriendTarget::Id(id) => id,
                FriendTarget::Name(name) => query_person_id_for_username(conn, name)?
                    .ok_or(DbError::NotFound("account"))?,
            };

            if other_id == own_id {
                return Err(DbError::Invalid("cannot befriend oneself"));
            }

            let existing: i64 = conn.query_row(
                "SELECT COUNT(*) FROM friends
                 WHERE (p1 = ?1 AND p2 = ?2) OR (p1 = ?2 AND p2 = ?1)",
                params![own_id, other_id],
                |row| row.get(0),
            )?;
            if existing > 0 {
                debug!("Edge {}-{} already present", own_id, other_id);
                return Ok(FriendOutcome::AlreadyFriends);
            }

            // Stored lower id first so the primary key also catches a racing
            // insert of the reverse orientation.
            let (p1, p2) = (own_id.min(other_id), own_id.max(other_id));
            match conn.execute("INSERT INTO friends (p1, p2) VALUES (?1, ?2)", params![p1, p2]) {
                Ok(_) => Ok(FriendOutcome::Added),
                Err(e) => match DbError::from(e) {
                    DbError::Duplicate => Ok(FriendOutcome::AlreadyFriends),
                    DbError::MissingReference => Err(DbError::NotFound("person")),
                    other => Err(other),
                },
            }
        })
    }

    /// Friends of `person_id`, sorted by id.
    pub fn get_friends(&self, person_id: i64) -> Result<Vec<PersonRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.name, p.mail, p.age
                 FROM friends AS f
                 INNER JOIN person AS p
                    ON (f.p1 = ?1 AND f.p2 = p.id) OR (f.p2 = ?1 AND f.p1 = p.id)
                 ORDER BY p.id",
            )?;
            let rows = stmt
                .query_map([person_id], person_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_friends(&self, person_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM friends WHERE p1 = ?1 OR p2 = ?1",
                [person_id],
                |row| row.get(0),
            )?)
        })
    }

    // -- Forum --

    /// Insert a post and read it back so the caller sees the stored
    /// representation, including the server-assigned timestamp.
    pub fn insert_forum_post(&self, username: &str, message: &str) -> Result<ForumRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO forum (username, message) VALUES (?1, ?2)",
                params![username, message],
            )?;
            let id = conn.last_insert_rowid();

            conn.query_row(
                "SELECT id, username, ts, message FROM forum WHERE id = ?1",
                [id],
                forum_from_row,
            )
            .optional()?
            .ok_or(DbError::NotFound("forum post"))
        })
    }

    pub fn list_forum_posts(&self) -> Result<Vec<ForumRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, username, ts, message FROM forum ORDER BY ts ASC, id ASC")?;
            let rows = stmt
                .query_map([], forum_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Debug dumps --

    pub fn table_names(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT name FROM sqlite_master
                 WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\'
                 ORDER BY name",
            )?;
            let names = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(names)
        })
    }

    /// Dump every row of `table` as JSON objects keyed by column name.
    ///
    /// The name is first checked against `sqlite_master` through a bound
    /// parameter, then spliced in only as a quoted identifier.
    pub fn dump_table(&self, table: &str) -> Result<Vec<Map<String, Value>>> {
        self.with_conn(|conn| {
            let exists: i64 = conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE type = 'table' AND name = ?1 AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\'",
                [table],
                |row| row.get(0),
            )?;
            if exists == 0 {
                return Err(DbError::NotFound("table"));
            }

            let sql = format!("SELECT * FROM {}", quote_identifier(table));
            trace!("{}", sql);
            let mut stmt = conn.prepare(&sql)?;
            let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_owned).collect();

            let rows = stmt
                .query_map([], |row| {
                    let mut object = Map::with_capacity(columns.len());
                    for (idx, column) in columns.iter().enumerate() {
                        if REDACTED_COLUMNS.contains(&column.as_str()) {
                            continue;
                        }
                        object.insert(column.clone(), json_value(row.get_ref(idx)?));
                    }
                    Ok(object)
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Schema --

    /// Drop and recreate all application tables.
    pub fn reset(&self) -> Result<()> {
        self.with_transaction(migrations::reset)
    }
}

/// Quote an SQL identifier for splicing into statement text. Values must
/// never go through here; they are always bound.
pub fn quote_identifier(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn insert_person_row(conn: &Connection, person: &NewPerson<'_>) -> Result<i64> {
    conn.execute(
        "INSERT INTO person (name, mail, age) VALUES (?1, ?2, ?3)",
        params![person.name, person.mail, person.age],
    )?;
    Ok(conn.last_insert_rowid())
}

fn query_person(conn: &Connection, id: i64) -> Result<Option<PersonRow>> {
    conn.query_row(
        "SELECT id, name, mail, age FROM person WHERE id = ?1",
        [id],
        person_from_row,
    )
    .optional()
}

fn query_person_id_for_username(conn: &Connection, username: &str) -> Result<Option<i64>> {
    conn.query_row(
        "SELECT personId FROM \"user\" WHERE username = ?1",
        [username],
        |row| row.get(0),
    )
    .optional()
}

fn person_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PersonRow> {
    Ok(PersonRow {
        id: row.get(0)?,
        name: row.get(1)?,
        mail: row.get(2)?,
        age: row.get(3)?,
    })
}

fn forum_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ForumRow> {
    Ok(ForumRow {
        id: row.get(0)?,
        username: row.get(1)?,
        ts: row.get(2)?,
        message: row.get(3)?,
    })
}

fn json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(text) => Value::String(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(bytes) => Value::from(bytes.to_vec()),
    }
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
