//! Database row types. These map directly to SQLite rows and stay separate
//! from the wire types in bastion-types.

pub struct PersonRow {
    pub id: i64,
    pub name: String,
    pub mail: String,
    pub age: Option<i64>,
}

/// Account joined with its person, as needed to authenticate.
pub struct LoginRow {
    pub person_id: i64,
    pub password_hash: String,
    pub is_admin: bool,
    pub name: String,
    pub mail: String,
    pub age: Option<i64>,
}

pub struct ForumRow {
    pub id: i64,
    pub username: String,
    /// `YYYY-MM-DD HH:MM:SS.SSS`, UTC.
    pub ts: String,
    pub message: String,
}

pub struct NewPerson<'a> {
    pub name: &'a str,
    pub mail: &'a str,
    pub age: Option<i64>,
}

pub struct NewAccount<'a> {
    pub username: &'a str,
    pub password_hash: &'a str,
    pub person: NewPerson<'a>,
}

/// Who to befriend: a person id, or a username resolved through the account table.
#[derive(Debug, Clone, Copy)]
pub enum FriendTarget<'a> {
    Id(i64),
    Name(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendOutcome {
    Added,
    AlreadyFriends,
}
