use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: i64,
    pub name: String,
    pub mail: String,
    pub age: Option<i64>,
}

/// Identity snapshot stored in a session after a successful login.
///
/// Field names match what the browser client reads (`id`, `userName`, `isAdmin`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthInfo {
    #[serde(rename = "id")]
    pub person_id: i64,
    #[serde(rename = "userName")]
    pub username: String,
    pub name: String,
    pub mail: String,
    pub age: Option<i64>,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
}

/// Forum posts are stored HTML-escaped, so `message` is always safe to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForumPost {
    pub id: i64,
    pub username: String,
    pub ts: DateTime<Utc>,
    pub message: String,
}
