use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{info, warn};

use bastion_db::models::ForumRow;
use bastion_types::api::AddMessageRequest;
use bastion_types::models::{AuthInfo, ForumPost};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::validate;

/// POST /api/addMessage — body `{message}`. The text is escaped before it is
/// stored, and the stored row is returned.
pub async fn add_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthInfo>,
    Json(req): Json<AddMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let message = validate::message(&req.message)?;

    let username = auth.username;
    let row = state
        .blocking(move |db| db.insert_forum_post(&username, &message))
        .await?;

    info!("Forum post {} added by {}", row.id, row.username);
    Ok((StatusCode::CREATED, Json(to_post(row))))
}

/// GET /api/messages — every post, oldest first.
pub async fn list_messages(
    State(state): State<AppState>,
) -> Result<Json<Vec<ForumPost>>, ApiError> {
    let rows = state.blocking(|db| db.list_forum_posts()).await?;
    Ok(Json(rows.into_iter().map(to_post).collect()))
}

fn to_post(row: ForumRow) -> ForumPost {
    let ts = parse_ts(&row.ts).unwrap_or_else(|e| {
        warn!("Corrupt ts '{}' on forum post {}: {}", row.ts, row.id, e);
        DateTime::default()
    });

    ForumPost {
        id: row.id,
        username: validate::escape_html(&row.username),
        ts,
        message: row.message,
    }
}

// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS.SSS" without timezone.
// Parse as naive UTC and convert.
fn parse_ts(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").map(|ndt| ndt.and_utc())
}
