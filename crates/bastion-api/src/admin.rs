use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde_json::{Map, Value};
use tracing::{error, warn};

use bastion_types::models::AuthInfo;

use crate::auth::AppState;
use crate::error::ApiError;

/// GET /tabledata/{tablename} — admin debug dump of one table.
///
/// Unknown tables are rejected without echoing the name back.
pub async fn table_data(
    State(state): State<AppState>,
    Path(table): Path<String>,
) -> Result<Json<Vec<Map<String, Value>>>, ApiError> {
    let rows = state
        .blocking(move |db| db.dump_table(&table))
        .await
        .map_err(|e| match e {
            ApiError::BadRequest(_) => ApiError::BadRequest("unknown table"),
            other => other,
        })?;
    Ok(Json(rows))
}

/// POST /api/resetdb — drop and recreate the schema. Test fixtures only.
pub async fn reset_db(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthInfo>,
) -> Result<Json<&'static str>, ApiError> {
    warn!("Database reset requested by {}", auth.username);

    state.blocking(|db| db.reset()).await.map_err(|e| {
        error!("Database reset failed");
        e
    })?;

    Ok(Json("Database cleaned."))
}
