use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use tracing::info;

use bastion_db::models::{FriendOutcome, FriendTarget};
use bastion_types::api::AddFriendQuery;
use bastion_types::models::{AuthInfo, Person};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::persons::to_person;
use crate::validate;

/// GET /api/getFriends — the caller's own friends.
pub async fn own_friends(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthInfo>,
) -> Result<Json<Vec<Person>>, ApiError> {
    friends_json(&state, auth.person_id).await
}

/// GET /api/getFriends/{person_id} — admin only.
pub async fn friends_of(
    State(state): State<AppState>,
    Path(person_id): Path<String>,
) -> Result<Json<Vec<Person>>, ApiError> {
    let person_id = validate::person_id(&person_id)?;
    friends_json(&state, person_id).await
}

/// GET /api/countFriends/{id} — admin only.
pub async fn count_friends(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<i64>, ApiError> {
    let id = validate::person_id(&id)?;
    let count = state.blocking(move |db| db.count_friends(id)).await?;
    Ok(Json(count))
}

/// POST /api/addFriend?otherId=&otherName= — `otherId` wins when both are given.
pub async fn add_friend(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthInfo>,
    Query(query): Query<AddFriendQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let own_id = auth.person_id;
    let other_id = match query.other_id.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(validate::person_id(raw)?),
        None => None,
    };
    let other_name = query.other_name.filter(|s| !s.is_empty());

    let outcome = state
        .blocking(move |db| {
            let target = match (other_id, other_name.as_deref()) {
                (Some(id), _) => FriendTarget::Id(id),
                (None, Some(name)) => FriendTarget::Name(name),
                (None, None) => return Err(bastion_db::DbError::Invalid("missing friend")),
            };
            db.add_friend(own_id, target)
        })
        .await?;

    match outcome {
        FriendOutcome::Added => info!("Person {} added a friend", own_id),
        FriendOutcome::AlreadyFriends => info!("Person {} re-added an existing friend", own_id),
    }

    Ok(Json(true))
}

async fn friends_json(state: &AppState, person_id: i64) -> Result<Json<Vec<Person>>, ApiError> {
    let rows = state.blocking(move |db| db.get_friends(person_id)).await?;
    Ok(Json(rows.into_iter().map(to_person).collect()))
}
