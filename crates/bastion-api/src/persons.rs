use axum::{
    Form, Json,
    extract::{State, rejection::FormRejection},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use tracing::info;

use bastion_db::models::{NewPerson, PersonRow};
use bastion_types::api::PersonForm;
use bastion_types::models::Person;

use crate::auth::AppState;
use crate::csrf;
use crate::error::ApiError;
use crate::session::CurrentSession;
use crate::validate;

/// Person fields are stored as typed and escaped on the way out.
pub(crate) fn to_person(row: PersonRow) -> Person {
    Person {
        id: row.id,
        name: validate::escape_html(&row.name),
        mail: validate::escape_html(&row.mail),
        age: row.age,
    }
}

/// POST /api/submitform — inserts a bare person row.
pub async fn submit_person(
    State(state): State<AppState>,
    session: CurrentSession,
    headers: HeaderMap,
    form: Result<Form<PersonForm>, FormRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let form = csrf::checked_form(&session, &headers, form).await?;

    validate::field(&form.name)?;
    validate::field(&form.mail)?;
    let age = validate::age(&form.age)?;

    let PersonForm { name, mail, .. } = form;
    let row = state
        .blocking(move |db| {
            db.insert_person(&NewPerson {
                name: &name,
                mail: &mail,
                age,
            })
        })
        .await?;

    info!("Person {} submitted", row.id);
    Ok((StatusCode::CREATED, Json(to_person(row))))
}

/// GET /listdata — every person row.
pub async fn list_persons(State(state): State<AppState>) -> Result<Json<Vec<Person>>, ApiError> {
    let rows = state.blocking(|db| db.list_persons()).await?;
    Ok(Json(rows.into_iter().map(to_person).collect()))
}
