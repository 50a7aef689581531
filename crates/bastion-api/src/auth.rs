use std::sync::{Arc, LazyLock};

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Extension, Form, Json,
    extract::{State, rejection::FormRejection},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use tracing::{error, info, warn};

use bastion_db::Database;
use bastion_db::models::{LoginRow, NewAccount, NewPerson};
use bastion_types::api::{CreateAccountForm, CreateAccountResponse, CreateAdminForm, LoginForm};
use bastion_types::models::AuthInfo;

use crate::csrf;
use crate::error::ApiError;
use crate::session::{CurrentSession, MemorySessionStore, SessionOptions};
use crate::validate;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub sessions: MemorySessionStore,
    pub session_options: SessionOptions,
}

impl AppStateInner {
    pub fn new(db: Database, session_options: SessionOptions) -> AppState {
        Arc::new(Self {
            db,
            sessions: MemorySessionStore::default(),
            session_options,
        })
    }

    /// Run a store operation off the async runtime.
    pub async fn blocking<F, T>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> bastion_db::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ApiError::Internal
            })?
            .map_err(ApiError::from)
    }
}

/// Verified against when the username is unknown, so both failure paths
/// cost one argon2 verification.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("bastion-dummy-password").ok());

/// POST /api/login — form `{user, pw, _csrf}`.
pub async fn login(
    State(state): State<AppState>,
    session: CurrentSession,
    headers: HeaderMap,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Json<AuthInfo>, ApiError> {
    let form = csrf::checked_form(&session, &headers, form).await?;

    let username = form.user.clone();
    let password = form.pw;
    let row = state
        .blocking(move |db| {
            let row = db.find_login(&username)?;
            Ok(authenticate(row, &password))
        })
        .await?;

    let Some(row) = row else {
        warn!("Login failed");
        return Err(ApiError::LoginFailed);
    };

    // Person fields are free text; the identity goes back to the browser
    // escaped, like every other person listing.
    let auth = AuthInfo {
        person_id: row.person_id,
        username: form.user,
        name: validate::escape_html(&row.name),
        mail: validate::escape_html(&row.mail),
        age: row.age,
        is_admin: row.is_admin,
    };

    session.log_in(&auth).await?;
    info!("User {} logged in", auth.username);

    Ok(Json(auth))
}

/// POST /api/logout — destroys the session.
pub async fn logout(
    session: CurrentSession,
    Extension(auth): Extension<AuthInfo>,
) -> Result<Json<bool>, ApiError> {
    session.destroy().await?;
    info!("User {} logged out", auth.username);

    Ok(Json(true))
}

/// GET /api/ownInfo — the session's identity, or `null`.
pub async fn own_info(session: CurrentSession) -> Result<Json<Option<AuthInfo>>, ApiError> {
    Ok(Json(session.auth_info().await?))
}

/// POST /api/createAccount — creates a person and its account atomically.
pub async fn create_account(
    State(state): State<AppState>,
    session: CurrentSession,
    headers: HeaderMap,
    form: Result<Form<CreateAccountForm>, FormRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let form = csrf::checked_form(&session, &headers, form).await?;

    // Validate input
    validate::username(&form.username)?;
    validate::password(&form.password, &form.password_repeat)?;
    validate::field(&form.name)?;
    validate::field(&form.mail)?;
    let age = validate::age(&form.age)?;

    // Hash password with Argon2id
    let password_hash = hash_password(&form.password).map_err(|e| {
        error!("Password hashing failed: {}", e);
        ApiError::Internal
    })?;

    let CreateAccountForm {
        username,
        name,
        mail,
        ..
    } = form;
    let log_name = username.clone();

    let person_id = state
        .blocking(move |db| {
            db.create_account(&NewAccount {
                username: &username,
                password_hash: &password_hash,
                person: NewPerson {
                    name: &name,
                    mail: &mail,
                    age,
                },
            })
        })
        .await
        .map_err(|e| match e {
            ApiError::BadRequest(_) => ApiError::BadRequest("account could not be created"),
            other => other,
        })?;

    info!("Account {} created for person {}", log_name, person_id);

    Ok((StatusCode::CREATED, Json(CreateAccountResponse { person_id })))
}

/// POST /api/createAdmin — admin only; grants admin to an existing account.
pub async fn create_admin(
    State(state): State<AppState>,
    session: CurrentSession,
    Extension(auth): Extension<AuthInfo>,
    headers: HeaderMap,
    form: Result<Form<CreateAdminForm>, FormRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let form = csrf::checked_form(&session, &headers, form).await?;
    validate::username(&form.username)?;

    let username = form.username;
    state.blocking(move |db| db.promote(&username)).await?;

    info!("Admin {} promoted an account", auth.username);
    Ok(Json(true))
}

fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Stored password hash is unreadable: {}", e);
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Returns the row only when the password verifies. Unknown users still pay
/// for one verification.
fn authenticate(row: Option<LoginRow>, password: &str) -> Option<LoginRow> {
    match row {
        Some(row) if verify_password(password, &row.password_hash) => Some(row),
        Some(_) => None,
        None => {
            if let Some(dummy) = DUMMY_HASH.as_deref() {
                verify_password(password, dummy);
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(hash: String) -> LoginRow {
        LoginRow {
            person_id: 1,
            password_hash: hash,
            is_admin: false,
            name: "Alice".into(),
            mail: "alice@example.com".into(),
            age: Some(30),
        }
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("correct horse").unwrap();
        let b = hash_password("correct horse").unwrap();

        assert_ne!(a, b);
        assert!(a.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &a));
        assert!(verify_password("correct horse", &b));
    }

    #[test]
    fn authenticate_checks_password() {
        let hash = hash_password("correct horse").unwrap();

        assert!(authenticate(Some(row(hash.clone())), "correct horse").is_some());
        assert!(authenticate(Some(row(hash)), "wrong horse").is_none());
        assert!(authenticate(None, "correct horse").is_none());
    }

    #[test]
    fn plaintext_stored_password_never_matches() {
        assert!(!verify_password("hunter22", "hunter22"));
    }
}
