use axum::{
    Form, Json,
    extract::rejection::FormRejection,
    http::HeaderMap,
};
use tracing::debug;

use bastion_types::api::{CreateAccountForm, CreateAdminForm, CsrfTokenResponse, LoginForm, PersonForm};

use crate::error::ApiError;
use crate::session::CurrentSession;

/// Header carrying the token on programmatic (fetch/XHR) calls.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// GET /api/csrfToken — the session's anti-forgery token, issued on first call.
pub async fn token(session: CurrentSession) -> Result<Json<CsrfTokenResponse>, ApiError> {
    Ok(Json(CsrfTokenResponse {
        token: session.issue_csrf_token().await?,
    }))
}

/// Check a presented token against the session's.
///
/// Every failure is the same 401; the reason only reaches the debug log.
pub async fn verify(session: &CurrentSession, presented: Option<&str>) -> Result<(), ApiError> {
    let presented = presented.filter(|t| !t.is_empty());

    let failure = match (session.csrf_token().await?, presented) {
        (None, _) => Some("session has no token"),
        (_, None) => Some("request carried no token"),
        (Some(expected), Some(given)) if constant_time_eq(expected.as_bytes(), given.as_bytes()) => {
            None
        }
        _ => Some("token mismatch"),
    };

    match failure {
        None => Ok(()),
        Some(reason) => {
            debug!(reason, "CSRF check failed");
            Err(ApiError::Unauthorized)
        }
    }
}

/// Forms that carry their token in a `_csrf` field.
pub trait CsrfField {
    fn csrf_field(&self) -> Option<&str>;
}

macro_rules! csrf_field {
    ($($form:ty),* $(,)?) => {
        $(impl CsrfField for $form {
            fn csrf_field(&self) -> Option<&str> {
                self.csrf.as_deref()
            }
        })*
    };
}

csrf_field!(LoginForm, CreateAccountForm, CreateAdminForm, PersonForm);

/// Unwrap a form body only once the request has proven it holds the session's
/// token.
///
/// A body that is not a readable form can only be vouched for by the header,
/// so a request without a valid token is a 401 whatever its body looks like.
pub async fn checked_form<T: CsrfField>(
    session: &CurrentSession,
    headers: &HeaderMap,
    form: Result<Form<T>, FormRejection>,
) -> Result<T, ApiError> {
    match form {
        Ok(Form(form)) => {
            verify(session, form_or_header(form.csrf_field(), headers)).await?;
            Ok(form)
        }
        Err(rejection) => {
            verify(session, header_token(headers)).await?;
            debug!(%rejection, "Unreadable form body");
            Err(ApiError::BadRequest("malformed form"))
        }
    }
}

/// Token from a form's `_csrf` field, falling back to the header.
pub fn form_or_header<'a>(field: Option<&'a str>, headers: &'a HeaderMap) -> Option<&'a str> {
    field
        .filter(|t| !t.is_empty())
        .or_else(|| header_token(headers))
}

pub fn header_token(headers: &HeaderMap) -> Option<&str> {
    headers.get(CSRF_HEADER).and_then(|v| v.to_str().ok())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
