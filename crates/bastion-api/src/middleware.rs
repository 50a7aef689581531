use axum::{extract::Request, middleware::Next, response::Response};
use tracing::debug;

use bastion_types::models::AuthInfo;

use crate::csrf;
use crate::error::ApiError;
use crate::session::CurrentSession;

/// Reject state-changing API calls whose `X-CSRF-TOKEN` header does not
/// match the session's token.
pub async fn require_csrf_header(req: Request, next: Next) -> Result<Response, ApiError> {
    let session = CurrentSession::from_extensions(req.extensions()).ok_or(ApiError::Unauthorized)?;
    let presented = csrf::header_token(req.headers()).map(str::to_owned);
    csrf::verify(&session, presented.as_deref()).await?;

    Ok(next.run(req).await)
}

/// Require a logged-in session; the identity is passed on as an
/// `Extension<AuthInfo>`.
pub async fn require_auth(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let auth = current_auth(CurrentSession::from_extensions(req.extensions())).await?;

    req.extensions_mut().insert(auth);
    Ok(next.run(req).await)
}

/// Like `require_auth`, but the identity must also be an admin. Non-admins
/// get exactly the same rejection as anonymous callers.
pub async fn require_admin(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let auth = current_auth(CurrentSession::from_extensions(req.extensions())).await?;
    if !auth.is_admin {
        debug!("Non-admin {} denied {}", auth.username, req.uri().path());
        return Err(ApiError::Unauthorized);
    }

    req.extensions_mut().insert(auth);
    Ok(next.run(req).await)
}

async fn current_auth(session: Option<CurrentSession>) -> Result<AuthInfo, ApiError> {
    let session = session.ok_or(ApiError::Unauthorized)?;
    session.auth_info().await?.ok_or(ApiError::Unauthorized)
}
