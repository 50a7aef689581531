use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::auth::{self, AppState};
use crate::middleware::{require_admin, require_auth, require_csrf_header};
use crate::{admin, csrf, forum, friends, persons, session};

/// Build the full application router.
///
/// Every request runs inside the session layer; a session is only stored
/// (and its cookie set) once something is written to it. Mutating API routes
/// then pass the CSRF header check, then the auth/admin guard. Form routes
/// check the `_csrf` field in the handler before reading anything else.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/login", post(auth::login))
        .route("/api/ownInfo", get(auth::own_info))
        .route("/api/createAccount", post(auth::create_account))
        .route("/api/csrfToken", get(csrf::token))
        .route("/api/messages", get(forum::list_messages));

    let protected_routes = Router::new()
        .route("/api/getFriends", get(friends::own_friends))
        .route("/api/submitform", post(persons::submit_person))
        .route("/listdata", get(persons::list_persons))
        .route_layer(middleware::from_fn(require_auth));

    let protected_api_routes = Router::new()
        .route("/api/addFriend", post(friends::add_friend))
        .route("/api/addMessage", post(forum::add_message))
        .route("/api/logout", post(auth::logout))
        .route_layer(middleware::from_fn(require_auth))
        .route_layer(middleware::from_fn(require_csrf_header));

    let admin_routes = Router::new()
        .route("/api/getFriends/{person_id}", get(friends::friends_of))
        .route("/api/countFriends/{id}", get(friends::count_friends))
        .route("/tabledata/{tablename}", get(admin::table_data))
        .route("/api/createAdmin", post(auth::create_admin))
        .route_layer(middleware::from_fn(require_admin));

    let admin_api_routes = Router::new()
        .route("/api/resetdb", post(admin::reset_db))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn(require_csrf_header));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(protected_api_routes)
        .merge(admin_routes)
        .merge(admin_api_routes)
        .layer(session::layer(state.sessions.clone(), state.session_options))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
