pub mod admin;
pub mod auth;
pub mod csrf;
pub mod error;
pub mod forum;
pub mod friends;
pub mod middleware;
pub mod persons;
pub mod router;
pub mod session;
pub mod validate;

pub use auth::{AppState, AppStateInner};
pub use error::ApiError;
pub use session::SessionOptions;
pub use router::router;
