//! Sessions on top of `tower-sessions`.
//!
//! The cookie carries only the session id. Records live in process memory and
//! expire after a period of inactivity; every request that loads a live
//! session pushes its deadline forward, and a background sweep drops the
//! expired ones.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{Extensions, request::Parts};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use time::{Duration, OffsetDateTime};
use tokio::task::JoinHandle;
use tower_sessions::cookie::SameSite;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store;
use tower_sessions::{ExpiredDeletion, Expiry, Session, SessionManagerLayer, SessionStore};
use tracing::{debug, error, warn};

use bastion_types::models::AuthInfo;

use crate::error::ApiError;

pub const SESSION_COOKIE: &str = "sid";

const AUTH_KEY: &str = "auth";
const CSRF_KEY: &str = "csrf_token";

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// Set the `Secure` flag on the cookie. Off only in development.
    pub secure: bool,
    /// Idle time after which a session is gone.
    pub idle: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            secure: true,
            idle: Duration::hours(12),
        }
    }
}

/// Cookie and expiry policy for every session.
pub fn layer(
    store: MemorySessionStore,
    options: SessionOptions,
) -> SessionManagerLayer<MemorySessionStore> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE)
        .with_path("/")
        .with_http_only(true)
        .with_same_site(SameSite::Strict)
        .with_secure(options.secure)
        .with_expiry(Expiry::OnInactivity(options.idle))
        .with_always_save(true)
}

// -- Store --

/// In-process session records keyed by id. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    records: Arc<Mutex<HashMap<Id, Record>>>,
}

impl MemorySessionStore {
    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Every critical section is a single map operation, so a poisoned map is
    // still consistent.
    fn records(&self) -> MutexGuard<'_, HashMap<Id, Record>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn is_active(record: &Record) -> bool {
    record.expiry_date > OffsetDateTime::now_utc()
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        let mut records = self.records();
        while records.contains_key(&record.id) {
            record.id = Id::default();
        }
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.records().insert(record.id, record.clone());
        Ok(())
    }

    async fn load(&self, id: &Id) -> session_store::Result<Option<Record>> {
        let mut records = self.records();
        match records.get(id) {
            Some(record) if is_active(record) => Ok(Some(record.clone())),
            Some(_) => {
                records.remove(id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: &Id) -> session_store::Result<()> {
        self.records().remove(id);
        Ok(())
    }
}

#[async_trait]
impl ExpiredDeletion for MemorySessionStore {
    async fn delete_expired(&self) -> session_store::Result<()> {
        let mut records = self.records();
        let before = records.len();
        records.retain(|_, record| is_active(record));

        let dropped = before - records.len();
        if dropped > 0 {
            debug!("Dropped {} expired sessions", dropped);
        }
        Ok(())
    }
}

/// Sweep expired sessions every `period` until the runtime shuts down.
pub fn spawn_expiry_sweep(store: MemorySessionStore, period: std::time::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            if let Err(e) = store.delete_expired().await {
                warn!("Session sweep failed: {}", e);
            }
        }
    })
}

// -- Request side --

/// The session bound to the current request, with typed access to the two
/// values Bastion keeps in it.
#[derive(Debug, Clone)]
pub struct CurrentSession(Session);

impl CurrentSession {
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    pub fn from_extensions(extensions: &Extensions) -> Option<Self> {
        extensions.get::<Session>().cloned().map(Self)
    }

    pub async fn auth_info(&self) -> Result<Option<AuthInfo>, ApiError> {
        Ok(self.0.get(AUTH_KEY).await?)
    }

    pub async fn csrf_token(&self) -> Result<Option<String>, ApiError> {
        Ok(self.0.get(CSRF_KEY).await?)
    }

    /// Return the session's CSRF token, issuing one on first use.
    pub async fn issue_csrf_token(&self) -> Result<String, ApiError> {
        if let Some(token) = self.csrf_token().await? {
            return Ok(token);
        }

        let token = random_token();
        self.0.insert(CSRF_KEY, &token).await?;
        Ok(token)
    }

    /// Install `auth` under a fresh session id. The CSRF token carries over.
    pub async fn log_in(&self, auth: &AuthInfo) -> Result<(), ApiError> {
        self.0.cycle_id().await?;
        self.0.insert(AUTH_KEY, auth).await?;
        Ok(())
    }

    /// Drop the record and clear the cookie.
    pub async fn destroy(&self) -> Result<(), ApiError> {
        self.0.flush().await?;
        Ok(())
    }
}

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_extensions(&parts.extensions).ok_or_else(|| {
            error!("Session layer missing from the router");
            ApiError::Internal
        })
    }
}

/// 256 random bits, base64url without padding.
pub(crate) fn random_token() -> String {
    let bytes: [u8; 32] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}
