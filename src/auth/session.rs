use std::time::Duration;

use actix_web::{FromRequest, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};
use moka::sync::Cache;
use uuid::Uuid;

use crate::{error::ApiError, model::user::Role};

/// Cookie carrying the opaque session token.
pub const SESSION_COOKIE: &str = "session";

/// Identity recorded in the session at login time.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,
}

/// Server-side session store. Tokens are opaque v4 UUIDs; entries expire
/// after the configured TTL so stale identities age out on their own.
pub struct SessionStore {
    sessions: Cache<String, SessionUser>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Cache::builder()
                .max_capacity(100_000)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Creates a session for the user and returns its token.
    pub fn create(&self, user: SessionUser) -> String {
        let token = Uuid::new_v4().to_string();
        self.sessions.insert(token.clone(), user);
        token
    }

    pub fn get(&self, token: &str) -> Option<SessionUser> {
        self.sessions.get(token)
    }

    /// Removes the session. Idempotent.
    pub fn destroy(&self, token: &str) {
        self.sessions.invalidate(token);
    }
}

/// Extractor for handlers that require a logged-in caller. Resolves the
/// session cookie against the store before the handler body runs; a missing
/// or expired session short-circuits to 401.
pub struct AuthSession {
    pub token: String,
    pub user: SessionUser,
}

impl FromRequest for AuthSession {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let token = match req.cookie(SESSION_COOKIE) {
            Some(cookie) => cookie.value().to_owned(),
            None => return ready(Err(ApiError::Unauthenticated)),
        };

        let store = match req.app_data::<Data<SessionStore>>() {
            Some(s) => s,
            None => return ready(Err(ApiError::Internal)),
        };

        match store.get(&token) {
            Some(user) => ready(Ok(AuthSession { token, user })),
            None => ready(Err(ApiError::Unauthenticated)),
        }
    }
}

impl AuthSession {
    /// Guard for admin-only operations.
    pub fn require_manager(&self) -> Result<(), ApiError> {
        if self.is_manager() {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }

    /// Guard for per-user reads: the owner themselves, or any manager.
    pub fn require_self_or_manager(&self, user_id: u64) -> Result<(), ApiError> {
        if self.is_manager() || self.user.user_id == user_id {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }

    pub fn is_manager(&self) -> bool {
        self.user.role == Role::Manager
    }
}
