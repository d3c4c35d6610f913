//! Auth-session state for the current user.
//!
//! SYSTEM CONTEXT
//! ==============
//! `SessionState` is the single owner of the in-memory session. The request
//! pipeline reads the token from it before every dispatch, the route guard
//! reads the derived flags, and the durable store is a write-through mirror
//! loaded once at construction.
//!
//! DESIGN
//! ======
//! Every mutation takes the lock, updates memory, then mirrors to the store
//! before releasing it, so the durable order always matches the in-memory
//! order. The lock is never held across an `.await`.
//!
//! A token without a profile (reload between `set_token` and
//! `set_user_info`) is the profile-pending state: logged in, not admin.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::store::{MemoryStore, SessionStore, TOKEN_KEY, USER_INFO_KEY};
use crate::error::ApiError;
use crate::net::types::{LoginPayload, ProfileResponse, ProfileUpdate, UserProfile};

// =============================================================================
// SESSION VALUE
// =============================================================================

/// Snapshot of the current session.
#[derive(Clone, Default, PartialEq)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<UserProfile>,
}

impl Session {
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(UserProfile::is_admin)
    }

    /// Logged in, but the profile has not been fetched yet.
    #[must_use]
    pub fn profile_pending(&self) -> bool {
        self.is_logged_in() && self.user.is_none()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("user", &self.user.as_ref().map(|u| &u.username))
            .finish()
    }
}

// =============================================================================
// AUTH COLLABORATOR
// =============================================================================

/// External source of tokens and profiles. The request pipeline implements
/// this through the auth API wrappers; tests substitute fakes.
#[async_trait::async_trait]
pub trait Authenticator: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<LoginPayload, ApiError>;

    async fn fetch_profile(&self) -> Result<ProfileResponse, ApiError>;

    async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError>;
}

// =============================================================================
// SESSION STATE
// =============================================================================

/// Shared handle to the session. Clones refer to the same session.
#[derive(Clone)]
pub struct SessionState {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    session: Mutex<Session>,
    store: Box<dyn SessionStore>,
}

impl SessionState {
    /// Build the session from whatever `store` holds. A missing, `null` or
    /// corrupt profile entry loads as "no profile".
    pub fn load(store: impl SessionStore + 'static) -> Self {
        let token = store.get(TOKEN_KEY).filter(|t| !t.is_empty());
        let user = store.get(USER_INFO_KEY).and_then(|raw| decode_profile(&store, &raw));
        tracing::debug!(logged_in = token.is_some(), has_profile = user.is_some(), "session loaded");
        Self {
            inner: Arc::new(SessionInner { session: Mutex::new(Session { token, user }), store: Box::new(store) }),
        }
    }

    /// Anonymous session backed by a fresh `MemoryStore`.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::load(MemoryStore::new())
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.lock().token.clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<UserProfile> {
        self.lock().user.clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.lock().clone()
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.lock().is_logged_in()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.lock().is_admin()
    }

    #[must_use]
    pub fn profile_pending(&self) -> bool {
        self.lock().profile_pending()
    }

    /// Store `token` in memory and durably. An empty token clears it.
    pub fn set_token(&self, token: impl Into<String>) {
        let token = token.into();
        let mut session = self.lock();
        if token.is_empty() {
            session.token = None;
            self.mirror_remove(TOKEN_KEY);
        } else {
            self.mirror_set(TOKEN_KEY, &token);
            session.token = Some(token);
        }
    }

    /// Store the profile in memory and durably as JSON.
    pub fn set_user_info(&self, user: UserProfile) {
        let mut session = self.lock();
        self.store_user(&mut session, user);
    }

    /// Store the profile only if the session still holds `token`.
    ///
    /// A profile fetched for one session must not land in another: after a
    /// logout, a 401 invalidation or a re-login the response is dropped.
    fn set_user_info_if(&self, token: Option<&str>, user: UserProfile) -> bool {
        let mut session = self.lock();
        if session.token.as_deref() != token {
            tracing::debug!("profile response dropped; session changed while it was in flight");
            return false;
        }
        self.store_user(&mut session, user);
        true
    }

    fn store_user(&self, session: &mut Session, user: UserProfile) {
        match serde_json::to_string(&user) {
            Ok(raw) => self.mirror_set(USER_INFO_KEY, &raw),
            Err(e) => tracing::warn!(error = %e, "profile not persisted: encode failed"),
        }
        session.user = Some(user);
    }

    /// Clear token and profile. Returns `false` when there was nothing to
    /// clear; repeated calls are no-ops.
    pub fn logout(&self) -> bool {
        let mut session = self.lock();
        let had_state = session.token.is_some() || session.user.is_some();
        session.token = None;
        session.user = None;
        self.mirror_remove(TOKEN_KEY);
        self.mirror_remove(USER_INFO_KEY);
        if had_state {
            tracing::info!("session cleared");
        }
        had_state
    }

    /// Clear the session only if the current token is still `signed_with`
    /// (`None` for a request that went out without a credential).
    ///
    /// Used on the 401 path: a response to a request signed with an older
    /// token must not end a newer session, and only the first of several
    /// concurrent 401s for the same token reports `true`. An unsigned 401
    /// reports `true` as long as no login happened while it was in flight.
    pub(crate) fn invalidate(&self, signed_with: Option<&str>) -> bool {
        let mut session = self.lock();
        if session.token.as_deref() != signed_with {
            return false;
        }
        session.token = None;
        session.user = None;
        self.mirror_remove(TOKEN_KEY);
        self.mirror_remove(USER_INFO_KEY);
        tracing::info!(credentialed = signed_with.is_some(), "session invalidated by server");
        true
    }

    /// Authenticate, then store the token before the profile.
    ///
    /// # Errors
    ///
    /// Returns the authenticator's error; the session is unchanged on failure.
    pub async fn login<A>(&self, auth: &A, username: &str, password: &str) -> Result<LoginPayload, ApiError>
    where
        A: Authenticator + ?Sized,
    {
        let payload = auth.login(username, password).await?;
        self.set_token(payload.token.clone());
        self.set_user_info(payload.user.clone());
        tracing::info!(user = %payload.user.username, "logged in");
        Ok(payload)
    }

    /// Refetch the profile and replace the stored one. The response is only
    /// stored if the session that asked for it is still current.
    ///
    /// # Errors
    ///
    /// Returns the authenticator's error; the profile is unchanged on failure.
    pub async fn fetch_profile<A>(&self, auth: &A) -> Result<ProfileResponse, ApiError>
    where
        A: Authenticator + ?Sized,
    {
        let token = self.token();
        let response = auth.fetch_profile().await?;
        self.set_user_info_if(token.as_deref(), response.user.clone());
        Ok(response)
    }

    /// Push a profile change and store the server's updated profile, under
    /// the same current-session check as [`SessionState::fetch_profile`].
    ///
    /// # Errors
    ///
    /// Returns the authenticator's error; the profile is unchanged on failure.
    pub async fn update_profile<A>(&self, auth: &A, update: &ProfileUpdate) -> Result<UserProfile, ApiError>
    where
        A: Authenticator + ?Sized,
    {
        let token = self.token();
        let user = auth.update_profile(update).await?;
        self.set_user_info_if(token.as_deref(), user.clone());
        Ok(user)
    }

    fn mirror_set(&self, key: &str, value: &str) {
        if let Err(e) = self.inner.store.set(key, value) {
            tracing::warn!(key, error = %e, "session entry not persisted");
        }
    }

    fn mirror_remove(&self, key: &str) {
        if let Err(e) = self.inner.store.remove(key) {
            tracing::warn!(key, error = %e, "session entry not removed from store");
        }
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SessionState").field(&self.snapshot()).finish()
    }
}

fn decode_profile(store: &dyn SessionStore, raw: &str) -> Option<UserProfile> {
    match serde_json::from_str::<Option<UserProfile>>(raw) {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "discarding corrupt persisted profile");
            if let Err(e) = store.remove(USER_INFO_KEY) {
                tracing::warn!(error = %e, "corrupt profile entry not removed");
            }
            None
        }
    }
}
