//! Current-location owner.
//!
//! DESIGN
//! ======
//! `navigate` resolves the target, follows static redirects, and runs the
//! guard on each hop against one session snapshot. Hops are bounded by
//! [`MAX_REDIRECTS`]; a cycle is reported as an error instead of spinning.
//!
//! `handle_event` is the subscriber side of the pipeline's invalidation
//! signal. Forcing `/login` while already there is a no-op, so redundant
//! events from concurrent 401s are harmless.

#[cfg(test)]
#[path = "navigator_test.rs"]
mod navigator_test;

use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::TryRecvError;

use super::guard::{self, GuardDecision, GuardRule};
use super::table::{LOGIN_PATH, RouteTable, normalize_path};
use crate::net::pipeline::SessionEvent;
use crate::state::session::SessionState;

pub const MAX_REDIRECTS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("no route matches `{0}`")]
    UnknownRoute(String),

    #[error("redirect loop while navigating to `{path}` ({hops} hops)")]
    RedirectLoop { path: String, hops: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationOutcome {
    pub requested: String,
    /// Where navigation ended up.
    pub location: String,
    /// First guard rule that redirected, if any.
    pub blocked_by: Option<GuardRule>,
    /// Whether the location differs from the previous one.
    pub changed: bool,
}

impl NavigationOutcome {
    /// The requested route was reached (static redirects aside).
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.blocked_by.is_none()
    }
}

#[derive(Debug)]
pub struct Navigator {
    table: RouteTable,
    session: SessionState,
    current: Option<String>,
}

impl Navigator {
    #[must_use]
    pub fn new(table: RouteTable, session: SessionState) -> Self {
        Self { table, session, current: None }
    }

    #[must_use]
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Navigate to `target`, applying static redirects and the guard.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown path or a redirect cycle.
    pub fn navigate(&mut self, target: &str) -> Result<NavigationOutcome, NavigationError> {
        let requested = normalize_path(target);
        let session = self.session.snapshot();
        let mut path = requested.clone();
        let mut blocked_by = None;

        for _ in 0..=MAX_REDIRECTS {
            let route = self
                .table
                .resolve(&path)
                .ok_or_else(|| NavigationError::UnknownRoute(path.clone()))?;
            if let Some(redirect) = &route.redirect {
                path.clone_from(redirect);
                continue;
            }
            if let GuardDecision::Redirect { to, rule } = guard::evaluate(route, &session) {
                tracing::debug!(from = %path, to, rule = rule.message(), "navigation redirected");
                blocked_by.get_or_insert(rule);
                path = to.to_owned();
                continue;
            }

            let changed = self.current.as_deref() != Some(path.as_str());
            self.current = Some(path.clone());
            return Ok(NavigationOutcome { requested, location: path, blocked_by, changed });
        }

        Err(NavigationError::RedirectLoop { path: requested, hops: MAX_REDIRECTS })
    }

    /// Move to the login page without consulting the guard.
    pub fn force_login(&mut self) -> NavigationOutcome {
        let changed = self.current.as_deref() != Some(LOGIN_PATH);
        if changed {
            tracing::info!("redirecting to login");
            self.current = Some(LOGIN_PATH.to_owned());
        }
        NavigationOutcome {
            requested: LOGIN_PATH.to_owned(),
            location: LOGIN_PATH.to_owned(),
            blocked_by: None,
            changed,
        }
    }

    pub fn handle_event(&mut self, event: SessionEvent) -> NavigationOutcome {
        match event {
            SessionEvent::Invalidated => self.force_login(),
        }
    }

    /// Apply every pending event. Returns `true` if any invalidation was
    /// pending, even when the navigator was already on the login page.
    pub fn drain_events(&mut self, events: &mut Receiver<SessionEvent>) -> bool {
        let mut invalidated = false;
        loop {
            match events.try_recv() {
                Ok(event) => {
                    self.handle_event(event);
                    invalidated = true;
                }
                // Only invalidations are ever sent, so missed ones mean the same.
                Err(TryRecvError::Lagged(_)) => {
                    self.force_login();
                    invalidated = true;
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return invalidated,
            }
        }
    }
}
