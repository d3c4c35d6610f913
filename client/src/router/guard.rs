//! Navigation guard.
//!
//! Rules, first match wins:
//! 1. auth required and not logged in: to login
//! 2. guest page (login/register) while logged in: to home
//! 3. admin required and not admin: to home
//! 4. allow
//!
//! Rule 1 precedes rule 3, so an admin page visited while logged out goes to
//! login, not home.

#[cfg(test)]
#[path = "guard_test.rs"]
mod guard_test;

use super::table::{HOME_PATH, LOGIN_PATH, RouteDescriptor};
use crate::state::session::{Session, SessionState};

/// Read-only view of the session flags the guard needs.
pub trait SessionView {
    fn is_logged_in(&self) -> bool;
    fn is_admin(&self) -> bool;
}

impl SessionView for Session {
    fn is_logged_in(&self) -> bool {
        Session::is_logged_in(self)
    }

    fn is_admin(&self) -> bool {
        Session::is_admin(self)
    }
}

impl SessionView for SessionState {
    fn is_logged_in(&self) -> bool {
        SessionState::is_logged_in(self)
    }

    fn is_admin(&self) -> bool {
        SessionState::is_admin(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardRule {
    LoginRequired,
    AlreadyLoggedIn,
    AdminRequired,
}

impl GuardRule {
    #[must_use]
    pub fn redirect_target(self) -> &'static str {
        match self {
            Self::LoginRequired => LOGIN_PATH,
            Self::AlreadyLoggedIn | Self::AdminRequired => HOME_PATH,
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::LoginRequired => "login required",
            Self::AlreadyLoggedIn => "already logged in",
            Self::AdminRequired => "administrator role required",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect { to: &'static str, rule: GuardRule },
}

impl GuardDecision {
    fn redirect(rule: GuardRule) -> Self {
        Self::Redirect { to: rule.redirect_target(), rule }
    }
}

#[must_use]
pub fn evaluate<S>(target: &RouteDescriptor, session: &S) -> GuardDecision
where
    S: SessionView + ?Sized,
{
    let logged_in = session.is_logged_in();
    if target.requires_auth && !logged_in {
        return GuardDecision::redirect(GuardRule::LoginRequired);
    }
    if target.guest && logged_in {
        return GuardDecision::redirect(GuardRule::AlreadyLoggedIn);
    }
    if target.requires_admin && !session.is_admin() {
        return GuardDecision::redirect(GuardRule::AdminRequired);
    }
    GuardDecision::Allow
}
