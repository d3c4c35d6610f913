//! User-visible failure notices.
//!
//! The pipeline decides the category and message; rendering belongs to
//! whatever `Notifier` the shell installs.

#[cfg(test)]
#[path = "notice_test.rs"]
mod notice_test;

use crate::error::ApiError;

pub const MSG_SESSION_EXPIRED: &str = "Session expired, please log in again";
pub const MSG_PERMISSION_DENIED: &str = "You do not have permission to access this resource";
pub const MSG_NOT_FOUND: &str = "The requested resource does not exist";
pub const MSG_REQUEST_FAILED: &str = "Request failed";
pub const MSG_NETWORK: &str = "Network error, please check your connection";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeKind {
    SessionExpired,
    PermissionDenied,
    NotFound,
    /// Generic failure, including connectivity problems.
    Failure,
}

impl NoticeKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SessionExpired => "session-expired",
            Self::PermissionDenied => "permission-denied",
            Self::NotFound => "not-found",
            Self::Failure => "failure",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    /// Notice for a classified error. Server-supplied messages win over the
    /// generic text, except for session expiry which always uses its own.
    #[must_use]
    pub fn for_error(error: &ApiError) -> Self {
        match error {
            ApiError::Unauthorized { .. } => Self::new(NoticeKind::SessionExpired, MSG_SESSION_EXPIRED),
            ApiError::Forbidden { message } => {
                Self::new(NoticeKind::PermissionDenied, non_empty_or(message, MSG_PERMISSION_DENIED))
            }
            ApiError::NotFound { message } => Self::new(NoticeKind::NotFound, non_empty_or(message, MSG_NOT_FOUND)),
            ApiError::Server { message, .. } => Self::new(NoticeKind::Failure, non_empty_or(message, MSG_REQUEST_FAILED)),
            ApiError::Network(_) => Self::new(NoticeKind::Failure, MSG_NETWORK),
            ApiError::Decode(_) | ApiError::InvalidRequest(_) => Self::new(NoticeKind::Failure, MSG_REQUEST_FAILED),
        }
    }
}

fn non_empty_or(message: &str, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_owned()
    } else {
        message.to_owned()
    }
}

/// Sink for user-visible notices.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);
}

/// Routes notices to `tracing` at WARN.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: &Notice) {
        tracing::warn!(kind = notice.kind.as_str(), message = %notice.message, "notice");
    }
}
