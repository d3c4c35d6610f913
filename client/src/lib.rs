//! # gotux-client
//!
//! Session-aware client for the gotux image-hosting service.
//!
//! SYSTEM CONTEXT
//! ==============
//! A shell (the `gotux` CLI, or a browser front end built on the `hydrate`
//! feature) owns one [`SessionState`], hands it to a [`RequestPipeline`] and
//! a [`Navigator`], and then issues calls through the `net::api` wrappers.
//!
//! - `state` holds the session and its durable mirror.
//! - `net` holds the request pipeline, notices and the endpoint catalogue.
//! - `router` holds the route table, the guard and navigation.

pub mod config;
pub mod error;
pub mod net;
pub mod router;
pub mod state;

pub use config::ClientConfig;
pub use error::{ApiError, ConfigError, StoreError};
pub use net::notice::{LogNotifier, Notice, NoticeKind, Notifier};
pub use net::pipeline::{ApiRequest, PublicChannel, RequestPipeline, SessionEvent};
pub use router::navigator::Navigator;
pub use state::session::{Authenticator, Session, SessionState};
