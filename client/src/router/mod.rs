//! Client-side routing: the static route table, the guard that gates every
//! transition, and the navigator that owns the current location.
//!
//! SYSTEM CONTEXT
//! ==============
//! The guard only reads the session. The navigator is the one place that
//! reacts to `SessionEvent::Invalidated`, so the request pipeline never needs
//! to know how navigation works.

pub mod guard;
pub mod navigator;
pub mod table;

pub use guard::{GuardDecision, GuardRule, SessionView};
pub use navigator::{NavigationError, NavigationOutcome, Navigator};
pub use table::{HOME_PATH, LOGIN_PATH, REGISTER_PATH, ROUTES, RouteDescriptor, RouteMeta, RouteNode, RouteTable};
