//! Session state and its durable mirror.

pub mod session;
pub mod store;
