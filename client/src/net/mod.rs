//! Networking: the request pipeline, user-visible notices, the endpoint
//! catalogue and the shared wire schema.

pub mod api;
pub mod notice;
pub mod pipeline;
pub mod types;
