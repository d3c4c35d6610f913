//! Endpoint catalogue for the gotux REST API.
//!
//! SYSTEM CONTEXT
//! ==============
//! Each endpoint is a pure `*_request` constructor that describes method,
//! path and payload, plus a thin async wrapper that hands the descriptor to
//! the pipeline and decodes the payload. Nothing here touches credentials,
//! translates errors or mutates session state.
//!
//! `public` is the exception: its wrappers take a `PublicChannel`, which has
//! no access to the session at all.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

#[path = "api_admin.rs"]
pub mod admin;
#[path = "api_auth.rs"]
pub mod auth;
#[path = "api_images.rs"]
pub mod images;
#[path = "api_public.rs"]
pub mod public;
#[path = "api_settings.rs"]
pub mod settings;
