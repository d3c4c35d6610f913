//! Anonymous random-image endpoints.
//!
//! These go through [`PublicChannel`] so they work for visitors with no
//! session and never carry a credential, even when one exists.

use crate::error::ApiError;
use crate::net::pipeline::{ApiRequest, PublicChannel};
use crate::net::types::{Image, RandomImageFilter};

/// `GET /random`: metadata of a random public image.
#[must_use]
pub fn random_request(filter: &RandomImageFilter) -> ApiRequest {
    ApiRequest::get("/random").query(filter.to_pairs())
}

/// `GET /random/image`: the file itself.
#[must_use]
pub fn random_image_request(filter: &RandomImageFilter) -> ApiRequest {
    ApiRequest::get("/random/image").query(filter.to_pairs())
}

/// # Errors
///
/// Returns the classified error (404 when nothing matches the filter).
pub async fn random(channel: &PublicChannel, filter: &RandomImageFilter) -> Result<Image, ApiError> {
    channel.send_json(random_request(filter)).await
}

/// # Errors
///
/// Returns the classified error (404 when nothing matches the filter).
pub async fn random_image(channel: &PublicChannel, filter: &RandomImageFilter) -> Result<Vec<u8>, ApiError> {
    channel.send_bytes(random_image_request(filter)).await
}
