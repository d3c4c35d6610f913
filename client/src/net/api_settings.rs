//! Per-user upload and link settings.

use crate::error::ApiError;
use crate::net::pipeline::{ApiRequest, RequestPipeline};
use crate::net::types::{MessageResponse, UserSettings};

#[must_use]
pub fn get_request() -> ApiRequest {
    ApiRequest::get("/user/settings")
}

/// # Errors
///
/// Returns `ApiError::InvalidRequest` if the settings cannot be serialized.
pub fn update_request(settings: &UserSettings) -> Result<ApiRequest, ApiError> {
    ApiRequest::put("/user/settings").try_json(settings)
}

/// # Errors
///
/// Returns the pipeline's classified error.
pub async fn get(pipeline: &RequestPipeline) -> Result<UserSettings, ApiError> {
    pipeline.send_json(get_request()).await
}

/// # Errors
///
/// Returns the pipeline's classified error.
pub async fn update(pipeline: &RequestPipeline, settings: &UserSettings) -> Result<MessageResponse, ApiError> {
    pipeline.send_json(update_request(settings)?).await
}
