//! Administrator endpoints. The server enforces the admin role; the route
//! guard only keeps non-admins from reaching the views that call these.

use serde_json::json;

use crate::error::ApiError;
use crate::net::pipeline::{ApiRequest, RequestPipeline};
use crate::net::types::{ImagePage, ListQuery, SystemStats, UserPage, UserStatus, UserUpdateResponse};

#[must_use]
pub fn users_request(query: &ListQuery) -> ApiRequest {
    ApiRequest::get("/admin/users").query(query.to_pairs())
}

#[must_use]
pub fn user_status_request(id: u64, status: UserStatus) -> ApiRequest {
    ApiRequest::put(format!("/admin/users/{id}/status")).json(json!({ "status": status }))
}

/// `storage_quota` in bytes; `0` means unlimited.
#[must_use]
pub fn user_quota_request(id: u64, storage_quota: i64) -> ApiRequest {
    ApiRequest::put(format!("/admin/users/{id}/quota")).json(json!({ "storage_quota": storage_quota }))
}

#[must_use]
pub fn images_request(query: &ListQuery) -> ApiRequest {
    ApiRequest::get("/admin/images").query(query.to_pairs())
}

#[must_use]
pub fn stats_request() -> ApiRequest {
    ApiRequest::get("/admin/stats")
}

// =============================================================================
// WRAPPERS
// =============================================================================

/// # Errors
///
/// Returns the pipeline's classified error.
pub async fn users(pipeline: &RequestPipeline, query: &ListQuery) -> Result<UserPage, ApiError> {
    pipeline.send_json(users_request(query)).await
}

/// # Errors
///
/// Returns the pipeline's classified error.
pub async fn set_user_status(
    pipeline: &RequestPipeline,
    id: u64,
    status: UserStatus,
) -> Result<UserUpdateResponse, ApiError> {
    pipeline.send_json(user_status_request(id, status)).await
}

/// # Errors
///
/// Returns the pipeline's classified error.
pub async fn set_user_quota(
    pipeline: &RequestPipeline,
    id: u64,
    storage_quota: i64,
) -> Result<UserUpdateResponse, ApiError> {
    pipeline
        .send_json(user_quota_request(id, storage_quota))
        .await
}

/// # Errors
///
/// Returns the pipeline's classified error.
pub async fn images(pipeline: &RequestPipeline, query: &ListQuery) -> Result<ImagePage, ApiError> {
    pipeline.send_json(images_request(query)).await
}

/// # Errors
///
/// Returns the pipeline's classified error.
pub async fn stats(pipeline: &RequestPipeline) -> Result<SystemStats, ApiError> {
    pipeline.send_json(stats_request()).await
}
