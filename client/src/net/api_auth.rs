//! Authentication and own-account endpoints.

use serde_json::json;

use crate::error::ApiError;
use crate::net::pipeline::{ApiRequest, RequestPipeline};
use crate::net::types::{
    LoginPayload, MessageResponse, ProfileResponse, ProfileUpdate, RegisterRequest, RegisterResponse, UserProfile,
    UserStats, UserUpdateResponse,
};
use crate::state::session::Authenticator;

#[must_use]
pub fn login_request(username: &str, password: &str) -> ApiRequest {
    ApiRequest::post("/auth/login").json(json!({ "username": username, "password": password }))
}

#[must_use]
pub fn register_request(request: &RegisterRequest) -> ApiRequest {
    ApiRequest::post("/auth/register").json(json!({
        "username": request.username,
        "email": request.email,
        "password": request.password,
    }))
}

#[must_use]
pub fn profile_request() -> ApiRequest {
    ApiRequest::get("/user/profile")
}

/// # Errors
///
/// Returns `ApiError::InvalidRequest` if the update cannot be serialized.
pub fn update_profile_request(update: &ProfileUpdate) -> Result<ApiRequest, ApiError> {
    ApiRequest::put("/user/profile").try_json(update)
}

#[must_use]
pub fn change_password_request(old_password: &str, new_password: &str) -> ApiRequest {
    ApiRequest::post("/user/change-password").json(json!({
        "old_password": old_password,
        "new_password": new_password,
    }))
}

#[must_use]
pub fn stats_request() -> ApiRequest {
    ApiRequest::get("/user/stats")
}

// =============================================================================
// WRAPPERS
// =============================================================================

/// # Errors
///
/// Returns the pipeline's classified error.
pub async fn login(pipeline: &RequestPipeline, username: &str, password: &str) -> Result<LoginPayload, ApiError> {
    pipeline.send_json(login_request(username, password)).await
}

/// # Errors
///
/// Returns the pipeline's classified error.
pub async fn register(pipeline: &RequestPipeline, request: &RegisterRequest) -> Result<RegisterResponse, ApiError> {
    pipeline.send_json(register_request(request)).await
}

/// # Errors
///
/// Returns the pipeline's classified error.
pub async fn profile(pipeline: &RequestPipeline) -> Result<ProfileResponse, ApiError> {
    pipeline.send_json(profile_request()).await
}

/// # Errors
///
/// Returns the pipeline's classified error.
pub async fn update_profile(pipeline: &RequestPipeline, update: &ProfileUpdate) -> Result<UserUpdateResponse, ApiError> {
    pipeline.send_json(update_profile_request(update)?).await
}

/// # Errors
///
/// Returns the pipeline's classified error.
pub async fn change_password(
    pipeline: &RequestPipeline,
    old_password: &str,
    new_password: &str,
) -> Result<MessageResponse, ApiError> {
    pipeline
        .send_json(change_password_request(old_password, new_password))
        .await
}

/// # Errors
///
/// Returns the pipeline's classified error.
pub async fn stats(pipeline: &RequestPipeline) -> Result<UserStats, ApiError> {
    pipeline.send_json(stats_request()).await
}

#[async_trait::async_trait]
impl Authenticator for RequestPipeline {
    async fn login(&self, username: &str, password: &str) -> Result<LoginPayload, ApiError> {
        login(self, username, password).await
    }

    async fn fetch_profile(&self) -> Result<ProfileResponse, ApiError> {
        profile(self).await
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError> {
        Ok(update_profile(self, update).await?.user)
    }
}
