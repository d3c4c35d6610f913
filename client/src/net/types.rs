//! Wire DTOs for the gotux REST API.
//!
//! DESIGN
//! ======
//! These types mirror the backend's JSON shapes. `UserProfile` and
//! `UserSettings` keep unknown fields in a flattened map so a profile written
//! to durable storage reloads deep-equal even when the server adds fields.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Role value the backend assigns to administrators.
pub const ADMIN_ROLE: &str = "admin";

// =============================================================================
// USERS
// =============================================================================

/// The authenticated user as returned by login and profile endpoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    /// `"admin"` or `"user"`.
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub avatar: String,
    /// `"active"` or `"disabled"`.
    #[serde(default)]
    pub status: String,
    /// Bytes; `0` means unlimited.
    #[serde(default)]
    pub storage_quota: i64,
    #[serde(default)]
    pub used_storage: i64,
    /// Fields this client does not model (timestamps, upload settings, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

/// Payload of `POST /auth/login`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoginPayload {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub message: String,
    pub user: UserProfile,
}

/// Payload of `GET /user/profile`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user: UserProfile,
    #[serde(default)]
    pub storage_used: i64,
}

/// Body of `PUT /user/profile`; absent fields are left unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Response of endpoints that return an updated user (`PUT /user/profile`,
/// `PUT /admin/users/{id}/status`, ...).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserUpdateResponse {
    #[serde(default)]
    pub message: String,
    pub user: UserProfile,
}

/// Plain `{ "message": ... }` acknowledgement.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Disabled,
}

/// Per-user usage summary from `GET /user/stats`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    #[serde(default)]
    pub image_count: i64,
    #[serde(default)]
    pub storage_used: i64,
    #[serde(default)]
    pub storage_quota: i64,
    /// `-1` means unlimited.
    #[serde(default)]
    pub remaining_quota: i64,
    #[serde(default)]
    pub quota_percent: f64,
    #[serde(default)]
    pub total_views: i64,
}

/// Service-wide totals from `GET /admin/stats`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemStats {
    #[serde(default)]
    pub user_count: i64,
    #[serde(default)]
    pub image_count: i64,
    #[serde(default)]
    pub total_storage: i64,
    #[serde(default)]
    pub total_views: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserPage {
    #[serde(default)]
    pub users: Vec<UserProfile>,
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
}

/// Per-user upload and link preferences (`/user/settings`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_domain: Option<String>,
    /// `url`, `markdown`, `html` or `bbcode`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_link_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_watermark: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watermark_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compress_image: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compress_quality: Option<u8>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// =============================================================================
// IMAGES
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageStats {
    #[serde(default)]
    pub view_count: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: u64,
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub user_id: u64,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub original_name: String,
    #[serde(default)]
    pub file_size: i64,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub description: String,
    /// Comma-separated.
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<ImageStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImagePage {
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
}

/// Body of `PUT /images/{id}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ImageUpdate {
    pub description: String,
    pub tags: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageUpdateResponse {
    #[serde(default)]
    pub message: String,
    pub image: Image,
}

/// Result of a multi-file upload; per-file failures are listed in `errors`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchDeleteResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub deleted_count: u64,
}

/// Shareable links for one image, keyed by format (`url`, `markdown`, ...).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageLinks {
    pub image: Image,
    #[serde(default)]
    pub links: BTreeMap<String, String>,
}

// =============================================================================
// QUERIES
// =============================================================================

/// Pagination/search parameters shared by the list endpoints.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub keyword: Option<String>,
}

impl ListQuery {
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page".to_owned(), page.to_string()));
        }
        if let Some(page_size) = self.page_size {
            pairs.push(("page_size".to_owned(), page_size.to_string()));
        }
        if let Some(keyword) = self.keyword.as_deref().filter(|k| !k.is_empty()) {
            pairs.push(("keyword".to_owned(), keyword.to_owned()));
        }
        pairs
    }
}

/// Filters for the public random-image endpoints.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RandomImageFilter {
    pub user_id: Option<u64>,
    pub tags: Option<String>,
}

impl RandomImageFilter {
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(user_id) = self.user_id {
            pairs.push(("user_id".to_owned(), user_id.to_string()));
        }
        if let Some(tags) = self.tags.as_deref().filter(|t| !t.is_empty()) {
            pairs.push(("tags".to_owned(), tags.to_owned()));
        }
        pairs
    }
}
