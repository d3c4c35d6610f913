//! Image library endpoints.

use serde_json::json;

use crate::error::ApiError;
use crate::net::pipeline::{ApiRequest, FilePart, RequestPipeline};
use crate::net::types::{
    BatchDeleteResponse, Image, ImageLinks, ImagePage, ImageUpdate, ImageUpdateResponse, ListQuery, MessageResponse,
    UploadResponse,
};

/// Multipart field the upload endpoint reads files from.
pub const UPLOAD_FIELD: &str = "files";

/// One file for [`upload_request`].
#[must_use]
pub fn upload_part(file_name: impl Into<String>, mime: Option<&str>, bytes: Vec<u8>) -> FilePart {
    FilePart { field: UPLOAD_FIELD.to_owned(), file_name: file_name.into(), mime: mime.map(str::to_owned), bytes }
}

#[must_use]
pub fn upload_request(files: Vec<FilePart>) -> ApiRequest {
    ApiRequest::post("/images/upload").multipart(files)
}

#[must_use]
pub fn list_request(query: &ListQuery) -> ApiRequest {
    ApiRequest::get("/images").query(query.to_pairs())
}

#[must_use]
pub fn get_request(id: u64) -> ApiRequest {
    ApiRequest::get(format!("/images/{id}"))
}

/// # Errors
///
/// Returns `ApiError::InvalidRequest` if the update cannot be serialized.
pub fn update_request(id: u64, update: &ImageUpdate) -> Result<ApiRequest, ApiError> {
    ApiRequest::put(format!("/images/{id}")).try_json(update)
}

#[must_use]
pub fn delete_request(id: u64) -> ApiRequest {
    ApiRequest::delete(format!("/images/{id}"))
}

#[must_use]
pub fn batch_delete_request(ids: &[u64]) -> ApiRequest {
    ApiRequest::post("/images/batch-delete").json(json!({ "image_ids": ids }))
}

#[must_use]
pub fn links_request(id: u64) -> ApiRequest {
    ApiRequest::get(format!("/images/{id}/links"))
}

// =============================================================================
// WRAPPERS
// =============================================================================

/// # Errors
///
/// Returns the pipeline's classified error.
pub async fn upload(pipeline: &RequestPipeline, files: Vec<FilePart>) -> Result<UploadResponse, ApiError> {
    pipeline.send_json(upload_request(files)).await
}

/// # Errors
///
/// Returns the pipeline's classified error.
pub async fn list(pipeline: &RequestPipeline, query: &ListQuery) -> Result<ImagePage, ApiError> {
    pipeline.send_json(list_request(query)).await
}

/// # Errors
///
/// Returns the pipeline's classified error.
pub async fn get(pipeline: &RequestPipeline, id: u64) -> Result<Image, ApiError> {
    pipeline.send_json(get_request(id)).await
}

/// # Errors
///
/// Returns the pipeline's classified error.
pub async fn update(pipeline: &RequestPipeline, id: u64, update: &ImageUpdate) -> Result<ImageUpdateResponse, ApiError> {
    pipeline.send_json(update_request(id, update)?).await
}

/// # Errors
///
/// Returns the pipeline's classified error.
pub async fn delete(pipeline: &RequestPipeline, id: u64) -> Result<MessageResponse, ApiError> {
    pipeline.send_json(delete_request(id)).await
}

/// # Errors
///
/// Returns the pipeline's classified error.
pub async fn batch_delete(pipeline: &RequestPipeline, ids: &[u64]) -> Result<BatchDeleteResponse, ApiError> {
    pipeline.send_json(batch_delete_request(ids)).await
}

/// # Errors
///
/// Returns the pipeline's classified error.
pub async fn links(pipeline: &RequestPipeline, id: u64) -> Result<ImageLinks, ApiError> {
    pipeline.send_json(links_request(id)).await
}
