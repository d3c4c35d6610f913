//! Session-aware request pipeline.
//!
//! ARCHITECTURE
//! ============
//! Every API call is an `ApiRequest` descriptor. The pipeline turns it into a
//! `PreparedRequest`, hands it to a `Transport`, and runs the inbound stages
//! on whatever comes back. Stage order is fixed:
//!
//! - outbound: [`OUTBOUND_STAGES`] = attach credential
//! - inbound, 2xx: [`INBOUND_SUCCESS_STAGES`] = unwrap payload
//! - inbound, otherwise: [`INBOUND_FAILURE_STAGES`] = classify and handle
//!
//! The credential is read from `SessionState` synchronously while the request
//! is prepared, so a token change that happens before a call is always seen
//! by that call. In-flight calls are never re-signed.
//!
//! ERROR HANDLING
//! ==============
//! Classification happens once, here. The side effect (notice, session
//! invalidation) runs first and the classified error is then returned so the
//! caller can still react locally.
//!
//! A 401 only ends the session that the failing request was signed with.
//! The first 401 for the current token clears it, broadcasts
//! `SessionEvent::Invalidated` and emits one session-expired notice. Later
//! 401s for the same (now gone) token are stale and stay silent. A 401 on a
//! request sent without a credential takes the same path as long as nobody
//! logged in while it was in flight: clearing is then a no-op, but the
//! signal and the notice still go out.

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod pipeline_test;

use std::sync::Arc;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast;

use super::notice::{MSG_REQUEST_FAILED, Notice, NoticeKind, Notifier};
use crate::config::{ClientConfig, Timeouts, join_url};
use crate::error::ApiError;
use crate::state::session::SessionState;

pub const AUTHORIZATION: &str = "Authorization";
const EVENT_CAPACITY: usize = 16;

// =============================================================================
// STAGES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundStage {
    AttachCredential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundStage {
    UnwrapPayload,
    ClassifyAndHandle,
}

pub const OUTBOUND_STAGES: &[OutboundStage] = &[OutboundStage::AttachCredential];
pub const INBOUND_SUCCESS_STAGES: &[InboundStage] = &[InboundStage::UnwrapPayload];
pub const INBOUND_FAILURE_STAGES: &[InboundStage] = &[InboundStage::ClassifyAndHandle];

/// Signal for the navigation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The server rejected the current session; it has been cleared.
    Invalidated,
}

// =============================================================================
// REQUEST / RESPONSE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Form field name (`files` for image uploads).
    pub field: String,
    pub file_name: String,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(Value),
    Multipart(Vec<FilePart>),
}

/// Endpoint-shaped call descriptor: what the API surface hands the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the base URL, e.g. `/images/7`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Body,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), query: Vec::new(), headers: Vec::new(), body: Body::Empty }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Body::Json(body);
        self
    }

    /// Serialize `body` as the JSON payload.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidRequest` if `body` cannot be represented as JSON.
    pub fn try_json<T: Serialize + ?Sized>(self, body: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        Ok(self.json(value))
    }

    #[must_use]
    pub fn query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn multipart(mut self, parts: Vec<FilePart>) -> Self {
        self.body = Body::Multipart(parts);
        self
    }
}

/// A request after the outbound stages, addressed to an absolute URL.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Body,
}

impl PreparedRequest {
    /// Case-insensitive header lookup.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        self.header(AUTHORIZATION)
            .and_then(|v| v.strip_prefix("Bearer "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { status, body: body.into() }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// =============================================================================
// TRANSPORT
// =============================================================================

/// Wire seam. Implementations return `Err` only when no response arrived.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: PreparedRequest) -> Result<RawResponse, ApiError>;
}

/// Production transport over `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(timeouts: Timeouts) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeouts.request())
            .connect_timeout(timeouts.connect())
            .build()
            .map_err(|e| ApiError::InvalidRequest(format!("http client build failed: {e}")))?;
        Ok(Self { http })
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: PreparedRequest) -> Result<RawResponse, ApiError> {
        let mut builder = self.http.request(request.method, &request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match request.body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(&value),
            Body::Multipart(parts) => builder.multipart(build_form(parts)?),
        };

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        Ok(RawResponse { status, body: body.to_vec() })
    }
}

fn build_form(parts: Vec<FilePart>) -> Result<reqwest::multipart::Form, ApiError> {
    let mut form = reqwest::multipart::Form::new();
    for part in parts {
        let mut file = reqwest::multipart::Part::bytes(part.bytes).file_name(part.file_name);
        if let Some(mime) = part.mime.as_deref() {
            file = file
                .mime_str(mime)
                .map_err(|e| ApiError::InvalidRequest(format!("invalid mime type `{mime}`: {e}")))?;
        }
        form = form.part(part.field, file);
    }
    Ok(form)
}

fn map_reqwest_error(error: reqwest::Error) -> ApiError {
    if error.is_builder() {
        ApiError::InvalidRequest(error.to_string())
    } else {
        ApiError::Network(error.to_string())
    }
}

// =============================================================================
// INBOUND HELPERS
// =============================================================================

/// Map a non-success response onto the error taxonomy.
#[must_use]
pub fn classify(response: &RawResponse) -> ApiError {
    let message = server_message(&response.body).unwrap_or_default();
    match response.status {
        401 => ApiError::Unauthorized { message },
        403 => ApiError::Forbidden { message },
        404 => ApiError::NotFound { message },
        status => ApiError::Server { status, message },
    }
}

fn server_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<Value>(body)
        .ok()?
        .get("error")?
        .as_str()
        .map(str::to_owned)
}

/// Strip the transport envelope: the JSON body is the domain payload.
fn unwrap_payload(response: &RawResponse) -> Result<Value, ApiError> {
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&response.body).map_err(|e| ApiError::Decode(e.to_string()))
}

fn decode<T: DeserializeOwned>(payload: Value) -> Result<T, ApiError> {
    serde_json::from_value(payload).map_err(|e| ApiError::Decode(e.to_string()))
}

// =============================================================================
// WIRE (shared by both channels)
// =============================================================================

struct Wire {
    base_url: String,
    transport: Arc<dyn Transport>,
    notifier: Arc<dyn Notifier>,
}

impl Wire {
    fn address(&self, request: ApiRequest) -> PreparedRequest {
        PreparedRequest {
            url: join_url(&self.base_url, &request.path),
            method: request.method,
            path: request.path,
            query: request.query,
            headers: request.headers,
            body: request.body,
        }
    }

    /// Dispatch and split 2xx from everything else.
    async fn exchange(&self, prepared: PreparedRequest) -> Result<RawResponse, ApiError> {
        let response = self.transport.send(prepared).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(classify(&response))
        }
    }

    /// Notice for any failure that does not end a session. The public
    /// channel has no session, so a 401 there is shown as a plain failure.
    fn report(&self, error: ApiError) -> ApiError {
        let notice = match &error {
            ApiError::Unauthorized { message } if !message.trim().is_empty() => {
                Notice::new(NoticeKind::Failure, message.clone())
            }
            ApiError::Unauthorized { .. } => Notice::new(NoticeKind::Failure, MSG_REQUEST_FAILED),
            other => Notice::for_error(other),
        };
        tracing::warn!(status = ?error.status(), error = %error, "request failed");
        self.notifier.notify(&notice);
        error
    }
}

// =============================================================================
// PIPELINE
// =============================================================================

/// The single credentialed HTTP client. Cheap to clone.
#[derive(Clone)]
pub struct RequestPipeline {
    inner: Arc<PipelineInner>,
}

struct PipelineInner {
    wire: Arc<Wire>,
    session: SessionState,
    events: broadcast::Sender<SessionEvent>,
}

impl RequestPipeline {
    /// Pipeline over `reqwest` with the configured base URL and timeouts.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &ClientConfig, session: SessionState, notifier: Arc<dyn Notifier>) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(config.timeouts)?;
        Ok(Self::with_transport(&config.base_url, session, Arc::new(transport), notifier))
    }

    #[must_use]
    pub fn with_transport(
        base_url: &str,
        session: SessionState,
        transport: Arc<dyn Transport>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let wire = Wire { base_url: base_url.trim_end_matches('/').to_owned(), transport, notifier };
        Self { inner: Arc::new(PipelineInner { wire: Arc::new(wire), session, events }) }
    }

    #[must_use]
    pub fn session(&self) -> &SessionState {
        &self.inner.session
    }

    /// Receiver for session-invalidated signals.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// The uncredentialed path for public endpoints.
    #[must_use]
    pub fn public(&self) -> PublicChannel {
        PublicChannel { wire: Arc::clone(&self.inner.wire) }
    }

    /// Send `request` and return its JSON payload (`Null` for an empty body).
    ///
    /// # Errors
    ///
    /// Returns the classified error after its notice/session side effect ran.
    pub async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let mut prepared = self.inner.wire.address(request);
        let signed_with = self.run_outbound(&mut prepared);
        tracing::debug!(
            method = %prepared.method,
            path = %prepared.path,
            credentialed = signed_with.is_some(),
            "dispatching request"
        );

        let response = match self.inner.wire.exchange(prepared).await {
            Ok(response) => response,
            Err(error) => return Err(self.classify_and_handle(error, signed_with.as_deref())),
        };
        unwrap_payload(&response).map_err(|error| self.classify_and_handle(error, signed_with.as_deref()))
    }

    /// Like [`RequestPipeline::send`], decoding the payload into `T`.
    ///
    /// # Errors
    ///
    /// Returns the classified error, or `ApiError::Decode` if the payload
    /// does not match `T`.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let payload = self.send(request).await?;
        decode(payload).map_err(|error| self.inner.wire.report(error))
    }

    fn run_outbound(&self, prepared: &mut PreparedRequest) -> Option<String> {
        let mut signed_with = None;
        for stage in OUTBOUND_STAGES {
            match stage {
                OutboundStage::AttachCredential => {
                    signed_with = attach_credential(prepared, &self.inner.session);
                }
            }
        }
        signed_with
    }

    fn classify_and_handle(&self, error: ApiError, signed_with: Option<&str>) -> ApiError {
        if !error.is_unauthorized() {
            return self.inner.wire.report(error);
        }

        if self.inner.session.invalidate(signed_with) {
            tracing::warn!(credentialed = signed_with.is_some(), "server rejected session; logged out");
            if self.inner.events.send(SessionEvent::Invalidated).is_err() {
                tracing::debug!("no navigation subscriber for session event");
            }
            self.inner.wire.notifier.notify(&Notice::for_error(&error));
        } else {
            tracing::debug!("stale 401 ignored; session already cleared or replaced");
        }
        error
    }
}

fn attach_credential(prepared: &mut PreparedRequest, session: &SessionState) -> Option<String> {
    let token = session.token().filter(|t| !t.is_empty())?;
    prepared
        .headers
        .retain(|(name, _)| !name.eq_ignore_ascii_case(AUTHORIZATION));
    prepared
        .headers
        .push((AUTHORIZATION.to_owned(), format!("Bearer {token}")));
    Some(token)
}

// =============================================================================
// PUBLIC CHANNEL
// =============================================================================

/// Uncredentialed path for anonymous endpoints. Holds no session handle, so
/// nothing sent through it can carry a token.
#[derive(Clone)]
pub struct PublicChannel {
    wire: Arc<Wire>,
}

impl PublicChannel {
    /// # Errors
    ///
    /// Returns the classified error after its notice ran.
    pub async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let response = self.dispatch(request).await?;
        unwrap_payload(&response).map_err(|error| self.wire.report(error))
    }

    /// # Errors
    ///
    /// Returns the classified error, or `ApiError::Decode` on shape mismatch.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let payload = self.send(request).await?;
        decode(payload).map_err(|error| self.wire.report(error))
    }

    /// Return the raw response body (e.g. image bytes).
    ///
    /// # Errors
    ///
    /// Returns the classified error after its notice ran.
    pub async fn send_bytes(&self, request: ApiRequest) -> Result<Vec<u8>, ApiError> {
        Ok(self.dispatch(request).await?.body)
    }

    async fn dispatch(&self, request: ApiRequest) -> Result<RawResponse, ApiError> {
        let prepared = self.wire.address(request);
        tracing::debug!(method = %prepared.method, path = %prepared.path, "dispatching public request");
        self.wire
            .exchange(prepared)
            .await
            .map_err(|error| self.wire.report(error))
    }
}
