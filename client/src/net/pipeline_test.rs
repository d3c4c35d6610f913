use super::*;
use std::collections::VecDeque;
use std::sync::Mutex;

use serde_json::json;
use tokio::sync::Barrier;
use tokio::sync::broadcast::error::TryRecvError;

use crate::net::notice::{MSG_NETWORK, MSG_SESSION_EXPIRED};
use crate::state::session::Session;

const BASE: &str = "http://api.test/api";

type Hook = Box<dyn Fn() + Send + Sync>;

/// Transport that replays canned responses and records what it was sent.
#[derive(Default)]
struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<RawResponse, ApiError>>>,
    seen: Mutex<Vec<PreparedRequest>>,
    barrier: Option<Barrier>,
    on_send: Option<Hook>,
}

impl ScriptedTransport {
    fn replying(responses: Vec<Result<RawResponse, ApiError>>) -> Self {
        Self { responses: Mutex::new(responses.into()), ..Self::default() }
    }

    fn seen(&self) -> Vec<PreparedRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: PreparedRequest) -> Result<RawResponse, ApiError> {
        self.seen.lock().unwrap().push(request);
        if let Some(hook) = &self.on_send {
            hook();
        }
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        let next = self.responses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(RawResponse::new(200, "{}")))
    }
}

#[derive(Default)]
struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: &Notice) {
        self.notices.lock().unwrap().push(notice.clone());
    }
}

fn ok(body: serde_json::Value) -> Result<RawResponse, ApiError> {
    Ok(RawResponse::new(200, body.to_string()))
}

fn status(code: u16, body: serde_json::Value) -> Result<RawResponse, ApiError> {
    Ok(RawResponse::new(code, body.to_string()))
}

fn pipeline(
    session: SessionState,
    transport: ScriptedTransport,
) -> (RequestPipeline, Arc<ScriptedTransport>, Arc<RecordingNotifier>) {
    let transport = Arc::new(transport);
    let notifier = Arc::new(RecordingNotifier::default());
    let pipeline = RequestPipeline::with_transport(BASE, session, transport.clone(), notifier.clone());
    (pipeline, transport, notifier)
}

// =============================================================
// Stage order
// =============================================================

#[test]
fn stage_lists_are_fixed() {
    assert_eq!(OUTBOUND_STAGES, &[OutboundStage::AttachCredential]);
    assert_eq!(INBOUND_SUCCESS_STAGES, &[InboundStage::UnwrapPayload]);
    assert_eq!(INBOUND_FAILURE_STAGES, &[InboundStage::ClassifyAndHandle]);
}

// =============================================================
// Outbound
// =============================================================

#[tokio::test]
async fn attaches_bearer_when_logged_in() {
    let session = SessionState::in_memory();
    session.set_token("t1");
    let (pipeline, transport, _) = pipeline(session, ScriptedTransport::replying(vec![ok(json!({"ok": true}))]));

    pipeline.send(ApiRequest::get("/images")).await.unwrap();

    let seen = transport.seen();
    assert_eq!(seen[0].url, "http://api.test/api/images");
    assert_eq!(seen[0].bearer_token(), Some("t1"));
}

#[tokio::test]
async fn no_authorization_header_when_logged_out() {
    let (pipeline, transport, _) = pipeline(SessionState::in_memory(), ScriptedTransport::default());

    pipeline.send(ApiRequest::get("/images")).await.unwrap();

    assert_eq!(transport.seen()[0].header(AUTHORIZATION), None);
}

#[tokio::test]
async fn token_change_is_seen_by_the_next_call() {
    let session = SessionState::in_memory();
    let (pipeline, transport, _) = pipeline(session.clone(), ScriptedTransport::default());

    session.set_token("a");
    pipeline.send(ApiRequest::get("/user/profile")).await.unwrap();
    session.set_token("b");
    pipeline.send(ApiRequest::get("/user/profile")).await.unwrap();
    session.logout();
    pipeline.send(ApiRequest::get("/user/profile")).await.unwrap();

    let tokens: Vec<_> = transport
        .seen()
        .iter()
        .map(|r| r.bearer_token().map(str::to_owned))
        .collect();
    assert_eq!(tokens, vec![Some("a".to_owned()), Some("b".to_owned()), None]);
}

#[tokio::test]
async fn caller_authorization_header_is_replaced() {
    let session = SessionState::in_memory();
    session.set_token("real");
    let (pipeline, transport, _) = pipeline(session, ScriptedTransport::default());

    pipeline
        .send(ApiRequest::get("/images").header("authorization", "Bearer forged"))
        .await
        .unwrap();

    let seen = transport.seen();
    let auth_headers = seen[0]
        .headers
        .iter()
        .filter(|(n, _)| n.eq_ignore_ascii_case(AUTHORIZATION))
        .count();
    assert_eq!(auth_headers, 1);
    assert_eq!(seen[0].bearer_token(), Some("real"));
}

#[tokio::test]
async fn public_channel_never_carries_a_credential() {
    let session = SessionState::in_memory();
    session.set_token("secret");
    let (pipeline, transport, _) = pipeline(session, ScriptedTransport::replying(vec![ok(json!({"id": 1}))]));

    let payload = pipeline.public().send(ApiRequest::get("/random")).await.unwrap();

    assert_eq!(payload, json!({"id": 1}));
    assert_eq!(transport.seen()[0].header(AUTHORIZATION), None);
}

// =============================================================
// Inbound success
// =============================================================

#[tokio::test]
async fn success_returns_payload_not_envelope() {
    let (pipeline, _, notifier) = pipeline(
        SessionState::in_memory(),
        ScriptedTransport::replying(vec![ok(json!({"images": [], "total": 0, "page": 1, "page_size": 20}))]),
    );

    let page: crate::net::types::ImagePage = pipeline.send_json(ApiRequest::get("/images")).await.unwrap();
    assert_eq!(page.total, 0);
    assert!(notifier.notices().is_empty());
}

#[tokio::test]
async fn empty_body_unwraps_to_null() {
    let (pipeline, _, _) = pipeline(
        SessionState::in_memory(),
        ScriptedTransport::replying(vec![Ok(RawResponse::new(204, Vec::new()))]),
    );
    let payload = pipeline.send(ApiRequest::delete("/images/1")).await.unwrap();
    assert_eq!(payload, serde_json::Value::Null);
}

#[tokio::test]
async fn malformed_success_body_is_decode_failure() {
    let (pipeline, _, notifier) = pipeline(
        SessionState::in_memory(),
        ScriptedTransport::replying(vec![Ok(RawResponse::new(200, "<html>"))]),
    );
    let err = pipeline.send(ApiRequest::get("/images")).await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
    assert_eq!(notifier.notices()[0].kind, NoticeKind::Failure);
}

// =============================================================
// Inbound failure: 401
// =============================================================

#[tokio::test]
async fn signed_401_clears_session_and_signals_once() {
    let session = SessionState::in_memory();
    session.set_token("t1");
    let (pipeline, _, notifier) = pipeline(
        session.clone(),
        ScriptedTransport::replying(vec![status(401, json!({"error": "token expired"}))]),
    );
    let mut events = pipeline.subscribe();

    let err = pipeline.send(ApiRequest::get("/user/profile")).await.unwrap_err();

    assert_eq!(err, ApiError::Unauthorized { message: "token expired".into() });
    assert!(!session.is_logged_in());
    assert_eq!(events.try_recv(), Ok(SessionEvent::Invalidated));
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    assert_eq!(notifier.notices(), vec![Notice::new(NoticeKind::SessionExpired, MSG_SESSION_EXPIRED)]);
}

#[tokio::test]
async fn concurrent_401s_produce_one_notice_and_one_event() {
    let session = SessionState::in_memory();
    session.set_token("t1");
    let transport = ScriptedTransport {
        barrier: Some(Barrier::new(2)),
        ..ScriptedTransport::replying(vec![
            status(401, json!({"error": "expired"})),
            status(401, json!({"error": "expired"})),
        ])
    };
    let (pipeline, transport, notifier) = pipeline(session.clone(), transport);
    let mut events = pipeline.subscribe();

    let (a, b) = tokio::join!(
        pipeline.send(ApiRequest::get("/images")),
        pipeline.send(ApiRequest::get("/user/stats")),
    );

    assert!(a.unwrap_err().is_unauthorized());
    assert!(b.unwrap_err().is_unauthorized());
    assert!(transport.seen().iter().all(|r| r.bearer_token() == Some("t1")));
    assert!(!session.is_logged_in());
    assert_eq!(notifier.notices().len(), 1);
    assert_eq!(events.try_recv(), Ok(SessionEvent::Invalidated));
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test]
async fn stale_401_does_not_end_a_newer_session() {
    let session = SessionState::in_memory();
    session.set_token("old");
    let relogin = session.clone();
    let transport = ScriptedTransport {
        on_send: Some(Box::new(move || relogin.set_token("new"))),
        ..ScriptedTransport::replying(vec![status(401, json!({"error": "expired"}))])
    };
    let (pipeline, _, notifier) = pipeline(session.clone(), transport);
    let mut events = pipeline.subscribe();

    let err = pipeline.send(ApiRequest::get("/images")).await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(session.token().as_deref(), Some("new"));
    assert!(notifier.notices().is_empty());
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test]
async fn unsigned_401_still_expires_and_signals() {
    let session = SessionState::in_memory();
    let (pipeline, transport, notifier) = pipeline(
        session.clone(),
        ScriptedTransport::replying(vec![status(401, json!({"error": "bad"}))]),
    );
    let mut events = pipeline.subscribe();

    let err = pipeline.send(ApiRequest::get("/images")).await.unwrap_err();

    assert_eq!(err, ApiError::Unauthorized { message: "bad".into() });
    assert_eq!(transport.seen()[0].bearer_token(), None);
    assert_eq!(session.snapshot(), Session::default());
    assert_eq!(events.try_recv(), Ok(SessionEvent::Invalidated));
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    assert_eq!(notifier.notices(), vec![Notice::new(NoticeKind::SessionExpired, MSG_SESSION_EXPIRED)]);
}

#[tokio::test]
async fn unsigned_401_does_not_end_a_login_made_in_flight() {
    let session = SessionState::in_memory();
    let login = session.clone();
    let transport = ScriptedTransport {
        on_send: Some(Box::new(move || login.set_token("fresh"))),
        ..ScriptedTransport::replying(vec![status(401, json!({"error": "bad"}))])
    };
    let (pipeline, _, notifier) = pipeline(session.clone(), transport);
    let mut events = pipeline.subscribe();

    let err = pipeline.send(ApiRequest::get("/images")).await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(session.token().as_deref(), Some("fresh"));
    assert!(notifier.notices().is_empty());
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test]
async fn invalidation_without_subscribers_still_notifies() {
    let session = SessionState::in_memory();
    session.set_token("t1");
    let (pipeline, _, notifier) = pipeline(
        session.clone(),
        ScriptedTransport::replying(vec![status(401, json!({}))]),
    );

    let err = pipeline.send(ApiRequest::get("/user/stats")).await.unwrap_err();

    assert!(err.is_unauthorized());
    assert!(!session.is_logged_in());
    assert_eq!(notifier.notices(), vec![Notice::new(NoticeKind::SessionExpired, MSG_SESSION_EXPIRED)]);
}

// =============================================================
// Inbound failure: other classes
// =============================================================

#[tokio::test]
async fn forbidden_keeps_session_and_uses_server_message() {
    let session = SessionState::in_memory();
    session.set_token("t");
    let (pipeline, _, notifier) = pipeline(
        session.clone(),
        ScriptedTransport::replying(vec![status(403, json!({"error": "admin only"}))]),
    );

    let err = pipeline.send(ApiRequest::get("/admin/users")).await.unwrap_err();

    assert_eq!(err, ApiError::Forbidden { message: "admin only".into() });
    assert!(session.is_logged_in());
    assert_eq!(notifier.notices(), vec![Notice::new(NoticeKind::PermissionDenied, "admin only")]);
}

#[tokio::test]
async fn not_found_and_server_errors_are_reported_and_returned() {
    let (pipeline, _, notifier) = pipeline(
        SessionState::in_memory(),
        ScriptedTransport::replying(vec![
            status(404, json!({"error": "image not found"})),
            Ok(RawResponse::new(500, "")),
        ]),
    );

    let first = pipeline.send(ApiRequest::get("/images/9")).await.unwrap_err();
    let second = pipeline.send(ApiRequest::get("/images/9")).await.unwrap_err();

    assert_eq!(first, ApiError::NotFound { message: "image not found".into() });
    assert_eq!(second, ApiError::Server { status: 500, message: String::new() });
    let kinds: Vec<_> = notifier.notices().into_iter().map(|n| n.kind).collect();
    assert_eq!(kinds, vec![NoticeKind::NotFound, NoticeKind::Failure]);
}

#[tokio::test]
async fn network_failure_gets_connectivity_notice() {
    let (pipeline, _, notifier) = pipeline(
        SessionState::in_memory(),
        ScriptedTransport::replying(vec![Err(ApiError::Network("connection refused".into()))]),
    );

    let err = pipeline.send(ApiRequest::get("/images")).await.unwrap_err();

    assert!(matches!(err, ApiError::Network(_)));
    assert_eq!(notifier.notices(), vec![Notice::new(NoticeKind::Failure, MSG_NETWORK)]);
}

#[tokio::test]
async fn public_401_never_touches_session() {
    let session = SessionState::in_memory();
    session.set_token("t");
    let (pipeline, _, notifier) = pipeline(session.clone(), ScriptedTransport::replying(vec![status(401, json!({}))]));

    let err = pipeline.public().send_bytes(ApiRequest::get("/random/image")).await.unwrap_err();

    assert!(err.is_unauthorized());
    assert!(session.is_logged_in());
    assert_eq!(notifier.notices()[0].kind, NoticeKind::Failure);
}

// =============================================================
// Helpers
// =============================================================

#[test]
fn classify_reads_error_field() {
    let response = RawResponse::new(418, json!({"error": "teapot"}).to_string());
    assert_eq!(classify(&response), ApiError::Server { status: 418, message: "teapot".into() });

    let response = RawResponse::new(403, "not json");
    assert_eq!(classify(&response), ApiError::Forbidden { message: String::new() });
}

#[test]
fn try_json_serializes_typed_bodies() {
    let request = ApiRequest::put("/user/profile")
        .try_json(&crate::net::types::ProfileUpdate { email: Some("a@b.test".into()), avatar: None })
        .unwrap();
    assert_eq!(request.body, Body::Json(json!({"email": "a@b.test"})));
}
