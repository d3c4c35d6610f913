use super::*;
use clap::CommandFactory;
use gotux_client::net::pipeline::{PreparedRequest, RawResponse, Transport};

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("gotux").chain(args.iter().copied())).unwrap()
}

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn commands_map_to_their_views() {
    assert_eq!(route_for(&parse(&["login", "alice", "--password", "pw"]).command), Some(LOGIN_PATH));
    assert_eq!(route_for(&parse(&["images", "upload", "a.png"]).command), Some("/upload"));
    assert_eq!(route_for(&parse(&["images", "show", "3"]).command), Some("/images"));
    assert_eq!(route_for(&parse(&["admin", "status", "3", "disabled"]).command), Some("/admin/users"));
    assert_eq!(route_for(&parse(&["admin", "images"]).command), Some("/admin/images"));
    assert_eq!(route_for(&parse(&["settings", "show"]).command), Some("/profile"));
}

#[test]
fn anonymous_commands_are_unguarded() {
    assert_eq!(route_for(&parse(&["random", "--tags", "sky"]).command), None);
    assert_eq!(route_for(&parse(&["whoami"]).command), None);
    assert_eq!(route_for(&parse(&["logout"]).command), None);
}

#[test]
fn every_admin_view_is_admin_only() {
    let table = RouteTable::standard();
    for args in [&["admin", "users"][..], &["admin", "quota", "1", "0"], &["admin", "images"], &["admin", "stats"]] {
        let route = route_for(&parse(args).command).unwrap();
        assert!(table.resolve(route).unwrap().requires_admin, "{args:?}");
    }
}

#[test]
fn settings_quality_is_bounded() {
    let result = Cli::try_parse_from(["gotux", "settings", "update", "--quality", "150"]);
    assert!(result.is_err());
}

#[test]
fn mime_follows_extension() {
    assert_eq!(mime_for(Path::new("a/b/photo.JPG")), Some("image/jpeg"));
    assert_eq!(mime_for(Path::new("x.webp")), Some("image/webp"));
    assert_eq!(mime_for(Path::new("notes.txt")), None);
    assert_eq!(mime_for(Path::new("noext")), None);
}

#[test]
fn refusals_explain_next_step() {
    assert!(CliError::Refused(GuardRule::LoginRequired).to_string().contains("gotux login"));
    assert!(CliError::Refused(GuardRule::AlreadyLoggedIn).to_string().contains("gotux logout"));
}

/// Backend that rejects every credential.
struct RejectingTransport;

#[async_trait::async_trait]
impl Transport for RejectingTransport {
    async fn send(&self, _request: PreparedRequest) -> Result<RawResponse, ApiError> {
        Ok(RawResponse::new(401, r#"{"error":"token revoked"}"#))
    }
}

struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notify(&self, _notice: &Notice) {}
}

fn rejecting_shell(session: SessionState) -> Shell {
    let pipeline = RequestPipeline::with_transport(
        "http://api.test/api",
        session.clone(),
        Arc::new(RejectingTransport),
        Arc::new(SilentNotifier),
    );
    Shell::new(session, pipeline)
}

#[tokio::test]
async fn refused_command_still_reports_expired_session() {
    let session = SessionState::in_memory();
    session.set_token("revoked");
    let mut shell = rejecting_shell(session.clone());

    let completed = shell.dispatch(parse(&["admin", "users"]).command).await;

    assert!(matches!(completed.result, Err(CliError::Refused(GuardRule::LoginRequired))));
    assert!(completed.session_expired);
    assert!(!session.is_logged_in());
    assert_eq!(shell.navigator.current(), Some(LOGIN_PATH));
}

#[tokio::test]
async fn failed_call_reports_expired_session() {
    let session = SessionState::in_memory();
    session.set_token("revoked");
    let mut shell = rejecting_shell(session.clone());
    let profile: gotux_client::net::types::UserProfile =
        serde_json::from_value(json!({"id": 1, "username": "u", "role": "user"})).unwrap();
    session.set_user_info(profile);

    let completed = shell.dispatch(parse(&["stats"]).command).await;

    assert!(matches!(completed.result, Err(CliError::Api(ApiError::Unauthorized { .. }))));
    assert!(completed.session_expired);
}
