use super::*;
use crate::net::types::UserProfile;

fn route(requires_auth: bool, requires_admin: bool) -> RouteDescriptor {
    RouteDescriptor {
        path: "/target".into(),
        name: "Target",
        requires_auth,
        requires_admin,
        guest: false,
        redirect: None,
    }
}

fn login_route() -> RouteDescriptor {
    RouteDescriptor { path: LOGIN_PATH.into(), name: "Login", guest: true, ..route(false, false) }
}

fn user(role: &str) -> UserProfile {
    serde_json::from_value(serde_json::json!({"id": 1, "username": "u", "role": role})).unwrap()
}

fn logged_out() -> Session {
    Session::default()
}

fn logged_in(role: &str) -> Session {
    Session { token: Some("t".into()), user: Some(user(role)) }
}

#[test]
fn auth_route_while_logged_out_goes_to_login() {
    assert_eq!(
        evaluate(&route(true, false), &logged_out()),
        GuardDecision::Redirect { to: LOGIN_PATH, rule: GuardRule::LoginRequired }
    );
}

#[test]
fn login_page_while_logged_in_goes_home() {
    assert_eq!(
        evaluate(&login_route(), &logged_in("user")),
        GuardDecision::Redirect { to: HOME_PATH, rule: GuardRule::AlreadyLoggedIn }
    );
}

#[test]
fn admin_route_for_plain_user_goes_home() {
    assert_eq!(
        evaluate(&route(true, true), &logged_in("user")),
        GuardDecision::Redirect { to: HOME_PATH, rule: GuardRule::AdminRequired }
    );
}

#[test]
fn admin_route_while_logged_out_goes_to_login_first() {
    assert_eq!(
        evaluate(&route(true, true), &logged_out()),
        GuardDecision::Redirect { to: LOGIN_PATH, rule: GuardRule::LoginRequired }
    );
}

#[test]
fn open_route_allows_any_session() {
    for session in [logged_out(), logged_in("user"), logged_in("admin")] {
        assert_eq!(evaluate(&route(false, false), &session), GuardDecision::Allow);
    }
}

#[test]
fn admin_reaches_admin_route() {
    assert_eq!(evaluate(&route(true, true), &logged_in("admin")), GuardDecision::Allow);
}

#[test]
fn guest_page_allowed_while_logged_out() {
    assert_eq!(evaluate(&login_route(), &logged_out()), GuardDecision::Allow);
}

#[test]
fn profile_pending_session_is_not_admin() {
    let pending = Session { token: Some("t".into()), user: None };
    assert_eq!(evaluate(&route(true, false), &pending), GuardDecision::Allow);
    assert_eq!(
        evaluate(&route(true, true), &pending),
        GuardDecision::Redirect { to: HOME_PATH, rule: GuardRule::AdminRequired }
    );
}

#[test]
fn live_session_state_is_a_view() {
    let state = SessionState::in_memory();
    assert_eq!(
        evaluate(&route(true, false), &state),
        GuardDecision::Redirect { to: LOGIN_PATH, rule: GuardRule::LoginRequired }
    );
    state.set_token("t");
    assert_eq!(evaluate(&route(true, false), &state), GuardDecision::Allow);
}
