use super::*;
use crate::net::types::UserProfile;
use crate::router::table::RouteNode;
use tokio::sync::broadcast;

fn session(role: Option<&str>) -> SessionState {
    let state = SessionState::in_memory();
    if let Some(role) = role {
        state.set_token("t");
        let user: UserProfile =
            serde_json::from_value(serde_json::json!({"id": 1, "username": "u", "role": role})).unwrap();
        state.set_user_info(user);
    }
    state
}

#[test]
fn root_follows_static_redirect() {
    let mut nav = Navigator::new(RouteTable::standard(), session(Some("user")));
    let outcome = nav.navigate("/").unwrap();
    assert_eq!(outcome.location, "/dashboard");
    assert!(outcome.is_allowed());
    assert_eq!(nav.current(), Some("/dashboard"));
}

#[test]
fn logged_out_visit_lands_on_login() {
    let mut nav = Navigator::new(RouteTable::standard(), session(None));
    let outcome = nav.navigate("/images").unwrap();
    assert_eq!(outcome.location, LOGIN_PATH);
    assert_eq!(outcome.blocked_by, Some(GuardRule::LoginRequired));
}

#[test]
fn non_admin_is_sent_home_then_dashboard() {
    let mut nav = Navigator::new(RouteTable::standard(), session(Some("user")));
    let outcome = nav.navigate("/admin/users").unwrap();
    assert_eq!(outcome.location, "/dashboard");
    assert_eq!(outcome.blocked_by, Some(GuardRule::AdminRequired));
}

#[test]
fn logged_in_login_visit_goes_to_dashboard() {
    let mut nav = Navigator::new(RouteTable::standard(), session(Some("admin")));
    let outcome = nav.navigate("/login").unwrap();
    assert_eq!(outcome.location, "/dashboard");
    assert_eq!(outcome.blocked_by, Some(GuardRule::AlreadyLoggedIn));
}

#[test]
fn unknown_route_is_an_error() {
    let mut nav = Navigator::new(RouteTable::standard(), session(None));
    assert_eq!(
        nav.navigate("/missing"),
        Err(NavigationError::UnknownRoute("/missing".into()))
    );
}

#[test]
fn redirect_cycle_is_an_error() {
    const NODES: &[RouteNode] = &[
        RouteNode::new("/a", "A").redirect("/b"),
        RouteNode::new("/b", "B").redirect("/a"),
    ];
    let mut nav = Navigator::new(RouteTable::from_nodes(NODES), session(None));
    assert!(matches!(nav.navigate("/a"), Err(NavigationError::RedirectLoop { .. })));
    assert_eq!(nav.current(), None);
}

#[test]
fn invalidation_forces_login_once() {
    let mut nav = Navigator::new(RouteTable::standard(), session(Some("user")));
    nav.navigate("/images").unwrap();

    assert!(nav.handle_event(SessionEvent::Invalidated).changed);
    assert_eq!(nav.current(), Some(LOGIN_PATH));
    assert!(!nav.handle_event(SessionEvent::Invalidated).changed);
    assert_eq!(nav.current(), Some(LOGIN_PATH));
}

#[test]
fn drain_applies_pending_events() {
    let (tx, mut rx) = broadcast::channel(4);
    let mut nav = Navigator::new(RouteTable::standard(), session(Some("user")));
    nav.navigate("/profile").unwrap();

    assert!(!nav.drain_events(&mut rx));
    tx.send(SessionEvent::Invalidated).unwrap();
    tx.send(SessionEvent::Invalidated).unwrap();
    assert!(nav.drain_events(&mut rx));
    assert_eq!(nav.current(), Some(LOGIN_PATH));
}

#[test]
fn drain_reports_invalidation_when_already_on_login() {
    let (tx, mut rx) = broadcast::channel(4);
    let mut nav = Navigator::new(RouteTable::standard(), session(None));
    nav.navigate("/images").unwrap();
    assert_eq!(nav.current(), Some(LOGIN_PATH));

    tx.send(SessionEvent::Invalidated).unwrap();
    assert!(nav.drain_events(&mut rx));
    assert_eq!(nav.current(), Some(LOGIN_PATH));
    assert!(!nav.drain_events(&mut rx));
}
