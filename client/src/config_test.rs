use super::*;
use std::collections::HashMap;

fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn from_vars_defaults() {
    let cfg = ClientConfig::from_vars(vars(&[("HOME", "/home/alice")])).unwrap();
    assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    assert_eq!(cfg.timeouts, Timeouts::default());
    assert_eq!(cfg.timeouts.request(), Duration::from_secs(30));
    assert_eq!(cfg.session_file, PathBuf::from("/home/alice/.gotux/session.json"));
}

#[test]
fn from_vars_overrides() {
    let cfg = ClientConfig::from_vars(vars(&[
        ("GOTUX_BASE_URL", "https://img.example.test/api/"),
        ("GOTUX_REQUEST_TIMEOUT_SECS", "5"),
        ("GOTUX_CONNECT_TIMEOUT_SECS", " 2 "),
        ("GOTUX_SESSION_FILE", "/tmp/s.json"),
    ]))
    .unwrap();
    assert_eq!(cfg.base_url, "https://img.example.test/api");
    assert_eq!(cfg.timeouts, Timeouts { request_secs: 5, connect_secs: 2 });
    assert_eq!(cfg.session_file, PathBuf::from("/tmp/s.json"));
}

#[test]
fn from_vars_without_home_uses_working_directory() {
    let cfg = ClientConfig::from_vars(vars(&[])).unwrap();
    assert_eq!(cfg.session_file, PathBuf::from(DEFAULT_SESSION_FILE_NAME));
}

#[test]
fn from_vars_rejects_non_http_base_url() {
    let err = ClientConfig::from_vars(vars(&[("GOTUX_BASE_URL", "ftp://nope")])).unwrap_err();
    assert_eq!(err, ConfigError::InvalidBaseUrl("ftp://nope".into()));
}

#[test]
fn from_vars_rejects_zero_and_garbage_timeouts() {
    for bad in ["0", "abc", "-3"] {
        let err = ClientConfig::from_vars(vars(&[("GOTUX_REQUEST_TIMEOUT_SECS", bad)])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { .. }), "expected error for {bad:?}");
    }
}

#[test]
fn endpoint_joins_with_single_slash() {
    let cfg = ClientConfig::new("http://localhost:8080/api/").unwrap();
    assert_eq!(cfg.endpoint("/images/3"), "http://localhost:8080/api/images/3");
    assert_eq!(cfg.endpoint("random"), "http://localhost:8080/api/random");
}
