// tests/config_file.rs
use std::collections::HashMap;
use std::time::Duration;
use std::{env, fs};

use post_impact_monitor::config::{
    load_file_default, load_file_from, ConfigError, FileConfig, MonitorConfig, ENV_CONFIG_PATH,
};

#[test]
fn toml_file_feeds_the_resolver() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("monitor.toml");
    fs::write(
        &p,
        r#"
target_url = "http://127.0.0.1:9000/statuses.json"
check_interval_secs = 45
fetch_mode = "http"
market_focus = "semiconductors"
notify_all_posts = true
smtp_port = 587
"#,
    )
    .unwrap();

    let file = load_file_from(&p).unwrap();
    let vars: HashMap<String, String> = [
        ("OPENAI_API_KEY", "sk-test"),
        ("EMAIL_SENDER", "bot@example.com"),
        ("EMAIL_PASSWORD", "pw"),
        ("EMAIL_RECIPIENT", "me@example.com"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let cfg = MonitorConfig::resolve(&file, &vars).unwrap();
    assert_eq!(cfg.target_url, "http://127.0.0.1:9000/statuses.json");
    assert_eq!(cfg.interval, Duration::from_secs(45));
    assert_eq!(cfg.classifier.focus.as_deref(), Some("semiconductors"));
    assert!(cfg.notify_all);
    assert_eq!(cfg.email.smtp_port, 587);
    assert_eq!(cfg.email.recipient, "me@example.com");
}

#[test]
fn broken_toml_names_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("monitor.toml");
    fs::write(&p, "check_interval_secs = \"soon\"").unwrap();
    let err = load_file_from(&p).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("monitor.toml"));
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallback() {
    // Isolate CWD so the repo's own config/ is not picked up.
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    env::remove_var(ENV_CONFIG_PATH);

    // Nothing on disk -> defaults
    let f = load_file_default().unwrap();
    assert!(f.target_url.is_none());

    // ./config/monitor.toml fallback
    fs::create_dir_all(tmp.path().join("config")).unwrap();
    fs::write(
        tmp.path().join("config/monitor.toml"),
        "check_interval_secs = 20",
    )
    .unwrap();
    assert_eq!(load_file_default().unwrap().check_interval_secs, Some(20));

    // Env path wins
    let p_env = tmp.path().join("other.toml");
    fs::write(&p_env, "check_interval_secs = 99").unwrap();
    env::set_var(ENV_CONFIG_PATH, p_env.display().to_string());
    assert_eq!(load_file_default().unwrap().check_interval_secs, Some(99));

    // Env path pointing nowhere is an error, not a silent fallback
    env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
    assert!(matches!(load_file_default(), Err(ConfigError::Read { .. })));

    env::remove_var(ENV_CONFIG_PATH);
    env::set_current_dir(&old).unwrap();
}

#[test]
fn missing_credentials_fail_before_anything_starts() {
    let empty: HashMap<String, String> = HashMap::new();
    let err = MonitorConfig::resolve(&FileConfig::default(), &empty).unwrap_err();
    assert!(matches!(err, ConfigError::Missing("OPENAI_API_KEY")));
}

#[test]
fn mock_mode_makes_api_key_optional() {
    let vars: HashMap<String, String> = [
        ("AI_TEST_MODE", "mock"),
        ("EMAIL_SENDER", "a@b.c"),
        ("EMAIL_PASSWORD", "pw"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    let cfg = MonitorConfig::resolve(&FileConfig::default(), &vars).unwrap();
    assert!(cfg.classifier.api_key.is_empty());
    assert!(cfg.classifier.mock);
}
