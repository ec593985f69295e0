use scribe_config::ScribeConfigLoader;
use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

#[test]
#[serial]
fn loads_file_with_defaults_for_missing_sections() {
    let tmp = TempDir::new().unwrap();

    let file_yaml = r#"
webdriver:
  endpoint: "http://127.0.0.1:4444"
  headless: false
workflow:
  publish_deadline_secs: 30
"#;
    let p = write_yaml(&tmp, "scribe.yaml", file_yaml);

    let config = ScribeConfigLoader::new()
        .with_file(p)
        .load()
        .expect("load config");

    assert_eq!(config.webdriver.endpoint, "http://127.0.0.1:4444");
    assert!(!config.webdriver.headless);
    assert_eq!(config.workflow.publish_deadline_secs, 30);
    // Untouched sections fall back to their documented defaults.
    assert_eq!(config.workflow.login_wait_secs, 20);
    assert_eq!(config.pacing.body_char_pause_ms, [20, 80]);
    assert_eq!(config.storage.database_url, "sqlite://scribe.db");
    assert!(config.promo.is_none());
}

#[test]
#[serial]
fn missing_file_is_tolerated() {
    let config = ScribeConfigLoader::new()
        .with_file("/definitely/not/here/scribe.yaml")
        .load()
        .expect("defaults despite missing file");

    assert_eq!(config.webdriver.endpoint, "http://localhost:9515");
    assert_eq!(config.workflow.verify_wait_secs, 20);
}

#[test]
#[serial]
fn master_key_is_expanded_from_environment() {
    temp_env::with_var("SCRIBE_MASTER_KEY", Some("a".repeat(64)), || {
        let config = ScribeConfigLoader::new()
            .with_yaml_str("secrets:\n  master_key: \"${SCRIBE_MASTER_KEY}\"\n")
            .load()
            .expect("load config");
        assert_eq!(config.secrets.master_key, "a".repeat(64));
    });
}

#[test]
#[serial]
fn promo_section_parses_when_present() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(
        &tmp,
        "scribe.yaml",
        r#"
promo:
  api_key: "test-key"
"#,
    );

    let config = ScribeConfigLoader::new().with_file(p).load().unwrap();
    let promo = config.promo.expect("promo section");
    assert_eq!(promo.api_key, "test-key");
    assert_eq!(promo.model, "gemini-1.5-flash");
}
