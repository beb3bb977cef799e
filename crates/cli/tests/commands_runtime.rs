use std::env;
use std::fs;
use std::sync::{Mutex, OnceLock};

use propquote_cli::commands::{config, doctor, estimate, migrate};
use propquote_core::config::LoadOptions;
use serde_json::Value;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("PROPQUOTE_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run(LoadOptions::default());
        assert_eq!(result.exit_code, 0, "expected successful migrate run: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_non_sqlite_urls() {
    with_env(&[("PROPQUOTE_DATABASE_URL", "postgres://localhost/propquote")], || {
        let result = migrate::run(LoadOptions::default());
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn doctor_passes_against_a_migrated_database_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("doctor.db").display());

    with_env(&[("PROPQUOTE_DATABASE_URL", url.as_str())], || {
        let migrated = migrate::run(LoadOptions::default());
        assert_eq!(migrated.exit_code, 0, "migrate first: {}", migrated.output);

        let result = doctor::run(LoadOptions::default());
        assert_eq!(result.exit_code, 0, "doctor should pass: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "doctor");
        assert_eq!(payload["data"]["overall_status"], "pass");
        let names: Vec<&str> = payload["data"]["checks"]
            .as_array()
            .expect("checks")
            .iter()
            .filter_map(|check| check["name"].as_str())
            .collect();
        assert!(names.contains(&"installation_rules"));
    });
}

#[test]
fn config_reports_env_sources_and_redacts_tokens() {
    with_env(
        &[
            ("PROPQUOTE_LABOR_RATE_ELECTRICAL", "120.00"),
            ("PROPQUOTE_DOCUMENTS_IMAGE_AUTH_TOKEN", "bearer-secret-value"),
        ],
        || {
            let result = config::run(LoadOptions::default());
            assert_eq!(result.exit_code, 0, "config should load: {}", result.output);
            assert!(!result.output.contains("bearer-secret-value"));

            let payload = parse_payload(&result.output);
            let entries = payload["data"]["entries"].as_array().expect("entries");
            let electrical = entries
                .iter()
                .find(|entry| entry["key"] == "labor.electrical")
                .expect("labor.electrical entry");
            assert_eq!(electrical["value"], "120.00");
            assert_eq!(electrical["source"], "env (PROPQUOTE_LABOR_RATE_ELECTRICAL)");

            let database = entries.iter().find(|entry| entry["key"] == "database.url").expect("url");
            assert_eq!(database["source"], "default");
        },
    );
}

#[test]
fn estimate_reads_a_selection_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let file = dir.path().join("selections.json");
    fs::write(&file, r#"[{"category": "smart_lock", "quantity": 3}, {"category": "hub", "quantity": 1}]"#)
        .expect("write selections");

    with_env(&[], || {
        let result = estimate::run(LoadOptions::default(), &file, true, false);
        assert_eq!(result.exit_code, 0, "estimate should succeed: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "estimate");
        let items = payload["data"]["labor_items"].as_array().expect("labor items");
        assert_eq!(items[0]["task_name"], "Smart Lock Installation");
        assert_eq!(items[1]["task_name"], "Hub Installation");
        assert!(payload["data"]["total_cost"].is_string(), "money serializes as a string");
    });
}

#[test]
fn estimate_reports_unreadable_input() {
    let dir = tempfile::tempdir().expect("temp dir");
    let file = dir.path().join("broken.json");
    fs::write(&file, "{ not json").expect("write file");

    with_env(&[], || {
        let result = estimate::run(LoadOptions::default(), &file, true, false);
        assert_eq!(result.exit_code, 8);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "input");
        assert!(payload["message"].as_str().unwrap_or_default().contains("broken.json"));
    });
}

#[test]
fn estimate_rejects_out_of_range_rate_overrides() {
    let dir = tempfile::tempdir().expect("temp dir");
    let file = dir.path().join("request.json");
    fs::write(
        &file,
        r#"{"selections": [{"category": "camera", "quantity": 2}],
            "labor_rates": {"installation": "-10"}}"#,
    )
    .expect("write request");

    with_env(&[], || {
        let result = estimate::run(LoadOptions::default(), &file, true, false);
        assert_eq!(result.exit_code, 8);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "input");
        assert!(payload["message"]
            .as_str()
            .unwrap_or_default()
            .contains("labor_rates.installation"));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "PROPQUOTE_DATABASE_URL",
        "PROPQUOTE_DATABASE_MAX_CONNECTIONS",
        "PROPQUOTE_DATABASE_TIMEOUT_SECS",
        "PROPQUOTE_SERVER_BIND_ADDRESS",
        "PROPQUOTE_SERVER_PORT",
        "PROPQUOTE_LABOR_RATE_ELECTRICAL",
        "PROPQUOTE_DOCUMENTS_IMAGE_AUTH_TOKEN",
        "PROPQUOTE_DOCUMENTS_TEMPLATE_DIR",
        "PROPQUOTE_LOGGING_LEVEL",
        "PROPQUOTE_LOGGING_FORMAT",
        "PROPQUOTE_LOG_LEVEL",
        "PROPQUOTE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
