use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use propquote_core::config::{AppConfig, LoadOptions};
use propquote_core::domain::installation::LaborCategory;
use secrecy::ExposeSecret;
use serde::Serialize;
use serde_json::json;
use toml::Value;

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct ConfigEntry {
    key: String,
    value: String,
    source: String,
}

struct SourceLookup {
    path: Option<PathBuf>,
    doc: Option<Value>,
}

impl SourceLookup {
    fn new(explicit: Option<&Path>) -> Self {
        let path = explicit.map(Path::to_path_buf).or_else(detect_config_path);
        let doc = load_config_file_doc(path.as_deref());
        Self { path, doc }
    }

    fn entry(&self, key: &str, value: impl Into<String>, env_keys: &[&str]) -> ConfigEntry {
        ConfigEntry { key: key.to_string(), value: value.into(), source: self.source(key, env_keys) }
    }

    fn source(&self, key_path: &str, env_keys: &[&str]) -> String {
        if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
            return format!("env ({env_key})");
        }

        if let Some(doc) = &self.doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .path
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

/// Effective configuration with per-key source attribution (env > file > default).
pub fn run(options: LoadOptions) -> CommandResult {
    let lookup = SourceLookup::new(options.config_path.as_deref());
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                2,
            );
        }
    };

    let entries = effective_entries(&config, &lookup);
    let config_file = lookup.path.as_ref().map(|path| path.display().to_string());
    CommandResult::success_with_data(
        "config",
        format!("{} effective settings", entries.len()),
        json!({ "config_file": config_file, "entries": entries }),
    )
}

fn effective_entries(config: &AppConfig, lookup: &SourceLookup) -> Vec<ConfigEntry> {
    let mut entries = vec![
        lookup.entry("database.url", &config.database.url, &["PROPQUOTE_DATABASE_URL"]),
        lookup.entry(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["PROPQUOTE_DATABASE_MAX_CONNECTIONS"],
        ),
        lookup.entry(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["PROPQUOTE_DATABASE_TIMEOUT_SECS"],
        ),
        lookup.entry(
            "server.bind_address",
            &config.server.bind_address,
            &["PROPQUOTE_SERVER_BIND_ADDRESS"],
        ),
        lookup.entry("server.port", config.server.port.to_string(), &["PROPQUOTE_SERVER_PORT"]),
        lookup.entry(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["PROPQUOTE_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
    ];

    for category in LaborCategory::ALL {
        let env_key = format!("PROPQUOTE_LABOR_RATE_{}", category.as_str().to_ascii_uppercase());
        entries.push(lookup.entry(
            &format!("labor.{}", category.as_str()),
            config.labor.rate(category).to_string(),
            &[env_key.as_str()],
        ));
    }

    let documents = &config.documents;
    entries.extend([
        lookup.entry(
            "documents.template_dir",
            documents.template_dir.display().to_string(),
            &["PROPQUOTE_DOCUMENTS_TEMPLATE_DIR"],
        ),
        lookup.entry(
            "documents.company_name",
            &documents.company_name,
            &["PROPQUOTE_DOCUMENTS_COMPANY_NAME"],
        ),
        lookup.entry(
            "documents.primary_color",
            &documents.primary_color,
            &["PROPQUOTE_DOCUMENTS_PRIMARY_COLOR"],
        ),
        lookup.entry(
            "documents.image_fetch_timeout_secs",
            documents.image_fetch_timeout_secs.to_string(),
            &["PROPQUOTE_DOCUMENTS_IMAGE_FETCH_TIMEOUT_SECS"],
        ),
        lookup.entry(
            "documents.image_base_url",
            documents.image_base_url.as_deref().unwrap_or("<unset>"),
            &["PROPQUOTE_DOCUMENTS_IMAGE_BASE_URL"],
        ),
        lookup.entry(
            "documents.image_auth_token",
            documents
                .image_auth_token
                .as_ref()
                .map(|token| redact_token(token.expose_secret()))
                .unwrap_or_else(|| "<unset>".to_string()),
            &["PROPQUOTE_DOCUMENTS_IMAGE_AUTH_TOKEN"],
        ),
    ]);

    let approvals = &config.approvals;
    entries.extend([
        lookup.entry(
            "approvals.default_expiry_hours",
            approvals.default_expiry_hours.to_string(),
            &["PROPQUOTE_APPROVALS_DEFAULT_EXPIRY_HOURS"],
        ),
        lookup.entry(
            "approvals.default_required_approvals",
            approvals.default_required_approvals.to_string(),
            &["PROPQUOTE_APPROVALS_DEFAULT_REQUIRED_APPROVALS"],
        ),
        lookup.entry(
            "approvals.payment_link_base_url",
            approvals.payment_link_base_url.as_deref().unwrap_or("<unset>"),
            &["PROPQUOTE_APPROVALS_PAYMENT_LINK_BASE_URL"],
        ),
        lookup.entry(
            "logging.level",
            &config.logging.level,
            &["PROPQUOTE_LOGGING_LEVEL", "PROPQUOTE_LOG_LEVEL"],
        ),
        lookup.entry(
            "logging.format",
            config.logging.format.as_str(),
            &["PROPQUOTE_LOGGING_FORMAT", "PROPQUOTE_LOG_FORMAT"],
        ),
    ]);

    entries
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("propquote.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/propquote.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

/// Keeps at most the first four characters of long tokens.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }
    if trimmed.chars().count() <= 8 {
        return "<redacted>".to_string();
    }

    let prefix: String = trimmed.chars().take(4).collect();
    format!("{prefix}***")
}
