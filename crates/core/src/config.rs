use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::approvals::{WorkflowSettings, MAX_EXPIRY_HOURS};
use crate::domain::installation::LaborCategory;
use crate::estimation::LaborRates;

pub const DEFAULT_CONFIG_FILE: &str = "propquote.toml";
const ENV_PREFIX: &str = "PROPQUOTE_";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub labor: LaborConfig,
    pub documents: DocumentsConfig,
    pub approvals: ApprovalsConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

/// Hourly rates per labor category, layered over the built-in table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaborConfig {
    pub rates: BTreeMap<LaborCategory, Decimal>,
}

impl Default for LaborConfig {
    fn default() -> Self {
        Self {
            rates: LaborCategory::ALL
                .into_iter()
                .map(|category| (category, category.default_hourly_rate()))
                .collect(),
        }
    }
}

impl LaborConfig {
    pub fn rate(&self, category: LaborCategory) -> Decimal {
        self.rates.get(&category).copied().unwrap_or_else(|| category.default_hourly_rate())
    }
}

#[derive(Clone, Debug)]
pub struct DocumentsConfig {
    pub template_dir: PathBuf,
    pub company_name: String,
    pub primary_color: String,
    pub image_fetch_timeout_secs: u64,
    pub image_base_url: Option<String>,
    pub image_auth_token: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct ApprovalsConfig {
    pub default_expiry_hours: i64,
    pub default_required_approvals: u32,
    pub payment_link_base_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub server_port: Option<u16>,
    pub template_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://propquote.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            labor: LaborConfig::default(),
            documents: DocumentsConfig {
                template_dir: PathBuf::from("templates"),
                company_name: "PropQuote".to_string(),
                primary_color: "#1f6f5c".to_string(),
                image_fetch_timeout_secs: 10,
                image_base_url: None,
                image_auth_token: None,
            },
            approvals: ApprovalsConfig {
                default_expiry_hours: 72,
                default_required_approvals: 1,
                payment_link_base_url: None,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(labor) = patch.labor {
            for (category, rate) in labor {
                self.labor.rates.insert(category, rate);
            }
        }

        if let Some(documents) = patch.documents {
            if let Some(template_dir) = documents.template_dir {
                self.documents.template_dir = template_dir;
            }
            if let Some(company_name) = documents.company_name {
                self.documents.company_name = company_name;
            }
            if let Some(primary_color) = documents.primary_color {
                self.documents.primary_color = primary_color;
            }
            if let Some(timeout) = documents.image_fetch_timeout_secs {
                self.documents.image_fetch_timeout_secs = timeout;
            }
            if let Some(base_url) = documents.image_base_url {
                self.documents.image_base_url = Some(base_url);
            }
            if let Some(token) = documents.image_auth_token {
                self.documents.image_auth_token = Some(token.into());
            }
        }

        if let Some(approvals) = patch.approvals {
            if let Some(hours) = approvals.default_expiry_hours {
                self.approvals.default_expiry_hours = hours;
            }
            if let Some(required) = approvals.default_required_approvals {
                self.approvals.default_required_approvals = required;
            }
            if let Some(base_url) = approvals.payment_link_base_url {
                self.approvals.payment_link_base_url = Some(base_url);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_env("DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_env("DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("SERVER_PORT") {
            self.server.port = parse_env("SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_env("SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        for category in LaborCategory::ALL {
            let key = format!("LABOR_RATE_{}", category.as_str().to_ascii_uppercase());
            if let Some(value) = read_env(&key) {
                self.labor.rates.insert(category, parse_env::<Decimal>(&key, &value)?);
            }
        }

        if let Some(value) = read_env("DOCUMENTS_TEMPLATE_DIR") {
            self.documents.template_dir = PathBuf::from(value);
        }
        if let Some(value) = read_env("DOCUMENTS_COMPANY_NAME") {
            self.documents.company_name = value;
        }
        if let Some(value) = read_env("DOCUMENTS_PRIMARY_COLOR") {
            self.documents.primary_color = value;
        }
        if let Some(value) = read_env("DOCUMENTS_IMAGE_FETCH_TIMEOUT_SECS") {
            self.documents.image_fetch_timeout_secs =
                parse_env("DOCUMENTS_IMAGE_FETCH_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("DOCUMENTS_IMAGE_BASE_URL") {
            self.documents.image_base_url = Some(value);
        }
        if let Some(value) = read_env("DOCUMENTS_IMAGE_AUTH_TOKEN") {
            self.documents.image_auth_token = Some(value.into());
        }

        if let Some(value) = read_env("APPROVALS_DEFAULT_EXPIRY_HOURS") {
            self.approvals.default_expiry_hours =
                parse_env("APPROVALS_DEFAULT_EXPIRY_HOURS", &value)?;
        }
        if let Some(value) = read_env("APPROVALS_DEFAULT_REQUIRED_APPROVALS") {
            self.approvals.default_required_approvals =
                parse_env("APPROVALS_DEFAULT_REQUIRED_APPROVALS", &value)?;
        }
        if let Some(value) = read_env("APPROVALS_PAYMENT_LINK_BASE_URL") {
            self.approvals.payment_link_base_url = Some(value);
        }

        let log_level = read_env("LOGGING_LEVEL").or_else(|| read_env("LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("LOGGING_FORMAT").or_else(|| read_env("LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(template_dir) = overrides.template_dir {
            self.documents.template_dir = template_dir;
        }
    }

    pub fn labor_rates(&self) -> LaborRates {
        LaborRates::new(self.labor.rates.clone())
    }

    pub fn workflow_settings(&self) -> WorkflowSettings {
        WorkflowSettings {
            default_expiry_hours: self.approvals.default_expiry_hours,
            default_required_approvals: self.approvals.default_required_approvals,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_labor(&self.labor)?;
        validate_documents(&self.documents)?;
        validate_approvals(&self.approvals)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), Path::new("config").join(DEFAULT_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_labor(labor: &LaborConfig) -> Result<(), ConfigError> {
    for (category, rate) in &labor.rates {
        if *rate <= Decimal::ZERO {
            return Err(ConfigError::Validation(format!(
                "labor.{} must be greater than zero",
                category.as_str()
            )));
        }
    }
    Ok(())
}

fn validate_documents(documents: &DocumentsConfig) -> Result<(), ConfigError> {
    if documents.image_fetch_timeout_secs == 0 || documents.image_fetch_timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "documents.image_fetch_timeout_secs must be in range 1..=120".to_string(),
        ));
    }

    if let Some(base_url) = &documents.image_base_url {
        if !is_http_url(base_url) {
            return Err(ConfigError::Validation(
                "documents.image_base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    let blank_token = documents
        .image_auth_token
        .as_ref()
        .is_some_and(|token| token.expose_secret().trim().is_empty());
    if blank_token {
        return Err(ConfigError::Validation(
            "documents.image_auth_token must not be blank when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_approvals(approvals: &ApprovalsConfig) -> Result<(), ConfigError> {
    if approvals.default_expiry_hours <= 0 {
        return Err(ConfigError::Validation(
            "approvals.default_expiry_hours must be greater than zero".to_string(),
        ));
    }

    if approvals.default_expiry_hours > MAX_EXPIRY_HOURS {
        return Err(ConfigError::Validation(format!(
            "approvals.default_expiry_hours must be at most {MAX_EXPIRY_HOURS}"
        )));
    }

    if approvals.default_required_approvals == 0 {
        return Err(ConfigError::Validation(
            "approvals.default_required_approvals must be at least 1".to_string(),
        ));
    }

    if let Some(base_url) = &approvals.payment_link_base_url {
        if !is_http_url(base_url) {
            return Err(ConfigError::Validation(
                "approvals.payment_link_base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

/// Reads `PROPQUOTE_<suffix>`; blank values count as unset.
fn read_env(suffix: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}{suffix}")).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: FromStr>(suffix: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: format!("{ENV_PREFIX}{suffix}"),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    labor: Option<BTreeMap<LaborCategory, Decimal>>,
    documents: Option<DocumentsPatch>,
    approvals: Option<ApprovalsPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct DocumentsPatch {
    template_dir: Option<PathBuf>,
    company_name: Option<String>,
    primary_color: Option<String>,
    image_fetch_timeout_secs: Option<u64>,
    image_base_url: Option<String>,
    image_auth_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ApprovalsPatch {
    default_expiry_hours: Option<i64>,
    default_required_approvals: Option<u32>,
    payment_link_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
