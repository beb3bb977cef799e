use std::sync::Arc;

use propquote_core::approvals::{
    ApprovalWorkflowEngine, ExecutorRegistry, NotificationDispatcher, TracingNotificationDispatcher,
};
use propquote_core::audit::AuditSink;
use propquote_core::config::{AppConfig, ConfigError, LoadOptions};
use propquote_core::estimation::{
    ConfigurationResolver, FallbackProvider, LaborEstimator, StaticDefaults,
};
use propquote_db::repositories::{
    AuditWriter, SqlApprovalPolicyRepository, SqlAuditSink, SqlPendingActionRepository,
};
use propquote_db::{
    connect_with_config, load_installation_rules, load_labor_rates, migrations, DbPool,
    RepositoryError,
};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use crate::api::ApiState;
use crate::documents::{DocumentError, DocumentRenderer, HttpImageFetcher, ImageFetcher};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub api_state: ApiState,
    pub audit_writer: AuditWriter,
    pub pdf_enabled: bool,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("installation rules could not be loaded: {0}")]
    Rules(#[source] RepositoryError),
    #[error("document pipeline setup failed: {0}")]
    Documents(#[from] DocumentError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

/// Connects, migrates, snapshots the rule set and wires the API state.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let rules = load_installation_rules(&db_pool).await.map_err(BootstrapError::Rules)?;
    let stored_rates = load_labor_rates(&db_pool).await.map_err(BootstrapError::Rules)?;
    let rates = config.labor_rates().with_overrides(&stored_rates);
    info!(
        event_name = "system.bootstrap.rules_loaded",
        correlation_id = "bootstrap",
        configs = rules.config_count(),
        stored_rates = stored_rates.len(),
        "installation rule snapshot ready"
    );
    let estimator = LaborEstimator::new(
        ConfigurationResolver::new(Arc::new(FallbackProvider::new(rules, StaticDefaults))),
        rates,
    );

    let renderer = DocumentRenderer::from_config(&config.documents)?;
    let pdf_enabled = renderer.produces_pdf();
    let image_fetcher: Arc<dyn ImageFetcher> =
        Arc::new(HttpImageFetcher::from_config(&config.documents)?);

    let notifier: Arc<dyn NotificationDispatcher> = Arc::new(TracingNotificationDispatcher);
    let (audit_sink, audit_writer) = SqlAuditSink::spawn(db_pool.clone());
    let audit: Arc<dyn AuditSink> = Arc::new(audit_sink);
    let engine = ApprovalWorkflowEngine::new(
        config.workflow_settings(),
        ExecutorRegistry::standard(config.approvals.payment_link_base_url.clone()),
        notifier,
        audit,
    );

    let api_state = ApiState {
        estimator: Arc::new(estimator),
        renderer: Arc::new(renderer),
        image_fetcher,
        policies: Arc::new(SqlApprovalPolicyRepository::new(db_pool.clone())),
        actions: Arc::new(SqlPendingActionRepository::new(db_pool.clone())),
        engine: Arc::new(engine),
        action_lock: Arc::new(Mutex::new(())),
    };

    Ok(Application { config, db_pool, api_state, audit_writer, pdf_enabled })
}
