use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use thiserror::Error;

use propquote_core::domain::action::{ActionStatus, ApprovalPolicy, PendingAction, PendingActionId};

pub mod approval_policy;
pub mod audit;
pub mod installation;
pub mod memory;
pub mod pending_action;

pub use approval_policy::SqlApprovalPolicyRepository;
pub use audit::{AuditWriter, SqlAuditRepository, SqlAuditSink};
pub use installation::{load_installation_rules, load_labor_rates, SqlInstallationRuleRepository};
pub use memory::{InMemoryApprovalPolicyRepository, InMemoryPendingActionRepository};
pub use pending_action::SqlPendingActionRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait ApprovalPolicyRepository: Send + Sync {
    async fn list_active(&self) -> Result<Vec<ApprovalPolicy>, RepositoryError>;
    async fn save(&self, policy: ApprovalPolicy) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait PendingActionRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: &PendingActionId,
    ) -> Result<Option<PendingAction>, RepositoryError>;
    async fn save(&self, action: PendingAction) -> Result<(), RepositoryError>;
    async fn list_by_status(
        &self,
        status: ActionStatus,
        limit: u32,
    ) -> Result<Vec<PendingAction>, RepositoryError>;
}

pub(crate) fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name).map_err(|e| RepositoryError::Decode(format!("{name}: {e}")))
}

pub(crate) fn parse_decimal(name: &str, raw: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(raw.trim())
        .map_err(|e| RepositoryError::Decode(format!("{name}: `{raw}` is not a decimal ({e})")))
}

pub(crate) fn parse_optional_decimal(
    name: &str,
    raw: Option<String>,
) -> Result<Option<Decimal>, RepositoryError> {
    raw.map(|value| parse_decimal(name, &value)).transpose()
}

pub(crate) fn parse_timestamp(name: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("{name}: `{raw}` is not RFC 3339 ({e})")))
}

pub(crate) fn parse_json<T: DeserializeOwned>(name: &str, raw: &str) -> Result<T, RepositoryError> {
    serde_json::from_str(raw).map_err(|e| RepositoryError::Decode(format!("{name}: {e}")))
}

pub(crate) fn to_json<T: serde::Serialize>(name: &str, value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|e| RepositoryError::Decode(format!("{name}: {e}")))
}

pub(crate) fn count_from_db(name: &str, raw: i64) -> Result<u32, RepositoryError> {
    u32::try_from(raw)
        .map_err(|_| RepositoryError::Decode(format!("{name}: `{raw}` is out of range")))
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::{connect_with_settings, migrations, DbPool};

    pub async fn setup() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }
}
