use propquote_core::domain::action::{
    ActionStatus, ActionUrgency, ApprovalRecord, PendingAction, PendingActionId, RejectionRecord,
};

use super::{
    column, count_from_db, parse_json, parse_optional_decimal, parse_timestamp, to_json,
    PendingActionRepository, RepositoryError,
};
use crate::DbPool;

const SELECT_COLUMNS: &str = "SELECT id, action_type, title, description, requested_by,
        property_id, urgency, estimated_cost, payload_json, status, policy_id,
        can_auto_approve, auto_approved, approval_count_current, approval_count_required,
        approvals_json, rejection_json, executed, executed_at, execution_result_json,
        execution_error, expires_at, created_at, updated_at
    FROM pending_action";

pub struct SqlPendingActionRepository {
    pool: DbPool,
}

impl SqlPendingActionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_action(row: &sqlx::sqlite::SqliteRow) -> Result<PendingAction, RepositoryError> {
    let urgency: String = column(row, "urgency")?;
    let status: String = column(row, "status")?;
    let estimated_cost: Option<String> = column(row, "estimated_cost")?;
    let payload: String = column(row, "payload_json")?;
    let approvals: String = column(row, "approvals_json")?;
    let rejection: Option<String> = column(row, "rejection_json")?;
    let executed_at: Option<String> = column(row, "executed_at")?;
    let execution_result: Option<String> = column(row, "execution_result_json")?;
    let current: i64 = column(row, "approval_count_current")?;
    let required: i64 = column(row, "approval_count_required")?;
    let expires_at: String = column(row, "expires_at")?;
    let created_at: String = column(row, "created_at")?;
    let updated_at: String = column(row, "updated_at")?;

    Ok(PendingAction {
        id: PendingActionId(column(row, "id")?),
        action_type: column(row, "action_type")?,
        title: column(row, "title")?,
        description: column(row, "description")?,
        requested_by: column(row, "requested_by")?,
        property_id: column(row, "property_id")?,
        urgency: ActionUrgency::parse(&urgency)
            .ok_or_else(|| RepositoryError::Decode(format!("urgency: unknown value `{urgency}`")))?,
        estimated_cost: parse_optional_decimal("estimated_cost", estimated_cost)?,
        payload: parse_json("payload_json", &payload)?,
        status: ActionStatus::parse(&status)
            .ok_or_else(|| RepositoryError::Decode(format!("status: unknown value `{status}`")))?,
        policy_id: column(row, "policy_id")?,
        can_auto_approve: column(row, "can_auto_approve")?,
        auto_approved: column(row, "auto_approved")?,
        approval_count_current: count_from_db("approval_count_current", current)?,
        approval_count_required: count_from_db("approval_count_required", required)?,
        approvals: parse_json::<Vec<ApprovalRecord>>("approvals_json", &approvals)?,
        rejection: rejection
            .map(|raw| parse_json::<RejectionRecord>("rejection_json", &raw))
            .transpose()?,
        executed: column(row, "executed")?,
        executed_at: executed_at.map(|raw| parse_timestamp("executed_at", &raw)).transpose()?,
        execution_result: execution_result
            .map(|raw| parse_json("execution_result_json", &raw))
            .transpose()?,
        execution_error: column(row, "execution_error")?,
        expires_at: parse_timestamp("expires_at", &expires_at)?,
        created_at: parse_timestamp("created_at", &created_at)?,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
    })
}

#[async_trait::async_trait]
impl PendingActionRepository for SqlPendingActionRepository {
    async fn find_by_id(
        &self,
        id: &PendingActionId,
    ) -> Result<Option<PendingAction>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_action).transpose()
    }

    async fn save(&self, action: PendingAction) -> Result<(), RepositoryError> {
        let rejection = action
            .rejection
            .as_ref()
            .map(|record| to_json("rejection_json", record))
            .transpose()?;
        let execution_result = action
            .execution_result
            .as_ref()
            .map(|value| to_json("execution_result_json", value))
            .transpose()?;

        sqlx::query(
            "INSERT INTO pending_action (id, action_type, title, description, requested_by,
                                         property_id, urgency, estimated_cost, payload_json,
                                         status, policy_id, can_auto_approve, auto_approved,
                                         approval_count_current, approval_count_required,
                                         approvals_json, rejection_json, executed, executed_at,
                                         execution_result_json, execution_error, expires_at,
                                         created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 status = excluded.status,
                 policy_id = excluded.policy_id,
                 can_auto_approve = excluded.can_auto_approve,
                 auto_approved = excluded.auto_approved,
                 approval_count_current = excluded.approval_count_current,
                 approval_count_required = excluded.approval_count_required,
                 approvals_json = excluded.approvals_json,
                 rejection_json = excluded.rejection_json,
                 executed = excluded.executed,
                 executed_at = excluded.executed_at,
                 execution_result_json = excluded.execution_result_json,
                 execution_error = excluded.execution_error,
                 expires_at = excluded.expires_at,
                 updated_at = excluded.updated_at",
        )
        .bind(&action.id.0)
        .bind(&action.action_type)
        .bind(&action.title)
        .bind(&action.description)
        .bind(&action.requested_by)
        .bind(&action.property_id)
        .bind(action.urgency.as_str())
        .bind(action.estimated_cost.map(|cost| cost.to_string()))
        .bind(to_json("payload_json", &action.payload)?)
        .bind(action.status.as_str())
        .bind(&action.policy_id)
        .bind(action.can_auto_approve)
        .bind(action.auto_approved)
        .bind(i64::from(action.approval_count_current))
        .bind(i64::from(action.approval_count_required))
        .bind(to_json("approvals_json", &action.approvals)?)
        .bind(rejection)
        .bind(action.executed)
        .bind(action.executed_at.map(|at| at.to_rfc3339()))
        .bind(execution_result)
        .bind(&action.execution_error)
        .bind(action.expires_at.to_rfc3339())
        .bind(action.created_at.to_rfc3339())
        .bind(action.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_by_status(
        &self,
        status: ActionStatus,
        limit: u32,
    ) -> Result<Vec<PendingAction>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE status = ? ORDER BY created_at ASC LIMIT ?"
        ))
        .bind(status.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_action).collect::<Result<Vec<_>, _>>()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;
    use serde_json::json;

    use propquote_core::domain::action::{
        ActionRequest, ActionStatus, ActionUrgency, ApprovalRecord, PendingAction,
        PendingActionId, RejectionRecord,
    };

    use super::SqlPendingActionRepository;
    use crate::repositories::test_support::setup;
    use crate::repositories::PendingActionRepository;

    fn sample_action(id: &str, minute: u32) -> PendingAction {
        let created = Utc.with_ymd_and_hms(2026, 3, 2, 10, minute, 0).single().expect("valid time");
        PendingAction::from_request(
            PendingActionId(id.to_string()),
            ActionRequest {
                action_type: "book_amenity".to_string(),
                title: "Rooftop booking".to_string(),
                description: "Saturday evening".to_string(),
                requested_by: "resident-12".to_string(),
                property_id: Some("prop-1".to_string()),
                urgency: ActionUrgency::High,
                estimated_cost: Some(Decimal::new(4_550, 2)),
                payload: json!({ "amenity": "rooftop" }),
            },
            created,
            created + Duration::hours(72),
        )
    }

    #[tokio::test]
    async fn save_and_find_by_id_round_trip() {
        let pool = setup().await;
        let repo = SqlPendingActionRepository::new(pool);
        let action = sample_action("act-1", 0);

        repo.save(action.clone()).await.expect("save");
        let found = repo.find_by_id(&action.id).await.expect("find");

        assert_eq!(found, Some(action));
        assert_eq!(
            repo.find_by_id(&PendingActionId("missing".to_string())).await.expect("find missing"),
            None
        );
    }

    #[tokio::test]
    async fn upsert_persists_workflow_progress() {
        let pool = setup().await;
        let repo = SqlPendingActionRepository::new(pool);
        let mut action = sample_action("act-1", 0);
        repo.save(action.clone()).await.expect("save");

        let approved_at = action.created_at + Duration::minutes(5);
        action.approvals.push(ApprovalRecord {
            approver: "manager-1".to_string(),
            comment: Some("ok".to_string()),
            approved_at,
        });
        action.approval_count_current = 1;
        action.status = ActionStatus::Approved;
        action.executed = false;
        action.executed_at = Some(approved_at);
        action.execution_error = Some("amenity is closed".to_string());
        action.updated_at = approved_at;
        repo.save(action.clone()).await.expect("upsert");

        let found = repo.find_by_id(&action.id).await.expect("find").expect("exists");
        assert_eq!(found, action);
        assert!(found.is_terminal());
    }

    #[tokio::test]
    async fn list_by_status_filters_and_orders_by_creation() {
        let pool = setup().await;
        let repo = SqlPendingActionRepository::new(pool);

        repo.save(sample_action("act-late", 30)).await.expect("save late");
        repo.save(sample_action("act-early", 5)).await.expect("save early");

        let mut rejected = sample_action("act-rejected", 10);
        rejected.status = ActionStatus::Rejected;
        rejected.rejection = Some(RejectionRecord {
            rejected_by: "manager-2".to_string(),
            reason: "double booked".to_string(),
            rejected_at: rejected.created_at,
        });
        repo.save(rejected).await.expect("save rejected");

        let pending = repo.list_by_status(ActionStatus::Pending, 10).await.expect("list pending");
        let ids: Vec<&str> = pending.iter().map(|action| action.id.0.as_str()).collect();
        assert_eq!(ids, vec!["act-early", "act-late"]);

        let rejected = repo.list_by_status(ActionStatus::Rejected, 10).await.expect("list");
        assert_eq!(rejected.len(), 1);
        assert_eq!(
            rejected[0].rejection.as_ref().map(|record| record.reason.as_str()),
            Some("double booked")
        );
    }
}
