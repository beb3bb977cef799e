use propquote_core::domain::action::{ActionUrgency, ApprovalPolicy};

use super::{
    column, count_from_db, parse_json, parse_optional_decimal, to_json, ApprovalPolicyRepository,
    RepositoryError,
};
use crate::DbPool;

pub struct SqlApprovalPolicyRepository {
    pool: DbPool,
}

impl SqlApprovalPolicyRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_policy(row: &sqlx::sqlite::SqliteRow) -> Result<ApprovalPolicy, RepositoryError> {
    let action_types: String = column(row, "action_types_json")?;
    let urgency_levels: String = column(row, "urgency_levels_json")?;
    let property_ids: String = column(row, "property_ids_json")?;
    let max_cost: Option<String> = column(row, "max_estimated_cost")?;
    let required: i64 = column(row, "required_approvals")?;
    let priority: i64 = column(row, "priority")?;

    Ok(ApprovalPolicy {
        id: column(row, "id")?,
        name: column(row, "name")?,
        action_types: parse_json("action_types_json", &action_types)?,
        urgency_levels: parse_json::<Vec<ActionUrgency>>("urgency_levels_json", &urgency_levels)?,
        max_estimated_cost: parse_optional_decimal("max_estimated_cost", max_cost)?,
        applies_to_all_properties: column(row, "applies_to_all_properties")?,
        property_ids: parse_json("property_ids_json", &property_ids)?,
        auto_approve: column(row, "auto_approve")?,
        require_explicit_approval: column(row, "require_explicit_approval")?,
        required_approvals: count_from_db("required_approvals", required)?,
        priority: i32::try_from(priority)
            .map_err(|_| RepositoryError::Decode(format!("priority: `{priority}` out of range")))?,
        active: column(row, "active")?,
        expires_after_hours: column(row, "expires_after_hours")?,
    })
}

#[async_trait::async_trait]
impl ApprovalPolicyRepository for SqlApprovalPolicyRepository {
    async fn list_active(&self) -> Result<Vec<ApprovalPolicy>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, action_types_json, urgency_levels_json, max_estimated_cost,
                    applies_to_all_properties, property_ids_json, auto_approve,
                    require_explicit_approval, required_approvals, priority, active,
                    expires_after_hours
             FROM approval_policy
             WHERE active = 1
             ORDER BY priority ASC, rowid ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_policy).collect::<Result<Vec<_>, _>>()
    }

    async fn save(&self, policy: ApprovalPolicy) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO approval_policy (id, name, action_types_json, urgency_levels_json,
                                          max_estimated_cost, applies_to_all_properties,
                                          property_ids_json, auto_approve,
                                          require_explicit_approval, required_approvals,
                                          priority, active, expires_after_hours)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 action_types_json = excluded.action_types_json,
                 urgency_levels_json = excluded.urgency_levels_json,
                 max_estimated_cost = excluded.max_estimated_cost,
                 applies_to_all_properties = excluded.applies_to_all_properties,
                 property_ids_json = excluded.property_ids_json,
                 auto_approve = excluded.auto_approve,
                 require_explicit_approval = excluded.require_explicit_approval,
                 required_approvals = excluded.required_approvals,
                 priority = excluded.priority,
                 active = excluded.active,
                 expires_after_hours = excluded.expires_after_hours",
        )
        .bind(&policy.id)
        .bind(&policy.name)
        .bind(to_json("action_types_json", &policy.action_types)?)
        .bind(to_json("urgency_levels_json", &policy.urgency_levels)?)
        .bind(policy.max_estimated_cost.map(|cost| cost.to_string()))
        .bind(policy.applies_to_all_properties)
        .bind(to_json("property_ids_json", &policy.property_ids)?)
        .bind(policy.auto_approve)
        .bind(policy.require_explicit_approval)
        .bind(i64::from(policy.required_approvals))
        .bind(i64::from(policy.priority))
        .bind(policy.active)
        .bind(policy.expires_after_hours)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
