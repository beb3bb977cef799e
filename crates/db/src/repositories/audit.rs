use std::collections::BTreeMap;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::warn;

use propquote_core::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use propquote_core::domain::action::PendingActionId;

use super::{column, parse_json, parse_timestamp, to_json, RepositoryError};
use crate::DbPool;

#[derive(Clone)]
pub struct SqlAuditRepository {
    pool: DbPool,
}

impl SqlAuditRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn append(&self, event: &AuditEvent) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO audit_event (event_id, action_id, correlation_id, event_type, category,
                                      actor, outcome, metadata_json, occurred_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.event_id)
        .bind(event.action_id.as_ref().map(|id| id.0.as_str()))
        .bind(&event.correlation_id)
        .bind(&event.event_type)
        .bind(event.category.as_str())
        .bind(&event.actor)
        .bind(event.outcome.as_str())
        .bind(to_json("metadata_json", &event.metadata)?)
        .bind(event.occurred_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn list_for_action(
        &self,
        action_id: &PendingActionId,
    ) -> Result<Vec<AuditEvent>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT event_id, action_id, correlation_id, event_type, category, actor, outcome,
                    metadata_json, occurred_at
             FROM audit_event
             WHERE action_id = ?
             ORDER BY occurred_at ASC, rowid ASC",
        )
        .bind(&action_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_event).collect::<Result<Vec<_>, _>>()
    }
}

fn row_to_event(row: &sqlx::sqlite::SqliteRow) -> Result<AuditEvent, RepositoryError> {
    let action_id: Option<String> = column(row, "action_id")?;
    let category: String = column(row, "category")?;
    let outcome: String = column(row, "outcome")?;
    let metadata: String = column(row, "metadata_json")?;
    let occurred_at: String = column(row, "occurred_at")?;

    Ok(AuditEvent {
        event_id: column(row, "event_id")?,
        action_id: action_id.map(PendingActionId),
        correlation_id: column(row, "correlation_id")?,
        event_type: column(row, "event_type")?,
        category: AuditCategory::parse(&category)
            .ok_or_else(|| RepositoryError::Decode(format!("category: unknown `{category}`")))?,
        actor: column(row, "actor")?,
        outcome: AuditOutcome::parse(&outcome)
            .ok_or_else(|| RepositoryError::Decode(format!("outcome: unknown `{outcome}`")))?,
        metadata: parse_json::<BTreeMap<String, String>>("metadata_json", &metadata)?,
        occurred_at: parse_timestamp("occurred_at", &occurred_at)?,
    })
}

/// Bridges the synchronous [`AuditSink`] seam onto the async repository.
///
/// Events are queued to a single writer task; a failed write is logged and
/// dropped so the workflow never waits on or fails because of the trail.
/// [`AuditWriter::shutdown`] flushes everything queued before it was called.
#[derive(Clone)]
pub struct SqlAuditSink {
    sender: mpsc::UnboundedSender<AuditEvent>,
}

/// Handle to the writer task behind a [`SqlAuditSink`].
pub struct AuditWriter {
    stop: oneshot::Sender<()>,
    task: JoinHandle<usize>,
}

impl SqlAuditSink {
    /// Must be called within a tokio runtime.
    pub fn spawn(pool: DbPool) -> (Self, AuditWriter) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (stop, stopped) = oneshot::channel();
        let task = tokio::spawn(write_events(SqlAuditRepository::new(pool), receiver, stopped));
        (Self { sender }, AuditWriter { stop, task })
    }
}

impl AuditSink for SqlAuditSink {
    fn emit(&self, event: AuditEvent) {
        if let Err(mpsc::error::SendError(event)) = self.sender.send(event) {
            warn!(
                event_name = "audit.sink_closed",
                audit_event_type = %event.event_type,
                correlation_id = %event.correlation_id,
                "audit writer has shut down; event dropped"
            );
        }
    }
}

impl AuditWriter {
    /// Stops accepting events, persists the backlog and returns how many
    /// events were written over the writer's lifetime.
    pub async fn shutdown(self) -> usize {
        let _ = self.stop.send(());
        match self.task.await {
            Ok(written) => written,
            Err(error) => {
                warn!(
                    event_name = "audit.writer_failed",
                    correlation_id = "shutdown",
                    error = %error,
                    "audit writer task ended abnormally"
                );
                0
            }
        }
    }
}

async fn write_events(
    repository: SqlAuditRepository,
    mut receiver: mpsc::UnboundedReceiver<AuditEvent>,
    mut stopped: oneshot::Receiver<()>,
) -> usize {
    let mut written = 0;
    loop {
        tokio::select! {
            biased;
            event = receiver.recv() => match event {
                Some(event) => written += persist(&repository, &event).await,
                None => return written,
            },
            _ = &mut stopped => break,
        }
    }

    receiver.close();
    while let Some(event) = receiver.recv().await {
        written += persist(&repository, &event).await;
    }
    written
}

async fn persist(repository: &SqlAuditRepository, event: &AuditEvent) -> usize {
    match repository.append(event).await {
        Ok(()) => 1,
        Err(error) => {
            warn!(
                event_name = "audit.persist_failed",
                audit_event_type = %event.event_type,
                correlation_id = %event.correlation_id,
                error = %error,
                "failed to persist audit event"
            );
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use propquote_core::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
    use propquote_core::domain::action::PendingActionId;

    use super::{SqlAuditRepository, SqlAuditSink};
    use crate::repositories::test_support::setup;

    fn event(action: &str, event_type: &str) -> AuditEvent {
        AuditEvent::new(
            Some(PendingActionId(action.to_string())),
            "req-1",
            event_type,
            AuditCategory::Approval,
            "manager-1",
            AuditOutcome::Success,
        )
        .with_metadata("approvals", "1/2")
    }

    #[tokio::test]
    async fn append_and_list_for_action() {
        let pool = setup().await;
        let repo = SqlAuditRepository::new(pool);

        let created = event("act-1", "approval.action.created");
        repo.append(&created).await.expect("append created");
        repo.append(&event("act-1", "approval.action.approved")).await.expect("append approved");
        repo.append(&event("act-2", "approval.action.created")).await.expect("append other");

        let events =
            repo.list_for_action(&PendingActionId("act-1".to_string())).await.expect("list");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], created);
        assert_eq!(events[1].event_type, "approval.action.approved");
    }

    #[tokio::test]
    async fn sink_writes_in_the_background() {
        let pool = setup().await;
        let (sink, writer) = SqlAuditSink::spawn(pool.clone());
        sink.emit(event("act-9", "approval.action.rejected"));

        let repo = SqlAuditRepository::new(pool);
        let action_id = PendingActionId("act-9".to_string());
        let mut stored = Vec::new();
        for _ in 0..50 {
            stored = repo.list_for_action(&action_id).await.expect("list");
            if !stored.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].event_type, "approval.action.rejected");
        assert_eq!(writer.shutdown().await, 1);
    }

    #[tokio::test]
    async fn shutdown_flushes_queued_events_and_refuses_later_ones() {
        let pool = setup().await;
        let (sink, writer) = SqlAuditSink::spawn(pool.clone());
        for step in ["created", "approved", "executed"] {
            sink.emit(event("act-3", &format!("approval.action.{step}")));
        }

        assert_eq!(writer.shutdown().await, 3);
        sink.emit(event("act-3", "approval.action.late"));

        let repo = SqlAuditRepository::new(pool);
        let stored =
            repo.list_for_action(&PendingActionId("act-3".to_string())).await.expect("list");
        let types: Vec<_> = stored.iter().map(|event| event.event_type.as_str()).collect();
        assert_eq!(
            types,
            ["approval.action.created", "approval.action.approved", "approval.action.executed"]
        );
    }
}
