use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::action::ActionUrgency;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub urgency: ActionUrgency,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>, urgency: ActionUrgency) -> Self {
        Self { title: title.into(), message: message.into(), urgency }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    pub channel: String,
    pub delivered: bool,
    pub error: Option<String>,
}

impl DeliveryOutcome {
    pub fn delivered(channel: impl Into<String>) -> Self {
        Self { channel: channel.into(), delivered: true, error: None }
    }

    pub fn failed(channel: impl Into<String>, error: impl Into<String>) -> Self {
        Self { channel: channel.into(), delivered: false, error: Some(error.into()) }
    }
}

pub trait NotificationDispatcher: Send + Sync {
    fn dispatch(&self, notification: &Notification) -> Result<Vec<DeliveryOutcome>, String>;
}

impl<D> NotificationDispatcher for Arc<D>
where
    D: NotificationDispatcher + ?Sized,
{
    fn dispatch(&self, notification: &Notification) -> Result<Vec<DeliveryOutcome>, String> {
        (**self).dispatch(notification)
    }
}

/// Writes notifications to the log stream; the single `log` channel always succeeds.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotificationDispatcher;

impl NotificationDispatcher for TracingNotificationDispatcher {
    fn dispatch(&self, notification: &Notification) -> Result<Vec<DeliveryOutcome>, String> {
        info!(
            event_name = "approval.notification.dispatched",
            title = %notification.title,
            urgency = notification.urgency.as_str(),
            message = %notification.message,
            "notification dispatched"
        );
        Ok(vec![DeliveryOutcome::delivered("log")])
    }
}

#[derive(Clone, Default)]
pub struct RecordingNotificationDispatcher {
    sent: Arc<Mutex<Vec<Notification>>>,
    fail_with: Option<String>,
}

impl RecordingNotificationDispatcher {
    pub fn failing(error: impl Into<String>) -> Self {
        Self { sent: Arc::default(), fail_with: Some(error.into()) }
    }

    pub fn sent(&self) -> Vec<Notification> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl NotificationDispatcher for RecordingNotificationDispatcher {
    fn dispatch(&self, notification: &Notification) -> Result<Vec<DeliveryOutcome>, String> {
        match self.sent.lock() {
            Ok(mut sent) => sent.push(notification.clone()),
            Err(poisoned) => poisoned.into_inner().push(notification.clone()),
        }
        match &self.fail_with {
            Some(error) => Err(error.clone()),
            None => Ok(vec![DeliveryOutcome::delivered("memory")]),
        }
    }
}
