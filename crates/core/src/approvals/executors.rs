//! Side effects run once an action is approved.
//!
//! Each executor validates its payload and returns a JSON record of what it
//! did. Failures are `ExecutionError` values; the workflow engine records
//! their message on the action and never retries.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::action::PendingAction;
use crate::money::round_currency;

pub const CREATE_WORK_ORDER: &str = "create_work_order";
pub const BOOK_AMENITY: &str = "book_amenity";
pub const GENERATE_ACCESS_CODE: &str = "generate_access_code";
pub const SEND_PAYMENT_LINK: &str = "send_payment_link";
pub const FEATURE_REQUEST: &str = "feature_request";
pub const BUG_REPORT: &str = "bug_report";

const DEFAULT_ACCESS_CODE_HOURS: i64 = 24;
const MAX_ACCESS_CODE_HOURS: i64 = 720;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("no executor registered for action type `{0}`")]
    UnknownActionType(String),
    #[error("payload field `{field}` is required")]
    MissingField { field: String },
    #[error("payload field `{field}` {reason}")]
    InvalidPayload { field: String, reason: String },
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
    #[error("{0}")]
    Rejected(String),
}

impl ExecutionError {
    fn missing(field: &str) -> Self {
        Self::MissingField { field: field.to_string() }
    }

    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPayload { field: field.to_string(), reason: reason.into() }
    }

    fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }
}

pub trait ActionExecutor: Send + Sync {
    fn action_type(&self) -> &'static str;
    fn execute(&self, action: &PendingAction, now: DateTime<Utc>) -> Result<Value, ExecutionError>;
}

#[derive(Default)]
pub struct ExecutorRegistry {
    executors: BTreeMap<String, Box<dyn ActionExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All six built-in executors.
    pub fn standard(payment_link_base_url: Option<String>) -> Self {
        let mut registry = Self::new();
        registry.register(CreateWorkOrderExecutor);
        registry.register(BookAmenityExecutor);
        registry.register(GenerateAccessCodeExecutor);
        registry.register(SendPaymentLinkExecutor::new(payment_link_base_url));
        registry.register(FeatureRequestExecutor);
        registry.register(BugReportExecutor);
        registry
    }

    pub fn register<E>(&mut self, executor: E)
    where
        E: ActionExecutor + 'static,
    {
        self.executors.insert(executor.action_type().to_string(), Box::new(executor));
    }

    pub fn action_types(&self) -> Vec<&str> {
        self.executors.keys().map(String::as_str).collect()
    }

    pub fn execute(
        &self,
        action: &PendingAction,
        now: DateTime<Utc>,
    ) -> Result<Value, ExecutionError> {
        let key = action.action_type.trim().to_ascii_lowercase();
        let executor = self
            .executors
            .get(&key)
            .ok_or_else(|| ExecutionError::UnknownActionType(action.action_type.clone()))?;
        executor.execute(action, now)
    }
}

fn short_id(prefix: &str) -> String {
    let simple = Uuid::new_v4().simple().to_string().to_ascii_uppercase();
    format!("{prefix}-{}", &simple[..8])
}

fn payload_str<'a>(action: &'a PendingAction, key: &str) -> Option<&'a str> {
    action.payload.get(key).and_then(Value::as_str).map(str::trim).filter(|value| !value.is_empty())
}

fn required_str<'a>(action: &'a PendingAction, key: &str) -> Result<&'a str, ExecutionError> {
    payload_str(action, key).ok_or_else(|| ExecutionError::missing(key))
}

fn payload_time(action: &PendingAction, key: &str) -> Result<DateTime<Utc>, ExecutionError> {
    let raw = required_str(action, key)?;
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| ExecutionError::invalid(key, format!("is not an RFC 3339 timestamp: {error}")))
}

fn payload_decimal(action: &PendingAction, key: &str) -> Result<Decimal, ExecutionError> {
    let text = match action.payload.get(key) {
        Some(Value::String(text)) => text.trim().to_string(),
        Some(Value::Number(number)) => number.to_string(),
        _ => return Err(ExecutionError::missing(key)),
    };
    Decimal::from_str(&text)
        .map_err(|error| ExecutionError::invalid(key, format!("is not a decimal: {error}")))
}

fn property_id(action: &PendingAction) -> Result<&str, ExecutionError> {
    action
        .property_id
        .as_deref()
        .or_else(|| payload_str(action, "property_id"))
        .ok_or_else(|| ExecutionError::missing("property_id"))
}

pub struct CreateWorkOrderExecutor;

impl ActionExecutor for CreateWorkOrderExecutor {
    fn action_type(&self) -> &'static str {
        CREATE_WORK_ORDER
    }

    fn execute(&self, action: &PendingAction, now: DateTime<Utc>) -> Result<Value, ExecutionError> {
        let property_id = property_id(action)?;
        if action.title.trim().is_empty() {
            return Err(ExecutionError::rejected("work order title must not be empty"));
        }

        Ok(json!({
            "work_order_id": short_id("WO"),
            "status": "open",
            "property_id": property_id,
            "unit": payload_str(action, "unit"),
            "title": action.title,
            "priority": action.urgency.as_str(),
            "estimated_cost": action.estimated_cost.map(|cost| round_currency(cost).to_string()),
            "opened_at": now.to_rfc3339(),
        }))
    }
}

pub struct BookAmenityExecutor;

impl ActionExecutor for BookAmenityExecutor {
    fn action_type(&self) -> &'static str {
        BOOK_AMENITY
    }

    fn execute(&self, action: &PendingAction, _now: DateTime<Utc>) -> Result<Value, ExecutionError> {
        let amenity = required_str(action, "amenity")?;
        let start = payload_time(action, "start_time")?;
        let end = payload_time(action, "end_time")?;
        if end <= start {
            return Err(ExecutionError::invalid("end_time", "must be after start_time"));
        }

        Ok(json!({
            "booking_id": short_id("BK"),
            "status": "confirmed",
            "amenity": amenity,
            "start_time": start.to_rfc3339(),
            "end_time": end.to_rfc3339(),
            "booked_for": action.requested_by,
        }))
    }
}

pub struct GenerateAccessCodeExecutor;

impl ActionExecutor for GenerateAccessCodeExecutor {
    fn action_type(&self) -> &'static str {
        GENERATE_ACCESS_CODE
    }

    fn execute(&self, action: &PendingAction, now: DateTime<Utc>) -> Result<Value, ExecutionError> {
        let door = payload_str(action, "door")
            .or_else(|| payload_str(action, "unit"))
            .ok_or_else(|| ExecutionError::missing("door"))?;
        let valid_hours = match action.payload.get("valid_hours") {
            None | Some(Value::Null) => DEFAULT_ACCESS_CODE_HOURS,
            Some(value) => value
                .as_i64()
                .ok_or_else(|| ExecutionError::invalid("valid_hours", "must be an integer"))?,
        };
        if !(1..=MAX_ACCESS_CODE_HOURS).contains(&valid_hours) {
            return Err(ExecutionError::invalid(
                "valid_hours",
                format!("must be between 1 and {MAX_ACCESS_CODE_HOURS}"),
            ));
        }

        let code: u32 = rand::thread_rng().gen_range(0..1_000_000);
        Ok(json!({
            "access_code": format!("{code:06}"),
            "door": door,
            "valid_from": now.to_rfc3339(),
            "valid_until": (now + Duration::hours(valid_hours)).to_rfc3339(),
        }))
    }
}

pub struct SendPaymentLinkExecutor {
    base_url: Option<String>,
}

impl SendPaymentLinkExecutor {
    pub fn new(base_url: Option<String>) -> Self {
        Self { base_url: base_url.map(|url| url.trim_end_matches('/').to_string()) }
    }
}

impl ActionExecutor for SendPaymentLinkExecutor {
    fn action_type(&self) -> &'static str {
        SEND_PAYMENT_LINK
    }

    fn execute(&self, action: &PendingAction, _now: DateTime<Utc>) -> Result<Value, ExecutionError> {
        let base_url = self
            .base_url
            .as_deref()
            .ok_or(ExecutionError::NotConfigured("payment link base url"))?;
        let recipient = required_str(action, "recipient")?;
        let amount = payload_decimal(action, "amount")?;
        if amount <= Decimal::ZERO {
            return Err(ExecutionError::invalid("amount", "must be positive"));
        }

        let token = Uuid::new_v4().simple().to_string();
        Ok(json!({
            "payment_link": format!("{base_url}/pay/{token}"),
            "recipient": recipient,
            "amount": round_currency(amount).to_string(),
            "memo": payload_str(action, "memo").unwrap_or(action.title.as_str()),
        }))
    }
}

pub struct FeatureRequestExecutor;

impl ActionExecutor for FeatureRequestExecutor {
    fn action_type(&self) -> &'static str {
        FEATURE_REQUEST
    }

    fn execute(&self, action: &PendingAction, _now: DateTime<Utc>) -> Result<Value, ExecutionError> {
        if action.title.trim().is_empty() {
            return Err(ExecutionError::rejected("feature request title must not be empty"));
        }
        Ok(json!({
            "ticket_id": short_id("FR"),
            "kind": FEATURE_REQUEST,
            "title": action.title,
            "submitted_by": action.requested_by,
            "status": "submitted",
        }))
    }
}

pub struct BugReportExecutor;

impl ActionExecutor for BugReportExecutor {
    fn action_type(&self) -> &'static str {
        BUG_REPORT
    }

    fn execute(&self, action: &PendingAction, _now: DateTime<Utc>) -> Result<Value, ExecutionError> {
        if action.title.trim().is_empty() {
            return Err(ExecutionError::rejected("bug report title must not be empty"));
        }
        let severity = payload_str(action, "severity").unwrap_or("medium").to_ascii_lowercase();
        if !matches!(severity.as_str(), "low" | "medium" | "high" | "critical") {
            return Err(ExecutionError::invalid("severity", format!("has unknown value `{severity}`")));
        }

        Ok(json!({
            "ticket_id": short_id("BUG"),
            "kind": BUG_REPORT,
            "title": action.title,
            "severity": severity,
            "steps_to_reproduce": payload_str(action, "steps_to_reproduce"),
            "submitted_by": action.requested_by,
            "status": "submitted",
        }))
    }
}
