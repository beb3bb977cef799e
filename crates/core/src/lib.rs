pub mod approvals;
pub mod audit;
pub mod config;
pub mod documents;
pub mod domain;
pub mod errors;
pub mod estimation;
pub mod money;

pub use approvals::{
    ApprovalError, ApprovalProgress, ApprovalWorkflowEngine, ExecutorRegistry,
    NotificationDispatcher, PolicySource, WorkflowSettings,
};
pub use audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use documents::{BulkDiscount, QuoteDocument};
pub use domain::action::{
    ActionRequest, ActionStatus, ActionUrgency, ApprovalPolicy, PendingAction, PendingActionId,
};
pub use domain::device::DeviceSelection;
pub use domain::installation::{InstallationConfig, LaborCategory, MaterialRequirement};
pub use domain::labor::{EstimationResult, LaborItemCategory, LaborLineItem, MaterialLine};
pub use domain::quote::{Quote, QuoteId, QuoteLineItem};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use estimation::{
    ConfigurationResolver, EstimateRequest, LaborEstimator, LaborRates, StaticDefaults,
};
