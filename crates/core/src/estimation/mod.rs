//! Labor and materials estimation for device installations.

pub mod aggregate;
pub mod defaults;
pub mod estimator;
pub mod narrative;
pub mod rates;
pub mod resolver;

pub use aggregate::{duration_days, summarize, CostSummary, HOURS_PER_WORKDAY};
pub use defaults::StaticDefaults;
pub use estimator::{efficiency_multiplier, EstimateRequest, LaborEstimator};
pub use rates::{rate_category_for, LaborRates, RateOverrides};
pub use resolver::{
    ConfigQuery, ConfigSource, ConfigurationProvider, ConfigurationResolver, FallbackProvider,
    InstallationRuleSet, ResolvedInstallation,
};
