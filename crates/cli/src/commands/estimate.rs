use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use propquote_core::config::{AppConfig, LoadOptions};
use propquote_core::domain::device::DeviceSelection;
use propquote_core::domain::labor::EstimationResult;
use propquote_core::estimation::{
    ConfigurationResolver, EstimateRequest, FallbackProvider, InstallationRuleSet, LaborEstimator,
    StaticDefaults,
};
use propquote_db::{connect_with_config, load_installation_rules, load_labor_rates};
use serde::Deserialize;

use crate::commands::{current_thread_runtime, CommandResult};

/// Either a bare selection list or a full request with rate overrides.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EstimateInput {
    Request(EstimateRequest),
    Selections(Vec<DeviceSelection>),
}

impl EstimateInput {
    fn into_request(self, include_materials: bool) -> EstimateRequest {
        match self {
            Self::Request(request) => EstimateRequest {
                include_materials: request.include_materials && include_materials,
                ..request
            },
            Self::Selections(selections) => {
                EstimateRequest { selections, include_materials, labor_rates: None }
            }
        }
    }
}

pub fn run(
    options: LoadOptions,
    file: &Path,
    include_materials: bool,
    with_database: bool,
) -> CommandResult {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "estimate",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let request = match read_request(file) {
        Ok(input) => input.into_request(include_materials),
        Err(error) => {
            return CommandResult::failure("estimate", "input", format!("{error:#}"), 8);
        }
    };
    if let Err(error) = request.validate() {
        return CommandResult::failure("estimate", "input", error.to_string(), 8);
    }

    let mut rates = config.labor_rates();
    let rules = if with_database {
        match load_stored_rules(&config) {
            Ok((rules, stored_rates)) => {
                rates = rates.with_overrides(&stored_rates);
                rules
            }
            Err(failure) => return failure,
        }
    } else {
        InstallationRuleSet::default()
    };

    let estimator = LaborEstimator::new(
        ConfigurationResolver::new(Arc::new(FallbackProvider::new(rules, StaticDefaults))),
        rates,
    );
    let result = estimator.estimate_request(&request);
    let message = summary(&result);

    match serde_json::to_value(&result) {
        Ok(data) => CommandResult::success_with_data("estimate", message, data),
        Err(error) => CommandResult::failure(
            "estimate",
            "serialization",
            format!("estimate serialization failed: {error}"),
            7,
        ),
    }
}

fn read_request(file: &Path) -> anyhow::Result<EstimateInput> {
    let raw = fs::read_to_string(file)
        .with_context(|| format!("could not read selections file `{}`", file.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("`{}` is not a selection list or estimate request", file.display()))
}

fn load_stored_rules(
    config: &AppConfig,
) -> Result<(InstallationRuleSet, propquote_core::estimation::RateOverrides), CommandResult> {
    let runtime = current_thread_runtime("estimate")?;
    runtime.block_on(async {
        let pool = connect_with_config(&config.database).await.map_err(|error| {
            CommandResult::failure("estimate", "db_connectivity", error.to_string(), 4)
        })?;
        let loaded = async {
            let rules = load_installation_rules(&pool).await?;
            let rates = load_labor_rates(&pool).await?;
            Ok::<_, propquote_db::RepositoryError>((rules, rates))
        }
        .await;
        pool.close().await;
        loaded.map_err(|error| {
            CommandResult::failure("estimate", "rule_load", error.to_string(), 5)
        })
    })
}

fn summary(result: &EstimationResult) -> String {
    if result.labor_items.is_empty() {
        return "no devices with a positive quantity; nothing to estimate".to_string();
    }
    format!(
        "{} labor items, {} hours, {} day(s), total {}",
        result.labor_items.len(),
        result.total_labor_hours.round_dp(2),
        result.estimated_duration_days,
        propquote_core::money::format_currency(result.total_cost)
    )
}
