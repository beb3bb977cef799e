use propquote_core::config::{AppConfig, LoadOptions};
use propquote_db::{connect_with_config, load_installation_rules, migrations, DbPool};
use serde::Serialize;

use crate::commands::{current_thread_runtime, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
pub struct DoctorCheck {
    pub name: &'static str,
    pub status: CheckStatus,
    pub details: String,
}

#[derive(Debug, Serialize)]
pub struct DoctorReport {
    pub overall_status: CheckStatus,
    pub summary: String,
    pub checks: Vec<DoctorCheck>,
}

const DATABASE_CHECKS: [&str; 3] =
    ["database_connectivity", "migrations_applied", "installation_rules"];

pub fn run(options: LoadOptions) -> CommandResult {
    let report = build_report(options);

    let data = match serde_json::to_value(&report) {
        Ok(data) => data,
        Err(error) => {
            return CommandResult::failure(
                "doctor",
                "serialization",
                format!("doctor report serialization failed: {error}"),
                7,
            );
        }
    };

    if report.overall_status == CheckStatus::Pass {
        CommandResult::success_with_data("doctor", report.summary, data)
    } else {
        CommandResult::failure_with_data("doctor", "readiness", report.summary, data, 6)
    }
}

pub fn build_report(options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_templates(&config));
            checks.extend(check_database(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(skipped("proposal_template"));
            checks.extend(DATABASE_CHECKS.into_iter().map(skipped));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn skipped(name: &'static str) -> DoctorCheck {
    DoctorCheck {
        name,
        status: CheckStatus::Skipped,
        details: "skipped because an earlier check failed".to_string(),
    }
}

/// A missing directory is fine; the server falls back to the built-in proposal.
fn check_templates(config: &AppConfig) -> DoctorCheck {
    let dir = &config.documents.template_dir;
    let proposal = dir.join("quotes/proposal.html.tera");
    let details = if proposal.exists() {
        format!("custom proposal template at `{}`", proposal.display())
    } else {
        format!("no proposal template under `{}`; built-in layout will be used", dir.display())
    };
    DoctorCheck { name: "proposal_template", status: CheckStatus::Pass, details }
}

fn check_database(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match current_thread_runtime("doctor") {
        Ok(runtime) => runtime,
        Err(failure) => {
            let mut checks = vec![DoctorCheck {
                name: "database_connectivity",
                status: CheckStatus::Fail,
                details: failure.output,
            }];
            checks.extend(DATABASE_CHECKS[1..].iter().copied().map(skipped));
            return checks;
        }
    };

    runtime.block_on(async {
        let pool = match connect_with_config(&config.database).await {
            Ok(pool) => pool,
            Err(error) => {
                let mut checks = vec![DoctorCheck {
                    name: "database_connectivity",
                    status: CheckStatus::Fail,
                    details: format!("failed to connect to database: {error}"),
                }];
                checks.extend(DATABASE_CHECKS[1..].iter().copied().map(skipped));
                return checks;
            }
        };

        let mut checks = vec![DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Pass,
            details: format!("connected using `{}`", config.database.url),
        }];
        let migrations_check = check_migrations(&pool).await;
        let migrated = migrations_check.status == CheckStatus::Pass;
        checks.push(migrations_check);
        checks.push(if migrated { check_rules(&pool).await } else { skipped("installation_rules") });

        pool.close().await;
        checks
    })
}

async fn check_migrations(pool: &DbPool) -> DoctorCheck {
    let known = migrations::MIGRATOR.iter().count() as i64;
    match migrations::applied_count(pool).await {
        Ok(applied) if applied >= known => DoctorCheck {
            name: "migrations_applied",
            status: CheckStatus::Pass,
            details: format!("{applied}/{known} migrations applied"),
        },
        Ok(applied) => DoctorCheck {
            name: "migrations_applied",
            status: CheckStatus::Fail,
            details: format!("{applied}/{known} migrations applied; run `propquote migrate`"),
        },
        Err(error) => DoctorCheck {
            name: "migrations_applied",
            status: CheckStatus::Fail,
            details: format!("migration history unavailable ({error}); run `propquote migrate`"),
        },
    }
}

async fn check_rules(pool: &DbPool) -> DoctorCheck {
    match load_installation_rules(pool).await {
        Ok(rules) => DoctorCheck {
            name: "installation_rules",
            status: CheckStatus::Pass,
            details: format!(
                "{} stored installation configs; static defaults cover the rest",
                rules.config_count()
            ),
        },
        Err(error) => DoctorCheck {
            name: "installation_rules",
            status: CheckStatus::Fail,
            details: format!("stored installation rules are unreadable: {error}"),
        },
    }
}
