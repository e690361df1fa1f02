use parley_backend::{BackendEndpoint, HttpConnector};
use parley_core::config::{AppConfig, LoadOptions};
use parley_core::{BackendConnector, DialogBackend};
use serde::Serialize;
use serde_json::Value;

use super::{escape_json, CommandResult, EXIT_CHECKS_FAILED};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { EXIT_CHECKS_FAILED };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                concat!(
                    "{{\"overall_status\":\"fail\",",
                    "\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}"
                ),
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let checks = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            let mut checks = vec![DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            }];
            checks.extend(check_backend_access(&config));
            checks
        }
        Err(error) => vec![
            DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            },
            skipped("backend_reachability"),
            skipped("workspace_access"),
        ],
    };

    summarize(checks)
}

fn summarize(checks: Vec<DoctorCheck>) -> DoctorReport {
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
        details: "skipped because configuration did not load".to_string(),
    }
}

/// Runs the reachability and workspace checks on one current-thread runtime.
fn check_backend_access(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![DoctorCheck {
                name: "backend_reachability",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            }];
        }
    };

    let connector = HttpConnector::new(BackendEndpoint::from_config(&config.backend));
    let backend = connector.connect(&config.backend.default_credentials());
    runtime.block_on(async {
        vec![
            check_backend(backend.as_ref()).await,
            check_workspace(backend.as_ref(), &config.backend.workspace_id).await,
        ]
    })
}

async fn check_backend(backend: &dyn DialogBackend) -> DoctorCheck {
    match backend.list_workspaces().await {
        Ok(listing) => {
            let count = listing.get("workspaces").and_then(Value::as_array).map_or(0, Vec::len);
            DoctorCheck {
                name: "backend_reachability",
                status: CheckStatus::Pass,
                details: format!("backend accepted credentials ({count} workspaces visible)"),
            }
        }
        Err(error) => DoctorCheck {
            name: "backend_reachability",
            status: CheckStatus::Fail,
            details: match error.status {
                Some(status) => {
                    format!("backend responded with status {status}: {}", error.message)
                }
                None => format!("backend unreachable: {}", error.message),
            },
        },
    }
}

async fn check_workspace(backend: &dyn DialogBackend, workspace_id: &str) -> DoctorCheck {
    match backend.list_intents(workspace_id).await {
        Ok(listing) => {
            let count = listing.get("intents").and_then(Value::as_array).map_or(0, Vec::len);
            DoctorCheck {
                name: "workspace_access",
                status: CheckStatus::Pass,
                details: format!("workspace `{workspace_id}` readable ({count} intents)"),
            }
        }
        Err(error) => DoctorCheck {
            name: "workspace_access",
            status: CheckStatus::Fail,
            details: format!("workspace `{workspace_id}` not readable: {}", error.message),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
