use mandi_core::config::{AppConfig, LoadOptions};
use mandi_db::ping;
use serde::Serialize;

use crate::commands::{escape_json, open_database};

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

impl DoctorCheck {
    fn new(name: &'static str, status: CheckStatus, details: impl Into<String>) -> Self {
        Self { name, status, details: details.into() }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: &'static str,
    checks: Vec<DoctorCheck>,
}

/// Readiness of the config, the Twilio media credentials and the database.
pub fn run(json_output: bool) -> String {
    let checks = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => vec![
            DoctorCheck::new("config_validation", CheckStatus::Pass, "configuration loaded and validated"),
            twilio_credentials(&config),
            database(&config),
        ],
        Err(error) => {
            let skipped = "skipped because configuration did not load";
            vec![
                DoctorCheck::new("config_validation", CheckStatus::Fail, error.to_string()),
                DoctorCheck::new("twilio_credentials", CheckStatus::Skipped, skipped),
                DoctorCheck::new("database_connectivity", CheckStatus::Skipped, skipped),
            ]
        }
    };

    let healthy = checks.iter().all(|check| check.status != CheckStatus::Fail);
    let report = DoctorReport {
        overall_status: if healthy { CheckStatus::Pass } else { CheckStatus::Fail },
        summary: if healthy {
            "doctor: all readiness checks passed"
        } else {
            "doctor: one or more readiness checks failed"
        },
        checks,
    };

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    let mut lines = vec![report.summary.to_string()];
    lines.extend(report.checks.iter().map(|check| {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        format!("- [{marker}] {}: {}", check.name, check.details)
    }));
    lines.join("\n")
}

fn twilio_credentials(config: &AppConfig) -> DoctorCheck {
    match &config.whatsapp.account_sid {
        Some(_) => DoctorCheck::new(
            "twilio_credentials",
            CheckStatus::Pass,
            "media downloads from twilio.com will be authenticated",
        ),
        None => DoctorCheck::new(
            "twilio_credentials",
            CheckStatus::Skipped,
            "not configured; twilio.com media URLs will be fetched anonymously",
        ),
    }
}

// Goes through the same connect-and-migrate path as the ledger commands.
fn database(config: &AppConfig) -> DoctorCheck {
    let checked = open_database(config, |pool| async move {
        ping(&pool).await.map_err(|error| ("db_query", format!("database query failed: {error}"), 4u8))
    });

    match checked {
        Ok(()) => DoctorCheck::new(
            "database_connectivity",
            CheckStatus::Pass,
            format!("connected using `{}` with migrations applied", config.database.url),
        ),
        Err((error_class, message, _)) => {
            DoctorCheck::new("database_connectivity", CheckStatus::Fail, format!("{error_class}: {message}"))
        }
    }
}
