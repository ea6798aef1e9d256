pub mod doctor;
pub mod ledger;
pub mod migrate;
pub mod register;

use std::future::Future;

use mandi_core::config::{AppConfig, LoadOptions};
use mandi_db::{connect, migrations, DbPool};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

/// `(error_class, message, exit_code)` for a command that could not finish.
pub(crate) type CommandFailure = (&'static str, String, u8);

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None)
    }

    pub fn success_with_data(command: &str, message: impl Into<String>, data: Option<Value>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

/// Loads config, opens a migrated pool, runs `work`, and closes the pool.
pub(crate) fn with_database<T, F, Fut>(command: &str, work: F) -> Result<T, CommandResult>
where
    F: FnOnce(DbPool) -> Fut,
    Fut: Future<Output = Result<T, CommandFailure>>,
{
    let config = AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(command, "config_validation", format!("configuration issue: {error}"), 2)
    })?;

    open_database(&config, work).map_err(|(error_class, message, exit_code)| {
        CommandResult::failure(command, error_class, message, exit_code)
    })
}

/// Runs `work` against a migrated pool for an already loaded config.
pub(crate) fn open_database<T, F, Fut>(config: &AppConfig, work: F) -> Result<T, CommandFailure>
where
    F: FnOnce(DbPool) -> Fut,
    Fut: Future<Output = Result<T, CommandFailure>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| ("runtime_init", format!("failed to initialize async runtime: {error}"), 3u8))?;

    runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        let outcome = work(pool.clone()).await;
        pool.close().await;
        outcome
    })
}

pub(crate) fn to_data(value: impl Serialize) -> Option<Value> {
    serde_json::to_value(value).ok()
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            escape_json(&error.to_string())
        )
    })
}

pub(crate) fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
