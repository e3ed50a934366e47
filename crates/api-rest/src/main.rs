//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own, without `.env` loading.
//!
//! ## Intended use
//! Useful for development and debugging. The workspace's main `pa-run` binary does the same but
//! also reads a `.env` file first.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{router, AppState};
use api_shared::auth::api_key_from_env_value;
use api_shared::API_KEY_ENV;
use pa_core::config::{baseline_minutes_from_env_value, rules_path_from_env_value};
use pa_core::constants::{BASELINE_MINUTES_ENV, RULES_PATH_ENV};
use pa_core::CoreConfig;

/// Main entry point for the prior-auth REST API server
///
/// # Environment Variables
/// - `PA_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `PA_RULES_PATH`: Payer rules file (JSON or YAML); built-in rules when unset
/// - `PA_BASELINE_MINUTES`: Minutes saved per request for reports (default: 15)
/// - `API_KEY`: Key callers must send in `x-api-key`
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration is invalid or the rules file cannot be loaded,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("pa_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("PA_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    tracing::info!("-- Starting prior-auth REST API on {}", addr);

    let cfg = Arc::new(CoreConfig::new(
        rules_path_from_env_value(std::env::var(RULES_PATH_ENV).ok()),
        baseline_minutes_from_env_value(std::env::var(BASELINE_MINUTES_ENV).ok())?,
    )?);
    let api_key = api_key_from_env_value(std::env::var(API_KEY_ENV).ok())?;

    let app = router(AppState::from_config(cfg, api_key)?);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
