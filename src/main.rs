use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{router, AppState};
use api_shared::{auth::api_key_from_env_value, API_KEY_ENV};
use pa_core::config::{baseline_minutes_from_env_value, rules_path_from_env_value};
use pa_core::constants::{BASELINE_MINUTES_ENV, RULES_PATH_ENV};
use pa_core::CoreConfig;

/// Main entry point for the prior-authorization service
///
/// Loads `.env` if present, resolves configuration once, and serves the REST API with
/// OpenAPI/Swagger UI at `/swagger-ui`.
///
/// # Environment Variables
/// - `PA_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `PA_RULES_PATH`: Payer rules file; the built-in rules are used when unset
/// - `PA_BASELINE_MINUTES`: Minutes saved per drafted request (default: 15)
/// - `API_KEY`: API key required in the `x-api-key` header
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration, startup or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pa=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("PA_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = Arc::new(CoreConfig::new(
        rules_path_from_env_value(std::env::var(RULES_PATH_ENV).ok()),
        baseline_minutes_from_env_value(std::env::var(BASELINE_MINUTES_ENV).ok())?,
    )?);
    let api_key = api_key_from_env_value(std::env::var(API_KEY_ENV).ok())?;
    let state = AppState::from_config(cfg, api_key)?;

    tracing::info!(
        "++ Starting prior-auth REST on {} (rules v{})",
        rest_addr,
        state.rules().version()
    );

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
