use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, router};
use companion_core::constants::DEFAULT_REST_ADDR;
use companion_core::config::optional_env_value;
use companion_core::{ConsentsService, CoreConfig, collaborators_from_config};

/// Main entry point for the companion consents service
///
/// Resolves configuration from the environment, wires the Caravan and Dashboard clients and the
/// companion link store into a `ConsentsService`, and serves the REST API until Ctrl-C.
///
/// # Environment Variables
/// - `COMPANION_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `CARAVAN_URL`: Caravan consents API base URL (required)
/// - `DASHBOARD_URL`: Dashboard API base URL (required)
/// - `DASHBOARD_AUTHORIZATION`: `Authorization` header value sent to Dashboard
/// - `DASHBOARD_ACCEPT`: `Accept` header value sent to Dashboard (default: "application/json")
/// - `CONSENT_LANGUAGE_ID`: language of the consent catalog (default: 1, English)
/// - `COMPANION_DATA_DIR`: directory for companion links and tasks (required)
/// - `API_KEY`: API key guarding task status updates
/// - `HTTP_TIMEOUT_SECS`: upstream request timeout (default: 30)
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("companion=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = optional_env_value(std::env::var("COMPANION_REST_ADDR").ok())
        .unwrap_or_else(|| DEFAULT_REST_ADDR.into());

    let config = CoreConfig::from_env()?;
    if config.api_key().is_none() {
        tracing::warn!("API_KEY is not set; task status updates are unauthenticated");
    }

    let consents = ConsentsService::new(collaborators_from_config(&config)?, config.language_id());
    let app = router(AppState::new(consents, config.api_key()));

    tracing::info!("++ Starting companion REST on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("-- Shutting down companion REST");
        })
        .await?;

    Ok(())
}
