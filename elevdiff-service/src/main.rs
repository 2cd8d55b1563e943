//! elevdiff Service - HTTP microservice for elevation differentials.
//!
//! A REST API that projects bearing segments and measures the terrain
//! elevation difference between their endpoints.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `ELEVDIFF_PROVIDER` | Elevation API: "open-elevation", "google", "custom" | open-elevation |
//! | `ELEVDIFF_API_KEY` | API key for the google provider | None |
//! | `ELEVDIFF_URL_TEMPLATE` | URL template for the custom provider | None |
//! | `ELEVDIFF_MAX_ATTEMPTS` | Attempts per elevation lookup | 3 |
//! | `ELEVDIFF_RETRY_DELAY_MS` | Pause between attempts | 2000 |
//! | `ELEVDIFF_TIMEOUT_SECS` | HTTP request timeout | 30 |
//! | `ELEVDIFF_ROW_FORMAT` | Default row format: "whitespace", "semicolon" | whitespace |
//! | `ELEVDIFF_POLICY` | Default batch policy: "fail-fast", "collect-all" | fail-fast |
//! | `ELEVDIFF_PORT` | HTTP server port | 8080 |
//! | `RUST_LOG` | Log level (e.g., "info", "debug") | "info" |
//!
//! ## Endpoints
//!
//! - `GET /project?lat=X&lon=Y&bearing=B&distance=D` - Project a segment destination
//! - `POST /differential` - Elevation differentials for a batch of rows
//! - `GET /health` - Health check
//! - `GET /docs` - OpenAPI documentation (Swagger UI)

use std::net::SocketAddr;
use std::sync::Arc;

use elevdiff::EngineConfig;
use elevdiff_service::{router, AppState, SharedSource};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "elevdiff=info,elevdiff_service=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load port from environment (service-specific config)
    let port: u16 = std::env::var("ELEVDIFF_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);

    // The library handles the provider, retry, format and policy variables
    let config = EngineConfig::from_env()?;
    let source: SharedSource = Arc::new(config.source()?);

    tracing::info!(
        provider = config.provider.name(),
        max_attempts = config.retry.max_attempts,
        retry_delay_ms = config.retry.delay.as_millis() as u64,
        format = ?config.format,
        policy = ?config.policy,
        port = port,
        "Starting elevdiff service"
    );

    let state = Arc::new(AppState {
        processor: config.processor(source),
        policy: config.policy,
    });

    // The blocking HTTP client must be built and dropped outside the runtime,
    // so main keeps a handle to the state until the runtime is gone.
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(serve(Arc::clone(&state), port))?;
    drop(runtime);

    Ok(())
}

async fn serve(state: Arc<AppState>, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
