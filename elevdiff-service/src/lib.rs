//! elevdiff Service Library
//!
//! HTTP handlers and types for the elevation differential service.
//! This library is used by both the elevdiff-service binary and integration tests.

pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use elevdiff::{BatchPolicy, BatchProcessor, ElevationSource};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Elevation source type erased so tests can plug in their own.
pub type SharedSource = Arc<dyn ElevationSource>;

/// Application state shared across handlers.
pub struct AppState {
    /// Processor used for every differential request.
    pub processor: BatchProcessor<SharedSource>,
    /// Policy applied when a request does not name one.
    pub policy: BatchPolicy,
}

/// OpenAPI documentation for the elevdiff service.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "elevdiff Service",
        version = "0.1.0",
        description = "Terrain elevation differentials along bearing segments.",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT"),
        contact(name = "Pedro Sanz Martinez", url = "https://github.com/pedrosanzmtz/elevdiff")
    ),
    paths(
        handlers::get_project,
        handlers::post_differential,
        handlers::health_check,
    ),
    components(
        schemas(
            handlers::ProjectResponse,
            handlers::DifferentialRequest,
            handlers::RowDifferential,
            handlers::DifferentialResponse,
            handlers::RowOutcome,
            handlers::CollectResponse,
            handlers::ErrorResponse,
            handlers::HealthResponse,
        )
    ),
    tags(
        (name = "differential", description = "Projection and elevation differential endpoints"),
        (name = "system", description = "System and health endpoints")
    )
)]
pub struct ApiDoc;

/// Build the application router with all routes and Swagger UI.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/project", get(handlers::get_project))
        .route("/differential", post(handlers::post_differential))
        .route("/health", get(handlers::health_check))
        .with_state(state)
}

// Re-export commonly used types for convenience
pub use handlers::{
    CollectResponse, DifferentialRequest, DifferentialResponse, ErrorResponse, HealthResponse,
    ProjectQuery, ProjectResponse, RowDifferential, RowOutcome,
};
