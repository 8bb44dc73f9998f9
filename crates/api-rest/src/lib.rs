//! # API REST
//!
//! REST API for the companion consent workflow.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (query and multipart parsing, status codes, CORS)
//!
//! Uses `api-shared` for DTOs and `companion-core` for everything else.

#![warn(rust_2018_idioms)]

pub mod convert;
mod handlers;

#[cfg(test)]
mod tests;

use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::Router;
use companion_core::{CompanionError, ConsentsService};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    consents: ConsentsService,
    api_key: Option<Arc<str>>,
}

impl AppState {
    /// `api_key`, when set, guards the task-status endpoint.
    pub fn new(consents: ConsentsService, api_key: Option<&str>) -> Self {
        Self {
            consents,
            api_key: api_key.map(Arc::from),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::get_definitions,
        handlers::get_options,
        handlers::create_capture,
        handlers::get_consent_status,
        handlers::update_task_status,
    ),
    components(schemas(
        api_shared::HealthRes,
        api_shared::ConsentDefinitionRes,
        api_shared::ConsentCategoryRes,
        api_shared::ConsentOptionRes,
        api_shared::ConsentOptionsRes,
        api_shared::CreateCaptureForm,
        api_shared::ConsentCaptureRes,
        api_shared::ConsentStatusRes,
        api_shared::UpdateTaskStatusReq,
        api_shared::TaskRes,
    ))
)]
pub struct ApiDoc;

/// Build the REST router, including Swagger UI at `/swagger-ui`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/companion/:link_id/consents/definitions",
            get(handlers::get_definitions),
        )
        .route(
            "/companion/:link_id/consents/options",
            get(handlers::get_options),
        )
        .route(
            "/companion/:link_id/consents/captures",
            post(handlers::create_capture),
        )
        .route(
            "/companion/:link_id/consents/status/:consent_type",
            get(handlers::get_consent_status),
        )
        .route(
            "/companion/:link_id/tasks/:task_id/status",
            put(handlers::update_task_status),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Map a workflow error to a status code and a client-safe message, logging the detail.
fn error_response(context: &str, e: CompanionError) -> (StatusCode, &'static str) {
    tracing::error!("{context} error: {e:?}");
    let status = if e.is_not_found() {
        StatusCode::NOT_FOUND
    } else if e.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    let message = match e {
        CompanionError::CompanionLinkNotFound(_) => "Companion link not found",
        CompanionError::CareRequestNotFound(_) => "Care request not found",
        CompanionError::TaskNotFound(_) => "Task not found",
        CompanionError::MissingServiceLine(_) => "Care request has no service line",
        CompanionError::InvalidInput(_) => "Bad request",
        _ => "Internal error",
    };
    (status, message)
}
