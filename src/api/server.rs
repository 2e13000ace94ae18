//! HTTP server implementation for the API

use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use super::handlers;
use crate::service::LocalizationService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<LocalizationService>,
}

/// Build the router with all routes and middleware
pub fn router(service: Arc<LocalizationService>) -> Router {
    let body_limit = service.max_upload_bytes();
    let app_state = AppState { service };

    // Configure CORS to allow browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/localize", post(localize_handler))
        .route("/localize/status/:job_id", get(status_handler))
        .with_state(app_state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
}

/// Configure and start the HTTP server
pub async fn start_http_server(service: Arc<LocalizationService>, port: u16) -> Result<()> {
    let app = router(service);

    // Bind and serve
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("🌐 API server listening on http://0.0.0.0:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check handler
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(handlers::health_check(&state.service).await))
}

/// Localization submission handler
async fn localize_handler(State(state): State<AppState>, multipart: Multipart) -> Response {
    let form = match handlers::read_localize_form(multipart).await {
        Ok(form) => form,
        Err((status, body)) => return (status, Json(body)).into_response(),
    };

    match handlers::localize(&state.service, form).await {
        Ok(data) => (StatusCode::OK, Json(data)).into_response(),
        Err((status, body)) => (status, Json(body)).into_response(),
    }
}

/// Job status handler
async fn status_handler(State(state): State<AppState>, Path(job_id): Path<String>) -> Response {
    match handlers::job_status(&state.service, &job_id).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err((status, body)) => (status, Json(body)).into_response(),
    }
}
