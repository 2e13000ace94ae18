//! HTTP API for submitting localization jobs and polling their status
//!
//! - `POST /localize` (multipart: `file`, `target_lang`)
//! - `GET /localize/status/:job_id`
//! - `GET /health`

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::service::LocalizationService;

pub mod handlers;
pub mod models;
pub mod server;

pub use server::router;

/// API server wrapping the localization service
pub struct ApiServer {
    service: Arc<LocalizationService>,
    port: u16,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(service: Arc<LocalizationService>, port: u16) -> Self {
        Self { service, port }
    }

    /// Start the API server and serve until it fails
    pub async fn start(self) -> Result<()> {
        info!("🚀 Starting API server on port {}", self.port);
        server::start_http_server(self.service, self.port).await
    }
}
