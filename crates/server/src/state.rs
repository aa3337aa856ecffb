use std::sync::Arc;

use serde::Serialize;

use crate::config::ServerConfig;
use crate::graphql::CatalogSchema;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub schema: CatalogSchema,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
