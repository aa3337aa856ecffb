pub mod graphql;

use axum::{
    extract::DefaultBodyLimit,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::state::{AppState, HealthResponse};

pub const GRAPHQL_PATH: &str = "/graphql";
pub const GRAPHQL_STREAM_PATH: &str = "/graphql/stream";

/// Room for the multipart envelope around an upload of the maximum size.
const UPLOAD_BODY_OVERHEAD: usize = 64 * 1024;

pub fn api_router(state: AppState) -> Router {
    let body_limit = state
        .config
        .upload
        .max_file_size
        .saturating_add(UPLOAD_BODY_OVERHEAD);

    Router::new()
        .route("/health", get(health))
        .route(
            GRAPHQL_PATH,
            get(graphql::graphiql)
                .post(graphql::execute)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .route(
            GRAPHQL_STREAM_PATH,
            get(graphql::subscribe_query).post(graphql::subscribe_json),
        )
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}
