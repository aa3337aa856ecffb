use std::convert::Infallible;
use std::time::Duration;

use async_graphql::http::{receive_batch_body, GraphiQLSource, MultipartOptions};
use async_graphql::{Request, Response as GraphQLResponse, Variables};
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    Json,
};
use bytes::Bytes;
use futures_util::{stream, Stream, StreamExt};
use serde::Deserialize;
use tracing::debug;

use crate::graphql::CatalogSchema;
use crate::state::AppState;
use crate::utils::json_error_response;

use super::GRAPHQL_PATH;

const KEEP_ALIVE_SECS: u64 = 15;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamQuery {
    pub query: String,
    pub operation_name: Option<String>,
    pub variables: Option<String>,
}

pub async fn execute(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());
    let max_file_size = state.config.upload.max_file_size;
    let options = MultipartOptions::default().max_file_size(max_file_size);

    let request = match receive_batch_body(content_type, body.as_ref(), options).await {
        Ok(request) => request,
        Err(err) => {
            return json_error_response(
                StatusCode::BAD_REQUEST,
                format!("invalid graphql request: {}", err),
            )
        }
    };
    Json(state.schema.execute_batch(request).await).into_response()
}

pub async fn graphiql(State(state): State<AppState>) -> Response {
    if !state.config.environment.is_development() {
        return json_error_response(StatusCode::NOT_FOUND, "graphiql is disabled");
    }
    Html(GraphiQLSource::build().endpoint(GRAPHQL_PATH).finish()).into_response()
}

pub async fn subscribe_query(
    State(state): State<AppState>,
    Query(params): Query<StreamQuery>,
) -> Response {
    let mut request = Request::new(params.query);
    if let Some(name) = params.operation_name {
        request = request.operation_name(name);
    }
    if let Some(raw) = params.variables.filter(|raw| !raw.trim().is_empty()) {
        match serde_json::from_str(&raw) {
            Ok(value) => request = request.variables(Variables::from_json(value)),
            Err(err) => {
                return json_error_response(
                    StatusCode::BAD_REQUEST,
                    format!("invalid variables: {}", err),
                )
            }
        }
    }
    subscription_response(state.schema.clone(), request).into_response()
}

pub async fn subscribe_json(
    State(state): State<AppState>,
    Json(request): Json<Request>,
) -> Response {
    subscription_response(state.schema.clone(), request).into_response()
}

/// Streams every subscription result as an SSE `next` event and closes with
/// `complete`.
fn subscription_response(
    schema: CatalogSchema,
    request: Request,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("New subscription stream");
    let results = schema
        .execute_stream(request)
        .map(|response| Ok(next_event(&response)));
    let complete = stream::once(async { Ok(Event::default().event("complete").data("")) });

    Sse::new(results.chain(complete)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(KEEP_ALIVE_SECS))
            .text("keep-alive"),
    )
}

fn next_event(response: &GraphQLResponse) -> Event {
    Event::default()
        .event("next")
        .json_data(response)
        .unwrap_or_else(|err| Event::default().event("error").data(err.to_string()))
}
