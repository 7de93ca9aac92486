//! Health, cache maintenance and debugging endpoints.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, Query, State},
    http::{HeaderMap, Method, Uri},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::{debug, info};

use crate::handlers::client_ip;
use crate::{ApiError, AppState};

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "queue_length": state.queue.len(),
    }))
}

/// Reload every metadata cache from Paperless.
pub async fn refresh_metadata(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    state.cache.refresh_all().await?;
    info!("Metadata refreshed on request");
    Ok(Json(json!({ "message": "Metadata refreshed successfully" })))
}

/// Echo the incoming request. Only available with `DEBUG=true`.
pub async fn debug_echo(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(query_params): Query<BTreeMap<String, String>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    if !state.config.debug {
        return Err(ApiError::NotFound("Not found".to_string()));
    }

    let headers: BTreeMap<String, String> = headers
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    let body_text = String::from_utf8_lossy(&body).into_owned();
    let body_json = serde_json::from_slice::<serde_json::Value>(&body).ok();

    let request_data = json!({
        "client_ip": client_ip(connect_info),
        "method": method.as_str(),
        "path": uri.path(),
        "headers": headers,
        "query_params": query_params,
        "body": body_text,
        "json": body_json,
    });
    debug!(request = %request_data, "Incoming debug request");

    Ok(Json(json!({
        "message": "Received request",
        "request_data": request_data,
        "version": env!("CARGO_PKG_VERSION"),
    })))
}
