//! Webhook intake.
//!
//! A Paperless workflow posts `{"tag": ..., "url": ..., "<field>": "<instruction>"}`
//! when a document receives the call tag. The request is validated, the
//! document fetched, and a queue entry handed to the worker. Processing
//! happens asynchronously; the response only reports the queue position.

use std::net::SocketAddr;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use docbridge_core::{collect_field_instructions, QueueEntry};

use crate::handlers::client_ip;
use crate::{ApiError, AppState};

/// Response for an accepted webhook call.
#[derive(Debug, Serialize)]
pub struct IntakeResponse {
    pub message: String,
    pub queue_length: usize,
    pub entry_id: Uuid,
}

/// `POST /ai/request`
///
/// # Returns
/// - 202 Accepted with the queue length after insertion
/// - 400 Bad Request if `tag`, `url` or every extractable field is missing
/// - 404 Not Found if the document does not exist
pub async fn receive_request(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    body: Bytes,
) -> Result<(StatusCode, Json<IntakeResponse>), ApiError> {
    let client_ip = client_ip(connect_info);

    let payload = match serde_json::from_slice::<Value>(&body) {
        Ok(Value::Object(map)) => map,
        _ => {
            warn!(client_ip = %client_ip, "Webhook body is not a JSON object");
            return Err(ApiError::BadRequest(
                "Request body must be a JSON object".to_string(),
            ));
        }
    };

    let Some(tag) = non_empty(&payload, "tag") else {
        warn!(client_ip = %client_ip, "Webhook call without call tag");
        return Err(ApiError::BadRequest(
            "Please add a webhook parameter \"tag\" with the tag that triggered the webhook"
                .to_string(),
        ));
    };
    let Some(url) = non_empty(&payload, "url") else {
        warn!(client_ip = %client_ip, "Webhook call without document url");
        return Err(ApiError::BadRequest(
            "Please add a webhook parameter \"url\" with \"{doc_url}\" as value".to_string(),
        ));
    };

    let fields = collect_field_instructions(&payload);
    if fields.is_empty() {
        warn!(client_ip = %client_ip, "Webhook call without extractable fields");
        return Err(ApiError::BadRequest(
            "No valid fields have been provided".to_string(),
        ));
    }

    let document_id = document_id_from_url(&url)?;
    debug!(url = %url, document_id, "Resolved document from webhook url");

    let document = state.store.fetch_document(document_id).await?;

    let entry = QueueEntry::new(document, client_ip.clone(), fields, Some(tag));
    let entry_id = entry.id;
    let queue_length = state.queue.enqueue(entry)?;

    info!(
        %entry_id,
        document_id,
        client_ip = %client_ip,
        queue_length,
        "Request added to processing queue"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(IntakeResponse {
            message: "Request added to processing queue".to_string(),
            queue_length,
            entry_id,
        }),
    ))
}

fn non_empty(payload: &Map<String, Value>, key: &str) -> Option<String> {
    payload
        .get(key)?
        .as_str()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// The document ID is the last non-empty path segment of the document URL,
/// e.g. `http://paperless/api/documents/42/` → 42.
fn document_id_from_url(url: &str) -> Result<i64, ApiError> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse::<i64>().ok())
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::BadRequest(format!("Could not read a document ID from url '{}'", url)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_id_from_url() {
        assert_eq!(
            document_id_from_url("http://paperless:8000/api/documents/42/").unwrap(),
            42
        );
        assert_eq!(document_id_from_url("http://paperless/documents/7").unwrap(), 7);
        assert_eq!(document_id_from_url("42").unwrap(), 42);
    }

    #[test]
    fn test_document_id_from_url_rejects_non_numeric() {
        assert!(document_id_from_url("http://paperless/documents/").is_err());
        assert!(document_id_from_url("http://paperless/documents/abc/").is_err());
        assert!(document_id_from_url("").is_err());
    }

    #[test]
    fn test_non_empty() {
        let payload = match json!({"tag": "  webhook-call ", "url": "", "n": 3}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        assert_eq!(non_empty(&payload, "tag").as_deref(), Some("webhook-call"));
        assert_eq!(non_empty(&payload, "url"), None);
        assert_eq!(non_empty(&payload, "n"), None);
        assert_eq!(non_empty(&payload, "missing"), None);
    }
}
