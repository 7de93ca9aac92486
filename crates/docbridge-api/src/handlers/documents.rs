//! Document helper endpoints used by the inbox front end.

use std::collections::BTreeMap;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use docbridge_core::{defaults, DocumentQuery, MetadataKind};

use crate::{ApiError, AppState};

/// Name shown for metadata that is unset or unknown to the cache.
const UNKNOWN_NAME: &str = "Unknown";

const SET_TAGS_USAGE: &str = "doc_id and tags (list) are required";

/// Request body for `/doc/set_tag`.
#[derive(Debug, Deserialize)]
pub struct SetTagsRequest {
    pub doc_id: i64,
    /// Tag directives: `name` adds, `-name` removes.
    #[serde(alias = "tag_names")]
    pub tags: Vec<String>,
}

/// Request body for `/doc/actions/:name`.
#[derive(Debug, Deserialize)]
pub struct RunActionRequest {
    pub doc_id: i64,
}

#[derive(Debug, Serialize)]
pub struct InboxItem {
    pub id: i64,
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct DocumentInfo {
    pub id: i64,
    pub title: String,
    pub correspondent: String,
    pub document_type: String,
    pub storage_path: String,
    pub tags: Vec<String>,
    pub thumbnail_url: String,
}

/// Apply tag directives to a document in one update.
///
/// # Returns
/// - 200 OK with `{"success": true}`
/// - 400 Bad Request if the body is not a valid request or no directives were given
/// - 404 Not Found if a tag or the document does not exist
/// - 502 Bad Gateway if Paperless rejected the update
pub async fn set_tags(
    State(state): State<AppState>,
    payload: Result<Json<SetTagsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload.map_err(|e| bad_body(SET_TAGS_USAGE, e))?;
    if req.tags.is_empty() {
        return Err(ApiError::BadRequest(SET_TAGS_USAGE.to_string()));
    }
    apply_directives(&state, req.doc_id, &req.tags).await
}

/// List the configured button actions.
pub async fn list_actions(State(state): State<AppState>) -> Json<BTreeMap<String, Vec<String>>> {
    Json(state.config.button_actions.clone())
}

/// Apply the directives of a named button action.
pub async fn run_action(
    State(state): State<AppState>,
    Path(name): Path<String>,
    payload: Result<Json<RunActionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload.map_err(|e| bad_body("doc_id is required", e))?;
    let directives = state
        .config
        .button_actions
        .get(&name)
        .ok_or_else(|| ApiError::NotFound(format!("Action '{}' is not configured", name)))?;
    apply_directives(&state, req.doc_id, directives).await
}

fn bad_body(usage: &str, rejection: JsonRejection) -> ApiError {
    debug!(error = %rejection.body_text(), "Rejected request body");
    ApiError::BadRequest(usage.to_string())
}

async fn apply_directives(
    state: &AppState,
    doc_id: i64,
    directives: &[String],
) -> Result<Json<serde_json::Value>, ApiError> {
    if state.tags.apply_tag_directives(doc_id, directives).await? {
        info!(document_id = doc_id, directives = ?directives, "Tags updated");
        Ok(Json(serde_json::json!({ "success": true })))
    } else {
        Err(ApiError::BadGateway(format!(
            "Paperless rejected the tag update for document {}",
            doc_id
        )))
    }
}

/// Documents carrying the inbox tag, most recently modified first.
pub async fn list_inbox(State(state): State<AppState>) -> Result<Json<Vec<InboxItem>>, ApiError> {
    let query = DocumentQuery::tagged(state.config.inbox_tag.clone())
        .ordered_by(defaults::INBOX_ORDERING);
    let items: Vec<InboxItem> = state
        .store
        .search_documents(query)
        .map_ok(|doc| InboxItem {
            id: doc.id,
            title: doc.title,
        })
        .try_collect()
        .await?;
    Ok(Json(items))
}

/// Document summary with metadata IDs resolved to names.
pub async fn document_info(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DocumentInfo>, ApiError> {
    let document = state.store.fetch_document(id).await?;

    let correspondent =
        resolve_name(&state, MetadataKind::Correspondent, document.correspondent).await?;
    let document_type =
        resolve_name(&state, MetadataKind::DocumentType, document.document_type).await?;
    let storage_path = resolve_name(&state, MetadataKind::StoragePath, document.storage_path).await?;
    let tags = state
        .cache
        .names_for_ids(MetadataKind::Tag, &document.tags)
        .await?;

    Ok(Json(DocumentInfo {
        id: document.id,
        title: document.title,
        correspondent,
        document_type,
        storage_path,
        tags,
        thumbnail_url: format!("/doc/get_thumbnail/{}", id),
    }))
}

async fn resolve_name(
    state: &AppState,
    kind: MetadataKind,
    id: Option<i64>,
) -> Result<String, ApiError> {
    let Some(id) = id else {
        return Ok(UNKNOWN_NAME.to_string());
    };
    Ok(state
        .cache
        .resolve_id_to_name(kind, id)
        .await?
        .unwrap_or_else(|| UNKNOWN_NAME.to_string()))
}

/// Proxy the document thumbnail, keeping the upstream content type.
pub async fn document_thumbnail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let thumbnail = state.store.fetch_thumbnail(id).await?;
    Ok(([(header::CONTENT_TYPE, thumbnail.content_type)], thumbnail.bytes))
}
