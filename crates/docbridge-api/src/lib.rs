//! docbridge-api - HTTP intake server for docbridge
//!
//! Receives Paperless workflow webhooks, validates them and hands them to the
//! processing queue. Also serves a handful of document helpers used by the
//! inbox front end.

pub mod config;
pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::{
    http::{header, Method},
    routing::{any, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use docbridge_core::DocumentStore;
use docbridge_jobs::ProcessingQueue;
use docbridge_store::{MetadataCache, TagResolver};

pub use config::{AppConfig, LogLevel};
pub use error::ApiError;

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// STATE
// =============================================================================

/// Shared handler state. All members are cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DocumentStore>,
    pub cache: MetadataCache,
    pub tags: TagResolver,
    pub queue: ProcessingQueue,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn DocumentStore>,
        cache: MetadataCache,
        queue: ProcessingQueue,
    ) -> Self {
        let tags = TagResolver::new(store.clone(), cache.clone());
        Self {
            config: Arc::new(config),
            store,
            cache,
            tags,
            queue,
        }
    }
}

// =============================================================================
// ROUTER
// =============================================================================

/// Build the application router with tracing, request-id and CORS layers.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::status::health_check))
        // Webhook intake
        .route("/ai/request", post(handlers::intake::receive_request))
        // Document helpers
        .route("/doc/set_tag", post(handlers::documents::set_tags))
        .route("/doc/list_inbox", get(handlers::documents::list_inbox))
        .route("/doc/get_info/:id", get(handlers::documents::document_info))
        .route(
            "/doc/get_thumbnail/:id",
            get(handlers::documents::document_thumbnail),
        )
        .route("/doc/actions", get(handlers::documents::list_actions))
        .route("/doc/actions/:name", post(handlers::documents::run_action))
        // Maintenance
        .route(
            "/refresh_metadata",
            get(handlers::status::refresh_metadata).post(handlers::status::refresh_metadata),
        )
        .route("/status/debug", any(handlers::status::debug_echo))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
                .max_age(std::time::Duration::from_secs(3600)),
        )
        .with_state(state)
}
