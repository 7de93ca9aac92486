//! Paperless REST API client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, trace, warn};

use docbridge_core::{
    defaults, Document, DocumentPatch, DocumentQuery, DocumentStore, Error, MetadataKind,
    NamedItem, Page, Result, Thumbnail,
};

/// Content type assumed when the store does not send one for a thumbnail.
const DEFAULT_THUMBNAIL_TYPE: &str = "application/octet-stream";

/// Client for the Paperless REST API.
///
/// `base_url` is the API root (for example `http://paperless:8000/api`);
/// every request carries `Authorization: Token <token>`.
#[derive(Debug, Clone)]
pub struct PaperlessClient {
    client: Client,
    base_url: String,
}

impl PaperlessClient {
    /// Create a client with the default request timeout.
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        Self::with_timeout(
            base_url,
            token,
            Duration::from_secs(defaults::STORE_TIMEOUT_SECS),
        )
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::Config(
                "Paperless base URL cannot be empty".to_string(),
            ));
        }
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "Paperless base URL must start with http:// or https://, got: {}",
                base_url
            )));
        }
        if token.trim().is_empty() {
            return Err(Error::Config("Paperless token cannot be empty".to_string()));
        }

        let mut auth = HeaderValue::from_str(&format!("Token {}", token.trim()))
            .map_err(|e| Error::Config(format!("Invalid Paperless token: {}", e)))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(base_url = %base_url, "Initializing Paperless client");

        Ok(Self { client, base_url })
    }

    /// API root this client talks to, without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Probe the API root. Used once at startup.
    #[instrument(skip(self), fields(subsystem = "store", component = "paperless", op = "test_connection"))]
    pub async fn test_connection(&self) -> Result<()> {
        let response = self
            .client
            .get(self.url(""))
            .send()
            .await
            .map_err(|e| Error::Request(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            info!("Paperless connection check passed");
            Ok(())
        } else {
            Err(Error::Request(format!(
                "Paperless returned {} for API root",
                status
            )))
        }
    }

    /// Fetch one page of a paginated listing.
    async fn get_page<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&'static str, String)],
    ) -> Result<Page<T>> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::Request(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Request(format!(
                "Paperless returned {}: {}",
                status, body
            )));
        }

        let page: Page<T> = response
            .json()
            .await
            .map_err(|e| Error::Serialization(format!("Failed to parse response: {}", e)))?;
        trace!(
            url,
            result_count = page.results.len(),
            has_next = page.next.is_some(),
            "Fetched page"
        );
        Ok(page)
    }
}

#[async_trait]
impl DocumentStore for PaperlessClient {
    #[instrument(skip(self), fields(subsystem = "store", component = "paperless", op = "fetch_document", document_id = id))]
    async fn fetch_document(&self, id: i64) -> Result<Document> {
        let response = self
            .client
            .get(self.url(&format!("documents/{}/", id)))
            .send()
            .await
            .map_err(|e| Error::NotFound(format!("Document {} could not be fetched: {}", id, e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("Document {} does not exist", id)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "Document fetch rejected");
            return Err(Error::NotFound(format!(
                "Document {} could not be fetched: {}",
                id, status
            )));
        }

        let document: Document = response
            .json()
            .await
            .map_err(|e| Error::Serialization(format!("Failed to parse document {}: {}", id, e)))?;
        debug!(content_len = document.content.len(), tag_count = document.tags.len(), "Fetched document");
        Ok(document)
    }

    fn search_documents(&self, query: DocumentQuery) -> BoxStream<'_, Result<Document>> {
        debug!(
            subsystem = "store",
            component = "paperless",
            op = "search_documents",
            ?query,
            "Starting document search"
        );
        let first = (self.url("documents/"), query.to_query_pairs());
        stream::try_unfold(Some(first), move |state| async move {
            let Some((url, pairs)) = state else {
                return Ok(None);
            };
            let page: Page<Document> = self.get_page(&url, &pairs).await?;
            // `next` already carries the original query string
            let next = page.next.map(|next_url| (next_url, Vec::new()));
            let documents = stream::iter(page.results.into_iter().map(Ok::<Document, Error>));
            Ok::<_, Error>(Some((documents, next)))
        })
        .try_flatten()
        .boxed()
    }

    #[instrument(skip(self, patch), fields(subsystem = "store", component = "paperless", op = "patch_document", document_id = id))]
    async fn patch_document(&self, id: i64, patch: &DocumentPatch) -> Result<bool> {
        let start = Instant::now();
        let response = self
            .client
            .patch(self.url(&format!("documents/{}/", id)))
            .json(patch)
            .send()
            .await
            .map_err(|e| Error::Request(format!("Request failed: {}", e)))?;

        let status = response.status();
        let elapsed = start.elapsed().as_millis() as u64;
        if status.is_success() {
            debug!(status = status.as_u16(), duration_ms = elapsed, "Document updated");
            Ok(true)
        } else {
            let body = response.text().await.unwrap_or_default();
            warn!(
                status = status.as_u16(),
                body = %body,
                duration_ms = elapsed,
                "Document update rejected"
            );
            Ok(false)
        }
    }

    #[instrument(skip(self), fields(subsystem = "store", component = "paperless", op = "list_all", kind = %kind))]
    async fn list_all(&self, kind: MetadataKind) -> Result<Vec<NamedItem>> {
        let start = Instant::now();
        let mut items = Vec::new();
        let mut next = Some(self.url(&format!("{}/", kind.endpoint())));

        while let Some(url) = next {
            let page: Page<NamedItem> = self.get_page(&url, &[]).await?;
            items.extend(page.results);
            next = page.next;
        }

        debug!(
            result_count = items.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Listed metadata"
        );
        Ok(items)
    }

    #[instrument(skip(self), fields(subsystem = "store", component = "paperless", op = "fetch_thumbnail", document_id = id))]
    async fn fetch_thumbnail(&self, id: i64) -> Result<Thumbnail> {
        let response = self
            .client
            .get(self.url(&format!("documents/{}/thumb/", id)))
            .header(ACCEPT, "image/*")
            .send()
            .await
            .map_err(|e| Error::Request(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("Thumbnail for document {}", id)));
        }
        if !status.is_success() {
            return Err(Error::Request(format!(
                "Paperless returned {} for thumbnail",
                status
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_THUMBNAIL_TYPE)
            .to_string();
        let bytes = response.bytes().await?.to_vec();
        debug!(size = bytes.len(), content_type = %content_type, "Fetched thumbnail");

        Ok(Thumbnail {
            content_type,
            bytes,
        })
    }
}
