//! Time-boxed read-through cache for document store metadata.
//!
//! One container per [`MetadataKind`]. A container is fresh while its last
//! refresh is younger than the TTL; a lookup on a stale or empty container
//! refetches the complete listing for that kind only, replaces the container
//! and then answers from the new snapshot.
//!
//! No lock is held while fetching. Concurrent lookups on a stale container
//! may each trigger a refresh; the last one to finish wins, and any of the
//! snapshots is acceptable.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use docbridge_core::{DocumentStore, MetadataKind, NamedItem, Result};

/// Shared metadata cache. Cloning is cheap and clones share state.
#[derive(Clone)]
pub struct MetadataCache {
    inner: Arc<MetadataCacheInner>,
}

struct MetadataCacheInner {
    store: Arc<dyn DocumentStore>,
    ttl: Duration,
    containers: [RwLock<CacheContainer>; 4],
}

#[derive(Default)]
struct CacheContainer {
    last_refresh: Option<Instant>,
    entries: Arc<Vec<NamedItem>>,
}

impl CacheContainer {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.last_refresh
            .map(|at| at.elapsed() < ttl)
            .unwrap_or(false)
    }
}

impl MetadataCache {
    /// Create an empty cache; the first lookup of each kind fetches it.
    pub fn new(store: Arc<dyn DocumentStore>, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(MetadataCacheInner {
                store,
                ttl,
                containers: Default::default(),
            }),
        }
    }

    /// Create a cache whose TTL is given in minutes.
    pub fn with_ttl_minutes(store: Arc<dyn DocumentStore>, minutes: u64) -> Self {
        Self::new(store, Duration::from_secs(minutes.saturating_mul(60)))
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    fn container(&self, kind: MetadataKind) -> &RwLock<CacheContainer> {
        &self.inner.containers[kind.index()]
    }

    /// Current snapshot for `kind`, refreshing first if stale.
    async fn snapshot(&self, kind: MetadataKind) -> Result<Arc<Vec<NamedItem>>> {
        {
            let container = self.container(kind).read().await;
            if container.is_fresh(self.inner.ttl) {
                return Ok(container.entries.clone());
            }
        }
        self.reload(kind).await
    }

    async fn reload(&self, kind: MetadataKind) -> Result<Arc<Vec<NamedItem>>> {
        let start = Instant::now();
        let items = match self.inner.store.list_all(kind).await {
            Ok(items) => items,
            Err(e) => {
                warn!(kind = %kind, error = %e, "Metadata refresh failed, keeping previous snapshot");
                return Err(e);
            }
        };
        let entries = Arc::new(items);

        {
            let mut container = self.container(kind).write().await;
            container.entries = entries.clone();
            container.last_refresh = Some(Instant::now());
        }

        debug!(
            kind = %kind,
            result_count = entries.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Metadata cache refreshed"
        );
        Ok(entries)
    }

    /// Force a refresh of one kind. Returns the number of cached items.
    #[instrument(skip(self), fields(subsystem = "store", component = "metadata_cache", op = "refresh", kind = %kind))]
    pub async fn refresh(&self, kind: MetadataKind) -> Result<usize> {
        Ok(self.reload(kind).await?.len())
    }

    /// Force a refresh of every kind, stopping at the first failure.
    pub async fn refresh_all(&self) -> Result<()> {
        for kind in MetadataKind::ALL {
            self.refresh(kind).await?;
        }
        Ok(())
    }

    /// Look up the ID of an item by exact name.
    ///
    /// `Ok(None)` means the name is unknown to the store, which callers treat
    /// as a validation problem rather than a fault.
    pub async fn resolve_name_to_id(&self, kind: MetadataKind, name: &str) -> Result<Option<i64>> {
        let entries = self.snapshot(kind).await?;
        Ok(entries.iter().find(|item| item.name == name).map(|item| item.id))
    }

    /// Look up the name of an item by ID.
    pub async fn resolve_id_to_name(&self, kind: MetadataKind, id: i64) -> Result<Option<String>> {
        let entries = self.snapshot(kind).await?;
        Ok(entries
            .iter()
            .find(|item| item.id == id)
            .map(|item| item.name.clone()))
    }

    /// All items of a kind, in store order.
    pub async fn list_all(&self, kind: MetadataKind) -> Result<Vec<NamedItem>> {
        Ok(self.snapshot(kind).await?.as_ref().clone())
    }

    /// Names for a list of IDs, skipping IDs the store does not know.
    pub async fn names_for_ids(&self, kind: MetadataKind, ids: &[i64]) -> Result<Vec<String>> {
        let entries = self.snapshot(kind).await?;
        Ok(ids
            .iter()
            .filter_map(|id| entries.iter().find(|item| item.id == *id))
            .map(|item| item.name.clone())
            .collect())
    }
}
