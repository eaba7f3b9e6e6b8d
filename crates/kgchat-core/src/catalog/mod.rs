//! Entity catalog access.
//!
//! The catalog is shared and read-mostly. Readers get an `Arc<CatalogSnapshot>`;
//! refreshes build a new snapshot off-lock and swap it in whole.

pub mod model;

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::CatalogConfig;
use crate::error::KgResult;
pub use model::{CatalogSnapshot, EntityRecord};

/// The external store that knows which entities exist.
#[async_trait]
pub trait EntitySource: Send + Sync {
    /// List every known entity. Fails with `KgError::CatalogUnavailable`.
    async fn list_entities(&self) -> KgResult<Vec<EntityRecord>>;
}

#[async_trait]
impl EntitySource for Vec<EntityRecord> {
    async fn list_entities(&self) -> KgResult<Vec<EntityRecord>> {
        Ok(self.clone())
    }
}

struct Cached {
    snapshot: Arc<CatalogSnapshot>,
    loaded_at: Instant,
}

/// Caching accessor over an [`EntitySource`].
pub struct EntityCatalog {
    source: Arc<dyn EntitySource>,
    staleness: Duration,
    current: RwLock<Option<Cached>>,
}

impl EntityCatalog {
    pub fn new(source: Arc<dyn EntitySource>, config: &CatalogConfig) -> Self {
        Self {
            source,
            staleness: config.staleness(),
            current: RwLock::new(None),
        }
    }

    /// Return the current snapshot, refreshing it first when stale.
    ///
    /// Never fails: when the source is unavailable the last good snapshot is
    /// returned, or an empty one if there never was one.
    pub async fn snapshot(&self) -> Arc<CatalogSnapshot> {
        if let Some(fresh) = self.cached(true) {
            return fresh;
        }

        match self.refresh().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Catalog refresh failed, continuing without fresh entities");
                self.cached(false)
                    .unwrap_or_else(|| Arc::new(CatalogSnapshot::empty()))
            }
        }
    }

    /// Reload the catalog from the source and publish the new snapshot.
    pub async fn refresh(&self) -> KgResult<Arc<CatalogSnapshot>> {
        let records = self.source.list_entities().await?;
        let snapshot = Arc::new(CatalogSnapshot::new(records));

        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(Cached {
            snapshot: Arc::clone(&snapshot),
            loaded_at: Instant::now(),
        });
        drop(guard);

        info!(entities = snapshot.len(), "Entity catalog refreshed");
        Ok(snapshot)
    }

    /// Refresh on a fixed interval until the returned handle is aborted.
    pub fn spawn_refresh(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(e) = self.refresh().await {
                    warn!(error = %e, "Background catalog refresh failed");
                }
            }
        })
    }

    fn cached(&self, require_fresh: bool) -> Option<Arc<CatalogSnapshot>> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        let cached = guard.as_ref()?;
        if require_fresh && cached.loaded_at.elapsed() >= self.staleness {
            debug!("Catalog snapshot is stale");
            return None;
        }
        Some(Arc::clone(&cached.snapshot))
    }
}
