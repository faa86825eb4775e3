//! Per-run version cache with singleflight fetches
//!
//! Modules sharing a source URI share one slot. The first caller runs the
//! fetch; concurrent callers for the same URI wait on the same slot and
//! receive the same result, including a failure.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::OnceCell;
use tracing::debug;

use crate::version::error::{CacheError, FetchError};
use crate::version::semver::VersionSet;

type FetchResult = Result<Arc<VersionSet>, Arc<FetchError>>;
type Slot = Arc<OnceCell<FetchResult>>;

#[derive(Default)]
pub struct VersionCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl VersionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_slots(&self) -> Result<MutexGuard<'_, HashMap<String, Slot>>, CacheError> {
        self.slots.lock().map_err(|_| CacheError::LockPoisoned)
    }

    /// Returns the versions cached for `uri`, running `fetch` if no caller has yet
    pub async fn get_or_fetch<F, Fut>(&self, uri: &str, fetch: F) -> Result<Arc<VersionSet>, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<VersionSet, FetchError>>,
    {
        // The lock only guards the map; the fetch runs outside of it
        let slot = self.lock_slots()?.entry(uri.to_string()).or_default().clone();

        let result = slot
            .get_or_init(|| async move {
                debug!("Fetching versions for {}", uri);
                fetch().await.map(Arc::new).map_err(Arc::new)
            })
            .await;

        result.clone().map_err(CacheError::Fetch)
    }

    /// Number of distinct URIs requested so far
    pub fn len(&self) -> Result<usize, CacheError> {
        Ok(self.lock_slots()?.len())
    }
}
