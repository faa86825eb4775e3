//! Fetcher test doubles

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use tf_module_versions::source::Source;
use tf_module_versions::version::error::FetchError;
use tf_module_versions::version::fetcher::VersionFetcher;
use tf_module_versions::version::semver::VersionSet;

/// Fetcher serving fixed versions per source URI and counting its calls
#[derive(Default)]
pub struct CountingFetcher {
    versions: HashMap<String, Vec<String>>,
    delay: Option<Duration>,
    calls: Mutex<HashMap<String, usize>>,
}

impl CountingFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_versions(mut self, uri: &str, versions: Vec<&str>) -> Self {
        self.versions.insert(
            uri.to_string(),
            versions.into_iter().map(|v| v.to_string()).collect(),
        );
        self
    }

    /// Makes every fetch take `delay`, so concurrent callers overlap
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self, uri: &str) -> usize {
        self.calls.lock().unwrap().get(uri).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl VersionFetcher for CountingFetcher {
    async fn fetch_versions(&self, source: &Source) -> Result<VersionSet, FetchError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(source.uri().to_string())
            .or_default() += 1;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.versions.get(source.uri()) {
            Some(versions) => Ok(VersionSet::from_texts(versions.clone())),
            None => Err(FetchError::NoModuleRegistryHost {
                host: source.uri().to_string(),
            }),
        }
    }
}
