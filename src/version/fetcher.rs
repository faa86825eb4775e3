//! Version fetcher trait for listing the published versions of a source

#[cfg(test)]
use mockall::automock;

use std::time::Duration;

use crate::config::Config;
use crate::source::Source;
use crate::version::error::FetchError;
use crate::version::registries::{GitRemoteClient, RegistryClient};
use crate::version::semver::VersionSet;

/// Trait for fetching every known version of a module source
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait VersionFetcher: Send + Sync {
    /// Lists the versions published for `source`
    ///
    /// # Returns
    /// * `Ok(VersionSet)` - Versions in ascending order; empty for local sources
    /// * `Err(FetchError)` - If the remote could not be queried
    async fn fetch_versions(&self, source: &Source) -> Result<VersionSet, FetchError>;
}

/// Fetcher dispatching to the git or registry client depending on the source
pub struct RemoteVersionFetcher {
    git: GitRemoteClient,
    registry: RegistryClient,
}

impl RemoteVersionFetcher {
    pub fn new(git: GitRemoteClient, registry: RegistryClient) -> Self {
        Self { git, registry }
    }

    /// Builds both clients from the loaded configuration
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        Ok(Self::new(
            GitRemoteClient::new(&config.git)
                .with_timeout(Duration::from_millis(config.registry.timeout_ms)),
            RegistryClient::new(&config.registry)?,
        ))
    }
}

#[async_trait::async_trait]
impl VersionFetcher for RemoteVersionFetcher {
    async fn fetch_versions(&self, source: &Source) -> Result<VersionSet, FetchError> {
        match source {
            Source::Git(git) => self.git.list_versions(&git.remote).await,
            Source::Registry(registry) => self.registry.list_versions(registry).await,
            Source::Local(_) => Ok(VersionSet::default()),
        }
    }
}
