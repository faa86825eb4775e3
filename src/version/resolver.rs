//! Update resolution
//!
//! Compares the current version and constraints of a module call with the
//! versions published for its source.

use std::sync::Arc;

use semver::Version;
use serde::Serialize;
use tracing::debug;

use crate::source::Source;
use crate::version::cache::VersionCache;
use crate::version::constraint::Constraints;
use crate::version::error::CacheError;
use crate::version::fetcher::VersionFetcher;
use crate::version::semver::{VersionCandidate, VersionSet, compare};

/// Newer versions available for one module call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    /// Greatest version satisfying the constraints
    pub latest_matching_version: Option<String>,
    /// Greatest version regardless of constraints
    pub latest_overall_version: Option<String>,
    /// A version newer than the current one satisfies the constraints
    pub has_matching_update: bool,
    /// The newest update falls outside the constraints
    pub has_non_matching_update: bool,
}

impl UpdateResult {
    pub fn has_update(&self) -> bool {
        self.has_matching_update || self.has_non_matching_update
    }
}

/// Computes the update result for a version set.
///
/// Without a current version every candidate counts as an update. Without
/// constraints no candidate matches, so any update is a non-matching one.
pub fn compute_update(
    versions: &VersionSet,
    current: Option<&Version>,
    constraints: Option<&Constraints>,
    include_prerelease: bool,
) -> UpdateResult {
    let mut result = UpdateResult::default();
    let mut latest_update: Option<&VersionCandidate> = None;

    for candidate in versions.candidates() {
        let Some(version) = &candidate.version else {
            continue;
        };
        if !include_prerelease && candidate.is_prerelease() {
            continue;
        }

        result.latest_overall_version = Some(candidate.text.clone());

        let is_update = current.is_none_or(|current| compare(version, current).is_gt());
        if is_update {
            latest_update = Some(candidate);
        }

        if constraints.is_some_and(|constraints| constraints.matches(version)) {
            result.latest_matching_version = Some(candidate.text.clone());
            if is_update {
                result.has_matching_update = true;
            }
        }
    }

    result.has_non_matching_update = latest_update
        .and_then(|candidate| candidate.version.as_ref())
        .is_some_and(|version| !constraints.is_some_and(|constraints| constraints.matches(version)));

    result
}

/// Resolves updates, fetching each distinct source URI at most once
pub struct UpdateResolver {
    fetcher: Arc<dyn VersionFetcher>,
    cache: VersionCache,
}

impl UpdateResolver {
    pub fn new(fetcher: Arc<dyn VersionFetcher>) -> Self {
        Self {
            fetcher,
            cache: VersionCache::new(),
        }
    }

    /// Versions published for `source`, fetched through the per-run cache
    pub async fn versions(&self, source: &Source) -> Result<Arc<VersionSet>, CacheError> {
        self.cache
            .get_or_fetch(source.uri(), || self.fetcher.fetch_versions(source))
            .await
    }

    /// Resolves the update result of one module call.
    ///
    /// Local sources have no published versions and resolve to an empty result
    /// without touching the fetcher.
    pub async fn resolve(
        &self,
        source: &Source,
        current: Option<&Version>,
        constraints: Option<&Constraints>,
        include_prerelease: bool,
    ) -> Result<UpdateResult, CacheError> {
        if let Source::Local(_) = source {
            return Ok(UpdateResult::default());
        }

        let versions = self.versions(source).await?;
        debug!(
            "{} has {} versions ({} unparsable)",
            source.uri(),
            versions.len(),
            versions.unparsable().len()
        );

        Ok(compute_update(
            &versions,
            current,
            constraints,
            include_prerelease,
        ))
    }
}
