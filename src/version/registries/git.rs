//! Git remote reference listing (`git ls-remote` without a clone)

use std::collections::HashSet;
use std::time::Duration;

use git2::{Cred, CredentialType, Direction, Remote, RemoteCallbacks};
use tracing::debug;

use crate::config::{FETCH_TIMEOUT_MS, GitConfig};
use crate::version::error::FetchError;
use crate::version::semver::VersionSet;

/// libgit2 keeps asking for credentials until one works; stop after this many tries
const MAX_CREDENTIAL_ATTEMPTS: usize = 3;

/// Lists the tags and branches of git remotes
#[derive(Debug, Clone)]
pub struct GitRemoteClient {
    token: Option<String>,
    /// Limit for connecting to a remote and for each read from it
    timeout: Duration,
}

impl Default for GitRemoteClient {
    fn default() -> Self {
        Self {
            token: None,
            timeout: Duration::from_millis(FETCH_TIMEOUT_MS),
        }
    }
}

impl GitRemoteClient {
    pub fn new(config: &GitConfig) -> Self {
        Self {
            token: config.token(),
            ..Self::default()
        }
    }

    /// Bounds how long a silent remote can block the listing thread
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Lists every reference of `remote` as a version set.
    ///
    /// Reference names that are not versions (`HEAD`, branches) end up in
    /// [`VersionSet::unparsable`] and take no part in update checks.
    pub async fn list_versions(&self, remote: &str) -> Result<VersionSet, FetchError> {
        let url = remote.to_string();
        let token = self.token.clone();
        let timeout = self.timeout;

        let names =
            tokio::task::spawn_blocking(move || list_references(&url, token, timeout)).await??;
        debug!("Listed {} references of {}", names.len(), remote);

        Ok(VersionSet::from_texts(names))
    }
}

/// Sets libgit2's process-wide connect and read timeouts
fn apply_server_timeouts(timeout: Duration) -> Result<(), git2::Error> {
    let millis = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
    // SAFETY: both options are plain integers that libgit2 reads when it opens a stream
    unsafe {
        git2::opts::set_server_connect_timeout_in_milliseconds(millis)?;
        git2::opts::set_server_timeout_in_milliseconds(millis)?;
    }
    Ok(())
}

fn list_references(
    url: &str,
    token: Option<String>,
    timeout: Duration,
) -> Result<Vec<String>, FetchError> {
    let git_error = |source| FetchError::Git {
        remote: url.to_string(),
        source,
    };

    apply_server_timeouts(timeout).map_err(git_error)?;

    let mut remote = Remote::create_detached(url).map_err(git_error)?;

    let mut attempts = 0;
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |_url, username, allowed| {
        attempts += 1;
        if attempts > MAX_CREDENTIAL_ATTEMPTS {
            return Err(git2::Error::from_str("authentication failed"));
        }
        if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
            if let Some(token) = &token {
                return Cred::userpass_plaintext(token, "");
            }
        }
        if allowed.contains(CredentialType::SSH_KEY) {
            return Cred::ssh_key_from_agent(username.unwrap_or("git"));
        }
        Cred::default()
    });

    let connection = remote
        .connect_auth(Direction::Fetch, Some(callbacks), None)
        .map_err(git_error)?;
    let heads = connection.list().map_err(git_error)?;

    let mut seen = HashSet::new();
    let names = heads
        .iter()
        .map(|head| short_reference_name(head.name()))
        .filter(|name| seen.insert(name.clone()))
        .collect();

    Ok(names)
}

/// `refs/tags/v1.0.0^{}` -> `v1.0.0`, `refs/heads/main` -> `main`
fn short_reference_name(name: &str) -> String {
    let name = name.strip_suffix("^{}").unwrap_or(name);
    name.strip_prefix("refs/tags/")
        .or_else(|| name.strip_prefix("refs/heads/"))
        .unwrap_or(name)
        .to_string()
}
