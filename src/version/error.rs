use std::sync::Arc;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Invalid registry header {name:?}")]
    InvalidHeader { name: String },

    #[error("Network error for {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Unexpected status {status} from {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("Invalid response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Host {host} does not provide a module registry (no modules.v1 in service discovery)")]
    NoModuleRegistryHost { host: String },

    #[error("Invalid module registry base {base:?} for host {host}: {source}")]
    BaseUrl {
        host: String,
        base: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Failed to list references of {remote}: {source}")]
    Git {
        remote: String,
        #[source]
        source: git2::Error,
    },

    #[error("Version listing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("Version cache lock poisoned")]
    LockPoisoned,

    /// The fetch behind a cache slot failed; every caller of that slot shares the error
    #[error(transparent)]
    Fetch(Arc<FetchError>),
}
