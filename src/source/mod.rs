//! Module source classification
//!
//! Turns the raw `source` string of a module call into a typed [`Source`]:
//!
//! ```text
//!   "./modules/vpc"                              -> Local
//!   "hashicorp/consul/aws"                       -> Registry (registry.terraform.io)
//!   "example.com:1234/acme/net/aws"              -> Registry (example.com:1234)
//!   "git@github.com:acme/net.git"                -> Git (ssh://git@github.com/acme/net.git)
//!   "git::https://example.com/net.git//vpc?ref=v1" -> Git (ref v1, sub-path vpc)
//!   "github.com/acme/net"                        -> Git (https://github.com/acme/net.git)
//! ```
//!
//! # Modules
//!
//! - [`detect`]: forced-getter and shorthand address detection
//! - [`git`]: git address parsing (`ref` query, `//` sub-path)
//! - [`registry`]: registry address normalization

pub mod detect;
pub mod git;
pub mod registry;

use serde::Serialize;

pub use git::GitSource;
pub use registry::RegistrySource;

/// Classified origin of a module call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Git(GitSource),
    Registry(RegistrySource),
    Local(LocalSource),
}

/// Module on the local filesystem, relative to the declaring file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSource {
    pub path: String,
}

/// Kind of a [`Source`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Git,
    Registry,
    Local,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Git => "git",
            SourceType::Registry => "registry",
            SourceType::Local => "local",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Source {
    pub fn source_type(&self) -> SourceType {
        match self {
            Source::Git(_) => SourceType::Git,
            Source::Registry(_) => SourceType::Registry,
            Source::Local(_) => SourceType::Local,
        }
    }

    /// Canonical identifier of the version origin; modules sharing it share one version list
    pub fn uri(&self) -> &str {
        match self {
            Source::Git(git) => &git.remote,
            Source::Registry(registry) => &registry.normalized,
            Source::Local(local) => &local.path,
        }
    }
}

/// Error type for source classification
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("source not supported: {protocol} ({raw})")]
    SourceNotSupported { raw: String, protocol: String },

    #[error("detect source type of {raw:?}: {reason}")]
    Detect { raw: String, reason: String },

    #[error("parse git url {address:?}: {source}")]
    GitUrl {
        address: String,
        source: url::ParseError,
    },
}

/// Classify a raw module source string.
///
/// Local relative paths are recognised before anything else so that their
/// segments are never mistaken for registry coordinates.
pub fn classify(raw: &str) -> Result<Source, ClassifyError> {
    if is_local_path(raw) {
        return Ok(Source::Local(LocalSource {
            path: raw.to_string(),
        }));
    }

    if let Some(registry) = RegistrySource::parse(raw) {
        return Ok(Source::Registry(registry));
    }

    let detected = detect::detect(raw)?;
    match detected.protocol.as_str() {
        "git" => git::parse_git(&detected.address).map(Source::Git),
        "file" => Ok(Source::Local(LocalSource {
            path: file_path(&detected.address),
        })),
        _ => Err(ClassifyError::SourceNotSupported {
            raw: raw.to_string(),
            protocol: detected.protocol,
        }),
    }
}

/// `./x`, `../x` (and their Windows spellings)
pub fn is_local_path(raw: &str) -> bool {
    ["./", "../", ".\\", "..\\"]
        .iter()
        .any(|prefix| raw.starts_with(prefix))
}

/// Filesystem path of a detected `file` address
fn file_path(address: &str) -> String {
    if address.starts_with("file://") {
        if let Some(path) = url::Url::parse(address)
            .ok()
            .and_then(|url| url.to_file_path().ok())
        {
            return path.display().to_string();
        }
    }
    address.to_string()
}
