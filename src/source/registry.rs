//! Registry module address normalization
//!
//! Accepts `namespace/name/target` (public registry) and
//! `hostname[:port]/namespace/name/target` (private registry), either one
//! optionally followed by a `//sub/path` into the module package.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::DEFAULT_REGISTRY_HOST;

/// `[host/]namespace/name/target[//sub-path]`
static MODULE_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:(?P<host>[^/]+)/)?",
        r"(?P<namespace>[0-9A-Za-z](?:[0-9A-Za-z_-]{0,62}[0-9A-Za-z])?)/",
        r"(?P<name>[0-9A-Za-z](?:[0-9A-Za-z_-]{0,62}[0-9A-Za-z])?)/",
        r"(?P<target>[0-9a-z]{1,64})",
        r"(?://(?P<sub_path>.+))?$",
    ))
    .expect("valid module address regex")
});

/// `host[.domain...][:port]`
static HOSTNAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*(?::[0-9]{1,5})?$")
        .expect("valid hostname regex")
});

/// Hosts serving git repositories that must never be queried as registries
const DISALLOWED_HOSTS: [&str; 2] = ["github.com", "bitbucket.org"];

/// A module published to a module registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySource {
    pub hostname: String,
    pub namespace: String,
    pub name: String,
    /// Target system (provider) the module is written for
    pub target: String,
    /// Lower-cased `host/namespace/name/target`, host omitted for the public registry.
    /// Never carries the sub-path, so every sub-module of a package shares it.
    pub normalized: String,
    /// Directory inside the module package, from a `//sub/path` suffix
    pub sub_path: Option<String>,
}

impl RegistrySource {
    /// Parse a registry address; `None` when the string is not one
    pub fn parse(raw: &str) -> Option<Self> {
        let caps = MODULE_ADDRESS.captures(raw)?;
        let namespace = caps.name("namespace")?.as_str();
        let name = caps.name("name")?.as_str();
        let target = caps.name("target")?.as_str();
        let sub_path = caps.name("sub_path").map(|sub_path| sub_path.as_str().to_string());

        let hostname = match caps.name("host") {
            Some(host) => {
                let host = host.as_str();
                if !is_registry_host(host) {
                    return None;
                }
                host.to_string()
            }
            None => DEFAULT_REGISTRY_HOST.to_string(),
        };

        let normalized = normalize(&hostname, namespace, name, target);

        Some(Self {
            hostname,
            namespace: namespace.to_string(),
            name: name.to_string(),
            target: target.to_string(),
            normalized,
            sub_path,
        })
    }
}

fn is_registry_host(host: &str) -> bool {
    if !HOSTNAME.is_match(host) {
        return false;
    }
    let bare_host = host.split(':').next().unwrap_or(host);
    if DISALLOWED_HOSTS
        .iter()
        .any(|disallowed| bare_host.eq_ignore_ascii_case(disallowed))
    {
        return false;
    }
    // Distinguishes a hostname from a fourth path segment
    bare_host.contains('.') || host.contains(':') || bare_host.eq_ignore_ascii_case("localhost")
}

fn normalize(hostname: &str, namespace: &str, name: &str, target: &str) -> String {
    let address = if hostname.eq_ignore_ascii_case(DEFAULT_REGISTRY_HOST) {
        format!("{}/{}/{}", namespace, name, target)
    } else {
        format!("{}/{}/{}/{}", hostname, namespace, name, target)
    };
    address.to_lowercase()
}
