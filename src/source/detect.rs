//! Address detection for non-registry sources
//!
//! Normalises shorthand addresses into `protocol` + URL pairs:
//! - `scheme::address` forced getters (`git::`, `hg::`, `s3::`, ...)
//! - SCP-style `git@host:path` remotes
//! - `github.com/org/repo`, `bitbucket.org/org/repo` and other `host/org/repo` shorthands
//! - bucket URLs on S3 and GCS
//! - absolute filesystem paths
//!
//! A `//` sub-path is detached before detection and re-attached to the result.

use std::sync::LazyLock;

use regex::Regex;

use crate::source::ClassifyError;
use crate::source::git::source_dir_subdir;

/// `scheme::address`
static FORCED_GETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9]+)::(.+)$").expect("valid forced getter regex"));

/// `[user@]host:path`
static SCP_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:([^@]+)@)?([^:]+):/?(.+)$").expect("valid scp regex"));

/// Detection result: the protocol to fetch with and the canonical address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detected {
    pub protocol: String,
    pub address: String,
}

/// A detector returns `Ok(None)` when the address is not its kind
type Detector = fn(&str) -> Result<Option<String>, String>;

const DETECTORS: [Detector; 7] = [
    detect_github,
    detect_git_ssh,
    detect_bitbucket,
    detect_gcs,
    detect_s3,
    detect_host_shorthand,
    detect_file,
];

/// Detect the protocol and canonical address of a raw source string
pub fn detect(raw: &str) -> Result<Detected, ClassifyError> {
    let (forced, rest) = split_forced(raw);
    let (dir, sub_dir) = source_dir_subdir(rest);

    let address = if has_url_scheme(&dir) {
        rest.to_string()
    } else {
        match run_detectors(&dir) {
            Ok((detect_forced, detected)) => {
                let (detected, detect_sub_dir) = source_dir_subdir(&detected);
                let sub_dir = join_sub_dirs(detect_sub_dir, sub_dir);
                let address = with_sub_dir(&detected, sub_dir.as_deref());
                return Ok(Detected {
                    protocol: forced
                        .or(detect_forced.as_deref())
                        .map(str::to_string)
                        .unwrap_or_else(|| url_scheme(&address)),
                    address,
                });
            }
            // An explicit getter needs no detection
            Err(_) if forced.is_some() => rest.to_string(),
            Err(reason) => {
                return Err(ClassifyError::Detect {
                    raw: raw.to_string(),
                    reason,
                });
            }
        }
    };

    let protocol = forced
        .map(str::to_string)
        .unwrap_or_else(|| url_scheme(&address));

    Ok(Detected { protocol, address })
}

fn split_forced(src: &str) -> (Option<&str>, &str) {
    match FORCED_GETTER.captures(src) {
        Some(caps) => match (caps.get(1), caps.get(2)) {
            (Some(forced), Some(rest)) => (Some(forced.as_str()), rest.as_str()),
            _ => (None, src),
        },
        None => (None, src),
    }
}

fn has_url_scheme(src: &str) -> bool {
    url::Url::parse(src).is_ok()
}

fn url_scheme(address: &str) -> String {
    url::Url::parse(address)
        .map(|url| url.scheme().to_string())
        .unwrap_or_default()
}

fn run_detectors(src: &str) -> Result<(Option<String>, String), String> {
    for detector in DETECTORS {
        if let Some(result) = detector(src)? {
            let (forced, rest) = split_forced(&result);
            return Ok((forced.map(str::to_string), rest.to_string()));
        }
    }
    Err(format!("invalid source string: {}", src))
}

fn join_sub_dirs(detected: Option<String>, requested: Option<String>) -> Option<String> {
    match (detected, requested) {
        (Some(detected), Some(requested)) => Some(format!("{}/{}", detected, requested)),
        (detected, requested) => detected.or(requested),
    }
}

/// Insert `//sub_dir` at the end of the path, before any query string
fn with_sub_dir(address: &str, sub_dir: Option<&str>) -> String {
    let Some(sub_dir) = sub_dir else {
        return address.to_string();
    };
    match address.split_once('?') {
        Some((base, query)) => format!("{}//{}?{}", base, sub_dir, query),
        None => format!("{}//{}", address, sub_dir),
    }
}

/// `github.com/org/repo[/legacy/sub/dir]` -> `git::https://github.com/org/repo.git`
fn detect_github(src: &str) -> Result<Option<String>, String> {
    if !src.starts_with("github.com/") {
        return Ok(None);
    }
    let parts: Vec<&str> = src.split('/').collect();
    if parts.len() < 3 {
        return Err("GitHub URLs should be github.com/username/repo".to_string());
    }

    let mut url = url::Url::parse(&format!("https://{}", parts[..3].join("/")))
        .map_err(|e| format!("error parsing GitHub URL: {}", e))?;
    if !url.path().ends_with(".git") {
        let path = format!("{}.git", url.path());
        url.set_path(&path);
    }

    let address = url.to_string();
    if parts.len() > 3 {
        return Ok(Some(format!(
            "git::{}",
            with_sub_dir(&address, Some(&parts[3..].join("/")))
        )));
    }
    Ok(Some(format!("git::{}", address)))
}

/// `git@host:path` -> `git::ssh://git@host/path`
fn detect_git_ssh(src: &str) -> Result<Option<String>, String> {
    let Some(caps) = SCP_ADDRESS.captures(src) else {
        return Ok(None);
    };
    let user = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
    if user != "git" {
        return Ok(None);
    }
    let (Some(host), Some(path)) = (caps.get(2), caps.get(3)) else {
        return Ok(None);
    };

    Ok(Some(format!(
        "git::ssh://{}@{}/{}",
        user,
        host.as_str(),
        path.as_str()
    )))
}

/// `bitbucket.org/org/repo` -> `git::https://bitbucket.org/org/repo`
fn detect_bitbucket(src: &str) -> Result<Option<String>, String> {
    if !src.starts_with("bitbucket.org/") {
        return Ok(None);
    }
    Ok(Some(format!("git::https://{}", src)))
}

fn detect_gcs(src: &str) -> Result<Option<String>, String> {
    if !src.contains("googleapis.com/") {
        return Ok(None);
    }
    Ok(Some(format!("gcs::https://{}", src)))
}

fn detect_s3(src: &str) -> Result<Option<String>, String> {
    if !src.contains(".amazonaws.com/") {
        return Ok(None);
    }
    Ok(Some(format!("s3::https://{}", src)))
}

/// `host.tld/org/repo` -> `git::https://host.tld/org/repo`
fn detect_host_shorthand(src: &str) -> Result<Option<String>, String> {
    let path = src.split('?').next().unwrap_or(src);
    let segments: Vec<&str> = path.split('/').collect();
    let is_host = segments
        .first()
        .is_some_and(|host| host.contains('.') && !host.starts_with('.'));
    if !is_host || segments.len() < 3 || segments.iter().any(|s| s.is_empty()) {
        return Ok(None);
    }
    Ok(Some(format!("git::https://{}", src)))
}

/// Absolute paths -> `file::path`; relative paths cannot be resolved without a base
fn detect_file(src: &str) -> Result<Option<String>, String> {
    if std::path::Path::new(src).is_absolute() {
        return Ok(Some(format!("file::{}", src)));
    }
    Err(format!(
        "relative paths require a module with a pwd: {}",
        src
    ))
}
