//! Git source address parsing

use url::Url;

use crate::source::ClassifyError;

/// Query parameter selecting the git reference to check out
const REF_QUERY_KEY: &str = "ref";

/// A module stored in a git repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitSource {
    /// Remote URL without `ref` query and sub-path
    pub remote: String,
    /// Value of the `ref` query parameter (tag, branch or commit)
    pub reference: Option<String>,
    /// Directory inside the repository holding the module
    pub sub_path: Option<String>,
}

/// Parse a detected git address (`<url>[//<sub-path>][?ref=<ref>]`)
pub fn parse_git(address: &str) -> Result<GitSource, ClassifyError> {
    let (dir, sub_path) = source_dir_subdir(address);

    let mut url = Url::parse(&dir).map_err(|source| ClassifyError::GitUrl {
        address: address.to_string(),
        source,
    })?;

    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    let mut reference = None;

    if pairs.iter().any(|(key, _)| key == REF_QUERY_KEY) {
        let mut remaining = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            if key == REF_QUERY_KEY {
                if !value.is_empty() {
                    reference = Some(value);
                }
            } else {
                remaining.push((key, value));
            }
        }

        if remaining.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(remaining);
        }
    }

    Ok(GitSource {
        remote: url.to_string(),
        reference,
        sub_path,
    })
}

/// Split `<dir>//<sub-dir>[?query]` into `<dir>[?query]` and `<sub-dir>`.
///
/// The `//` following a URL scheme is not a sub-directory boundary, and a query
/// string attached to the sub-directory moves back onto the directory part.
pub(crate) fn source_dir_subdir(src: &str) -> (String, Option<String>) {
    let stop = src.find('?').unwrap_or(src.len());
    let offset = src[..stop].find("://").map(|idx| idx + 3).unwrap_or(0);

    let Some(idx) = src[offset..stop].find("//") else {
        return (src.to_string(), None);
    };
    let idx = idx + offset;

    let mut dir = src[..idx].to_string();
    let mut sub_dir = &src[idx + 2..];
    if let Some(query_idx) = sub_dir.find('?') {
        dir.push_str(&sub_dir[query_idx..]);
        sub_dir = &sub_dir[..query_idx];
    }

    if sub_dir.is_empty() {
        return (dir, None);
    }
    (dir, Some(sub_dir.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://example.com/repo.git?ref=v1.0.0", "https://example.com/repo.git", Some("v1.0.0"))]
    #[case("https://example.com/repo.git?ref=main&depth=1", "https://example.com/repo.git?depth=1", Some("main"))]
    #[case("https://example.com/repo.git?depth=1&ref=v2", "https://example.com/repo.git?depth=1", Some("v2"))]
    #[case("https://example.com/repo.git?ref=", "https://example.com/repo.git", None)]
    #[case("https://example.com/repo.git", "https://example.com/repo.git", None)]
    #[case("ssh://git@example.com/acme/repo.git?ref=0.3.0", "ssh://git@example.com/acme/repo.git", Some("0.3.0"))]
    fn parse_git_extracts_ref_and_removes_it_from_remote(
        #[case] address: &str,
        #[case] remote: &str,
        #[case] reference: Option<&str>,
    ) {
        let result = parse_git(address).unwrap();

        assert_eq!(result.remote, remote);
        assert_eq!(result.reference.as_deref(), reference);
        assert!(!result.remote.contains("ref="));
    }

    #[rstest]
    #[case("https://example.com/repo.git//modules/vpc", "https://example.com/repo.git", "modules/vpc")]
    #[case("https://example.com/repo.git//modules/vpc?ref=v1", "https://example.com/repo.git", "modules/vpc")]
    #[case("ssh://git@example.com/acme/repo//vpc", "ssh://git@example.com/acme/repo", "vpc")]
    fn parse_git_splits_sub_path_at_double_slash(
        #[case] address: &str,
        #[case] remote: &str,
        #[case] sub_path: &str,
    ) {
        let result = parse_git(address).unwrap();

        assert_eq!(result.remote, remote);
        assert_eq!(result.sub_path.as_deref(), Some(sub_path));
        assert!(!result.remote.ends_with(sub_path));

        let rejoined = parse_git(&format!("{}//{}", result.remote, sub_path)).unwrap();
        assert_eq!(rejoined.remote, result.remote);
        assert_eq!(rejoined.sub_path, result.sub_path);
    }

    #[test]
    fn parse_git_rejects_invalid_url() {
        let result = parse_git("not a url");

        assert!(matches!(result, Err(ClassifyError::GitUrl { .. })));
    }

    #[rstest]
    #[case("https://example.com/repo", "https://example.com/repo", None)]
    #[case("https://example.com/repo//sub", "https://example.com/repo", Some("sub"))]
    #[case("https://example.com/repo//sub/dir?ref=v1", "https://example.com/repo?ref=v1", Some("sub/dir"))]
    #[case("https://example.com/repo?url=http://x//y", "https://example.com/repo?url=http://x//y", None)]
    #[case("example.com/repo//sub", "example.com/repo", Some("sub"))]
    #[case("https://example.com/repo//", "https://example.com/repo", None)]
    fn source_dir_subdir_returns_expected(
        #[case] src: &str,
        #[case] dir: &str,
        #[case] sub_dir: Option<&str>,
    ) {
        assert_eq!(
            source_dir_subdir(src),
            (dir.to_string(), sub_dir.map(str::to_string))
        );
    }
}
