//! Lenient semver parsing and ordered version sets

use std::cmp::Ordering;

use semver::Version;

/// Parse a version string into a semver::Version, normalizing partial versions.
///
/// Accepts a leading `v`/`V` and pads missing minor/patch components with zeros.
///
/// Examples:
/// - "1" -> Version(1, 0, 0)
/// - "v1.2" -> Version(1, 2, 0)
/// - "1.2.3-rc.1" -> Version(1, 2, 3, pre: rc.1)
pub fn parse_version(version: &str) -> Option<Version> {
    let version = version.trim();
    let version = version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .unwrap_or(version);

    // Pre-release and build suffixes may contain dots of their own
    let core_end = version.find(['-', '+']).unwrap_or(version.len());
    let (core, suffix) = version.split_at(core_end);

    let normalized = match core.split('.').count() {
        1 => format!("{}.0.0{}", core, suffix),
        2 => format!("{}.0{}", core, suffix),
        _ => version.to_string(),
    };
    Version::parse(&normalized).ok()
}

/// Number of dot-separated components written in a version (`1.2` -> 2)
pub fn component_count(version: &str) -> usize {
    let version = version.trim().trim_start_matches(['v', 'V']);
    let core_end = version.find(['-', '+']).unwrap_or(version.len());
    version[..core_end].split('.').count()
}

/// Compare two versions by semver precedence (build metadata is ignored)
pub fn compare(a: &Version, b: &Version) -> Ordering {
    a.cmp_precedence(b)
}

/// A version as published by a remote, with its original spelling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionCandidate {
    /// Version text as listed by the remote (e.g. `v1.2.0`)
    pub text: String,
    /// Parsed version; `None` when the text is not a version
    pub version: Option<Version>,
}

impl VersionCandidate {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let version = parse_version(&text);
        Self { text, version }
    }

    pub fn is_prerelease(&self) -> bool {
        self.version.as_ref().is_some_and(|v| !v.pre.is_empty())
    }
}

/// All versions known for one source.
///
/// Parsable candidates are kept in ascending precedence order; the rest are
/// retained as text only and never take part in ordering or matching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionSet {
    ordered: Vec<VersionCandidate>,
    unparsable: Vec<String>,
}

impl VersionSet {
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ordered = Vec::new();
        let mut unparsable = Vec::new();

        for text in texts {
            let candidate = VersionCandidate::new(text);
            if candidate.version.is_some() {
                ordered.push(candidate);
            } else {
                unparsable.push(candidate.text);
            }
        }

        // Stable sort keeps the listing order of equal versions
        ordered.sort_by(|a, b| match (&a.version, &b.version) {
            (Some(a), Some(b)) => compare(a, b),
            _ => Ordering::Equal,
        });

        Self {
            ordered,
            unparsable,
        }
    }

    /// Parsable candidates in ascending order
    pub fn candidates(&self) -> &[VersionCandidate] {
        &self.ordered
    }

    /// Entries that are not versions (branch names, malformed tags)
    pub fn unparsable(&self) -> &[String] {
        &self.unparsable
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1", Some(Version::new(1, 0, 0)))]
    #[case("1.2", Some(Version::new(1, 2, 0)))]
    #[case("1.2.3", Some(Version::new(1, 2, 3)))]
    #[case("v1.2.3", Some(Version::new(1, 2, 3)))]
    #[case("V2", Some(Version::new(2, 0, 0)))]
    #[case(" 0.10.0 ", Some(Version::new(0, 10, 0)))]
    #[case("1.2-beta.1", Version::parse("1.2.0-beta.1").ok())]
    #[case("1.2.3-rc.1+build.5", Version::parse("1.2.3-rc.1+build.5").ok())]
    #[case("main", None)]
    #[case("HEAD", None)]
    #[case("1.2.3.4", None)]
    #[case("", None)]
    fn parse_version_returns_expected(#[case] input: &str, #[case] expected: Option<Version>) {
        assert_eq!(parse_version(input), expected);
    }

    #[rstest]
    #[case("1", 1)]
    #[case("1.2", 2)]
    #[case("v1.2.3", 3)]
    #[case("1.2-rc.1", 2)]
    fn component_count_returns_expected(#[case] input: &str, #[case] expected: usize) {
        assert_eq!(component_count(input), expected);
    }

    #[test]
    fn from_texts_sorts_ascending_and_sets_aside_unparsable() {
        let set = VersionSet::from_texts(["v2.0.0", "main", "1.0.0", "1.10.0", "1.2.0", "HEAD"]);

        let texts: Vec<_> = set.candidates().iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["1.0.0", "1.2.0", "1.10.0", "v2.0.0"]);
        assert_eq!(set.unparsable(), &["main".to_string(), "HEAD".to_string()]);
    }

    #[test]
    fn from_texts_orders_prereleases_before_release() {
        let set = VersionSet::from_texts(["1.0.0", "1.0.0-rc.2", "1.0.0-rc.10", "1.0.0-beta"]);

        let texts: Vec<_> = set.candidates().iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["1.0.0-beta", "1.0.0-rc.2", "1.0.0-rc.10", "1.0.0"]);
    }

    #[test]
    fn equal_versions_keep_their_original_text() {
        let set = VersionSet::from_texts(["v1.0.0", "1.0.0", "1.0.0+build.1"]);

        let texts: Vec<_> = set.candidates().iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["v1.0.0", "1.0.0", "1.0.0+build.1"]);
        let first = set.candidates()[0].version.as_ref().unwrap();
        let last = set.candidates()[2].version.as_ref().unwrap();
        assert_eq!(compare(first, last), Ordering::Equal);
    }

    #[test]
    fn is_prerelease_detects_pre_release_identifiers() {
        assert!(VersionCandidate::new("1.0.0-alpha").is_prerelease());
        assert!(!VersionCandidate::new("1.0.0").is_prerelease());
        assert!(!VersionCandidate::new("main").is_prerelease());
    }
}
