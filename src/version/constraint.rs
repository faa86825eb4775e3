//! Version constraint language
//!
//! Supports the constraint syntax found in module `version` attributes:
//! - `1.2.3` / `=1.2.3` - exactly this version
//! - `!=1.2.3` - anything but this version
//! - `>1.2.3`, `>=1.2.3`, `<1.2.3`, `<=1.2.3` - comparison operators
//! - `~>1.2.3` - pessimistic: >=1.2.3 <1.3.0; `~>1.2` - >=1.2.0 <2.0.0; `~>1` - >=1.0.0
//! - `~1.2.3` - tilde: >=1.2.3 <1.3.0
//! - `^1.2.3` - caret: >=1.2.3 <2.0.0 (or special cases for 0.x)
//! - `*`, `1.x`, `1.2.*` - wildcards
//! - `,` joins terms that must all hold; `||` separates alternatives

use std::fmt;
use std::str::FromStr;

use semver::Version;

use crate::version::semver::{component_count, parse_version};

/// Error type for constraint parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid version constraint {constraint:?}: {reason}")]
pub struct ConstraintError {
    pub constraint: String,
    pub reason: String,
}

/// A single comparison; compound operators are expanded into two of these
#[derive(Debug, Clone, PartialEq, Eq)]
enum Term {
    Exact(Version),
    NotEqual(Version),
    Gt(Version),
    Gte(Version),
    Lt(Version),
    Lte(Version),
    Any,
    /// `1.x` matches every 1.y.z
    WildcardMajor(u64),
    /// `1.2.x` matches every 1.2.z
    WildcardMinor(u64, u64),
}

impl Term {
    fn satisfies(&self, version: &Version) -> bool {
        match self {
            Term::Exact(v) => version.cmp_precedence(v).is_eq(),
            Term::NotEqual(v) => !version.cmp_precedence(v).is_eq(),
            Term::Gt(v) => version.cmp_precedence(v).is_gt(),
            Term::Gte(v) => version.cmp_precedence(v).is_ge(),
            Term::Lt(v) => version.cmp_precedence(v).is_lt(),
            Term::Lte(v) => version.cmp_precedence(v).is_le(),
            Term::Any => true,
            Term::WildcardMajor(major) => version.major == *major,
            Term::WildcardMinor(major, minor) => {
                version.major == *major && version.minor == *minor
            }
        }
    }
}

/// Parsed version constraints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraints {
    text: String,
    /// Any alternative may hold (OR); all terms of an alternative must hold (AND)
    alternatives: Vec<Vec<Term>>,
}

impl Constraints {
    pub fn parse(text: &str) -> Result<Self, ConstraintError> {
        let error = |reason: String| ConstraintError {
            constraint: text.to_string(),
            reason,
        };

        if text.trim().is_empty() {
            return Err(error("empty constraint".to_string()));
        }

        let mut alternatives = Vec::new();
        for alternative in text.split("||") {
            let mut terms = Vec::new();
            for piece in alternative.split(',') {
                let piece = piece.trim();
                if piece.is_empty() {
                    return Err(error("empty term".to_string()));
                }
                terms.extend(parse_term(piece).map_err(error)?);
            }
            alternatives.push(terms);
        }

        Ok(Self {
            text: text.to_string(),
            alternatives,
        })
    }

    /// Check whether a version satisfies the constraints
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives
            .iter()
            .any(|terms| terms.iter().all(|term| term.satisfies(version)))
    }

    /// The constraint as written
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl FromStr for Constraints {
    type Err = ConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Constraints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Operators, longest first so `>=` is not read as `>`
const OPERATORS: [&str; 9] = ["~>", ">=", "<=", "!=", ">", "<", "=", "~", "^"];

fn parse_term(piece: &str) -> Result<Vec<Term>, String> {
    let (operator, operand) = OPERATORS
        .iter()
        .find_map(|op| piece.strip_prefix(op).map(|rest| (*op, rest.trim())))
        .unwrap_or(("", piece));

    if operand.is_empty() {
        return Err(format!("missing version after {:?}", operator));
    }

    if matches!(operator, "" | "=") {
        if let Some(wildcard) = parse_wildcard(operand) {
            return Ok(vec![wildcard]);
        }
    }

    let version =
        parse_version(operand).ok_or_else(|| format!("{:?} is not a version", operand))?;
    let components = component_count(operand);

    let terms = match operator {
        "" | "=" => vec![Term::Exact(version)],
        "!=" => vec![Term::NotEqual(version)],
        ">" => vec![Term::Gt(version)],
        ">=" => vec![Term::Gte(version)],
        "<" => vec![Term::Lt(version)],
        "<=" => vec![Term::Lte(version)],
        "~>" => pessimistic(version, components)?,
        "~" => tilde(version, components)?,
        "^" => caret(version, components)?,
        _ => return Err(format!("unknown operator {:?}", operator)),
    };

    Ok(terms)
}

/// `*`, `x`, `1.x`, `1.2.*`
fn parse_wildcard(operand: &str) -> Option<Term> {
    let is_wild = |part: &str| matches!(part, "*" | "x" | "X");
    let parts: Vec<&str> = operand.trim_start_matches(['v', 'V']).split('.').collect();

    match parts.as_slice() {
        [any] if is_wild(any) => Some(Term::Any),
        [major, rest @ ..] if !rest.is_empty() && rest.iter().all(|p| is_wild(p)) => {
            major.parse().ok().map(Term::WildcardMajor)
        }
        [major, minor, patch] if is_wild(patch) => {
            let major = major.parse().ok()?;
            let minor = minor.parse().ok()?;
            Some(Term::WildcardMinor(major, minor))
        }
        _ => None,
    }
}

/// `~> N` has no upper bound; otherwise the right-most written component may grow
fn pessimistic(version: Version, components: usize) -> Result<Vec<Term>, String> {
    let upper = match components {
        1 => return Ok(vec![Term::Gte(version)]),
        2 => next_major(&version)?,
        _ => next_minor(&version)?,
    };
    Ok(vec![Term::Gte(version), Term::Lt(upper)])
}

fn tilde(version: Version, components: usize) -> Result<Vec<Term>, String> {
    let upper = if components == 1 {
        next_major(&version)?
    } else {
        next_minor(&version)?
    };
    Ok(vec![Term::Gte(version), Term::Lt(upper)])
}

fn caret(version: Version, components: usize) -> Result<Vec<Term>, String> {
    let upper = if version.major > 0 || components == 1 {
        next_major(&version)?
    } else if version.minor > 0 || components == 2 {
        next_minor(&version)?
    } else {
        next_patch(&version)?
    };
    Ok(vec![Term::Gte(version), Term::Lt(upper)])
}

fn next_major(version: &Version) -> Result<Version, String> {
    version
        .major
        .checked_add(1)
        .map(|major| Version::new(major, 0, 0))
        .ok_or_else(|| no_upper_bound(version))
}

fn next_minor(version: &Version) -> Result<Version, String> {
    version
        .minor
        .checked_add(1)
        .map(|minor| Version::new(version.major, minor, 0))
        .ok_or_else(|| no_upper_bound(version))
}

fn next_patch(version: &Version) -> Result<Version, String> {
    version
        .patch
        .checked_add(1)
        .map(|patch| Version::new(version.major, version.minor, patch))
        .ok_or_else(|| no_upper_bound(version))
}

fn no_upper_bound(version: &Version) -> String {
    format!("{} has no next version to bound the range", version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[rstest]
    // pessimistic
    #[case("~>1.0", "1.0.0", true)]
    #[case("~>1.0", "1.9.9", true)]
    #[case("~>1.0", "2.0.0", false)]
    #[case("~> 1.2.3", "1.2.9", true)]
    #[case("~> 1.2.3", "1.3.0", false)]
    #[case("~> 1.2.3", "1.2.2", false)]
    #[case("~> 1", "1.0.0", true)]
    #[case("~> 1", "7.3.0", true)]
    #[case("~> 1", "0.9.0", false)]
    // comparisons
    #[case(">= 1.0, < 2.0", "1.5.0", true)]
    #[case(">= 1.0, < 2.0", "2.0.0", false)]
    #[case("> 1.0.0", "1.0.0", false)]
    #[case("<= 1.0.0", "1.0.0", true)]
    #[case("!= 1.2.0", "1.2.0", false)]
    #[case("!= 1.2.0", "1.2.1", true)]
    // exact
    #[case("1.2.0", "1.2.0", true)]
    #[case("= 1.2.0", "1.2.1", false)]
    #[case("v1.2.0", "1.2.0", true)]
    // tilde and caret
    #[case("~1.2.3", "1.2.9", true)]
    #[case("~1.2.3", "1.3.0", false)]
    #[case("^1.2.3", "1.9.0", true)]
    #[case("^1.2.3", "2.0.0", false)]
    #[case("^0.2.3", "0.2.9", true)]
    #[case("^0.2.3", "0.3.0", false)]
    #[case("^0.0.3", "0.0.4", false)]
    // wildcards
    #[case("*", "9.9.9", true)]
    #[case("1.x", "1.4.0", true)]
    #[case("1.x", "2.0.0", false)]
    #[case("1.2.*", "1.2.7", true)]
    #[case("1.2.*", "1.3.0", false)]
    // alternatives
    #[case("1.0.0 || >= 3.0", "3.1.0", true)]
    #[case("1.0.0 || >= 3.0", "2.0.0", false)]
    fn matches_returns_expected(#[case] constraint: &str, #[case] version: &str, #[case] expected: bool) {
        let constraints = Constraints::parse(constraint).unwrap();
        assert_eq!(constraints.matches(&v(version)), expected);
    }

    #[test]
    fn pessimistic_two_components_equals_explicit_range() {
        let pessimistic = Constraints::parse("~>1.0").unwrap();
        let explicit = Constraints::parse(">=1.0.0,<2.0.0").unwrap();

        for version in ["0.9.0", "1.0.0", "1.1.0", "1.99.0", "2.0.0", "2.1.0"] {
            assert_eq!(
                pessimistic.matches(&v(version)),
                explicit.matches(&v(version)),
                "disagreement at {}",
                version
            );
        }
    }

    #[rstest]
    #[case("")]
    #[case(">=")]
    #[case("~> banana")]
    #[case(">= 1.0,")]
    #[case("1.0.0 ||")]
    fn parse_rejects_invalid_constraints(#[case] constraint: &str) {
        let err = Constraints::parse(constraint).unwrap_err();
        assert_eq!(err.constraint, constraint);
    }

    #[rstest]
    #[case("~> 18446744073709551615.0")]
    #[case("~> 1.18446744073709551615.0")]
    #[case("~18446744073709551615")]
    #[case("^18446744073709551615.2.3")]
    #[case("^0.0.18446744073709551615")]
    fn parse_rejects_range_without_upper_bound(#[case] constraint: &str) {
        let err = Constraints::parse(constraint).unwrap_err();
        assert!(err.reason.contains("no next version"), "{}", err.reason);
    }

    #[test]
    fn parse_accepts_largest_version_without_upper_bound() {
        let constraints = Constraints::parse("~> 18446744073709551615").unwrap();
        assert!(constraints.matches(&Version::new(u64::MAX, 0, 0)));
    }

    #[test]
    fn display_preserves_written_text() {
        let constraints: Constraints = "~> 5.0".parse().unwrap();
        assert_eq!(constraints.to_string(), "~> 5.0");
        assert_eq!(constraints.as_str(), "~> 5.0");
    }
}
