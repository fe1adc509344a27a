//! npm-style version ranges on top of `semver`.
//!
//! The `semver` crate speaks Cargo's dialect, which differs from npm's in a
//! few places:
//!
//! - a bare version is a caret requirement in Cargo but exact in npm
//! - npm separates comparators with whitespace, Cargo with commas
//! - npm has `a || b` alternatives and `a - b` hyphen ranges
//!
//! [`VersionRange::parse`] rewrites each npm alternative into a Cargo
//! requirement with the same meaning.

use std::fmt;

use semver::{Version, VersionReq};

/// A parsed npm range: satisfied when any alternative is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    alternatives: Vec<VersionReq>,
}

/// Why a range failed to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeParseError {
    pub range: String,
    pub message: String,
}

impl fmt::Display for RangeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid range `{}`: {}", self.range, self.message)
    }
}

impl std::error::Error for RangeParseError {}

impl VersionRange {
    /// Parse an npm range.
    pub fn parse(range: &str) -> Result<Self, RangeParseError> {
        let alternatives = range
            .split("||")
            .map(|alt| {
                let req = translate_alternative(alt.trim());
                VersionReq::parse(&req).map_err(|e| RangeParseError {
                    range: range.to_string(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(VersionRange { alternatives })
    }

    /// Does `version` satisfy this range?
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }

    /// The highest of `versions` satisfying this range.
    pub fn max_satisfying<'a, I>(&self, versions: I) -> Option<&'a Version>
    where
        I: IntoIterator<Item = &'a Version>,
    {
        versions.into_iter().filter(|v| self.matches(v)).max()
    }
}

/// Rewrite one npm alternative as a Cargo requirement string.
fn translate_alternative(alt: &str) -> String {
    if alt.is_empty() {
        return "*".to_string();
    }

    if let Some((low, high)) = alt.split_once(" - ") {
        let bounds: Vec<String> = [
            strip_wildcards(low.trim()).map(|v| format!(">={}", v)),
            strip_wildcards(high.trim()).map(|v| format!("<={}", v)),
        ]
        .into_iter()
        .flatten()
        .collect();

        return if bounds.is_empty() {
            "*".to_string()
        } else {
            bounds.join(", ")
        };
    }

    let comparators: Vec<String> = merge_operators(alt)
        .into_iter()
        .filter_map(|token| translate_comparator(&token))
        .collect();

    if comparators.is_empty() {
        "*".to_string()
    } else {
        comparators.join(", ")
    }
}

/// Join operator-only tokens with the version after them (`>= 1.2.3`).
fn merge_operators(alt: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut pending = String::new();

    for token in alt.split_whitespace() {
        if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '^' | '~')) {
            pending.push_str(token);
        } else {
            tokens.push(format!("{}{}", pending, token));
            pending.clear();
        }
    }

    tokens
}

/// Translate a single comparator. Returns `None` for "match anything".
fn translate_comparator(token: &str) -> Option<String> {
    let split = token
        .find(|c: char| !matches!(c, '<' | '>' | '=' | '^' | '~'))
        .unwrap_or(token.len());
    let (op, version) = token.split_at(split);
    let version = strip_wildcards(version)?;

    let op = match op {
        "" | "=" | "==" => "=",
        other => other,
    };

    Some(format!("{}{}", op, version))
}

/// Drop a leading `v` and any wildcard components (`1.x` -> `1`).
/// Returns `None` if nothing but wildcards remain.
fn strip_wildcards(version: &str) -> Option<String> {
    let version = version.strip_prefix(['v', 'V']).unwrap_or(version);
    let (core, rest) = match version.find(['-', '+']) {
        Some(idx) => version.split_at(idx),
        None => (version, ""),
    };

    let parts: Vec<&str> = core
        .split('.')
        .take_while(|part| !matches!(*part, "x" | "X" | "*" | ""))
        .collect();

    if parts.is_empty() {
        return None;
    }

    // Prerelease/build only apply to a full version.
    if parts.len() == 3 {
        Some(format!("{}{}", parts.join("."), rest))
    } else {
        Some(parts.join("."))
    }
}
