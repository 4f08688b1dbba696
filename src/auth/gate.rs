//! Access gate - decides whether a request path must be authenticated.

use serde::Deserialize;

/// A path that bypasses authentication.
///
/// Written in configuration as a plain string; a trailing `*` turns the rule
/// into a prefix match.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub struct ExclusionRule {
    /// Exact rules: the path with a trailing `/`. Wildcards: the prefix
    /// without the `*`.
    pub path_pattern: String,
    pub is_wildcard: bool,
}

impl ExclusionRule {
    pub fn parse(rule: &str) -> Self {
        match rule.strip_suffix('*') {
            Some(prefix) => Self {
                path_pattern: prefix.to_string(),
                is_wildcard: true,
            },
            None => Self {
                path_pattern: with_trailing_slash(rule),
                is_wildcard: false,
            },
        }
    }

    /// Match against an already normalized path.
    fn matches(&self, normalized_path: &str) -> bool {
        if self.is_wildcard {
            normalized_path.starts_with(&self.path_pattern)
        } else {
            normalized_path == self.path_pattern
        }
    }
}

impl From<String> for ExclusionRule {
    fn from(rule: String) -> Self {
        Self::parse(&rule)
    }
}

impl From<&str> for ExclusionRule {
    fn from(rule: &str) -> Self {
        Self::parse(rule)
    }
}

fn with_trailing_slash(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}

/// Returns `false` only when `path` matches one of the exclusion rules.
///
/// A missing path or an empty rule list always requires auth. Without a `*`
/// a rule must equal the path exactly; prefixes do not count.
pub fn requires_auth(path: Option<&str>, exclusions: Option<&[ExclusionRule]>) -> bool {
    let Some(path) = path else {
        return true;
    };
    let exclusions = match exclusions {
        Some(rules) if !rules.is_empty() => rules,
        _ => return true,
    };

    let normalized = with_trailing_slash(path);
    !exclusions.iter().any(|rule| rule.matches(&normalized))
}
