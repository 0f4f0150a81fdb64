//! Route matching logic.
//!
//! # Responsibilities
//! - Match path prefix (case-sensitive)
//! - Pick the most specific of several matching prefixes
//!
//! # Design Decisions
//! - Specificity is prefix length; ties keep the first entry
//! - Empty prefix = always matches (wildcard)

/// Matches the request path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Longer prefixes are more specific.
    pub fn specificity(&self) -> usize {
        self.prefix.len()
    }
}

/// Return the entry whose matcher is the longest prefix of `path`.
pub fn longest_match<'a, T>(
    entries: &'a [(PathPrefixMatcher, T)],
    path: &str,
) -> Option<&'a (PathPrefixMatcher, T)> {
    let mut best: Option<&(PathPrefixMatcher, T)> = None;
    for entry in entries.iter().filter(|(m, _)| m.matches(path)) {
        match best {
            Some((current, _)) if current.specificity() >= entry.0.specificity() => {}
            _ => best = Some(entry),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_matcher() {
        let matcher = PathPrefixMatcher::new("/api");
        assert!(matcher.matches("/api/v1"));
        assert!(!matcher.matches("/images"));
        assert!(!matcher.matches("/API/v1"));
    }

    #[test]
    fn most_specific_prefix_wins() {
        let entries = vec![
            (PathPrefixMatcher::new("/api/"), "general"),
            (PathPrefixMatcher::new("/api/auth/"), "auth"),
            (PathPrefixMatcher::new("/api/orders"), "orders"),
        ];

        assert_eq!(longest_match(&entries, "/api/auth/login").map(|e| e.1), Some("auth"));
        assert_eq!(longest_match(&entries, "/api/orders/7").map(|e| e.1), Some("orders"));
        assert_eq!(longest_match(&entries, "/api/products").map(|e| e.1), Some("general"));
        assert!(longest_match(&entries, "/admin").is_none());
    }

    #[test]
    fn ties_keep_the_first_entry() {
        let entries = vec![
            (PathPrefixMatcher::new("/api/"), 1),
            (PathPrefixMatcher::new("/api/"), 2),
        ];
        assert_eq!(longest_match(&entries, "/api/x").map(|e| e.1), Some(1));
    }
}
