use std::collections::HashSet;

/// Fixed set of repository-relative paths exempt from all sync operations.
/// Matching is exact; no globbing.
#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    paths: HashSet<String>,
}

impl IgnoreList {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_ignored(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    /// A rename touching an ignored path on either side is skipped in its
    /// entirety rather than split into a partial operation.
    pub fn is_rename_ignored(&self, previous_path: &str, path: &str) -> bool {
        self.is_ignored(previous_path) || self.is_ignored(path)
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_only() {
        let ignore = IgnoreList::new(["docs/README.md"]);

        assert!(ignore.is_ignored("docs/README.md"));
        assert!(!ignore.is_ignored("README.md"));
        assert!(!ignore.is_ignored("docs/readme.md"));
        assert!(!ignore.is_ignored("docs"));
    }

    #[test]
    fn test_rename_ignored_by_either_side() {
        let ignore = IgnoreList::new(["keep.go"]);

        assert!(ignore.is_rename_ignored("keep.go", "moved.go"));
        assert!(ignore.is_rename_ignored("other.go", "keep.go"));
        assert!(!ignore.is_rename_ignored("a.go", "b.go"));
    }

    #[test]
    fn test_empty_list_ignores_nothing() {
        let ignore = IgnoreList::default();

        assert!(ignore.is_empty());
        assert!(!ignore.is_ignored("anything"));
    }
}
