use serde::Deserialize;
use tracing::debug;

/// One file-level entry as returned by the upstream compare API.
///
/// The status field is kept as a raw string because the remote API treats it
/// as an open-ended enum; values we do not recognize are dropped during
/// classification rather than rejected.
#[derive(Debug, Clone, Deserialize)]
pub struct RawFileChange {
    pub status: String,
    pub filename: String,
    #[serde(default)]
    pub previous_filename: Option<String>,
    #[serde(default)]
    pub raw_url: Option<String>,
}

/// Recognized change categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    Added,
    Modified,
    Removed,
    Renamed,
}

impl ChangeStatus {
    fn parse(status: &str) -> Option<Self> {
        match status {
            "added" => Some(Self::Added),
            "modified" => Some(Self::Modified),
            "removed" => Some(Self::Removed),
            "renamed" => Some(Self::Renamed),
            _ => None,
        }
    }
}

/// A validated added, modified, or removed file entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// Repository-relative path.
    pub path: String,
    /// Locator for the file's raw bytes; absent for removals.
    pub content_ref: Option<String>,
}

/// A validated rename entry. The pre-rename path is mandatory here, so the
/// rest of the pipeline never has to re-check it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameChange {
    pub previous_path: String,
    pub path: String,
    /// Used only when the pre-rename path is missing locally and the
    /// destination has to be fetched instead.
    pub content_ref: Option<String>,
}

/// A record with a recognized status that is missing a field required for
/// that status. Distinct from an unrecognized status: this is an upstream
/// contract violation and is reported as a failure, not silently dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedChange {
    pub path: String,
    pub reason: String,
}

/// The classified change-set between two upstream revisions. Created once
/// per run and immutable thereafter.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub added: Vec<FileChange>,
    pub modified: Vec<FileChange>,
    pub removed: Vec<FileChange>,
    pub renamed: Vec<RenameChange>,
    pub malformed: Vec<MalformedChange>,
}

impl ChangeSet {
    /// Partition raw compare records by status, preserving input order
    /// within each category.
    pub fn classify(records: Vec<RawFileChange>) -> Self {
        let mut changes = Self::default();

        for record in records {
            match ChangeStatus::parse(&record.status) {
                Some(status @ (ChangeStatus::Added | ChangeStatus::Modified)) => {
                    match record.raw_url {
                        Some(raw_url) => {
                            let change = FileChange {
                                path: record.filename,
                                content_ref: Some(raw_url),
                            };
                            if status == ChangeStatus::Added {
                                changes.added.push(change);
                            } else {
                                changes.modified.push(change);
                            }
                        }
                        None => changes.malformed.push(MalformedChange {
                            path: record.filename,
                            reason: format!("{:?} record without a content locator", status),
                        }),
                    }
                }
                Some(ChangeStatus::Removed) => changes.removed.push(FileChange {
                    path: record.filename,
                    content_ref: record.raw_url,
                }),
                Some(ChangeStatus::Renamed) => match record.previous_filename {
                    Some(previous_path) => changes.renamed.push(RenameChange {
                        previous_path,
                        path: record.filename,
                        content_ref: record.raw_url,
                    }),
                    None => changes.malformed.push(MalformedChange {
                        path: record.filename,
                        reason: "renamed record without a previous filename".to_string(),
                    }),
                },
                None => {
                    // Forward compatibility: the API may grow new statuses.
                    debug!(
                        "Dropping record with unrecognized status {:?}: {}",
                        record.status, record.filename
                    );
                }
            }
        }

        changes
    }

    /// Total number of recognized, well-formed records.
    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.removed.len() + self.renamed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0 && self.malformed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;

    fn raw(status: &str, filename: &str) -> RawFileChange {
        RawFileChange {
            status: status.to_string(),
            filename: filename.to_string(),
            previous_filename: None,
            raw_url: Some(format!("https://raw.example/{}", filename)),
        }
    }

    #[test]
    fn test_classify_partitions_by_status() {
        let mut renamed = raw("renamed", "new_name.go");
        renamed.previous_filename = Some("old_name.go".to_string());

        let records = vec![
            raw("added", "a.go"),
            raw("modified", "b.go"),
            raw("removed", "c.go"),
            renamed,
            raw("added", "d.go"),
        ];

        let changes = ChangeSet::classify(records);

        assert_eq!(changes.added.len(), 2);
        assert_eq!(changes.added[0].path, "a.go");
        assert_eq!(changes.added[1].path, "d.go");
        assert_eq!(changes.modified.len(), 1);
        assert_eq!(changes.removed.len(), 1);
        assert_eq!(changes.renamed.len(), 1);
        assert_eq!(changes.renamed[0].previous_path, "old_name.go");
        assert!(changes.malformed.is_empty());
        assert_eq!(changes.len(), 5);
    }

    #[test]
    fn test_unrecognized_status_is_dropped() {
        let records = vec![
            raw("copied", "a.go"),
            raw("unchanged", "b.go"),
            raw("added", "c.go"),
        ];

        let changes = ChangeSet::classify(records);

        assert_eq!(changes.added.len(), 1);
        assert_eq!(changes.len(), 1);
        // Unknown statuses are not failures.
        assert!(changes.malformed.is_empty());
    }

    #[test]
    fn test_renamed_without_previous_filename_is_malformed() {
        let records = vec![raw("renamed", "x")];

        let changes = ChangeSet::classify(records);

        assert!(changes.renamed.is_empty());
        assert_eq!(changes.malformed.len(), 1);
        assert_eq!(changes.malformed[0].path, "x");
    }

    #[test]
    fn test_added_without_raw_url_is_malformed() {
        let mut record = raw("added", "a.go");
        record.raw_url = None;

        let changes = ChangeSet::classify(vec![record]);

        assert!(changes.added.is_empty());
        assert_eq!(changes.malformed.len(), 1);
    }

    #[test]
    fn test_empty_input() {
        let changes = ChangeSet::classify(vec![]);
        assert!(changes.is_empty());
    }

    #[derive(Debug, Clone)]
    struct AnyRecord(RawFileChange);

    impl Arbitrary for AnyRecord {
        fn arbitrary(g: &mut Gen) -> Self {
            let statuses = [
                "added",
                "modified",
                "removed",
                "renamed",
                "copied",
                "unchanged",
            ];
            let status = g.choose(&statuses).unwrap().to_string();
            let filename = format!("dir/file_{}.go", u8::arbitrary(g));
            AnyRecord(RawFileChange {
                status,
                filename: filename.clone(),
                previous_filename: Some(format!("old/{}", filename)),
                raw_url: Some(format!("https://raw.example/{}", filename)),
            })
        }
    }

    /// The four categories are disjoint, together they cover exactly the
    /// recognized-status subset of the input, and order is preserved
    /// within each category.
    #[quickcheck]
    fn prop_classification_is_an_order_preserving_partition(records: Vec<AnyRecord>) -> bool {
        let records: Vec<RawFileChange> = records.into_iter().map(|r| r.0).collect();
        let changes = ChangeSet::classify(records.clone());

        let by_status = |status: &str| -> Vec<String> {
            records
                .iter()
                .filter(|r| r.status == status)
                .map(|r| r.filename.clone())
                .collect()
        };

        let added: Vec<String> = changes.added.iter().map(|c| c.path.clone()).collect();
        let modified: Vec<String> = changes.modified.iter().map(|c| c.path.clone()).collect();
        let removed: Vec<String> = changes.removed.iter().map(|c| c.path.clone()).collect();
        let renamed: Vec<String> = changes.renamed.iter().map(|c| c.path.clone()).collect();

        let recognized = by_status("added").len()
            + by_status("modified").len()
            + by_status("removed").len()
            + by_status("renamed").len();

        added == by_status("added")
            && modified == by_status("modified")
            && removed == by_status("removed")
            && renamed == by_status("renamed")
            && changes.len() == recognized
            && changes.malformed.is_empty()
    }
}
