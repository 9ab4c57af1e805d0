//! Sync applier - applies a classified change-set to the local mirror tree.
//!
//! Phases run in a fixed order: fetch (added, then modified), rename with
//! fetch fallback, removal, then the unconditional post-pass cleanup.
//! Fetching before renaming guarantees a rename fallback never needs a file
//! a removal already deleted; removals run last so a path freed by a rename
//! is not still seen as present.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::changes::ChangeSet;
use crate::ignore::IgnoreList;
use crate::rewrite::Rewriter;

/// Retrieves the raw bytes behind a content locator.
///
/// Implemented by the GitHub client for real runs and by in-memory fakes in
/// tests. Any error is treated as a per-file failure, never a run abort.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>>;
}

/// A single file operation that could not be completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub path: String,
    pub error: String,
}

/// Outcome accumulator for one sync run. Threaded through the applier
/// explicitly rather than kept as ambient state so runs stay testable in
/// isolation.
#[derive(Debug, Clone, Default)]
pub struct SyncSummary {
    pub added: usize,
    pub modified: usize,
    pub renamed: usize,
    pub removed: usize,
    /// Renames recovered by fetching the destination because the pre-rename
    /// path was missing locally.
    pub fallbacks: usize,
    /// Records skipped because a path was on the ignore-list.
    pub skipped: usize,
    /// Removals whose target was already absent.
    pub already_absent: usize,
    /// Paths deleted by the post-pass cleanup.
    pub cleaned: usize,
    pub failures: Vec<FileFailure>,
}

impl SyncSummary {
    /// True when every record reached its target state.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record_failure(&mut self, path: &str, error: anyhow::Error) {
        warn!("Failed to sync {}: {:#}", path, error);
        self.failures.push(FileFailure {
            path: path.to_string(),
            error: format!("{:#}", error),
        });
    }
}

/// Applies a [`ChangeSet`] to the mirror tree rooted at a target directory.
pub struct SyncApplier {
    root: PathBuf,
    ignore: IgnoreList,
    rewriter: Rewriter,
    cleanup: Vec<String>,
}

impl SyncApplier {
    pub fn new(root: PathBuf, ignore: IgnoreList, rewriter: Rewriter, cleanup: Vec<String>) -> Self {
        Self {
            root,
            ignore,
            rewriter,
            cleanup,
        }
    }

    /// Run all phases sequentially and return the accumulated summary.
    ///
    /// Per-file failures are collected and the run continues; only an
    /// inaccessible mirror root aborts before anything is applied.
    pub async fn apply(
        &self,
        changes: &ChangeSet,
        fetcher: &dyn ContentFetcher,
    ) -> Result<SyncSummary> {
        if !self.root.is_dir() {
            bail!(
                "mirror root is not an accessible directory: {}",
                self.root.display()
            );
        }

        let mut summary = SyncSummary::default();

        for malformed in &changes.malformed {
            warn!(
                "Skipping malformed record for {}: {}",
                malformed.path, malformed.reason
            );
            summary.failures.push(FileFailure {
                path: malformed.path.clone(),
                error: malformed.reason.clone(),
            });
        }

        self.fetch_phase(changes, fetcher, &mut summary).await;
        self.rename_phase(changes, fetcher, &mut summary).await;
        self.removal_phase(changes, &mut summary).await;
        self.cleanup_phase(&mut summary).await;

        Ok(summary)
    }

    /// Phase 1: download added and modified files into the tree.
    async fn fetch_phase(
        &self,
        changes: &ChangeSet,
        fetcher: &dyn ContentFetcher,
        summary: &mut SyncSummary,
    ) {
        for change in &changes.added {
            if self.ignore.is_ignored(&change.path) {
                debug!("Ignoring added file: {}", change.path);
                summary.skipped += 1;
                continue;
            }
            match self
                .fetch_into_tree(&change.path, change.content_ref.as_deref(), fetcher)
                .await
            {
                Ok(()) => summary.added += 1,
                Err(error) => summary.record_failure(&change.path, error),
            }
        }

        for change in &changes.modified {
            if self.ignore.is_ignored(&change.path) {
                debug!("Ignoring modified file: {}", change.path);
                summary.skipped += 1;
                continue;
            }
            match self
                .fetch_into_tree(&change.path, change.content_ref.as_deref(), fetcher)
                .await
            {
                Ok(()) => summary.modified += 1,
                Err(error) => summary.record_failure(&change.path, error),
            }
        }
    }

    /// Phase 2: relocate renamed files, falling back to a fresh fetch when
    /// the pre-rename path is missing locally. The fallback is what keeps a
    /// partially-populated mirror convergent across re-runs.
    async fn rename_phase(
        &self,
        changes: &ChangeSet,
        fetcher: &dyn ContentFetcher,
        summary: &mut SyncSummary,
    ) {
        for change in &changes.renamed {
            if self
                .ignore
                .is_rename_ignored(&change.previous_path, &change.path)
            {
                debug!(
                    "Ignoring rename: {} -> {}",
                    change.previous_path, change.path
                );
                summary.skipped += 1;
                continue;
            }

            let source = self.root.join(&change.previous_path);

            // Existence is checked explicitly instead of relying on the
            // rename call's missing-source failure mode, which differs
            // between filesystems.
            if source.exists() {
                match self.rename_in_tree(&source, &change.path).await {
                    Ok(()) => {
                        info!("Renamed {} -> {}", change.previous_path, change.path);
                        summary.renamed += 1;
                    }
                    Err(error) => summary.record_failure(&change.path, error),
                }
            } else {
                warn!(
                    "Pre-rename path {} missing locally, fetching {} instead",
                    change.previous_path, change.path
                );
                match self
                    .fetch_into_tree(&change.path, change.content_ref.as_deref(), fetcher)
                    .await
                {
                    Ok(()) => {
                        summary.renamed += 1;
                        summary.fallbacks += 1;
                    }
                    Err(error) => summary.record_failure(&change.path, error),
                }
            }
        }
    }

    /// Phase 3: delete removed files; already-absent targets are satisfied.
    async fn removal_phase(&self, changes: &ChangeSet, summary: &mut SyncSummary) {
        for change in &changes.removed {
            if self.ignore.is_ignored(&change.path) {
                debug!("Ignoring removed file: {}", change.path);
                summary.skipped += 1;
                continue;
            }

            let target = self.root.join(&change.path);
            if target.exists() {
                match tokio::fs::remove_file(&target)
                    .await
                    .with_context(|| format!("failed to remove {}", target.display()))
                {
                    Ok(()) => {
                        info!("Removed {}", change.path);
                        summary.removed += 1;
                    }
                    Err(error) => summary.record_failure(&change.path, error),
                }
            } else {
                info!("Already absent: {}", change.path);
                summary.already_absent += 1;
            }
        }
    }

    /// Phase 4: unconditionally delete the configured cleanup paths. This
    /// pass is independent of the change-set and the ignore-list.
    async fn cleanup_phase(&self, summary: &mut SyncSummary) {
        for path in &self.cleanup {
            let target = self.root.join(path);
            if !target.exists() {
                continue;
            }

            let result = if target.is_dir() {
                tokio::fs::remove_dir_all(&target).await
            } else {
                tokio::fs::remove_file(&target).await
            };

            match result.with_context(|| format!("failed to clean up {}", target.display())) {
                Ok(()) => {
                    info!("Cleaned up {}", path);
                    summary.cleaned += 1;
                }
                Err(error) => summary.record_failure(path, error),
            }
        }
    }

    /// Fetch a file's bytes, run them through the rewriter keyed by the
    /// destination path, and write the result into the tree.
    async fn fetch_into_tree(
        &self,
        path: &str,
        content_ref: Option<&str>,
        fetcher: &dyn ContentFetcher,
    ) -> Result<()> {
        let locator = content_ref.context("record has no content locator")?;

        let bytes = fetcher
            .fetch(locator)
            .await
            .with_context(|| format!("failed to fetch content for {}", path))?;

        let destination = self.root.join(path);
        self.ensure_parent_dirs(&destination).await?;

        let bytes = self.rewriter.rewrite(path, bytes);
        tokio::fs::write(&destination, bytes)
            .await
            .with_context(|| format!("failed to write {}", destination.display()))?;

        info!("Fetched {}", path);
        Ok(())
    }

    /// Relocate an existing file to a new repository-relative path. Content
    /// is not re-rewritten: a pure rename leaves the bytes unchanged.
    async fn rename_in_tree(&self, source: &Path, path: &str) -> Result<()> {
        let destination = self.root.join(path);
        self.ensure_parent_dirs(&destination).await?;

        tokio::fs::rename(source, &destination)
            .await
            .with_context(|| {
                format!(
                    "failed to rename {} -> {}",
                    source.display(),
                    destination.display()
                )
            })
    }

    async fn ensure_parent_dirs(&self, destination: &Path) -> Result<()> {
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        Ok(())
    }
}
