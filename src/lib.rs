//! MirrorSync - Selective Upstream Tree Synchronization
//!
//! MirrorSync keeps a local mirror of a subset of a remote source tree in
//! step with the changes introduced between two revisions of an upstream
//! GitHub repository, without performing a full clone.
//!
//! ## Core Features
//!
//! - **Change Classification**: Partitions compare-API records into added,
//!   modified, removed, and renamed categories
//! - **Minimal Filesystem Effects**: Fetches new content, relocates renamed
//!   files (with a fetch fallback for partially-populated mirrors), and
//!   deletes removed files
//! - **Content Rewriting**: Literal text substitutions applied to fetched
//!   text files; binary content passes through untouched
//! - **Ignore-List**: Exact-match path exemptions from every operation
//! - **Post-Pass Cleanup**: Strips configured artifacts after every sync
//!
//! ## Modules
//!
//! - [`changes`]: Change-set classification
//! - [`apply`]: The sync applier and its phase ordering
//! - [`github`]: Compare metadata and raw content retrieval

pub mod apply;
pub mod changes;
pub mod config;
pub mod github;
pub mod ignore;
pub mod rewrite;

pub use apply::{ContentFetcher, FileFailure, SyncApplier, SyncSummary};
pub use changes::{ChangeSet, ChangeStatus, FileChange, RawFileChange, RenameChange};
pub use config::Config;
pub use github::GitHubClient;
pub use ignore::IgnoreList;
pub use rewrite::{RewriteRule, Rewriter};
