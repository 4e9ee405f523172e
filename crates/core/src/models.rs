//! Domain model types used throughout forksync.
//!
//! These types bridge the history walker, the reconciliation engine, and the
//! JSON output consumed by the metrics tooling.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Raw commit metadata
// ---------------------------------------------------------------------------

/// Raw metadata for a single commit, as produced by the history walker.
///
/// This is the engine's input shape: the walker yields one `CommitMeta` per
/// commit, newest-first, for each side of the fork.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMeta {
    /// Full hex object id.
    pub sha: String,
    /// Full commit message, first line is the title.
    pub message: String,
    /// Author name, free text.
    pub author_name: String,
    /// Author timestamp, seconds since epoch.
    pub authored_at: i64,
    /// Committer timestamp, seconds since epoch.
    pub committed_at: i64,
}

impl CommitMeta {
    /// The commit title: the first line of the message.
    pub fn title(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

// ---------------------------------------------------------------------------
// Annotated commit record
// ---------------------------------------------------------------------------

/// One annotated commit as emitted into the sync data output.
///
/// A commit appearing on both sides of the fork is represented independently
/// per side. Optional correlation fields are omitted from the JSON output
/// entirely when unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Full hex object id.
    pub sha: String,

    /// Author timestamp, seconds since epoch.
    #[serde(rename = "authored_seconds_since_epoch")]
    pub authored_at: i64,

    /// Committer timestamp, seconds since epoch.
    #[serde(rename = "committed_seconds_since_epoch")]
    pub committed_at: i64,

    /// Author name.
    #[serde(rename = "author")]
    pub author_name: String,

    /// First line of the commit message.
    pub title: String,

    /// Upstream change-request reference parsed from an `Upstream PR:`
    /// trailer. A URL value is reduced to its final path segment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_pr: Option<String>,

    /// Exact upstream commit this one was cherry-picked from, parsed from a
    /// `(cherry picked from commit ...)` trailer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_sha: Option<String>,

    /// Downstream commit that cherry-picked this upstream commit
    /// (upstream-side records only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downstream_sha: Option<String>,

    /// Downstream commit whose title matched this upstream commit after it
    /// referenced a change request. Weaker evidence than `downstream_sha`;
    /// the two commits are not guaranteed to carry the same change.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downstream_sha_guess: Option<String>,

    /// Reciprocal of `downstream_sha_guess`, set on the downstream record
    /// once its title is matched to an upstream commit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_sha_guess: Option<String>,

    /// Commit this one reverts, parsed from a `This reverts commit ...` body
    /// line of a `Revert`-titled commit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverts_sha: Option<String>,

    /// Commit that reverts this one, filled in while processing the revert.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverted_by_sha: Option<String>,
}

// ---------------------------------------------------------------------------
// Sync data envelope
// ---------------------------------------------------------------------------

/// Provenance metadata for a collection run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMeta {
    pub upstream_url: String,
    pub upstream_rev: String,
    pub downstream_url: String,
    pub downstream_rev: String,
    /// Wall-clock time of the collection run, seconds since epoch.
    #[serde(rename = "authored_seconds_since_epoch")]
    pub collected_at: i64,
}

/// The complete output of one collection run: provenance, the merge base,
/// and the two annotated commit lists in walk order (newest-first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncData {
    pub meta: SyncMeta,
    pub merge_base: CommitRecord,
    pub downstream_commits: Vec<CommitRecord>,
    pub upstream_commits: Vec<CommitRecord>,
}
