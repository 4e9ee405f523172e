//! Two-pass reconciliation of diverging fork histories.
//!
//! Pass 1 walks the downstream commits (newest-first, back toward the merge
//! base), annotates each one, and builds cross-reference indices over the
//! results. Pass 2 walks the upstream commits and resolves each against
//! those indices, back-filling title-based guesses onto the downstream
//! records it matches. The passes are strictly sequential: Pass 2 consumes
//! the completed, immutable indices from Pass 1.

use std::collections::HashMap;

use tracing::debug;

use crate::annotate::annotate;
use crate::models::{CommitMeta, CommitRecord};

/// Title prefix stripped before indexing a change-request commit by title.
pub const FROMLIST_TITLE_PREFIX: &str = "[nrf fromlist] ";

// ---------------------------------------------------------------------------
// Downstream indices
// ---------------------------------------------------------------------------

/// Cross-reference indices over the downstream records, built during Pass 1
/// and read-only afterwards.
#[derive(Debug, Default)]
pub struct DownstreamIndex {
    /// Upstream sha -> downstream sha, for exact cherry-pick correlations.
    exact: HashMap<String, String>,
    /// Normalized title -> position in the downstream record list, for
    /// commits that referenced a change request but have no exact upstream
    /// sha. On a title collision the later-iterated commit wins.
    title: HashMap<String, usize>,
    /// Reverted sha -> reverting sha.
    revert: HashMap<String, String>,
}

impl DownstreamIndex {
    /// Downstream sha that cherry-picked the given upstream commit, if any.
    pub fn exact_downstream(&self, upstream_sha: &str) -> Option<&str> {
        self.exact.get(upstream_sha).map(String::as_str)
    }

    /// Position of the downstream record whose normalized title matches,
    /// if any. Lookups use the upstream title verbatim.
    pub fn guess_candidate(&self, title: &str) -> Option<usize> {
        self.title.get(title).copied()
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The reconciled record set: both annotated lists in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutput {
    pub downstream_commits: Vec<CommitRecord>,
    pub upstream_commits: Vec<CommitRecord>,
}

/// Pass 1: annotate the downstream sequence and build the indices.
///
/// Revert back-references are resolved within this single pass, so a revert
/// only finds its target when the revert was iterated first (the expected
/// state for newest-first input).
pub fn index_downstream(commits: &[CommitMeta]) -> (Vec<CommitRecord>, DownstreamIndex) {
    let mut records = Vec::with_capacity(commits.len());
    let mut index = DownstreamIndex::default();

    for meta in commits {
        let mut record = annotate(meta, true);

        if let Some(upstream_sha) = &record.upstream_sha {
            index
                .exact
                .insert(upstream_sha.clone(), record.sha.clone());
        } else if record.upstream_pr.is_some() {
            let title = record
                .title
                .strip_prefix(FROMLIST_TITLE_PREFIX)
                .unwrap_or(&record.title);
            index.title.insert(title.to_string(), records.len());
        }

        if let Some(reverts_sha) = &record.reverts_sha {
            index.revert.insert(reverts_sha.clone(), record.sha.clone());
        }
        record.reverted_by_sha = index.revert.get(&record.sha).cloned();

        records.push(record);
    }

    (records, index)
}

/// Pass 2: resolve each upstream commit against the downstream indices.
///
/// An exact index hit yields `downstream_sha`. A title hit yields the guess
/// pair: the matched downstream record (addressed by its position in
/// `downstream`) receives `upstream_sha_guess`, and the upstream record
/// receives `downstream_sha_guess`. Upstream messages are not scanned for
/// trailers; they are the source of truth.
pub fn resolve_upstream(
    commits: &[CommitMeta],
    index: &DownstreamIndex,
    downstream: &mut [CommitRecord],
) -> Vec<CommitRecord> {
    let mut records = Vec::with_capacity(commits.len());

    for meta in commits {
        let downstream_sha = index.exact_downstream(&meta.sha).map(str::to_string);

        let mut downstream_sha_guess = None;
        if let Some(pos) = index.guess_candidate(meta.title()) {
            let candidate = &mut downstream[pos];
            candidate.upstream_sha_guess = Some(meta.sha.clone());
            downstream_sha_guess = Some(candidate.sha.clone());
        }

        let mut record = annotate(meta, false);
        record.downstream_sha = downstream_sha;
        record.downstream_sha_guess = downstream_sha_guess;
        records.push(record);
    }

    records
}

/// Reconcile the two histories. Both sequences are expected newest-first,
/// walking back toward the merge base; output preserves input order.
pub fn reconcile(downstream: &[CommitMeta], upstream: &[CommitMeta]) -> ReconcileOutput {
    let (mut downstream_commits, index) = index_downstream(downstream);
    let upstream_commits = resolve_upstream(upstream, &index, &mut downstream_commits);

    debug!(
        downstream = downstream_commits.len(),
        upstream = upstream_commits.len(),
        "reconciled commit histories"
    );

    ReconcileOutput {
        downstream_commits,
        upstream_commits,
    }
}
