//! Commit message annotation.
//!
//! Extracts correlation signals from a commit's message: a referenced
//! upstream change request, the exact upstream commit it was cherry-picked
//! from, or the commit it reverts. Produces one [`CommitRecord`] per commit;
//! malformed or absent trailers simply leave the corresponding field unset.

use std::sync::LazyLock;

use regex_lite::Regex;

use crate::models::{CommitMeta, CommitRecord};

/// Title prefix marking a revert commit.
pub const REVERT_PREFIX: &str = "Revert";

/// Title prefix marking a downstream-only commit that never goes upstream.
pub const NOUP_PREFIX: &str = "[nrf noup]";

/// Combined correlation pattern. Matches, at the start of any message line,
/// either an `Upstream PR:` / `Upstream PR #:` reference or a cherry-pick
/// trailer. Only the first match in document order is used, so a message
/// carrying both forms yields exactly one correlation field.
static RE_CORRELATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)(^Upstream PR(?: #)?: (?P<upstream_pr>.+))|(^\(cherry picked from commit (?P<upstream_sha>[0-9a-f]+)\))",
    )
    .expect("correlation pattern")
});

/// Revert back-reference pattern.
static RE_REVERT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^This reverts commit (?P<sha>[0-9a-f]+)").expect("revert pattern")
});

/// Annotate one commit's metadata.
///
/// Always populates sha, timestamps, author, and title. When
/// `parse_upstream_refs` is set and the title does not begin with
/// [`REVERT_PREFIX`] or [`NOUP_PREFIX`], the message is scanned for the
/// correlation trailers. Revert-titled commits are scanned only for the
/// `This reverts commit` back-reference; no other trailer parsing is
/// attempted for them.
pub fn annotate(meta: &CommitMeta, parse_upstream_refs: bool) -> CommitRecord {
    let mut record = CommitRecord {
        sha: meta.sha.clone(),
        authored_at: meta.authored_at,
        committed_at: meta.committed_at,
        author_name: meta.author_name.clone(),
        title: meta.title().to_string(),
        ..Default::default()
    };

    if record.title.starts_with(REVERT_PREFIX) {
        if let Some(caps) = RE_REVERT.captures(&meta.message) {
            if let Some(sha) = caps.name("sha") {
                record.reverts_sha = Some(sha.as_str().to_string());
            }
        }
        return record;
    }

    if parse_upstream_refs && !record.title.starts_with(NOUP_PREFIX) {
        if let Some(caps) = RE_CORRELATION.captures(&meta.message) {
            if let Some(sha) = caps.name("upstream_sha") {
                record.upstream_sha = Some(sha.as_str().to_string());
            }
            if let Some(pr) = caps.name("upstream_pr") {
                record.upstream_pr = Some(change_request_id(pr.as_str()).to_string());
            }
        }
    }

    record
}

/// Reduce a change-request reference to its identifier: a URL keeps only the
/// final path segment, anything else is taken verbatim.
fn change_request_id(value: &str) -> &str {
    value.split('/').next_back().unwrap_or(value)
}
