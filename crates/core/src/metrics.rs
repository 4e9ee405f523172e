//! Aggregate metrics derived from collected sync data.
//!
//! Each metric is a predicate-and-count fold over the annotated commit
//! lists. The derived entry is what gets rendered to InfluxDB line protocol
//! (or printed in dry-run mode).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::annotate::NOUP_PREFIX;
use crate::models::{CommitRecord, SyncData};

/// Title prefix for commits carried downstream from the upstream tree.
const FROMTREE_PREFIX: &str = "[nrf fromtree]";

/// Title prefix for commits picked from a pending upstream change request.
const FROMLIST_PREFIX: &str = "[nrf fromlist]";

/// One metrics data point: a measurement name, static tags, the collection
/// timestamp, and integer fields keyed by their display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsEntry {
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    /// Seconds since epoch, taken from the sync data's collection time.
    pub timestamp: i64,
    pub fields: BTreeMap<String, i64>,
}

impl MetricsEntry {
    /// The entry timestamp rendered as RFC 3339 UTC.
    pub fn time_rfc3339(&self) -> String {
        DateTime::<Utc>::from_timestamp(self.timestamp, 0)
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_default()
    }
}

/// Derive the metrics entry for one collection run.
pub fn derive_entry(data: &SyncData, measurement: &str) -> MetricsEntry {
    let downstream = &data.downstream_commits;
    let upstream = &data.upstream_commits;

    let mut fields = BTreeMap::new();
    fields.insert(
        "Commits upstream after upmerge".to_string(),
        upstream.len() as i64,
    );
    fields.insert(
        "Commits downstream after upmerge".to_string(),
        downstream.len() as i64,
    );
    fields.insert(
        "Downstream noup commits".to_string(),
        count(downstream, |c| is_non_reverted_with_prefix(c, NOUP_PREFIX)),
    );
    fields.insert(
        "Downstream fromtree commits".to_string(),
        count(downstream, |c| {
            is_non_reverted_with_prefix(c, FROMTREE_PREFIX)
        }),
    );
    fields.insert(
        "Downstream fromlist commits".to_string(),
        count(downstream, |c| {
            is_non_reverted_with_prefix(c, FROMLIST_PREFIX)
        }),
    );
    fields.insert(
        "Downstream fromlist commits likely merged".to_string(),
        count(downstream, is_likely_merged_fromlist),
    );
    fields.insert(
        "Commits upstream only".to_string(),
        count(upstream, is_upstream_only),
    );
    fields.insert(
        "Bluetooth commits upstream only".to_string(),
        count(upstream, is_bluetooth_upstream_only),
    );

    let mut tags = BTreeMap::new();
    tags.insert("mode".to_string(), "measurement".to_string());

    MetricsEntry {
        measurement: measurement.to_string(),
        tags,
        timestamp: data.meta.collected_at,
        fields,
    }
}

fn count<P>(records: &[CommitRecord], predicate: P) -> i64
where
    P: Fn(&CommitRecord) -> bool,
{
    records.iter().filter(|r| predicate(r)).count() as i64
}

/// Commit carries the given category prefix and has not been reverted.
fn is_non_reverted_with_prefix(record: &CommitRecord, prefix: &str) -> bool {
    record.title.starts_with(prefix) && record.reverted_by_sha.is_none()
}

/// Non-reverted fromlist commit whose title was later matched upstream.
fn is_likely_merged_fromlist(record: &CommitRecord) -> bool {
    record.title.starts_with(FROMLIST_PREFIX)
        && record.reverted_by_sha.is_none()
        && record.upstream_sha_guess.is_some()
}

/// Upstream commit with no downstream correlation, exact or guessed.
fn is_upstream_only(record: &CommitRecord) -> bool {
    record.downstream_sha.is_none() && record.downstream_sha_guess.is_none()
}

/// Upstream-only Bluetooth commit (title prefix match, either case).
fn is_bluetooth_upstream_only(record: &CommitRecord) -> bool {
    is_upstream_only(record)
        && (record.title.starts_with("Bluetooth") || record.title.starts_with("bluetooth"))
}
