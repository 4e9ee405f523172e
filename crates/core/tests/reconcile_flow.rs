//! End-to-end tests for the collect pipeline: walk two diverging branches of
//! a real local repository and reconcile them.
//!
//! No network I/O: the repository is built in a tempdir with `git2`, with an
//! "upstream" and a "downstream" branch diverging from a shared base commit.

use git2::{IndexAddOption, Oid, Repository, Signature};
use tempfile::TempDir;

use forksync_core::git::GitClient;
use forksync_core::models::{CommitRecord, SyncData, SyncMeta};
use forksync_core::reconcile::reconcile;

// ===========================================================================
// Helpers
// ===========================================================================

fn commit_file(repo: &Repository, name: &str, content: &str, message: &str) -> Oid {
    std::fs::write(repo.workdir().unwrap().join(name), content).unwrap();
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();
    let tree_oid = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_oid).unwrap();
    let sig = Signature::now("Test Dev", "dev@test.com").unwrap();
    let parent = match repo.head() {
        Ok(head) => Some(head.peel_to_commit().unwrap()),
        Err(_) => None,
    };
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap()
}

fn checkout_new_branch(repo: &Repository, name: &str, from: Oid) {
    let commit = repo.find_commit(from).unwrap();
    repo.branch(name, &commit, false).unwrap();
    repo.set_head(&format!("refs/heads/{name}")).unwrap();
    repo.checkout_head(Some(git2::build::CheckoutBuilder::new().force()))
        .unwrap();
}

struct ForkFixture {
    _dir: TempDir,
    client: GitClient,
    base: Oid,
    upstream_fix: Oid,
    upstream_feature: Oid,
    upstream_bluetooth: Oid,
    down_pick: Oid,
    down_fromlist: Oid,
    down_noup: Oid,
    down_revert: Oid,
}

/// Build a repository with a shared base and two diverging branches:
///
/// - `upstream`: a fix (later cherry-picked downstream), a feature (merged
///   from a change request the downstream already picked), and an
///   upstream-only Bluetooth commit.
/// - `downstream`: the cherry-pick of the fix, the fromlist pick of the
///   feature, a noup commit, and a revert of that noup commit.
fn build_fixture() -> ForkFixture {
    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path()).unwrap();

    let base = commit_file(&repo, "base.txt", "base", "Initial commit");

    checkout_new_branch(&repo, "upstream", base);
    let upstream_fix = commit_file(
        &repo,
        "fix.txt",
        "fix",
        "Fix bug in scheduler\n\nDetails about the fix.\n",
    );
    let upstream_feature = commit_file(&repo, "feature.txt", "feature", "Add watchdog feature\n");
    let upstream_bluetooth = commit_file(
        &repo,
        "bt.txt",
        "bt",
        "Bluetooth: improve scanning\n\nUpstream only work.\n",
    );

    checkout_new_branch(&repo, "downstream", base);
    let down_pick = commit_file(
        &repo,
        "fix.txt",
        "fix",
        &format!(
            "[nrf fromtree] Fix bug in scheduler\n\nDetails about the fix.\n\n(cherry picked from commit {upstream_fix})\n"
        ),
    );
    let down_fromlist = commit_file(
        &repo,
        "feature.txt",
        "feature",
        "[nrf fromlist] Add watchdog feature\n\nUpstream PR: https://github.com/acme/widgets/pull/4242\n",
    );
    let down_noup = commit_file(
        &repo,
        "board.txt",
        "board",
        "[nrf noup] Add custom board\n\nDownstream-only board support.\n",
    );
    let down_revert = commit_file(
        &repo,
        "board.txt",
        "",
        &format!("Revert \"[nrf noup] Add custom board\"\n\nThis reverts commit {down_noup}.\n"),
    );

    let client = GitClient::open(dir.path()).unwrap();
    ForkFixture {
        _dir: dir,
        client,
        base,
        upstream_fix,
        upstream_feature,
        upstream_bluetooth,
        down_pick,
        down_fromlist,
        down_noup,
        down_revert,
    }
}

fn find<'a>(records: &'a [CommitRecord], sha: Oid) -> &'a CommitRecord {
    let sha = sha.to_string();
    records
        .iter()
        .find(|r| r.sha == sha)
        .unwrap_or_else(|| panic!("no record for {sha}"))
}

// ===========================================================================
// Tests
// ===========================================================================

#[test]
fn test_merge_base_is_shared_root() {
    let fx = build_fixture();
    let base = fx.client.merge_base("upstream", "downstream").unwrap();
    assert_eq!(base, fx.base.to_string());
}

#[test]
fn test_walk_is_newest_first_and_excludes_base() {
    let fx = build_fixture();
    let base = fx.base.to_string();

    let downstream = fx.client.commits_between(&base, "downstream").unwrap();
    let shas: Vec<String> = downstream.iter().map(|c| c.sha.clone()).collect();
    assert_eq!(
        shas,
        vec![
            fx.down_revert.to_string(),
            fx.down_noup.to_string(),
            fx.down_fromlist.to_string(),
            fx.down_pick.to_string(),
        ]
    );

    let upstream = fx.client.commits_between(&base, "upstream").unwrap();
    assert_eq!(upstream.len(), 3);
    assert_eq!(upstream[0].sha, fx.upstream_bluetooth.to_string());
}

#[test]
fn test_reconcile_cross_references_both_sides() {
    let fx = build_fixture();
    let base = fx.base.to_string();
    let downstream = fx.client.commits_between(&base, "downstream").unwrap();
    let upstream = fx.client.commits_between(&base, "upstream").unwrap();

    let out = reconcile(&downstream, &upstream);

    // Exact cherry-pick correlation, both directions.
    let pick = find(&out.downstream_commits, fx.down_pick);
    assert_eq!(pick.upstream_sha.as_deref(), Some(fx.upstream_fix.to_string().as_str()));
    let fix = find(&out.upstream_commits, fx.upstream_fix);
    assert_eq!(fix.downstream_sha.as_deref(), Some(fx.down_pick.to_string().as_str()));

    // Title-based guess pair for the fromlist pick, with the PR reference
    // reduced to its trailing id.
    let fromlist = find(&out.downstream_commits, fx.down_fromlist);
    assert_eq!(fromlist.upstream_pr.as_deref(), Some("4242"));
    assert_eq!(
        fromlist.upstream_sha_guess.as_deref(),
        Some(fx.upstream_feature.to_string().as_str())
    );
    let feature = find(&out.upstream_commits, fx.upstream_feature);
    assert_eq!(
        feature.downstream_sha_guess.as_deref(),
        Some(fx.down_fromlist.to_string().as_str())
    );

    // Revert chain: the revert is newer, so it links its target.
    let revert = find(&out.downstream_commits, fx.down_revert);
    assert_eq!(revert.reverts_sha.as_deref(), Some(fx.down_noup.to_string().as_str()));
    let noup = find(&out.downstream_commits, fx.down_noup);
    assert_eq!(
        noup.reverted_by_sha.as_deref(),
        Some(fx.down_revert.to_string().as_str())
    );
}

#[test]
fn test_upstream_only_commit_serializes_without_correlations() {
    let fx = build_fixture();
    let base = fx.base.to_string();
    let downstream = fx.client.commits_between(&base, "downstream").unwrap();
    let upstream = fx.client.commits_between(&base, "upstream").unwrap();

    let out = reconcile(&downstream, &upstream);
    let bluetooth = find(&out.upstream_commits, fx.upstream_bluetooth);

    let value = serde_json::to_value(bluetooth).unwrap();
    assert!(value.get("downstream_sha").is_none());
    assert!(value.get("downstream_sha_guess").is_none());
    assert_eq!(value["title"], "Bluetooth: improve scanning");
}

#[test]
fn test_sync_data_envelope_round_trips() {
    let fx = build_fixture();
    let base = fx.base.to_string();
    let downstream = fx.client.commits_between(&base, "downstream").unwrap();
    let upstream = fx.client.commits_between(&base, "upstream").unwrap();
    let out = reconcile(&downstream, &upstream);

    let merge_base = fx.client.commit_meta(&base).unwrap();
    let data = SyncData {
        meta: SyncMeta {
            upstream_url: "https://example.com/upstream".into(),
            upstream_rev: "upstream".into(),
            downstream_url: "https://example.com/downstream".into(),
            downstream_rev: "downstream".into(),
            collected_at: 1_700_000_000,
        },
        merge_base: forksync_core::annotate(&merge_base, false),
        downstream_commits: out.downstream_commits,
        upstream_commits: out.upstream_commits,
    };

    let json = serde_json::to_string(&data).unwrap();
    let back: SyncData = serde_json::from_str(&json).unwrap();
    assert_eq!(back, data);
    assert_eq!(back.merge_base.sha, fx.base.to_string());
    assert_eq!(back.meta.collected_at, 1_700_000_000);
}
