// tests/release_workflow_test.rs
use git_release_notes::archive::{MockRegistry, PublishAction};
use git_release_notes::config::Config;
use git_release_notes::domain::{Commit, MergeBases, PullRequest, ReleaseMetadata, Review};
use git_release_notes::git::MockRepository;
use git_release_notes::github::MockCodeHost;
use git_release_notes::profile::{ProfileResolver, ProfileStore};
use git_release_notes::workflow::{self, NotesFormat, ReleaseSummary, Tarball, Workflow};

fn config() -> Config {
    let mut config = Config::default();
    config.github.owner = "org".to_string();
    config.github.repo = "proj".to_string();
    config
}

fn metadata() -> ReleaseMetadata {
    ReleaseMetadata::new(Some("1.3.0"), MergeBases::Since("v1.2.0".into()), "main")
}

/// #10 by alice maps directly, #11 by bob by subject, one commit is unexplained
fn scenario() -> (MockRepository, MockCodeHost) {
    let mut repo = MockRepository::new();
    repo.add_log(
        "v1.2.0",
        "main",
        vec![
            Commit::new("c1", "Add feature (#10)"),
            Commit::new("c2", "Fix the thing"),
            Commit::new("c3", "Mystery commit"),
        ],
    );

    let mut host = MockCodeHost::new();
    host.add_pull(
        PullRequest::new(10, "Add feature", "alice").with_labels(&["enhancement"]),
        vec![],
    );
    host.associate("c1", 10);
    host.add_pull(
        PullRequest::new(11, "Fix the thing", "bob").with_labels(&["bug"]),
        vec![Review::approved("alice")],
    );
    host.add_recent(11);
    host.add_user("alice", Some("Alice Liddell"));
    host.add_user("bob", Some("Bob Builder"));
    host.add_user("carol", Some("Carol Danvers"));
    host.add_team("core", "Core developers", &["carol", "alice"]);
    (repo, host)
}

fn summarize(repo: &MockRepository, host: &mut MockCodeHost, config: &Config) -> ReleaseSummary {
    let mut progress = Vec::new();
    let summary = Workflow::new(repo, host, config)
        .summarize(&metadata(), |done, total, id| progress.push((done, total, id)))
        .unwrap();
    assert_eq!(progress, vec![(1, 2, 10), (2, 2, 11)]);
    summary
}

#[test]
fn test_summary_counts_authors_and_reviewers() {
    let (repo, mut host) = scenario();
    let config = config();
    let summary = summarize(&repo, &mut host, &config);

    assert_eq!(summary.reconciliation.pull_ids, vec![10, 11]);
    assert_eq!(summary.reconciliation.warnings.len(), 1);
    assert_eq!(summary.contributions.authors.get("alice"), Some(1));
    assert_eq!(summary.contributions.authors.get("bob"), Some(1));
    assert_eq!(summary.contributions.reviewers.get("alice"), Some(1));
    assert_eq!(summary.contributions.reviewers.len(), 1);
    assert_eq!(summary.pulls.len(), 2);
    assert!(summary.rejected().is_empty());
}

#[test]
fn test_markdown_notes() {
    let (repo, mut host) = scenario();
    let config = config();
    let summary = summarize(&repo, &mut host, &config);

    let mut store = ProfileStore::in_memory();
    let mut resolver = ProfileResolver::new(&mut store, &mut host, &config.profiles);
    let text = workflow::render_notes(
        &config,
        &metadata(),
        &summary,
        "Highlights of this release.",
        NotesFormat::Markdown,
        &mut resolver,
    )
    .unwrap();

    assert!(text.starts_with("Highlights of this release.\n"));
    assert!(text.contains("## New features\n\n* Add feature *(@alice, #10)*\n"));
    assert!(text.contains("## Bug fixes\n\n* Fix the thing *(@bob, #11)*\n"));
    assert!(text.contains("## Reviewers\n\n* Alice Liddell *(@alice)*: 1\n"));
    assert!(text.ends_with(
        "**Full Changelog**: https://github.com/org/proj/compare/v1.2.0...v1.3.0\n"
    ));
    assert!(
        text.find("New features").unwrap() < text.find("Bug fixes").unwrap(),
        "categories follow rule order"
    );
    assert_eq!(store.len(), 1);
}

#[test]
fn test_rst_notes_for_major_release() {
    let (repo, mut host) = scenario();
    let config = config();
    let summary = summarize(&repo, &mut host, &config);

    let mut store = ProfileStore::in_memory();
    let mut resolver = ProfileResolver::new(&mut store, &mut host, &config.profiles);
    let text = workflow::render_notes(
        &config,
        &metadata(),
        &summary,
        "",
        NotesFormat::Rst,
        &mut resolver,
    )
    .unwrap();

    assert!(text.contains("Series 1.3"));
    assert!(text.contains(".. _release_v1.3.0:"));
    assert!(text.contains("Version 1.3.0"));
    assert!(text.contains("* Add feature *(@alice, #10)*"));
}

#[test]
fn test_archive_metadata_and_publish() {
    let (repo, mut host) = scenario();
    let config = config();
    let summary = summarize(&repo, &mut host, &config);
    let teams = Workflow::new(&repo, &mut host, &config).teams().unwrap();

    let mut store = ProfileStore::in_memory();
    let mut resolver = ProfileResolver::new(&mut store, &mut host, &config.profiles);
    let record = workflow::archive_metadata(
        &config,
        &metadata(),
        &summary.contributions,
        &teams,
        None,
        "Highlights of this release.",
        "",
        &mut resolver,
    )
    .unwrap();

    assert_eq!(record.title, "proj 1.3.0");
    assert_eq!(record.version.as_deref(), Some("1.3.0"));
    let mut creators: Vec<_> = record.creators.iter().map(|p| p.name.as_str()).collect();
    creators.sort();
    assert_eq!(creators, vec!["Alice Liddell", "Bob Builder"]);

    // alice is a creator, so neither her review nor her team puts her in contributors
    let contributors: Vec<_> = record
        .contributors
        .iter()
        .map(|p| (p.name.as_str(), p.role.as_deref()))
        .collect();
    assert_eq!(contributors, vec![("Carol Danvers", Some("ProjectMember"))]);
    assert!(record.description.contains("Highlights of this release."));

    let tarball = Tarball {
        name: "proj-1.3.0.tar.gz".to_string(),
        url: "https://dl/proj-1.3.0.tar.gz".to_string(),
        content: b"tarball".to_vec(),
    };
    let mut registry = MockRegistry::new();
    let first = workflow::publish(&mut registry, &record, None, Some(&tarball)).unwrap();
    assert_eq!(first.action, PublishAction::Created);
    assert_eq!(first.uploaded.as_deref(), Some("proj-1.3.0.tar.gz"));

    // Re-running reuses the draft and replaces the file
    let second = workflow::publish(&mut registry, &record, None, Some(&tarball)).unwrap();
    assert_eq!(second.action, PublishAction::UpdatedDraft);
    assert_eq!(second.deposition.id, first.deposition.id);
    assert_eq!(registry.deposition_count(), 1);
    assert_eq!(registry.files(first.deposition.id), vec!["proj-1.3.0.tar.gz"]);
    assert_eq!(registry.call_count("delete_file"), 1);
}

#[test]
fn test_publish_new_version_of_previous_release() {
    let (repo, mut host) = scenario();
    let config = config();
    let summary = summarize(&repo, &mut host, &config);
    let teams = Workflow::new(&repo, &mut host, &config).teams().unwrap();
    let mut store = ProfileStore::in_memory();
    let mut resolver = ProfileResolver::new(&mut store, &mut host, &config.profiles);
    let record = workflow::archive_metadata(
        &config,
        &metadata(),
        &summary.contributions,
        &teams,
        None,
        "Notes",
        "",
        &mut resolver,
    )
    .unwrap();

    let mut previous = record.clone();
    previous.title = "proj 1.2.0".to_string();
    let mut registry = MockRegistry::new();
    let prior_id = registry.insert_published(&previous);

    let outcome = workflow::publish(&mut registry, &record, Some("proj 1.2.0"), None).unwrap();
    assert_eq!(outcome.action, PublishAction::NewVersion);
    assert_ne!(outcome.deposition.id, prior_id);
    assert_eq!(outcome.deposition.title(), Some("proj 1.3.0"));
    assert!(outcome.uploaded.is_none());

    // Publishing the finished record is a no-op
    let mut done = MockRegistry::new();
    done.insert_published(&record);
    let outcome = workflow::publish(&mut done, &record, Some("proj 1.2.0"), None).unwrap();
    assert_eq!(outcome.action, PublishAction::AlreadyPublished);
    assert_eq!(done.call_count("update"), 0);
}
