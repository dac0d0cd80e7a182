//! Slicing against a mocked hosting API and a local git repository

use git2::{Oid, Repository, Signature};
use serde_json::json;
use smellslice::git::{head_revision, FullClone};
use smellslice::slicer::walker::fallback_creation_date;
use smellslice::slicer::{GitHubClient, RepoHistoryWalker};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chrono::{DateTime, TimeZone, Utc};

const TOKEN: &str = "test-token";

fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

/// Local source repository laid out as `<root>/acme/widget`
struct SourceRepo {
    _root: TempDir,
    path: PathBuf,
    commits: Vec<Oid>,
}

impl SourceRepo {
    fn new(files: &[(&str, &str)]) -> Self {
        let root = TempDir::new().unwrap();
        let path = root.path().join("acme").join("widget");
        fs::create_dir_all(&path).unwrap();
        let repo = Repository::init(&path).unwrap();

        let mut commits = Vec::new();
        for (name, content) in files {
            fs::write(path.join(name), content).unwrap();
            let mut index = repo.index().unwrap();
            index.add_path(Path::new(name)).unwrap();
            index.write().unwrap();
            let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
            let signature = Signature::now("Test", "test@example.com").unwrap();
            let parent = repo.head().ok().map(|h| h.peel_to_commit().unwrap());
            let parents: Vec<&git2::Commit> = parent.iter().collect();
            let oid = repo
                .commit(Some("HEAD"), &signature, &signature, name, &tree, &parents)
                .unwrap();
            commits.push(oid);
        }

        Self {
            _root: root,
            path,
            commits,
        }
    }

    fn url(&self) -> String {
        format!("file://{}", self.path.display())
    }
}

async fn mock_created_at(server: &MockServer, created_at: &str) {
    Mock::given(method("GET"))
        .and(path("/repos/acme/widget"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "created_at": created_at })))
        .mount(server)
        .await;
}

async fn mock_commits(server: &MockServer, since: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/repos/acme/widget/commits"))
        .and(query_param("since", since))
        .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn walker(server: &MockServer, output: &Path) -> RepoHistoryWalker<GitHubClient, FullClone> {
    let client = GitHubClient::new(&server.uri(), Some(TOKEN.to_string()), Duration::from_secs(5)).unwrap();
    RepoHistoryWalker::new(client, FullClone, output)
}

#[tokio::test]
async fn test_windows_materialize_latest_commit_and_skip_empty_ones() {
    let source = SourceRepo::new(&[("one.txt", "1"), ("two.txt", "2")]);
    let server = MockServer::start().await;
    mock_created_at(&server, "2021-01-01T00:00:00Z").await;
    mock_commits(&server, "2021-01-01T00:00:00Z", json!([])).await;
    mock_commits(
        &server,
        "2021-05-01T00:00:00Z",
        json!([{ "sha": source.commits[0].to_string() }]),
    )
    .await;
    // Listed oldest first: the dated entries reveal the most recent one
    mock_commits(
        &server,
        "2021-08-29T00:00:00Z",
        json!([
            { "sha": source.commits[0].to_string(), "commit": { "committer": { "date": "2021-08-30T00:00:00Z" } } },
            { "sha": source.commits[1].to_string(), "commit": { "committer": { "date": "2021-08-31T00:00:00Z" } } }
        ]),
    )
    .await;

    let out = TempDir::new().unwrap();
    let summary = walker(&server, out.path())
        .run(&source.url(), None, utc(2021, 9, 1))
        .await
        .unwrap();

    assert_eq!(summary.created(), 2);
    assert_eq!(summary.skipped, vec!["2021-01_to_2021-05".to_string()]);
    assert!(summary.failed.is_empty());

    let root = out.path().join("snapshots_acme_widget");
    assert_eq!(summary.output_root, root);

    let first = &summary.snapshots[0];
    assert_eq!(first.index, 1);
    assert_eq!(first.directory, root.join("2021-05_to_2021-08"));
    assert_eq!(head_revision(&first.directory).unwrap(), source.commits[0].to_string());
    assert!(first.directory.join("one.txt").exists());
    assert!(!first.directory.join("two.txt").exists());

    let second = &summary.snapshots[1];
    assert_eq!(second.index, 2);
    assert_eq!(second.event_count, 2);
    assert_eq!(second.directory, root.join("2021-08_to_2021-09"));
    assert_eq!(head_revision(&second.directory).unwrap(), source.commits[1].to_string());
}

#[tokio::test]
async fn test_existing_snapshot_directory_is_replaced() {
    let source = SourceRepo::new(&[("one.txt", "1")]);
    let server = MockServer::start().await;
    mock_created_at(&server, "2021-01-01T00:00:00Z").await;
    mock_commits(
        &server,
        "2021-01-01T00:00:00Z",
        json!([{ "sha": source.commits[0].to_string() }]),
    )
    .await;

    let out = TempDir::new().unwrap();
    let stale = out.path().join("snapshots_acme_widget/2021-01_to_2021-03");
    fs::create_dir_all(&stale).unwrap();
    fs::write(stale.join("stale.txt"), "old").unwrap();

    let summary = walker(&server, out.path())
        .run(&source.url(), None, utc(2021, 3, 1))
        .await
        .unwrap();

    assert_eq!(summary.created(), 1);
    assert!(!stale.join("stale.txt").exists());
    assert!(stale.join("one.txt").exists());
}

#[tokio::test]
async fn test_start_before_creation_is_clamped() {
    let source = SourceRepo::new(&[("one.txt", "1")]);
    let server = MockServer::start().await;
    mock_created_at(&server, "2021-01-01T00:00:00Z").await;
    mock_commits(&server, "2021-01-01T00:00:00Z", json!([])).await;

    let out = TempDir::new().unwrap();
    let summary = walker(&server, out.path())
        .run(&source.url(), Some(utc(2019, 6, 1)), utc(2021, 2, 1))
        .await
        .unwrap();

    assert_eq!(summary.effective_start, utc(2021, 1, 1));
    assert_eq!(summary.created(), 0);
    assert_eq!(summary.skipped.len(), 1);
}

#[tokio::test]
async fn test_creation_date_failure_falls_back() {
    let source = SourceRepo::new(&[("one.txt", "1")]);
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/widget"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let out = TempDir::new().unwrap();
    let summary = walker(&server, out.path())
        .run(&source.url(), Some(utc(2021, 1, 1)), utc(2021, 2, 1))
        .await
        .unwrap();

    assert_eq!(summary.creation_date, fallback_creation_date());
    assert_eq!(summary.effective_start, utc(2021, 1, 1));
    // Unmatched commit queries answer 404 and count as empty windows
    assert_eq!(summary.created(), 0);
}

#[tokio::test]
async fn test_checkout_failure_only_fails_its_window() {
    let source = SourceRepo::new(&[("one.txt", "1")]);
    let server = MockServer::start().await;
    mock_created_at(&server, "2021-01-01T00:00:00Z").await;
    mock_commits(
        &server,
        "2021-01-01T00:00:00Z",
        json!([{ "sha": "0000000000000000000000000000000000000001" }]),
    )
    .await;
    mock_commits(
        &server,
        "2021-05-01T00:00:00Z",
        json!([{ "sha": source.commits[0].to_string() }]),
    )
    .await;

    let out = TempDir::new().unwrap();
    let summary = walker(&server, out.path())
        .run(&source.url(), None, utc(2021, 6, 1))
        .await
        .unwrap();

    assert_eq!(summary.failed, vec!["2021-01_to_2021-05".to_string()]);
    assert_eq!(summary.created(), 1);
    assert_eq!(summary.snapshots[0].index, 1);
}
