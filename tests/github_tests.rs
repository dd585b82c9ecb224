//! Tests for the GitHub collaborator layer
//!
//! Everything here runs offline against parsed URLs, a temporary base
//! directory and pre-seeded cache files; the tests that talk to the live
//! GitHub API are ignored by default.

use ci_reviewer::{analyze_workflow_run, GitHubAction, GitHubApi, GitHubRepo, LogAnalyzer};

#[test]
fn test_github_repo_from_url() {
    let cases = [
        (
            "https://github.com/WolfgangFahl/pyOpenSourceProjects",
            "WolfgangFahl",
            "pyOpenSourceProjects",
        ),
        (
            "http://github.com/WolfgangFahl/pyOpenSourceProjects",
            "WolfgangFahl",
            "pyOpenSourceProjects",
        ),
        (
            "git@github.com:WolfgangFahl/pyOpenSourceProjects",
            "WolfgangFahl",
            "pyOpenSourceProjects",
        ),
        ("https://github.com/ad-freiburg/qlever", "ad-freiburg", "qlever"),
    ];
    for (url, owner, project_id) in cases {
        let repo = GitHubRepo::from_url(url).unwrap_or_else(|| panic!("should parse {}", url));
        assert_eq!(repo.owner, owner, "url: {}", url);
        assert_eq!(repo.project_id, project_id, "url: {}", url);
    }

    assert_eq!(GitHubRepo::from_url("https://example.com/foo/bar"), None);
    assert_eq!(GitHubRepo::from_url("not a url"), None);
}

#[test]
fn test_project_url() {
    let repo = GitHubRepo::from_url("git@github.com:ad-freiburg/qlever").expect("should parse");
    assert_eq!(repo.project_url(), "https://github.com/ad-freiburg/qlever");
}

#[test]
fn test_github_action_from_url() {
    let action = GitHubAction::from_url(
        "https://github.com/WolfgangFahl/scan2wiki/actions/runs/10557241724/job/29244366904",
    )
    .expect("should parse");

    assert_eq!(action.repo.owner, "WolfgangFahl");
    assert_eq!(action.repo.project_id, "scan2wiki");
    assert_eq!(action.run_id, 10557241724);
    assert_eq!(action.job_id, 29244366904);
    assert_eq!(
        action.log_id(),
        "WolfgangFahl_scan2wiki_10557241724_29244366904"
    );
}

#[test]
fn test_github_action_from_invalid_url() {
    let cases = [
        "https://github.com/WolfgangFahl/scan2wiki",
        "https://github.com/WolfgangFahl/scan2wiki/pull/5",
        "https://github.com/WolfgangFahl/scan2wiki/actions/runs/not_a_number/job/2",
        "https://example.com/foo/bar/actions/runs/1/job/2",
        "",
    ];
    for url in cases {
        assert!(
            GitHubAction::from_url(url).is_err(),
            "should reject {:?}",
            url
        );
    }
}

/// A saved log is read from disk without touching the API.
#[tokio::test]
async fn test_fetch_logs_from_saved_file() {
    let base = tempfile::tempdir().expect("tempdir");
    let api = GitHubApi::with_base_dir(base.path().to_path_buf(), 300).expect("api");
    let action = GitHubAction::from_url(
        "https://github.com/WolfgangFahl/scan2wiki/actions/runs/10557241724/job/29244366904",
    )
    .expect("should parse");

    let log_text = "FAIL: test_x (tests.TestX)\nAssertionError: boom\n\nFAILED (failures=1)\n";
    std::fs::write(action.log_file(&api), log_text).expect("seed log file");

    let logs = action.fetch_logs(&api).await.expect("should read saved log");
    assert_eq!(logs, log_text);

    let analysis = analyze_workflow_run(
        &api,
        &LogAnalyzer::new(),
        "https://github.com/WolfgangFahl/scan2wiki/actions/runs/10557241724/job/29244366904",
    )
    .await
    .expect("analysis should succeed");
    assert_eq!(analysis.build_status, "failed");
    assert_eq!(analysis.failed_tests.len(), 1);
    assert_eq!(analysis.failed_tests[0].error, "boom");
}

/// A fresh cache file is served without touching the API.
#[tokio::test]
async fn test_repos_for_owner_from_fresh_cache() {
    let base = tempfile::tempdir().expect("tempdir");
    let api = GitHubApi::with_base_dir(base.path().to_path_buf(), 300).expect("api");

    let cached = serde_json::json!([
        {"name": "pyOpenSourceProjects"},
        {"name": "scan2wiki"}
    ]);
    std::fs::write(
        api.cache_dir.join("WolfgangFahl_repos.json"),
        cached.to_string(),
    )
    .expect("seed cache file");

    let (cache_file, content, age) = api.repos_for_owner_from_cache("WolfgangFahl");
    assert!(cache_file.ends_with("WolfgangFahl_repos.json"));
    let content = content.expect("cache should be readable");
    assert_eq!(content.len(), 2);
    assert!(age.expect("cache should have an age") < 300);

    let repos = api
        .repos_for_owner("WolfgangFahl")
        .await
        .expect("should serve from cache");
    assert_eq!(repos.len(), 2);
    assert_eq!(
        repos[0].get("name").and_then(|v| v.as_str()),
        Some("pyOpenSourceProjects")
    );
}

#[test]
fn test_repos_for_owner_cache_miss() {
    let base = tempfile::tempdir().expect("tempdir");
    let api = GitHubApi::with_base_dir(base.path().to_path_buf(), 300).expect("api");

    let (_, content, age) = api.repos_for_owner_from_cache("nobody");
    assert_eq!(content, None);
    assert_eq!(age, None);
}

/// Live API test, run with --ignored when network access and rate-limit
/// headroom are available.
#[tokio::test]
#[ignore]
async fn test_analyze_workflow_run_live() {
    let api = GitHubApi::new().expect("api");
    let analysis = analyze_workflow_run(
        &api,
        &LogAnalyzer::new(),
        "https://github.com/WolfgangFahl/pyOnlineSpreadSheetEditing/actions/runs/10571934380/job/29288830929",
    )
    .await
    .expect("analysis should succeed");

    assert_eq!(analysis.build_status, "failed");
    assert_eq!(analysis.failed_tests.len(), 1);
}

/// Live API test for the paged repository listing.
#[tokio::test]
#[ignore]
async fn test_repos_for_owner_live() {
    let api = GitHubApi::new().expect("api");
    let repos = api
        .repos_for_owner("WolfgangFahl")
        .await
        .expect("should fetch repositories");
    assert!(!repos.is_empty());
}
