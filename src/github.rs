use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::analysis::{LogAnalyzer, WorkflowRunAnalysis};
use crate::settings;

lazy_static! {
    // https://www.rfc-editor.org/rfc/rfc3986#appendix-B
    static ref REPO_URL: Regex = Regex::new(
        r"(?:(?:https?://github\.com/)|(?:git@github\.com:))(?P<owner>[^/?#]+)/(?P<project_id>[^./?#]+)(?:\.git)?"
    )
    .unwrap();
}

/// GitHub API client. Explicitly constructed and passed to callers that need
/// it; owns the access token, the HTTP client and the on-disk cache layout.
pub struct GitHubApi {
    pub api_url: String,
    pub cache_dir: PathBuf,
    pub log_dir: PathBuf,
    /// Maximum age in seconds before a cached API response is refreshed.
    pub cache_expiry_secs: u64,
    access_token: Option<String>,
    client: reqwest::Client,
}

impl GitHubApi {
    /// Client rooted at `~/.github` with the default 5 minute cache expiry.
    pub fn new() -> Result<Self, String> {
        Self::with_base_dir(settings::base_dir(), 300)
    }

    /// Client rooted at an explicit directory, for tests and embedding.
    pub fn with_base_dir(base_dir: PathBuf, cache_expiry_secs: u64) -> Result<Self, String> {
        let cache_dir = base_dir.join("cache");
        fs::create_dir_all(&cache_dir)
            .map_err(|e| format!("Failed to create cache dir {:?}: {}", cache_dir, e))?;
        let log_dir = base_dir.join("log");
        fs::create_dir_all(&log_dir)
            .map_err(|e| format!("Failed to create log dir {:?}: {}", log_dir, e))?;
        let access_token = settings::load_access_token(&base_dir);
        let client = reqwest::Client::builder()
            .user_agent("ci-reviewer")
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            api_url: "https://api.github.com".to_string(),
            cache_dir,
            log_dir,
            cache_expiry_secs,
            access_token,
            client,
        })
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.get(url);
        if let Some(token) = &self.access_token {
            builder = builder.header("Authorization", format!("token {}", token));
        }
        builder
    }

    /// GET a JSON document from the GitHub API.
    pub async fn get_json(
        &self,
        title: &str,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<serde_json::Value, String> {
        let resp = self
            .request(url)
            .query(params)
            .send()
            .await
            .map_err(|e| format!("Failed to {} for {}: {}", title, url, e))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(format!("Failed to {} for {}: {} - {}", title, url, status, body));
        }
        resp.json()
            .await
            .map_err(|e| format!("Failed to parse {} response for {}: {}", title, url, e))
    }

    /// GET a text document from the GitHub API, following redirects (job log
    /// downloads redirect to blob storage). The collaborator contract: raw
    /// bytes are decoded here and any UTF-8 byte-order mark is stripped
    /// before the text reaches the analysis engine.
    pub async fn get_text(&self, title: &str, url: &str) -> Result<String, String> {
        let resp = self
            .request(url)
            .send()
            .await
            .map_err(|e| format!("Failed to {} for {}: {}", title, url, e))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(format!("Failed to {} for {}: {} - {}", title, url, status, body));
        }
        let text = resp
            .text()
            .await
            .map_err(|e| format!("Failed to read {} response for {}: {}", title, url, e))?;
        Ok(text.strip_prefix('\u{feff}').unwrap_or(&text).to_string())
    }

    /// All repositories of an owner, served from the cache when it is younger
    /// than the configured expiry, fetched and re-cached otherwise.
    pub async fn repos_for_owner(&self, owner: &str) -> Result<Vec<serde_json::Value>, String> {
        let (cache_file, cache_content, cache_age) = self.repos_for_owner_from_cache(owner);
        if let Some(repos) = cache_content {
            if cache_age.map_or(true, |age| age < self.cache_expiry_secs) {
                return Ok(repos);
            }
        }

        let repos = self.repos_for_owner_via_api(owner).await?;
        let json = serde_json::to_string(&repos)
            .map_err(|e| format!("Failed to serialize repo cache for {}: {}", owner, e))?;
        fs::write(&cache_file, json)
            .map_err(|e| format!("Failed to write repo cache {:?}: {}", cache_file, e))?;
        Ok(repos)
    }

    /// Cache lookup for [`repos_for_owner`]: the cache file path, the cached
    /// repositories if a readable cache exists, and its age in seconds.
    ///
    /// [`repos_for_owner`]: GitHubApi::repos_for_owner
    pub fn repos_for_owner_from_cache(
        &self,
        owner: &str,
    ) -> (PathBuf, Option<Vec<serde_json::Value>>, Option<u64>) {
        let cache_file = self.cache_dir.join(format!("{}_repos.json", owner));
        let cache_age = fs::metadata(&cache_file)
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .map(|age| age.as_secs());
        let cache_content = fs::read_to_string(&cache_file)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok());
        (cache_file, cache_content, cache_age)
    }

    /// All repositories of an owner directly from the API, paged 100 at a time.
    pub async fn repos_for_owner_via_api(
        &self,
        owner: &str,
    ) -> Result<Vec<serde_json::Value>, String> {
        let url = format!("{}/users/{}/repos", self.api_url, owner);
        let mut all_repos = Vec::new();
        let mut page: u32 = 1;

        loop {
            let params = [
                ("type", "all".to_string()),
                ("per_page", "100".to_string()),
                ("page", page.to_string()),
            ];
            let response = self.get_json("fetch repositories", &url, &params).await?;
            let repos = match response.as_array() {
                Some(repos) if !repos.is_empty() => repos.clone(),
                _ => break,
            };
            all_repos.extend(repos);
            page += 1;
        }

        Ok(all_repos)
    }
}

/// A GitHub repository address.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GitHubRepo {
    pub owner: String,
    pub project_id: String,
}

impl GitHubRepo {
    /// Resolve a project URL (https, http or `git@github.com:` form) to its
    /// owner and project name. `None` for anything else.
    pub fn from_url(url: &str) -> Option<Self> {
        let caps = REPO_URL.captures(url)?;
        let owner = caps.name("owner")?.as_str().to_string();
        let project_id = caps.name("project_id")?.as_str().to_string();
        Some(Self { owner, project_id })
    }

    pub fn project_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.project_id)
    }

    /// Newest workflow run of this repository, `None` when it has no runs.
    pub async fn latest_workflow_run(
        &self,
        api: &GitHubApi,
    ) -> Result<Option<serde_json::Value>, String> {
        let url = format!(
            "{}/repos/{}/{}/actions/runs",
            api.api_url, self.owner, self.project_id
        );
        let response = api.get_json("fetch latest workflow run", &url, &[]).await?;
        let run = response
            .get("workflow_runs")
            .and_then(|runs| runs.as_array())
            .and_then(|runs| runs.first())
            .cloned();
        Ok(run)
    }
}

/// One GitHub Actions job, addressed by repository, run id and job id.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GitHubAction {
    pub repo: GitHubRepo,
    pub run_id: u64,
    pub job_id: u64,
}

impl GitHubAction {
    /// Parse a GitHub Actions job URL of the form
    /// `https://github.com/{owner}/{project}/actions/runs/{run_id}/job/{job_id}`.
    pub fn from_url(url: &str) -> Result<Self, String> {
        let path = url
            .splitn(2, "github.com")
            .nth(1)
            .ok_or("Invalid GitHub Actions URL format")?;
        let path = path
            .split(|c| c == '?' || c == '#')
            .next()
            .unwrap_or(path);
        let parts: Vec<&str> = path
            .trim_start_matches(|c| c == ':' || c == '/')
            .split('/')
            .collect();
        // parts: owner / project / actions / runs / run_id / job / job_id
        if parts.len() < 7 || parts[2] != "actions" || parts[3] != "runs" || parts[5] != "job" {
            return Err("Invalid GitHub Actions URL format".to_string());
        }
        let run_id = parts[4]
            .parse()
            .map_err(|e| format!("Failed to parse GitHub Actions URL: {}", e))?;
        let job_id = parts[6]
            .parse()
            .map_err(|e| format!("Failed to parse GitHub Actions URL: {}", e))?;
        Ok(Self {
            repo: GitHubRepo {
                owner: parts[0].to_string(),
                project_id: parts[1].to_string(),
            },
            run_id,
            job_id,
        })
    }

    pub fn log_id(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.repo.owner, self.repo.project_id, self.run_id, self.job_id
        )
    }

    /// Local cache file for this job's log.
    pub fn log_file(&self, api: &GitHubApi) -> PathBuf {
        api.log_dir.join(format!("action_log_{}.txt", self.log_id()))
    }

    /// The log text for this job: the local copy when one exists, fetched
    /// from the API and saved locally otherwise.
    pub async fn fetch_logs(&self, api: &GitHubApi) -> Result<String, String> {
        let log_file = self.log_file(api);
        if log_file.exists() {
            return fs::read_to_string(&log_file)
                .map_err(|e| format!("Failed to read saved log {:?}: {}", log_file, e));
        }

        let url = format!(
            "{}/repos/{}/{}/actions/jobs/{}/logs",
            api.api_url, self.repo.owner, self.repo.project_id, self.job_id
        );
        let log_content = api.get_text("fetch job logs", &url).await?;
        if let Err(e) = fs::write(&log_file, &log_content) {
            eprintln!("Failed to save log {:?}: {}", log_file, e);
        }
        Ok(log_content)
    }
}

/// Analyze one GitHub Actions workflow run end to end: resolve the job URL,
/// obtain the log text (local copy or API) and hand it to the analyzer.
pub async fn analyze_workflow_run(
    api: &GitHubApi,
    analyzer: &LogAnalyzer,
    url: &str,
) -> Result<WorkflowRunAnalysis, String> {
    let action = GitHubAction::from_url(url)?;
    let logs = action.fetch_logs(api).await?;
    Ok(analyzer.analyze(&logs))
}
