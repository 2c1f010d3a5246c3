use crate::error::{DashboardError, FetchError};
use crate::models::github::{CommitActivityWeek, Repository, SearchResult};
use crate::models::metrics::RepoId;
use crate::utils::patterns::last_page_from_link;
use chrono::{DateTime, SecondsFormat, Utc};
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, LINK, RETRY_AFTER, USER_AGENT};
use reqwest::{Response, StatusCode};
use serde::de::IgnoredAny;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Result of `/stats/commit_activity`, which GitHub computes lazily.
pub enum CommitActivity {
    Ready(Vec<CommitActivityWeek>),
    /// HTTP 202: statistics are still being generated.
    Pending,
}

#[derive(Debug, Clone, Copy)]
pub enum PullState {
    Open,
    Closed,
}

impl PullState {
    fn as_str(self) -> &'static str {
        match self {
            PullState::Open => "open",
            PullState::Closed => "closed",
        }
    }
}

pub struct GitHubClient {
    client: reqwest::Client,
    base_url: String,
}

impl GitHubClient {
    pub fn new(token: Option<String>, base_url: &str) -> Result<Self, DashboardError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("repo-dashboard"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static("2022-11-28"));

        if let Some(t) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", t))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Response, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {} {:?}", url, query);

        let response = self.client.get(&url).query(query).send().await?;
        check_status(response).await
    }

    /// Counts a list endpoint requested with `per_page=1`: the `rel="last"`
    /// page number is the item count, otherwise the body holds every item.
    async fn count_items(&self, path: &str, query: &[(&str, &str)]) -> Result<u64, FetchError> {
        let mut query = query.to_vec();
        query.push(("per_page", "1"));

        let response = self.get(path, &query).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(0);
        }

        let last_page = response
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .and_then(last_page_from_link);
        if let Some(count) = last_page {
            return Ok(count);
        }

        let items: Vec<IgnoredAny> = response.json().await?;
        Ok(items.len() as u64)
    }

    pub async fn get_repository(&self, repo: &RepoId) -> Result<Repository, FetchError> {
        let response = self.get(&format!("/repos/{}", repo), &[]).await?;
        let repository: Repository = response.json().await?;
        Ok(repository)
    }

    pub async fn count_contributors(&self, repo: &RepoId) -> Result<u64, FetchError> {
        self.count_items(&format!("/repos/{}/contributors", repo), &[("anon", "true")])
            .await
    }

    pub async fn count_pull_requests(&self, repo: &RepoId, state: PullState) -> Result<u64, FetchError> {
        self.count_items(&format!("/repos/{}/pulls", repo), &[("state", state.as_str())])
            .await
    }

    /// Uses the search API, whose quota is separate and much smaller:
    /// exhausting it yields `SearchRateLimited`, not `RateLimited`.
    pub async fn count_merged_pull_requests(&self, repo: &RepoId) -> Result<u64, FetchError> {
        let q = format!("repo:{} is:pr is:merged", repo);
        let response = self
            .get("/search/issues", &[("q", q.as_str()), ("per_page", "1")])
            .await?;
        let result: SearchResult = response.json().await?;
        Ok(result.total_count)
    }

    /// Issues *and* pull requests, in any state.
    pub async fn count_issue_items(&self, repo: &RepoId) -> Result<u64, FetchError> {
        self.count_items(&format!("/repos/{}/issues", repo), &[("state", "all")])
            .await
    }

    pub async fn get_commit_activity(&self, repo: &RepoId) -> Result<CommitActivity, FetchError> {
        let response = self
            .get(&format!("/repos/{}/stats/commit_activity", repo), &[])
            .await?;

        match response.status() {
            StatusCode::ACCEPTED => Ok(CommitActivity::Pending),
            StatusCode::NO_CONTENT => Ok(CommitActivity::Ready(Vec::new())),
            _ => Ok(CommitActivity::Ready(response.json().await?)),
        }
    }

    pub async fn count_commits_since(&self, repo: &RepoId, since: DateTime<Utc>) -> Result<u64, FetchError> {
        let since = since.to_rfc3339_opts(SecondsFormat::Secs, true);
        let result = self
            .count_items(&format!("/repos/{}/commits", repo), &[("since", since.as_str())])
            .await;

        match result {
            // 409: the repository has no commits at all
            Err(FetchError::Api { status: 409 }) => Ok(0),
            other => other,
        }
    }
}

async fn check_status(response: Response) -> Result<Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let headers = response.headers();
    let remaining = header_value::<u64>(headers, "x-ratelimit-remaining");
    let reset_at = header_value::<i64>(headers, "x-ratelimit-reset")
        .and_then(|ts| DateTime::from_timestamp(ts, 0));
    let retry_after = headers.contains_key(RETRY_AFTER);
    let resource = header_value::<String>(headers, "x-ratelimit-resource");
    let url = response.url().to_string();

    let error_text = response.text().await.unwrap_or_default();
    debug!("GitHub API error {} for {}: {}", status, url, error_text);

    match classify_status(status, remaining, retry_after, reset_at) {
        FetchError::RateLimited { reset_at } if resource.as_deref() == Some("search") => {
            Err(FetchError::SearchRateLimited { reset_at })
        }
        other => Err(other),
    }
}

fn classify_status(
    status: StatusCode,
    remaining: Option<u64>,
    retry_after: bool,
    reset_at: Option<DateTime<Utc>>,
) -> FetchError {
    match status {
        StatusCode::NOT_FOUND => FetchError::NotFound,
        StatusCode::TOO_MANY_REQUESTS => FetchError::RateLimited { reset_at },
        StatusCode::FORBIDDEN if remaining == Some(0) || retry_after => {
            FetchError::RateLimited { reset_at }
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FetchError::Forbidden {
            status: status.as_u16(),
        },
        _ => FetchError::Api {
            status: status.as_u16(),
        },
    }
}

fn header_value<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn hello_world() -> RepoId {
        RepoId::new("octocat", "Hello-World")
    }

    #[test]
    fn classifies_error_statuses() {
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND, None, false, None),
            FetchError::NotFound
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, Some(12), false, None),
            FetchError::Forbidden { status: 403 }
        ));
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, None, false, None),
            FetchError::Forbidden { status: 401 }
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, Some(0), false, None),
            FetchError::RateLimited { .. }
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, None, true, None),
            FetchError::RateLimited { .. }
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, None, false, None),
            FetchError::RateLimited { .. }
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, None, false, None),
            FetchError::Api { status: 502 }
        ));
    }

    #[tokio::test]
    async fn fetches_repository_with_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/repos/octocat/Hello-World")
            .match_header("authorization", "Bearer s3cret")
            .match_header("user-agent", "repo-dashboard")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"full_name": "octocat/Hello-World", "stargazers_count": 1500, "forks_count": 300, "language": "C"}"#)
            .create_async()
            .await;

        let client = GitHubClient::new(Some("s3cret".to_string()), &server.url()).unwrap();
        let repo = client.get_repository(&hello_world()).await.unwrap();

        assert_eq!(repo.stargazers_count, 1500);
        assert_eq!(repo.forks_count, 300);
        assert_eq!(repo.language.as_deref(), Some("C"));
    }

    #[tokio::test]
    async fn missing_repository_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/repos/octocat/Hello-World")
            .with_status(404)
            .with_body(r#"{"message": "Not Found"}"#)
            .create_async()
            .await;

        let client = GitHubClient::new(None, &server.url()).unwrap();
        let err = client.get_repository(&hello_world()).await.unwrap_err();
        assert!(matches!(err, FetchError::NotFound));
    }

    #[tokio::test]
    async fn exhausted_quota_is_rate_limited_with_reset_time() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/repos/octocat/Hello-World")
            .with_status(403)
            .with_header("x-ratelimit-remaining", "0")
            .with_header("x-ratelimit-reset", "1718452800")
            .with_body(r#"{"message": "API rate limit exceeded"}"#)
            .create_async()
            .await;

        let client = GitHubClient::new(None, &server.url()).unwrap();
        let err = client.get_repository(&hello_world()).await.unwrap_err();
        match err {
            FetchError::RateLimited { reset_at } => {
                assert_eq!(reset_at, DateTime::from_timestamp(1718452800, 0));
            }
            other => panic!("expected rate limit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn counts_from_last_page_link() {
        let mut server = mockito::Server::new_async().await;
        let link = format!(
            r#"<{0}/repos/octocat/Hello-World/contributors?anon=true&per_page=1&page=2>; rel="next", <{0}/repos/octocat/Hello-World/contributors?anon=true&per_page=1&page=42>; rel="last""#,
            server.url()
        );
        let _m = server
            .mock("GET", "/repos/octocat/Hello-World/contributors")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("per_page".into(), "1".into()),
                Matcher::UrlEncoded("anon".into(), "true".into()),
            ]))
            .with_status(200)
            .with_header("link", &link)
            .with_body(r#"[{"login": "octocat", "contributions": 32}]"#)
            .create_async()
            .await;

        let client = GitHubClient::new(None, &server.url()).unwrap();
        assert_eq!(client.count_contributors(&hello_world()).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn counts_body_without_link_header() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/repos/octocat/Hello-World/pulls")
            .match_query(Matcher::UrlEncoded("state".into(), "open".into()))
            .with_status(200)
            .with_body(r#"[{"number": 7, "state": "open"}]"#)
            .create_async()
            .await;

        let client = GitHubClient::new(None, &server.url()).unwrap();
        let count = client
            .count_pull_requests(&hello_world(), PullState::Open)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn empty_repository_has_no_contributors() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/repos/octocat/Hello-World/contributors")
            .match_query(Matcher::Any)
            .with_status(204)
            .create_async()
            .await;

        let client = GitHubClient::new(None, &server.url()).unwrap();
        assert_eq!(client.count_contributors(&hello_world()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn merged_count_comes_from_search() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/search/issues")
            .match_query(Matcher::UrlEncoded(
                "q".into(),
                "repo:octocat/Hello-World is:pr is:merged".into(),
            ))
            .with_status(200)
            .with_body(r#"{"total_count": 17, "incomplete_results": false, "items": []}"#)
            .create_async()
            .await;

        let client = GitHubClient::new(None, &server.url()).unwrap();
        assert_eq!(
            client.count_merged_pull_requests(&hello_world()).await.unwrap(),
            17
        );
    }

    #[tokio::test]
    async fn exhausted_search_quota_is_not_a_core_rate_limit() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/search/issues")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_header("x-ratelimit-remaining", "0")
            .with_header("x-ratelimit-resource", "search")
            .with_header("x-ratelimit-reset", "1718452800")
            .with_body(r#"{"message": "API rate limit exceeded"}"#)
            .create_async()
            .await;

        let client = GitHubClient::new(None, &server.url()).unwrap();
        let err = client
            .count_merged_pull_requests(&hello_world())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::SearchRateLimited { reset_at: Some(_) }));
    }

    #[tokio::test]
    async fn commit_activity_still_computing() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/repos/octocat/Hello-World/stats/commit_activity")
            .with_status(202)
            .with_body("{}")
            .create_async()
            .await;

        let client = GitHubClient::new(None, &server.url()).unwrap();
        let activity = client.get_commit_activity(&hello_world()).await.unwrap();
        assert!(matches!(activity, CommitActivity::Pending));
    }

    #[tokio::test]
    async fn commits_of_empty_repository_count_zero() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/repos/octocat/Hello-World/commits")
            .match_query(Matcher::Any)
            .with_status(409)
            .with_body(r#"{"message": "Git Repository is empty."}"#)
            .create_async()
            .await;

        let client = GitHubClient::new(None, &server.url()).unwrap();
        let since = DateTime::from_timestamp(1718452800, 0).unwrap();
        assert_eq!(
            client.count_commits_since(&hello_world(), since).await.unwrap(),
            0
        );
    }
}
