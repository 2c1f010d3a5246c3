use serde::Deserialize;
use chrono::{DateTime, Utc};

#[derive(Debug, Deserialize)]
pub struct Repository {
    pub full_name: String,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub watchers_count: u64,
    /// Open issues *and* open pull requests.
    #[serde(default)]
    pub open_issues_count: u64,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub total_count: u64,
}

/// One bucket of `/stats/commit_activity`. `week` is the Unix timestamp
/// of the first day; `days` starts on that day.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitActivityWeek {
    pub week: i64,
    #[serde(default)]
    pub days: Vec<u64>,
}
