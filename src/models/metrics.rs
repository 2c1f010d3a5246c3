use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// A repository reference in `owner/name` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// One CSV row. Field order is the column order of the data file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryMetricsRecord {
    pub repo: String,
    pub stars: u64,
    pub forks: u64,
    pub watchers: u64,
    pub contributors: u64,
    pub open_issues: u64,
    pub total_issues: u64,
    pub closed_issues: u64,
    pub open_prs: u64,
    pub total_prs: u64,
    pub closed_prs: u64,
    pub merged_prs: u64,
    pub recent_commits_30d: u64,
    pub size_kb: u64,
    pub language: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub last_fetched: DateTime<Utc>,
}

pub const CSV_COLUMNS: [&str; 18] = [
    "repo",
    "stars",
    "forks",
    "watchers",
    "contributors",
    "open_issues",
    "total_issues",
    "closed_issues",
    "open_prs",
    "total_prs",
    "closed_prs",
    "merged_prs",
    "recent_commits_30d",
    "size_kb",
    "language",
    "created_at",
    "updated_at",
    "last_fetched",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IssueCounts {
    pub open: u64,
    pub closed: u64,
    pub total: u64,
}

impl IssueCounts {
    /// Builds counts that always satisfy `total = open + closed`; a total
    /// smaller than `open` (counts taken at slightly different moments)
    /// is raised to `open`.
    pub fn from_open_and_total(open: u64, total: u64) -> Self {
        let closed = total.saturating_sub(open);
        Self {
            open,
            closed,
            total: open + closed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PullRequestCounts {
    pub open: u64,
    pub closed: u64,
    pub merged: u64,
    pub total: u64,
}

impl PullRequestCounts {
    pub fn new(open: u64, closed: u64, merged: u64) -> Self {
        Self {
            open,
            closed,
            merged: merged.min(closed),
            total: open + closed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    pub total_repositories: usize,
    pub total_stars: u64,
    pub total_forks: u64,
    pub total_contributors: u64,
    pub total_open_issues: u64,
    pub total_open_prs: u64,
    pub total_merged_prs: u64,
    pub total_recent_commits: u64,
    pub average_stars: f64,
    pub average_forks: f64,
    pub average_contributors: f64,
    pub most_starred: Option<(String, u64)>,
    pub languages: BTreeMap<String, usize>,
    pub last_update: Option<DateTime<Utc>>,
    pub data_file: String,
}
