use crate::error::FetchError;
use crate::models::github::{CommitActivityWeek, Repository};
use crate::models::metrics::{IssueCounts, PullRequestCounts, RepoId, RepositoryMetricsRecord};
use crate::services::github::{CommitActivity, GitHubClient, PullState};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use log::{debug, warn};

/// Days counted by `recent_commits_30d`, today included.
pub const RECENT_COMMIT_DAYS: i64 = 30;

/// Something that can produce a metrics row for one repository.
#[allow(async_fn_in_trait)]
pub trait MetricsSource {
    async fn fetch(&self, repo: &RepoId, now: DateTime<Utc>) -> Result<RepositoryMetricsRecord, FetchError>;
}

/// Raw endpoint results for one repository, before derivation.
pub struct RawMetrics {
    pub repository: Repository,
    pub contributors: u64,
    pub pull_requests: PullRequestCounts,
    /// `/issues?state=all` count, pull requests included.
    pub issue_items: u64,
    pub recent_commits: u64,
}

impl MetricsSource for GitHubClient {
    async fn fetch(&self, repo: &RepoId, now: DateTime<Utc>) -> Result<RepositoryMetricsRecord, FetchError> {
        let repository = self.get_repository(repo).await?;
        if !repository.full_name.eq_ignore_ascii_case(&repo.to_string()) {
            debug!("{} now resolves to {}", repo, repository.full_name);
        }

        let contributors = or_zero(self.count_contributors(repo).await, repo, "contributors")?;
        let open_prs = or_zero(
            self.count_pull_requests(repo, PullState::Open).await,
            repo,
            "open pull requests",
        )?;
        let closed_prs = or_zero(
            self.count_pull_requests(repo, PullState::Closed).await,
            repo,
            "closed pull requests",
        )?;
        let merged_prs = or_zero(self.count_merged_pull_requests(repo).await, repo, "merged pull requests")?;
        let issue_items = or_zero(self.count_issue_items(repo).await, repo, "issues")?;
        let recent_commits = or_zero(recent_commits(self, repo, now).await, repo, "recent commits")?;

        let raw = RawMetrics {
            repository,
            contributors,
            pull_requests: PullRequestCounts::new(open_prs, closed_prs, merged_prs),
            issue_items,
            recent_commits,
        };
        Ok(build_record(repo, raw, now))
    }
}

async fn recent_commits(client: &GitHubClient, repo: &RepoId, now: DateTime<Utc>) -> Result<u64, FetchError> {
    match client.get_commit_activity(repo).await? {
        CommitActivity::Ready(weeks) => Ok(sum_recent_commits(&weeks, now.date_naive())),
        CommitActivity::Pending => {
            debug!("Commit statistics for {} not ready, listing commits instead", repo);
            client
                .count_commits_since(repo, now - Duration::days(RECENT_COMMIT_DAYS))
                .await
        }
    }
}

/// Once the repository itself resolved, a single failing count endpoint
/// (issues disabled, contributor list too large, search quota spent)
/// records 0 for that metric. Core rate limits and transport errors
/// still propagate.
fn or_zero(result: Result<u64, FetchError>, repo: &RepoId, metric: &str) -> Result<u64, FetchError> {
    match result {
        Err(
            e @ (FetchError::NotFound
            | FetchError::Forbidden { .. }
            | FetchError::Api { .. }
            | FetchError::SearchRateLimited { .. }),
        ) => {
            warn!("{}: could not count {} ({}); recording 0", repo, metric, e);
            Ok(0)
        }
        other => other,
    }
}

/// Maps raw endpoint results into a row.
///
/// GitHub counts pull requests as issues, both in `open_issues_count` and
/// in `/issues`, so pull request counts are subtracted from both.
pub fn build_record(repo: &RepoId, raw: RawMetrics, now: DateTime<Utc>) -> RepositoryMetricsRecord {
    let prs = raw.pull_requests;
    let issues = IssueCounts::from_open_and_total(
        raw.repository.open_issues_count.saturating_sub(prs.open),
        raw.issue_items.saturating_sub(prs.total),
    );

    RepositoryMetricsRecord {
        repo: repo.to_string(),
        stars: raw.repository.stargazers_count,
        forks: raw.repository.forks_count,
        watchers: raw.repository.watchers_count,
        contributors: raw.contributors,
        open_issues: issues.open,
        total_issues: issues.total,
        closed_issues: issues.closed,
        open_prs: prs.open,
        total_prs: prs.total,
        closed_prs: prs.closed,
        merged_prs: prs.merged,
        recent_commits_30d: raw.recent_commits,
        size_kb: raw.repository.size,
        language: raw.repository.language,
        created_at: raw.repository.created_at,
        updated_at: raw.repository.updated_at,
        last_fetched: now,
    }
}

/// Sums daily commit counts over `[today - 29 days, today]`.
pub fn sum_recent_commits(weeks: &[CommitActivityWeek], today: NaiveDate) -> u64 {
    let window_start = today - Duration::days(RECENT_COMMIT_DAYS - 1);

    weeks
        .iter()
        .filter_map(|week| {
            DateTime::from_timestamp(week.week, 0).map(|start| (start.date_naive(), &week.days))
        })
        .flat_map(|(start, days)| {
            days.iter()
                .enumerate()
                .map(move |(offset, count)| (start + Duration::days(offset as i64), *count))
        })
        .filter(|(day, _)| *day >= window_start && *day <= today)
        .map(|(_, count)| count)
        .sum()
}
