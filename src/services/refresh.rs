use crate::error::{DashboardError, FetchError};
use crate::models::metrics::{RepoId, RepositoryMetricsRecord};
use crate::services::config::RepositoryListStore;
use crate::services::fetcher::MetricsSource;
use crate::services::staleness::is_stale;
use crate::services::store::MetricsStore;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use std::collections::HashMap;

#[derive(Debug)]
pub enum RefreshOutcome {
    /// Last refresh is within the staleness threshold; nothing fetched.
    UpToDate { last_update: DateTime<Utc> },
    Refreshed {
        written: usize,
        skipped: Vec<(RepoId, FetchError)>,
    },
}

/// Runs one refresh: staleness gate, repository list, sequential fetch,
/// then a full rewrite of the stored rows and the timestamp.
///
/// Skipped repositories (not found, forbidden, other API errors) do not
/// fail the run. A rate limit stops it: rows fetched so far are written
/// alongside the previous rows of repositories not reached yet, and the
/// timestamp is left alone so the next run retries.
pub async fn refresh<S, R, M>(
    source: &S,
    repos: &R,
    store: &M,
    now: DateTime<Utc>,
    force: bool,
) -> Result<RefreshOutcome, DashboardError>
where
    S: MetricsSource,
    R: RepositoryListStore,
    M: MetricsStore,
{
    let last_update = store.last_update()?;
    if !force {
        if let Some(last) = last_update.filter(|&last| !is_stale(Some(last), now)) {
            info!("Data is up to date (last refreshed {})", last.to_rfc3339());
            return Ok(RefreshOutcome::UpToDate { last_update: last });
        }
    }

    let repo_list = repos.load_repositories()?;
    info!("Collecting data for {} repositories", repo_list.len());

    let mut fetched = Vec::with_capacity(repo_list.len());
    let mut skipped = Vec::new();
    let mut stopped = None;

    for (idx, repo) in repo_list.iter().enumerate() {
        info!("[{}/{}] Fetching {}", idx + 1, repo_list.len(), repo);

        match source.fetch(repo, now).await {
            Ok(record) => fetched.push(record),
            Err(FetchError::RateLimited { reset_at }) => {
                error!("Rate limited while fetching {}; stopping", repo);
                stopped = Some((idx, reset_at));
                break;
            }
            Err(e) => {
                warn!("Skipping {}: {}", repo, e);
                skipped.push((repo.clone(), e));
            }
        }
    }

    if let Some((idx, reset_at)) = stopped {
        let pending = &repo_list[idx..];
        if !fetched.is_empty() {
            let rows = keep_unreached_rows(fetched, store.load_records()?, pending);
            store.save_records(&rows)?;
            info!("Saved partial results to {}", store.location());
        }
        return Err(DashboardError::RateLimited {
            reset_at,
            pending: pending.iter().map(ToString::to_string).collect(),
        });
    }

    if fetched.is_empty() {
        return Err(DashboardError::NothingFetched);
    }

    store.save_records(&fetched)?;
    store.set_last_update(now)?;
    info!(
        "Data collection complete: {} written, {} skipped, saved to {}",
        fetched.len(),
        skipped.len(),
        store.location()
    );

    Ok(RefreshOutcome::Refreshed {
        written: fetched.len(),
        skipped,
    })
}

/// Fresh rows first, then the previous rows of repositories the run never reached.
fn keep_unreached_rows(
    fetched: Vec<RepositoryMetricsRecord>,
    previous: Vec<RepositoryMetricsRecord>,
    pending: &[RepoId],
) -> Vec<RepositoryMetricsRecord> {
    let mut previous: HashMap<String, RepositoryMetricsRecord> = previous
        .into_iter()
        .map(|record| (record.repo.clone(), record))
        .collect();

    let mut rows = fetched;
    for repo in pending {
        if let Some(row) = previous.remove(&repo.to_string()) {
            rows.push(row);
        }
    }
    rows
}
