use crate::error::DashboardError;
use crate::services::config::{FileRepositoryList, RepositoryListStore};
use crate::services::fetcher::MetricsSource;
use crate::services::refresh::{refresh, RefreshOutcome};
use crate::services::report::{render_summary, render_table, summarize};
use crate::services::store::MetricsStore;
use chrono::Utc;
use log::{info, warn};

/// `--show`: the stored rows as a table, then the summary.
pub fn show<M: MetricsStore>(store: &M) -> Result<String, DashboardError> {
    let records = store.load_records()?;
    let mut out = render_table(&records);

    if !records.is_empty() {
        let summary = summarize(&records, store.last_update()?, store.location());
        out.push_str("\n\n");
        out.push_str(&render_summary(&summary));
    }
    Ok(out)
}

/// `--summary`: aggregate statistics only.
pub fn summary<M: MetricsStore>(store: &M) -> Result<String, DashboardError> {
    let records = store.load_records()?;
    let summary = summarize(&records, store.last_update()?, store.location());
    Ok(render_summary(&summary))
}

/// Refreshes (when stale or forced) and describes what happened.
pub async fn update<S, R, M>(source: &S, repos: &R, store: &M, force: bool) -> Result<String, DashboardError>
where
    S: MetricsSource,
    R: RepositoryListStore,
    M: MetricsStore,
{
    let message = match refresh(source, repos, store, Utc::now(), force).await? {
        RefreshOutcome::UpToDate { last_update } => format!(
            "Data is up to date (last updated {}). Use --update to refresh anyway.",
            last_update.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        RefreshOutcome::Refreshed { written, skipped } => {
            let mut message = format!(
                "Data collection complete: {} repositories saved to {}",
                written,
                store.location()
            );
            if !skipped.is_empty() {
                let names: Vec<String> = skipped
                    .iter()
                    .map(|(repo, e)| format!("{} ({})", repo, e))
                    .collect();
                warn!("{} repositories were skipped", skipped.len());
                message.push_str(&format!("\nSkipped: {}", names.join(", ")));
            }
            message
        }
    };
    Ok(message)
}

/// Default mode: refresh when stale, then show whatever is stored. The
/// table is printed even when the refresh failed; the error is returned
/// alongside so the caller can still exit non-zero.
pub async fn auto<S, R, M>(source: &S, repos: &R, store: &M) -> (String, Result<(), DashboardError>)
where
    S: MetricsSource,
    R: RepositoryListStore,
    M: MetricsStore,
{
    let mut out = String::new();
    let refreshed = match update(source, repos, store, false).await {
        Ok(message) => {
            out.push_str(&message);
            out.push_str("\n\n");
            Ok(())
        }
        Err(e) => {
            warn!("Refresh failed: {}", e);
            Err(e)
        }
    };

    match show(store) {
        Ok(current) => out.push_str(&current),
        Err(e) => return (out, refreshed.and(Err(e))),
    }
    (out, refreshed)
}

/// `--init`: seeds the repository list for first-time users.
pub fn init(repos: &FileRepositoryList) -> Result<String, DashboardError> {
    let message = if repos.init_example()? {
        format!(
            "Wrote example repositories to {}; edit it and run with --update",
            repos.path().display()
        )
    } else {
        info!("Repository list already present");
        format!("{} already lists repositories; nothing to do", repos.path().display())
    };
    Ok(message)
}
