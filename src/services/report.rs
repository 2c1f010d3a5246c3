use crate::models::metrics::{DashboardSummary, RepositoryMetricsRecord};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tabled::settings::object::Columns;
use tabled::settings::{Alignment, Modify, Style, Width};
use tabled::{Table, Tabled};

pub const NO_DATA_MESSAGE: &str =
    "No data available. Run with --update to fetch repository metrics.";

const REPO_COLUMN_WIDTH: usize = 30;
const LANGUAGE_COLUMN_WIDTH: usize = 15;

#[derive(Tabled)]
struct TableRow {
    #[tabled(rename = "Repository")]
    repo: String,
    #[tabled(rename = "Stars")]
    stars: u64,
    #[tabled(rename = "Forks")]
    forks: u64,
    #[tabled(rename = "Contributors")]
    contributors: u64,
    #[tabled(rename = "Open Issues")]
    open_issues: u64,
    #[tabled(rename = "Open PRs")]
    open_prs: u64,
    #[tabled(rename = "Commits 30d")]
    recent_commits: u64,
    #[tabled(rename = "Language")]
    language: String,
}

impl From<&RepositoryMetricsRecord> for TableRow {
    fn from(record: &RepositoryMetricsRecord) -> Self {
        Self {
            repo: record.repo.clone(),
            stars: record.stars,
            forks: record.forks,
            contributors: record.contributors,
            open_issues: record.open_issues,
            open_prs: record.open_prs,
            recent_commits: record.recent_commits_30d,
            language: record.language.clone().unwrap_or_else(|| "Unknown".to_string()),
        }
    }
}

pub fn render_table(records: &[RepositoryMetricsRecord]) -> String {
    if records.is_empty() {
        return NO_DATA_MESSAGE.to_string();
    }

    let mut table = Table::new(records.iter().map(TableRow::from));
    table
        .with(Style::rounded())
        .with(Modify::new(Columns::single(0)).with(Width::truncate(REPO_COLUMN_WIDTH).suffix("…")))
        .with(Modify::new(Columns::single(7)).with(Width::truncate(LANGUAGE_COLUMN_WIDTH).suffix("…")))
        .with(Modify::new(Columns::new(1..7)).with(Alignment::right()));
    table.to_string()
}

pub fn summarize(
    records: &[RepositoryMetricsRecord],
    last_update: Option<DateTime<Utc>>,
    data_file: String,
) -> DashboardSummary {
    let total_stars: u64 = records.iter().map(|r| r.stars).sum();
    let total_forks: u64 = records.iter().map(|r| r.forks).sum();
    let total_contributors: u64 = records.iter().map(|r| r.contributors).sum();

    let mut languages = BTreeMap::new();
    for record in records {
        let language = record.language.clone().unwrap_or_else(|| "Unknown".to_string());
        *languages.entry(language).or_insert(0) += 1;
    }

    let most_starred = records
        .iter()
        .max_by_key(|r| r.stars)
        .map(|r| (r.repo.clone(), r.stars));

    DashboardSummary {
        total_repositories: records.len(),
        total_stars,
        total_forks,
        total_contributors,
        total_open_issues: records.iter().map(|r| r.open_issues).sum(),
        total_open_prs: records.iter().map(|r| r.open_prs).sum(),
        total_merged_prs: records.iter().map(|r| r.merged_prs).sum(),
        total_recent_commits: records.iter().map(|r| r.recent_commits_30d).sum(),
        average_stars: average(total_stars, records.len()),
        average_forks: average(total_forks, records.len()),
        average_contributors: average(total_contributors, records.len()),
        most_starred,
        languages,
        last_update,
        data_file,
    }
}

pub fn render_summary(summary: &DashboardSummary) -> String {
    if summary.total_repositories == 0 {
        return NO_DATA_MESSAGE.to_string();
    }

    let mut out = String::from("GitHub Dashboard Summary\n");
    out.push_str(&format!("Total Repositories: {}\n", summary.total_repositories));
    out.push_str(&format!(
        "Total Stars: {} (avg {:.1})\n",
        thousands(summary.total_stars),
        summary.average_stars
    ));
    out.push_str(&format!(
        "Total Forks: {} (avg {:.1})\n",
        thousands(summary.total_forks),
        summary.average_forks
    ));
    out.push_str(&format!(
        "Total Contributors: {} (avg {:.1})\n",
        thousands(summary.total_contributors),
        summary.average_contributors
    ));
    out.push_str(&format!("Open Issues: {}\n", thousands(summary.total_open_issues)));
    out.push_str(&format!("Open PRs: {}\n", thousands(summary.total_open_prs)));
    out.push_str(&format!("Merged PRs: {}\n", thousands(summary.total_merged_prs)));
    out.push_str(&format!("Commits (30d): {}\n", thousands(summary.total_recent_commits)));

    if let Some((repo, stars)) = &summary.most_starred {
        out.push_str(&format!("Most Starred: {} ({})\n", repo, thousands(*stars)));
    }

    let languages = summary
        .languages
        .iter()
        .map(|(language, count)| format!("{} ({})", language, count))
        .collect::<Vec<_>>()
        .join(", ");
    out.push_str(&format!("Languages: {}\n", languages));

    let last_update = summary
        .last_update
        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    out.push_str(&format!("Last Updated: {}\n", last_update));
    out.push_str(&format!("Data File: {}", summary.data_file));

    out
}

fn average(total: u64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}

fn thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
