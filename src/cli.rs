use crate::services::config::DEFAULT_REPOS_FILE;
use crate::services::store::DEFAULT_DATA_DIR;
use clap::{ArgGroup, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "repo-dashboard",
    version,
    about = "Track metrics for multiple public GitHub repositories",
    long_about = "Collects stars, forks, contributors, issues, pull requests and recent commit \
                  activity for a list of GitHub repositories and saves them to CSV. \
                  Data is refreshed automatically once it is 7 days old.",
    group(ArgGroup::new("action").args(["update", "show", "summary", "init"]).multiple(false))
)]
pub struct Cli {
    /// Force a refresh, ignoring the 7-day cycle
    #[arg(long)]
    pub update: bool,

    /// Print the stored metrics as a table, followed by the summary
    #[arg(long)]
    pub show: bool,

    /// Print summary statistics of the stored metrics
    #[arg(long)]
    pub summary: bool,

    /// Write an example repository list if none exists yet
    #[arg(long)]
    pub init: bool,

    /// GitHub personal access token (optional, raises the rate limit)
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// File listing repositories to track, one owner/name per line
    #[arg(long, env = "REPOS_FILE", default_value = DEFAULT_REPOS_FILE)]
    pub repos: PathBuf,

    /// Directory holding the CSV data and the last-update timestamp
    #[arg(long, env = "DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Update,
    Show,
    Summary,
    Init,
    /// Refresh if stale, then show the table.
    Auto,
}

impl Cli {
    pub fn action(&self) -> Action {
        if self.update {
            Action::Update
        } else if self.show {
            Action::Show
        } else if self.summary {
            Action::Summary
        } else if self.init {
            Action::Init
        } else {
            Action::Auto
        }
    }
}
