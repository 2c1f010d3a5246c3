use crate::error::DashboardError;
use crate::models::metrics::RepoId;
use crate::utils::patterns::parse_repo_entry;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const DEFAULT_REPOS_FILE: &str = "env/repos.txt";

const EXAMPLE_REPOS: &str = "\
# Repositories to track, one owner/name per line.
# Lines starting with # are ignored.
rust-lang/rust
tokio-rs/tokio
serde-rs/serde
";

/// Source of the list of repositories to track.
pub trait RepositoryListStore {
    fn load_repositories(&self) -> Result<Vec<RepoId>, DashboardError>;
}

pub struct FileRepositoryList {
    path: PathBuf,
}

impl FileRepositoryList {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes an example list unless the file already has entries.
    /// Returns whether anything was written.
    pub fn init_example(&self) -> Result<bool, DashboardError> {
        match fs::read_to_string(&self.path) {
            Ok(content) if !parse_repository_list(&content).is_empty() => {
                info!("{} already lists repositories, leaving it alone", self.path.display());
                return Ok(false);
            }
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(DashboardError::io(&self.path, e)),
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| DashboardError::io(parent, e))?;
        }
        fs::write(&self.path, EXAMPLE_REPOS).map_err(|e| DashboardError::io(&self.path, e))?;
        info!("Wrote example repository list to {}", self.path.display());
        Ok(true)
    }
}

impl RepositoryListStore for FileRepositoryList {
    fn load_repositories(&self) -> Result<Vec<RepoId>, DashboardError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(DashboardError::ConfigMissing {
                    path: self.path.clone(),
                });
            }
            Err(e) => return Err(DashboardError::io(&self.path, e)),
        };

        let repos = parse_repository_list(&content);
        if repos.is_empty() {
            return Err(DashboardError::ConfigEmpty {
                path: self.path.clone(),
            });
        }

        debug!("Loaded {} repositories from {}", repos.len(), self.path.display());
        Ok(repos)
    }
}

/// Parses a repository list. Comments (`#` to end of line) and blank
/// lines are dropped, invalid entries are skipped with a warning and
/// duplicates keep their first position.
pub fn parse_repository_list(content: &str) -> Vec<RepoId> {
    let mut seen = HashSet::new();
    let mut repos = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        let Some(repo) = parse_repo_entry(line) else {
            warn!("Ignoring invalid repository entry on line {}: {:?}", idx + 1, line);
            continue;
        };

        if seen.insert(repo.clone()) {
            repos.push(repo);
        } else {
            debug!("Duplicate repository entry on line {}: {}", idx + 1, repo);
        }
    }

    repos
}

/// Blank tokens count as absent.
pub fn resolve_token(token: Option<String>) -> Option<String> {
    let token = token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    if token.is_none() {
        info!("No GitHub token configured; using the unauthenticated rate limit");
    }

    token
}
