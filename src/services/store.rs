use crate::error::DashboardError;
use crate::models::metrics::{RepositoryMetricsRecord, CSV_COLUMNS};
use chrono::{DateTime, NaiveDateTime, Utc};
use log::{debug, warn};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use tempfile::NamedTempFile;

pub const DEFAULT_DATA_DIR: &str = "data";
const CSV_FILE: &str = "github_metrics.csv";
const TIMESTAMP_FILE: &str = "last_update.txt";

/// Persistence for fetched rows and the last refresh time.
pub trait MetricsStore {
    /// Missing data is an empty list, not an error.
    fn load_records(&self) -> Result<Vec<RepositoryMetricsRecord>, DashboardError>;
    /// Replaces all stored rows.
    fn save_records(&self, records: &[RepositoryMetricsRecord]) -> Result<(), DashboardError>;
    fn last_update(&self) -> Result<Option<DateTime<Utc>>, DashboardError>;
    fn set_last_update(&self, at: DateTime<Utc>) -> Result<(), DashboardError>;
    /// Human-readable location of the rows, for reports.
    fn location(&self) -> String;
}

pub struct CsvMetricsStore {
    data_dir: PathBuf,
    csv_path: PathBuf,
    timestamp_path: PathBuf,
}

impl CsvMetricsStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            csv_path: data_dir.join(CSV_FILE),
            timestamp_path: data_dir.join(TIMESTAMP_FILE),
            data_dir,
        }
    }

    fn ensure_data_dir(&self) -> Result<(), DashboardError> {
        fs::create_dir_all(&self.data_dir).map_err(|e| DashboardError::io(&self.data_dir, e))
    }

    fn write_csv(&self, records: &[RepositoryMetricsRecord]) -> Result<(), DashboardError> {
        self.ensure_data_dir()?;

        let mut tmp = NamedTempFile::new_in(&self.data_dir)
            .map_err(|e| DashboardError::io(&self.data_dir, e))?;
        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(&mut tmp);
            writer
                .write_record(CSV_COLUMNS)
                .map_err(|e| DashboardError::csv(&self.csv_path, e))?;
            for record in records {
                writer
                    .serialize(record)
                    .map_err(|e| DashboardError::csv(&self.csv_path, e))?;
            }
            writer
                .flush()
                .map_err(|e| DashboardError::io(&self.csv_path, e))?;
        }

        tmp.persist(&self.csv_path)
            .map_err(|e| DashboardError::io(&self.csv_path, e.error))?;
        Ok(())
    }
}

impl MetricsStore for CsvMetricsStore {
    fn load_records(&self) -> Result<Vec<RepositoryMetricsRecord>, DashboardError> {
        let file = match fs::File::open(&self.csv_path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No data file at {}", self.csv_path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(DashboardError::io(&self.csv_path, e)),
        };

        let mut reader = csv::Reader::from_reader(file);
        let headers = reader
            .headers()
            .map_err(|e| DashboardError::csv(&self.csv_path, e))?
            .clone();
        if !headers.is_empty() && !headers.iter().eq(CSV_COLUMNS.iter().copied()) {
            warn!(
                "Unexpected columns in {}; rows may fail to load",
                self.csv_path.display()
            );
        }

        reader
            .deserialize()
            .collect::<Result<Vec<RepositoryMetricsRecord>, _>>()
            .map_err(|e| DashboardError::csv(&self.csv_path, e))
    }

    fn save_records(&self, records: &[RepositoryMetricsRecord]) -> Result<(), DashboardError> {
        self.write_csv(records)?;
        debug!("Wrote {} rows to {}", records.len(), self.csv_path.display());
        Ok(())
    }

    fn last_update(&self) -> Result<Option<DateTime<Utc>>, DashboardError> {
        let content = match fs::read_to_string(&self.timestamp_path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                warn!("Could not read {}: {}", self.timestamp_path.display(), e);
                return Ok(None);
            }
        };

        let parsed = parse_timestamp(content.trim());
        if parsed.is_none() {
            warn!(
                "Ignoring unparseable timestamp in {}: {:?}",
                self.timestamp_path.display(),
                content.trim()
            );
        }
        Ok(parsed)
    }

    fn set_last_update(&self, at: DateTime<Utc>) -> Result<(), DashboardError> {
        self.ensure_data_dir()?;
        let mut file = fs::File::create(&self.timestamp_path)
            .map_err(|e| DashboardError::io(&self.timestamp_path, e))?;
        writeln!(file, "{}", at.to_rfc3339())
            .map_err(|e| DashboardError::io(&self.timestamp_path, e))?;
        Ok(())
    }

    fn location(&self) -> String {
        self.csv_path.display().to_string()
    }
}

/// Accepts RFC 3339 and, for older files, a naive ISO-8601 timestamp read as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
pub struct MemoryMetricsStore {
    records: std::sync::Mutex<Vec<RepositoryMetricsRecord>>,
    last_update: std::sync::Mutex<Option<DateTime<Utc>>>,
}

#[cfg(test)]
impl MemoryMetricsStore {
    pub fn new(records: Vec<RepositoryMetricsRecord>, last_update: Option<DateTime<Utc>>) -> Self {
        Self {
            records: std::sync::Mutex::new(records),
            last_update: std::sync::Mutex::new(last_update),
        }
    }
}

#[cfg(test)]
impl MetricsStore for MemoryMetricsStore {
    fn load_records(&self) -> Result<Vec<RepositoryMetricsRecord>, DashboardError> {
        Ok(self.records.lock().unwrap().clone())
    }

    fn save_records(&self, records: &[RepositoryMetricsRecord]) -> Result<(), DashboardError> {
        *self.records.lock().unwrap() = records.to_vec();
        Ok(())
    }

    fn last_update(&self) -> Result<Option<DateTime<Utc>>, DashboardError> {
        Ok(*self.last_update.lock().unwrap())
    }

    fn set_last_update(&self, at: DateTime<Utc>) -> Result<(), DashboardError> {
        *self.last_update.lock().unwrap() = Some(at);
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
pub fn sample_record(repo: &str) -> RepositoryMetricsRecord {
    use chrono::TimeZone;

    RepositoryMetricsRecord {
        repo: repo.to_string(),
        stars: 1500,
        forks: 300,
        watchers: 1500,
        contributors: 12,
        open_issues: 5,
        total_issues: 20,
        closed_issues: 15,
        open_prs: 2,
        total_prs: 10,
        closed_prs: 8,
        merged_prs: 6,
        recent_commits_30d: 4,
        size_kb: 108,
        language: Some("Rust".to_string()),
        created_at: Some(Utc.with_ymd_and_hms(2011, 1, 26, 19, 1, 12).unwrap()),
        updated_at: Some(Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap()),
        last_fetched: Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap(),
    }
}
