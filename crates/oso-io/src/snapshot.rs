//! CSV metric snapshot.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use oso_core::config::DataSnapshot;
use oso_core::constants::PERIOD_LABEL_FORMAT;
use oso_core::error::SourceError;
use oso_core::traits::MetricSource;
use oso_core::types::{MetricObservation, ProjectKey};
use serde::Deserialize;
use tracing::{debug, warn};

/// A projects file plus a long-format metrics file on disk.
#[derive(Debug, Clone)]
pub struct CsvSnapshot {
    projects_path: PathBuf,
    metrics_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ProjectRecord {
    project_id: String,
    project_name: String,
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct MetricRecord {
    project_id: String,
    chain: String,
    metric_name: String,
    #[serde(default)]
    sample_date: Option<String>,
    #[serde(default)]
    measurement_period: Option<String>,
    amount: String,
}

impl CsvSnapshot {
    pub fn new(projects_path: impl Into<PathBuf>, metrics_path: impl Into<PathBuf>) -> Self {
        Self {
            projects_path: projects_path.into(),
            metrics_path: metrics_path.into(),
        }
    }

    pub fn from_config(snapshot: &DataSnapshot) -> Self {
        Self::new(snapshot.projects_path(), snapshot.metrics_path())
    }

    fn load_projects(&self) -> Result<BTreeMap<String, ProjectKey>, SourceError> {
        let path = display(&self.projects_path);
        let mut reader = open(&self.projects_path)?;
        let mut projects = BTreeMap::new();
        for record in reader.deserialize::<ProjectRecord>() {
            let r = record.map_err(|e| csv_error(&path, e))?;
            // First row wins for a duplicated id.
            projects
                .entry(r.project_id.clone())
                .or_insert_with(|| ProjectKey::new(r.project_id, r.project_name, r.display_name));
        }
        debug!(path = %path, projects = projects.len(), "loaded project metadata");
        Ok(projects)
    }
}

impl MetricSource for CsvSnapshot {
    fn load_observations(&self) -> Result<Vec<MetricObservation>, SourceError> {
        let projects = self.load_projects()?;
        let path = display(&self.metrics_path);
        let mut reader = open(&self.metrics_path)?;

        let mut out = Vec::new();
        let mut unknown_project = 0usize;
        let mut blank_amount = 0usize;
        for (idx, record) in reader.deserialize::<MetricRecord>().enumerate() {
            // Header is line 1.
            let row = idx + 2;
            let r = record.map_err(|e| csv_error(&path, e))?;

            let Some(project) = projects.get(&r.project_id) else {
                unknown_project += 1;
                continue;
            };
            let amount = r.amount.trim();
            if amount.is_empty() {
                blank_amount += 1;
                continue;
            }
            let amount: f64 = amount.parse().map_err(|_| SourceError::InvalidAmount {
                path: path.clone(),
                row,
                value: r.amount.clone(),
            })?;
            let period_label = match r.measurement_period.filter(|p| !p.trim().is_empty()) {
                Some(p) => p,
                None => {
                    let date = r.sample_date.unwrap_or_default();
                    period_label(&date).ok_or_else(|| SourceError::InvalidDate {
                        path: path.clone(),
                        row,
                        value: date.clone(),
                    })?
                }
            };

            out.push(MetricObservation {
                project_id: project.project_id.clone(),
                project_name: project.project_name.clone(),
                display_name: project.display_name.clone(),
                chain: r.chain,
                period_label,
                metric_name: r.metric_name,
                amount,
            });
        }

        if unknown_project > 0 {
            warn!(path = %path, dropped = unknown_project, "dropped observations without project metadata");
        }
        if blank_amount > 0 {
            debug!(path = %path, skipped = blank_amount, "skipped observations with blank amount");
        }
        debug!(path = %path, observations = out.len(), "loaded metric observations");
        Ok(out)
    }
}

/// Month label such as `"Jan 2025"` for a sample date.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`, and RFC 3339.
pub fn period_label(sample_date: &str) -> Option<String> {
    let s = sample_date.trim();
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))?;
    Some(date.format(PERIOD_LABEL_FORMAT).to_string())
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

fn open(path: &Path) -> Result<csv::Reader<std::fs::File>, SourceError> {
    let file = std::fs::File::open(path).map_err(|source| SourceError::Io {
        path: display(path),
        source,
    })?;
    Ok(csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file))
}

fn csv_error(path: &str, e: csv::Error) -> SourceError {
    SourceError::Csv {
        path: path.to_string(),
        message: e.to_string(),
    }
}
