//! Monthly report files.
//!
//! Reports are rendered to `<dir>/<year>_<month>_report.csv`. A past month
//! can no longer change, so an existing file for it is served as is; the
//! current month is rendered again on every request.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Utc};
use engine::{Engine, EngineError, ReportRow};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("report file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("report rendering failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid report file name: {0}")]
    InvalidFileName(String),
    #[error("report file not found: {0}")]
    Missing(String),
}

#[derive(Clone, Debug)]
pub struct ReportFiles {
    dir: PathBuf,
}

impl ReportFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name(year: i32, month: u32) -> String {
        format!("{year}_{month}_report.csv")
    }

    /// Makes sure the report for `year`/`month` exists on disk and returns
    /// its file name.
    pub async fn ensure(
        &self,
        engine: &Engine,
        year: i32,
        month: u32,
        now: DateTime<Utc>,
    ) -> Result<String, ReportError> {
        let name = Self::file_name(year, month);
        let path = self.dir.join(&name);
        let current_month = now.year() == year && now.month() == month;

        if !current_month && tokio::fs::try_exists(&path).await? {
            tracing::debug!(%name, "reusing rendered report");
            return Ok(name);
        }

        let rows = engine.report(year, month).await?;
        let bytes = render(&rows)?;

        tokio::fs::create_dir_all(&self.dir).await?;
        // Concurrent renders of the same month each write their own file.
        let tmp = self.dir.join(format!("{name}.{}.tmp", Uuid::new_v4()));
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        tracing::info!(%name, rows = rows.len(), "report rendered");
        Ok(name)
    }

    /// Reads a rendered report by file name.
    pub async fn read(&self, name: &str) -> Result<Vec<u8>, ReportError> {
        if !is_report_file_name(name) {
            return Err(ReportError::InvalidFileName(name.to_string()));
        }
        match tokio::fs::read(self.dir.join(name)).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(ReportError::Missing(name.to_string()))
            }
            Err(err) => Err(ReportError::Io(err)),
        }
    }
}

/// Renders report rows as CSV with a `service_name,total_revenue` header.
pub fn render(rows: &[ReportRow]) -> Result<Vec<u8>, ReportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["service_name", "total_revenue"])?;
    for row in rows {
        let total = row.total_cost.to_string();
        writer.write_record([row.service_name.as_str(), total.as_str()])?;
    }
    writer
        .into_inner()
        .map_err(|err| ReportError::Io(err.into_error()))
}

// Only names produced by `file_name`; rejects anything path-like.
fn is_report_file_name(name: &str) -> bool {
    let Some(stem) = name.strip_suffix("_report.csv") else {
        return false;
    };
    let mut parts = stem.split('_');
    matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(year), Some(month), None)
            if !year.is_empty()
                && !month.is_empty()
                && year.chars().all(|c| c.is_ascii_digit())
                && month.chars().all(|c| c.is_ascii_digit())
    )
}
