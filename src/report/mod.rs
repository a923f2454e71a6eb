pub mod json;
pub mod text;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::runner::RunLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Text,
}

impl ReportFormat {
    pub const ALL: [ReportFormat; 2] = [ReportFormat::Json, ReportFormat::Text];

    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Text => "txt",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// `api_test_report_<unix>.<ext>`, keyed on the run's start time.
pub fn report_filename(run_log: &RunLog, format: ReportFormat) -> String {
    let started = DateTime::parse_from_rfc3339(&run_log.timestamp)
        .map(|t| t.timestamp())
        .unwrap_or_else(|_| Utc::now().timestamp());
    format!("api_test_report_{}.{}", started, format.extension())
}

pub fn render(run_log: &RunLog, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => json::render(run_log),
        ReportFormat::Text => Ok(text::render(run_log)),
    }
}

/// Write one report into `output_dir` and return its path.
pub fn emit(run_log: &RunLog, format: ReportFormat, output_dir: &Path) -> Result<PathBuf> {
    let content = render(run_log, format)?;
    let path = output_dir.join(report_filename(run_log, format));
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write {} report to {}", format, path.display()))?;
    log::info!("{} report saved to: {}", format, path.display());
    Ok(path)
}

/// Write every format, creating `output_dir` if needed.
pub fn emit_all(run_log: &RunLog, output_dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir).with_context(|| {
        format!("Failed to create output directory {}", output_dir.display())
    })?;
    ReportFormat::ALL
        .iter()
        .map(|format| emit(run_log, *format, output_dir))
        .collect()
}
