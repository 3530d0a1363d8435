//! Output encoding
//!
//! This module writes the enriched table (CSV or JSON) and the JSON run
//! report. File output goes through `write_atomic`, so a failed run leaves any
//! previous output untouched.

use crate::analytics::LogAnalytics;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::oracle::ResolverStats;
use crate::pipeline::PipelineOutput;
use crate::types::{EnrichedRow, QualityFlag, RiskAssessment, Scores, SessionPatternStats};
use crate::{PRODUCER_NAME, VERSION};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Current run report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Enriched table serialization format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Csv,
    /// One JSON array
    Json,
    /// Indented JSON array
    JsonPretty,
}

/// Producer metadata stamped on every report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Log-level run report for downstream consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    pub config: PipelineConfig,
    pub row_count: usize,
    pub scores: Scores,
    pub risk: RiskAssessment,
    pub session_stats: SessionPatternStats,
    pub analytics: LogAnalytics,
    pub quality_flags: Vec<QualityFlag>,
    pub oracle: ResolverStats,
    /// Titles that fell back to Unclassified after the oracle failed
    pub unclassified_titles: Vec<String>,
}

/// Report encoder
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Build the run report for a pipeline output
    pub fn encode(&self, output: &PipelineOutput) -> FocusReport {
        FocusReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            config: output.config.clone(),
            row_count: output.rows.len(),
            scores: output.scores.clone(),
            risk: output.risk.clone(),
            session_stats: output.session_stats.clone(),
            analytics: output.analytics.clone(),
            quality_flags: output.quality_flags.clone(),
            oracle: output.resolver_stats.clone(),
            unclassified_titles: output.unclassified_titles.clone(),
        }
    }

    /// Encode the run report to pretty JSON
    pub fn encode_to_json(&self, output: &PipelineOutput) -> Result<String, PipelineError> {
        let report = self.encode(output);
        serde_json::to_string_pretty(&report).map_err(PipelineError::JsonError)
    }
}

/// Serialize enriched rows to a writer
pub fn write_table<W: Write>(
    rows: &[EnrichedRow],
    mut writer: W,
    format: OutputFormat,
) -> Result<(), PipelineError> {
    match format {
        OutputFormat::Csv => {
            let mut csv_writer = csv::Writer::from_writer(writer);
            if rows.is_empty() {
                // Keep the column contract visible on empty output
                csv_writer.write_record(EnrichedRow::COLUMNS)?;
            }
            for row in rows {
                csv_writer.serialize(row)?;
            }
            csv_writer.flush()?;
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut writer, rows)?;
            writer.write_all(b"\n")?;
        }
        OutputFormat::JsonPretty => {
            serde_json::to_writer_pretty(&mut writer, rows)?;
            writer.write_all(b"\n")?;
        }
    }
    Ok(())
}

/// Serialize enriched rows to an in-memory buffer
pub fn encode_table(rows: &[EnrichedRow], format: OutputFormat) -> Result<Vec<u8>, PipelineError> {
    let mut buffer = Vec::new();
    write_table(rows, &mut buffer, format)?;
    Ok(buffer)
}

/// Replace `path` with `contents` via a sibling temp file and a rename
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), PipelineError> {
    let temp = temp_path(path)?;

    let result = (|| -> Result<(), PipelineError> {
        let mut file = fs::File::create(&temp)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&temp, path)?;
        Ok(())
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp);
    }
    result
}

fn temp_path(path: &Path) -> Result<PathBuf, PipelineError> {
    let file_name = path.file_name().ok_or_else(|| {
        PipelineError::EncodingError(format!("not a file path: {}", path.display()))
    })?;
    let temp_name = format!(
        ".{}.{}.tmp",
        file_name.to_string_lossy(),
        Uuid::new_v4().simple()
    );
    Ok(path.with_file_name(temp_name))
}
