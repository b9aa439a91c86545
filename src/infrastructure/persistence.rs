//! Run artifacts written at finalize: activity summary, reviewed ledger, corrected ledger.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use super::config::OutputConfig;
use super::logging::FILE_TIMESTAMP_FORMAT;
use crate::domain::record::{CorrectedRecord, RecordSnapshot};
use crate::domain::run_state::{RunCounters, StopReason};

pub const REVIEWED_HEADER: [&str; 6] = [
    "Company Product Number",
    "Manufacturer Number",
    "Start Availability Date Time",
    "Master GTIN",
    "Net Content",
    "Company Net Content",
];

pub const CORRECTED_HEADER: [&str; 11] = [
    "Company Product Number",
    "Manufacturer Number",
    "Corrected Manufacturer Number",
    "Start Availability Date Time",
    "Corrected Start Availability Date Time",
    "Master GTIN",
    "Corrected Master GTIN",
    "Net Content",
    "Corrected Net Content",
    "Company Net Content",
    "Corrected Company Net Content",
];

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),
}

/// Everything finalize hands to the sink.
#[derive(Debug, Clone, Copy)]
pub struct RunReport<'a> {
    pub run_id: Uuid,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub stop_reason: StopReason,
    pub counters: RunCounters,
    pub reviewed: &'a [RecordSnapshot],
    pub corrected: &'a [CorrectedRecord],
}

/// Files written for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedArtifacts {
    pub summary: PathBuf,
    pub reviewed: PathBuf,
    pub corrected: PathBuf,
}

#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn persist(&self, report: &RunReport<'_>) -> Result<PersistedArtifacts, PersistenceError>;
}

/// Writes the three artifacts as text/CSV files below the configured output root.
#[derive(Debug, Clone)]
pub struct CsvResultSink {
    output: OutputConfig,
}

impl CsvResultSink {
    #[must_use]
    pub const fn new(output: OutputConfig) -> Self {
        Self { output }
    }

    fn target(&self, dir: &str, stamp: &str, suffix: &str) -> PathBuf {
        self.output.root_dir.join(dir).join(format!("{stamp}_{suffix}"))
    }
}

/// Activity summary text.
#[must_use]
pub fn summary_text(report: &RunReport<'_>) -> String {
    format!(
        "PIM Data Cleanup Activity Summary\n\
         ----------------------------------\n\
         Total Products Reviewed: {}\n\
         Total Products Fixed:    {}\n\
         Total Errors Fixed:      {}\n\
         \n\
         Run ID:      {}\n\
         Started:     {}\n\
         Finished:    {}\n\
         Stop reason: {}\n",
        report.counters.reviewed,
        report.counters.fixed,
        report.counters.errors_fixed,
        report.run_id,
        report.started_at.format("%Y-%m-%d %H:%M:%S"),
        report.finished_at.format("%Y-%m-%d %H:%M:%S"),
        report.stop_reason,
    )
}

fn encode_csv<const N: usize>(
    header: [&str; N],
    rows: impl Iterator<Item = [String; N]>,
) -> Result<Vec<u8>, PersistenceError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(header)?;
    for row in rows {
        wtr.write_record(&row)?;
    }
    wtr.into_inner()
        .map_err(|e| PersistenceError::Csv(csv::Error::from(e.into_error())))
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| PersistenceError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    tokio::fs::write(path, contents)
        .await
        .map_err(|source| PersistenceError::Write {
            path: path.to_path_buf(),
            source,
        })
}

#[async_trait]
impl ResultSink for CsvResultSink {
    async fn persist(&self, report: &RunReport<'_>) -> Result<PersistedArtifacts, PersistenceError> {
        let stamp = report.finished_at.format(FILE_TIMESTAMP_FORMAT).to_string();
        let artifacts = PersistedArtifacts {
            summary: self.target(&self.output.summary_dir, &stamp, "data_cleanup_summary.txt"),
            reviewed: self.target(&self.output.reviewed_dir, &stamp, "data_cleanup_reviewed.csv"),
            corrected: self.target(&self.output.corrected_dir, &stamp, "data_cleanup_fixed.csv"),
        };

        let reviewed = encode_csv(
            REVIEWED_HEADER,
            report.reviewed.iter().map(RecordSnapshot::reviewed_row),
        )?;
        let corrected = encode_csv(
            CORRECTED_HEADER,
            report.corrected.iter().map(CorrectedRecord::corrected_row),
        )?;

        write_file(&artifacts.summary, summary_text(report).as_bytes()).await?;
        write_file(&artifacts.reviewed, &reviewed).await?;
        write_file(&artifacts.corrected, &corrected).await?;

        info!(
            summary = %artifacts.summary.display(),
            reviewed = %artifacts.reviewed.display(),
            corrected = %artifacts.corrected.display(),
            "Run artifacts saved"
        );
        Ok(artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::attribute::{Attribute, AttributeValue};
    use crate::domain::record::CorrectionPlan;

    fn snapshot(key: &str) -> RecordSnapshot {
        RecordSnapshot {
            record_key: key.into(),
            manufacturer_number: "42".into(),
            start_availability: "02/06/2018 00:00:01".into(),
            master_gtin: AttributeValue::Blank,
            net_content: "-1".into(),
            company_net_content: "10.00".into(),
        }
    }

    #[tokio::test]
    async fn writes_three_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvResultSink::new(OutputConfig {
            root_dir: dir.path().to_path_buf(),
            ..OutputConfig::default()
        });

        let reviewed = vec![snapshot("A, with comma"), snapshot("B")];
        let mut corrections = CorrectionPlan::new();
        corrections.insert(Attribute::ManufacturerNumber, "000042".into());
        let corrected = vec![CorrectedRecord {
            original: snapshot("B"),
            corrections,
        }];
        let now = Local::now();
        let report = RunReport {
            run_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            stop_reason: StopReason::Completed,
            counters: RunCounters {
                reviewed: 2,
                fixed: 1,
                errors_fixed: 1,
            },
            reviewed: &reviewed,
            corrected: &corrected,
        };

        let artifacts = sink.persist(&report).await.unwrap();
        assert!(artifacts.summary.starts_with(dir.path().join("Activity Summary Files")));

        let summary = std::fs::read_to_string(&artifacts.summary).unwrap();
        assert!(summary.contains("Total Products Reviewed: 2"));
        assert!(summary.contains("Total Errors Fixed:      1"));
        assert!(summary.contains("completed"));

        let mut rdr = csv::Reader::from_path(&artifacts.reviewed).unwrap();
        assert_eq!(rdr.headers().unwrap().len(), 6);
        let rows: Vec<csv::StringRecord> = rdr.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "A, with comma");

        let mut rdr = csv::Reader::from_path(&artifacts.corrected).unwrap();
        let rows: Vec<csv::StringRecord> = rdr.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 11);
        assert_eq!(&rows[0][2], "000042");
        assert_eq!(&rows[0][4], "");
    }

    #[test]
    fn file_names_use_finalize_timestamp() {
        let sink = CsvResultSink::new(OutputConfig::default());
        let path = sink.target("Reviewed Record Files", "01.02.2026_03.04.05", "data_cleanup_reviewed.csv");
        assert!(path.ends_with("Reviewed Record Files/01.02.2026_03.04.05_data_cleanup_reviewed.csv"));
    }
}
