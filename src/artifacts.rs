//! Typed load/save for the inter-stage artifacts.
//!
//! Tabular artifacts are JSON Lines (one serde record per line); final
//! analytics artifacts are plain JSON documents. Every writer goes through a
//! temp file and an atomic rename, so a failed stage never leaves a partial
//! file in a canonical location.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};

/// Resolved on-disk locations of every inter-stage artifact.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub stg_rows: PathBuf,
    pub stg_rows_enriched: PathBuf,
    pub stg_rows_enriched_2: PathBuf,
    pub dim_employer: PathBuf,
    pub dim_job: PathBuf,
    pub fact_comp: PathBuf,
    pub analytics_dir: PathBuf,
}

impl ArtifactPaths {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            stg_rows: config.staging_dir.join("stg_rows.jsonl"),
            stg_rows_enriched: config.staging_dir.join("stg_rows_enriched.jsonl"),
            stg_rows_enriched_2: config.staging_dir.join("stg_rows_enriched_2.jsonl"),
            dim_employer: config.curated_dir.join("dim_employer.jsonl"),
            dim_job: config.curated_dir.join("dim_job.jsonl"),
            fact_comp: config.curated_dir.join("fact_comp.jsonl"),
            analytics_dir: config.analytics_dir.clone(),
        }
    }

    pub fn analytics_file(&self, name: &str) -> PathBuf {
        self.analytics_dir.join(name)
    }
}

/// Write serializable records as JSON Lines via temp-then-rename.
pub fn save_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = temp_path(path);
    {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        for record in records {
            serde_json::to_writer(&mut writer, record)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    debug!(path = %path.display(), rows = records.len(), "artifact written");
    Ok(())
}

/// Load a JSON Lines artifact produced by an earlier stage. A missing file
/// is a stage-contract violation and names the stage that should have
/// produced it.
pub fn load_records<T: DeserializeOwned>(path: &Path, produced_by: &str) -> Result<Vec<T>> {
    require(path, produced_by)?;
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}

/// Write a JSON document via temp-then-rename.
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = temp_path(path);
    {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    debug!(path = %path.display(), "analytics artifact written");
    Ok(())
}

/// Check that a required input artifact exists before a stage runs.
pub fn require(path: &Path, produced_by: &str) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(PipelineError::MissingArtifact {
            produced_by: produced_by.to_string(),
            path: path.to_path_buf(),
        })
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StagingRow;

    fn sample_row() -> StagingRow {
        StagingRow {
            year: 2020,
            sector_label: String::new(),
            last_name: "DOE".to_string(),
            first_name: "JANE".to_string(),
            employer: "City of Toronto".to_string(),
            job_title: "Analyst".to_string(),
            salary: 120_000.0,
            benefits: 500.0,
            total_comp: 120_500.0,
        }
    }

    #[test]
    fn test_records_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stg_rows.jsonl");
        let rows = vec![sample_row(), sample_row()];
        save_records(&path, &rows).unwrap();
        let loaded: Vec<StagingRow> = load_records(&path, "ingest").unwrap();
        assert_eq!(loaded, rows);
        // No stray temp file left behind
        assert!(!dir.path().join("stg_rows.jsonl.tmp").exists());
    }

    #[test]
    fn test_missing_artifact_names_producing_stage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fact_comp.jsonl");
        let err = load_records::<StagingRow>(&path, "link_persons").unwrap_err();
        match err {
            PipelineError::MissingArtifact { produced_by, .. } => {
                assert_eq!(produced_by, "link_persons")
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
