//! Stage 7: project the canonical dimensions into the search index.
//!
//! Pure projection, no computation; it exists because the dashboard's
//! lookup lists are part of the same dependency chain as everything else.

use serde::Serialize;
use tracing::info;

use crate::artifacts::{self, ArtifactPaths};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::types::{EmployerDim, EmployerIndexEntry, JobDim, JobIndexEntry};

#[derive(Debug, Serialize)]
pub struct SearchIndex {
    pub employers: Vec<EmployerIndexEntry>,
    pub jobs: Vec<JobIndexEntry>,
}

pub fn run(_config: &PipelineConfig, paths: &ArtifactPaths) -> Result<usize> {
    let employers: Vec<EmployerDim> =
        artifacts::load_records(&paths.dim_employer, "normalize_employers")?;
    let jobs: Vec<JobDim> = artifacts::load_records(&paths.dim_job, "normalize_jobs")?;

    let index = build(employers, jobs);
    let total = index.employers.len() + index.jobs.len();
    artifacts::save_json(&paths.analytics_file("search_index.json"), &index)?;
    info!(
        employers = index.employers.len(),
        jobs = index.jobs.len(),
        "search index written"
    );
    Ok(total)
}

pub fn build(mut employers: Vec<EmployerDim>, mut jobs: Vec<JobDim>) -> SearchIndex {
    // Dimensions are written sorted, but sort again so the index stays
    // byte-stable even if the artifacts were produced by an older build.
    employers.sort_by(|a, b| a.canonical_name.cmp(&b.canonical_name));
    jobs.sort_by(|a, b| a.canonical_title.cmp(&b.canonical_title));
    SearchIndex {
        employers: employers
            .into_iter()
            .map(|e| EmployerIndexEntry {
                id: e.employer_id,
                name: e.canonical_name,
            })
            .collect(),
        jobs: jobs
            .into_iter()
            .map(|j| JobIndexEntry {
                id: j.job_id,
                title: j.canonical_title,
                family: j.job_family,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_projects_and_sorts() {
        let employers = vec![
            EmployerDim {
                employer_id: "b".to_string(),
                canonical_name: "HYDRO ONE".to_string(),
            },
            EmployerDim {
                employer_id: "a".to_string(),
                canonical_name: "CITY OF TORONTO".to_string(),
            },
        ];
        let jobs = vec![JobDim {
            job_id: "j".to_string(),
            canonical_title: "NURSE".to_string(),
            job_family: "Medical".to_string(),
        }];
        let index = build(employers, jobs);
        assert_eq!(index.employers[0].name, "CITY OF TORONTO");
        assert_eq!(index.employers[1].id, "b");
        assert_eq!(index.jobs[0].family, "Medical");
    }
}
