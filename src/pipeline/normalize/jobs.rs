//! Stage 3: build the canonical job dimension and finish row enrichment.
//!
//! Same shape as the employer normalizer, plus job-family inference from
//! ordered keyword rules. First matching rule wins; everything else lands in
//! the explicit "Other" bucket rather than guessing.

use std::collections::BTreeMap;

use tracing::info;

use crate::artifacts::{self, ArtifactPaths};
use crate::config::{AliasDictionary, PipelineConfig};
use crate::error::Result;
use crate::identity::stable_id;
use crate::pipeline::normalize::clean_job_title;
use crate::types::{EmployerEnrichedRow, FullyEnrichedRow, JobDim};

/// Ordered (keyword, family) rules applied to the lowercased canonical
/// title. Order matters: "police detective" must hit Police before anything
/// broader would.
const FAMILY_RULES: &[(&str, &str)] = &[
    ("professor", "Academic"),
    ("teacher", "Education"),
    ("principal", "Education"),
    ("nurse", "Medical"),
    ("physician", "Medical"),
    ("doctor", "Medical"),
    ("police", "Police"),
    ("constable", "Police"),
    ("detective", "Police"),
    ("firefighter", "Fire"),
    ("engineer", "Engineering"),
    ("director", "Management"),
    ("manager", "Management"),
];

pub const DEFAULT_FAMILY: &str = "Other";

pub fn run(config: &PipelineConfig, paths: &ArtifactPaths) -> Result<usize> {
    let rows: Vec<EmployerEnrichedRow> =
        artifacts::load_records(&paths.stg_rows_enriched, "normalize_employers")?;
    let aliases = AliasDictionary::load(&config.job_aliases)?;
    info!(rows = rows.len(), aliases = aliases.len(), "normalizing job titles");

    let (dim, enriched) = normalize(rows, &aliases);

    artifacts::save_records(&paths.dim_job, &dim)?;
    artifacts::save_records(&paths.stg_rows_enriched_2, &enriched)?;
    info!(jobs = dim.len(), "job dimension written");
    Ok(enriched.len())
}

pub fn normalize(
    rows: Vec<EmployerEnrichedRow>,
    aliases: &AliasDictionary,
) -> (Vec<JobDim>, Vec<FullyEnrichedRow>) {
    let mut dim: BTreeMap<String, (String, String)> = BTreeMap::new();
    let mut enriched = Vec::with_capacity(rows.len());

    for base in rows {
        let canonical = canonicalize(&base.row.job_title, aliases);
        let family = infer_family(&canonical).to_string();
        let (job_id, job_family) = dim
            .entry(canonical.clone())
            .or_insert_with(|| (stable_id(&canonical), family))
            .clone();
        enriched.push(FullyEnrichedRow {
            base,
            job_id,
            job_canonical: canonical,
            job_family,
        });
    }

    let dim = dim
        .into_iter()
        .map(|(canonical_title, (job_id, job_family))| JobDim {
            job_id,
            canonical_title,
            job_family,
        })
        .collect();
    (dim, enriched)
}

fn canonicalize(raw: &str, aliases: &AliasDictionary) -> String {
    let cleaned = clean_job_title(raw);
    let resolved = aliases
        .resolve(raw)
        .or_else(|| aliases.resolve(&cleaned))
        .unwrap_or(&cleaned);
    clean_job_title(resolved)
}

/// First matching keyword rule wins; unmatched titles are "Other".
pub fn infer_family(canonical_title: &str) -> &'static str {
    let lowered = canonical_title.to_lowercase();
    for &(keyword, family) in FAMILY_RULES {
        if lowered.contains(keyword) {
            return family;
        }
    }
    DEFAULT_FAMILY
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StagingRow;

    fn row(job_title: &str) -> EmployerEnrichedRow {
        EmployerEnrichedRow {
            row: StagingRow {
                year: 2020,
                sector_label: String::new(),
                last_name: "DOE".to_string(),
                first_name: "JANE".to_string(),
                employer: "City of Toronto".to_string(),
                job_title: job_title.to_string(),
                salary: 110_000.0,
                benefits: 0.0,
                total_comp: 110_000.0,
            },
            employer_id: stable_id("CITY OF TORONTO"),
            employer_canonical: "CITY OF TORONTO".to_string(),
        }
    }

    #[test]
    fn test_family_inference_first_match_wins() {
        assert_eq!(infer_family("ASSOCIATE PROFESSOR"), "Academic");
        assert_eq!(infer_family("POLICE DETECTIVE"), "Police");
        assert_eq!(infer_family("REGISTERED NURSE"), "Medical");
        assert_eq!(infer_family("SENIOR WIDGET POLISHER"), "Other");
    }

    #[test]
    fn test_nurse_manager_is_medical_not_management() {
        // "nurse" appears earlier in the rule table than "manager"
        assert_eq!(infer_family("NURSE MANAGER"), "Medical");
    }

    #[test]
    fn test_title_variants_collapse_to_one_job() {
        let aliases = AliasDictionary::default();
        let (dim, enriched) = normalize(vec![row("Teacher, Elementary"), row("TEACHER ELEMENTARY")], &aliases);
        assert_eq!(dim.len(), 1);
        assert_eq!(dim[0].job_family, "Education");
        assert_eq!(enriched[0].job_id, enriched[1].job_id);
    }

    #[test]
    fn test_job_alias_applied() {
        let aliases = AliasDictionary::from_pairs(vec![(
            "RN".to_string(),
            "REGISTERED NURSE".to_string(),
        )]);
        let (dim, _) = normalize(vec![row("RN")], &aliases);
        assert_eq!(dim[0].canonical_title, "REGISTERED NURSE");
        assert_eq!(dim[0].job_family, "Medical");
    }
}
