//! Stage 2: build the canonical employer dimension and enrich staging rows.
//!
//! Canonicalization is deterministic string cleanup plus an exact-match
//! alias dictionary; there is no fuzzy matching. Names that stay distinct
//! after cleanup ("U OF T" vs "UNIVERSITY OF TORONTO") remain distinct
//! entities until someone curates an alias entry.

use std::collections::BTreeMap;

use tracing::info;

use crate::artifacts::{self, ArtifactPaths};
use crate::config::{AliasDictionary, PipelineConfig};
use crate::error::Result;
use crate::identity::stable_id;
use crate::pipeline::normalize::clean_employer_name;
use crate::types::{EmployerDim, EmployerEnrichedRow, StagingRow};

pub fn run(config: &PipelineConfig, paths: &ArtifactPaths) -> Result<usize> {
    let rows: Vec<StagingRow> = artifacts::load_records(&paths.stg_rows, "ingest")?;
    let aliases = AliasDictionary::load(&config.employer_aliases)?;
    info!(rows = rows.len(), aliases = aliases.len(), "normalizing employers");

    let (dim, enriched) = normalize(rows, &aliases);

    artifacts::save_records(&paths.dim_employer, &dim)?;
    artifacts::save_records(&paths.stg_rows_enriched, &enriched)?;
    info!(employers = dim.len(), "employer dimension written");
    Ok(enriched.len())
}

/// Resolve every row to its canonical employer and collect the deduplicated
/// dimension, sorted by canonical name for byte-stable output.
pub fn normalize(
    rows: Vec<StagingRow>,
    aliases: &AliasDictionary,
) -> (Vec<EmployerDim>, Vec<EmployerEnrichedRow>) {
    let mut dim: BTreeMap<String, String> = BTreeMap::new();
    let mut enriched = Vec::with_capacity(rows.len());

    for row in rows {
        let canonical = canonicalize(&row.employer, aliases);
        let employer_id = dim
            .entry(canonical.clone())
            .or_insert_with(|| stable_id(&canonical))
            .clone();
        enriched.push(EmployerEnrichedRow {
            row,
            employer_id,
            employer_canonical: canonical,
        });
    }

    let dim = dim
        .into_iter()
        .map(|(canonical_name, employer_id)| EmployerDim {
            employer_id,
            canonical_name,
        })
        .collect();
    (dim, enriched)
}

/// Clean the raw name, then let a curated alias override it. The raw string
/// is tried against the dictionary first (dictionaries are keyed on what the
/// source files actually print), then the cleaned form. The alias target is
/// cleaned again so dictionary entries cannot introduce non-canonical text.
fn canonicalize(raw: &str, aliases: &AliasDictionary) -> String {
    let cleaned = clean_employer_name(raw);
    let resolved = aliases
        .resolve(raw)
        .or_else(|| aliases.resolve(&cleaned))
        .unwrap_or(&cleaned);
    clean_employer_name(resolved)
}
