//! Stage 4: cross-year person linking under a strict zero-false-positive
//! policy.
//!
//! A record links to an earlier record iff the case-normalized
//! (first_name, last_name) matches exactly, the employer_id matches exactly,
//! and the year gap is at most two (one missed disclosure year). Anything
//! weaker breaks the chain: a person changing employer is deliberately a new
//! chain, because growth and retention must mean growth and retention within
//! one employer. Duplicate (name, employer, year) collisions fail closed and
//! never join or anchor a chain.
//!
//! Implemented as sort-then-scan: rows are sorted by
//! (name, employer_id, year, ...) and each (name, employer) run is walked
//! once, so the whole stage is O(N log N) over millions of rows.

use itertools::Itertools;
use tracing::info;

use crate::artifacts::{self, ArtifactPaths};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::types::{CompFact, FullyEnrichedRow};

/// Maximum year gap that still continues a chain.
const MAX_LINK_GAP: i32 = 2;

/// The name key of a row whose first and last name are both blank.
const EMPTY_NAME_KEY: &str = "\u{1f}";

pub fn run(_config: &PipelineConfig, paths: &ArtifactPaths) -> Result<usize> {
    let rows: Vec<FullyEnrichedRow> =
        artifacts::load_records(&paths.stg_rows_enriched_2, "normalize_jobs")?;
    info!(rows = rows.len(), "linking persons across years");

    let facts = link(rows);
    let chains = facts
        .iter()
        .map(|f| f.person_key.as_str())
        .unique()
        .count();
    info!(facts = facts.len(), chains, "person linking complete");

    artifacts::save_records(&paths.fact_comp, &facts)?;
    Ok(facts.len())
}

/// Assign a `person_key` to every row. Keys are chain counters issued in a
/// totally ordered scan, so re-running on identical input reproduces
/// identical keys.
pub fn link(rows: Vec<FullyEnrichedRow>) -> Vec<CompFact> {
    let mut work: Vec<(String, FullyEnrichedRow)> = rows
        .into_iter()
        .map(|r| (name_key(&r), r))
        .collect();

    // Total order: group key first, then year for the scan, then
    // compensation and job to pin down duplicate rows deterministically.
    work.sort_by(|(ka, a), (kb, b)| {
        ka.cmp(kb)
            .then_with(|| a.base.employer_id.cmp(&b.base.employer_id))
            .then_with(|| a.base.row.year.cmp(&b.base.row.year))
            .then_with(|| a.base.row.total_comp.total_cmp(&b.base.row.total_comp))
            .then_with(|| a.job_id.cmp(&b.job_id))
    });

    let mut next_chain: u64 = 1;
    let mut fresh = move || {
        let key = next_chain.to_string();
        next_chain += 1;
        key
    };

    let mut facts = Vec::with_capacity(work.len());
    for ((name, _employer), group) in &work
        .iter()
        .chunk_by(|(name, r)| (name.clone(), r.base.employer_id.clone()))
    {
        // Unnamed rows carry no identity signal; never chain them.
        if name == EMPTY_NAME_KEY {
            for (_, row) in group {
                let key = fresh();
                facts.push(to_fact(row, key));
            }
            continue;
        }

        // Chain state: year and key of the most recent linkable record.
        let mut prev: Option<(i32, String)> = None;
        for (year, year_rows) in &group.chunk_by(|(_, r)| r.base.row.year) {
            let year_rows: Vec<&(String, FullyEnrichedRow)> = year_rows.collect();
            if year_rows.len() > 1 {
                // True duplicates: same name, employer, and year. Ambiguity
                // must never produce a link, and a later year must not link
                // through it either, so the chain is severed here.
                for (_, row) in year_rows {
                    let key = fresh();
                    facts.push(to_fact(row, key));
                }
                prev = None;
            } else {
                let (_, row) = year_rows[0];
                let key = match &prev {
                    Some((prev_year, prev_key)) if year - prev_year <= MAX_LINK_GAP => {
                        prev_key.clone()
                    }
                    _ => fresh(),
                };
                facts.push(to_fact(row, key.clone()));
                prev = Some((year, key));
            }
        }
    }
    facts
}

/// Case-normalized (last, first) identity key. The separator keeps
/// ("AB", "C") distinct from ("A", "BC").
fn name_key(row: &FullyEnrichedRow) -> String {
    format!(
        "{}\u{1f}{}",
        row.base.row.last_name.trim().to_uppercase(),
        row.base.row.first_name.trim().to_uppercase()
    )
}

fn to_fact(row: &FullyEnrichedRow, person_key: String) -> CompFact {
    CompFact {
        year: row.base.row.year,
        person_key,
        employer_id: row.base.employer_id.clone(),
        job_id: row.job_id.clone(),
        salary: row.base.row.salary,
        benefits: row.base.row.benefits,
        total_comp: row.base.row.total_comp,
        first_name: row.base.row.first_name.clone(),
        last_name: row.base.row.last_name.clone(),
        employer_canonical: row.base.employer_canonical.clone(),
        job_canonical: row.job_canonical.clone(),
        job_family: row.job_family.clone(),
    }
}
