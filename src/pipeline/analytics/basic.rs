//! Stage 6a: per-year distribution summaries and top-earner lists.

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::info;

use crate::artifacts::{self, ArtifactPaths};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::pipeline::analytics::{mean, percentile, sorted_sample};
use crate::types::{CompFact, TopEarner, YearSummary};

pub fn run(config: &PipelineConfig, paths: &ArtifactPaths) -> Result<usize> {
    let facts: Vec<CompFact> = artifacts::load_records(&paths.fact_comp, "link_persons")?;
    info!(facts = facts.len(), "generating year summaries and top earners");

    let summaries = year_summaries(&facts);
    artifacts::save_json(&paths.analytics_file("year_summary.json"), &summaries)?;

    let top = top_earners(&facts, config.top_earners_limit);
    artifacts::save_json(&paths.analytics_file("top_earners.json"), &top)?;

    Ok(summaries.len())
}

pub fn year_summaries(facts: &[CompFact]) -> Vec<YearSummary> {
    let mut by_year: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for fact in facts {
        by_year.entry(fact.year).or_default().push(fact.total_comp);
    }

    // Each year's distribution is independent; percentile sorting is the
    // bulk of the work and parallelizes cleanly without affecting output.
    let mut summaries: Vec<YearSummary> = by_year
        .into_par_iter()
        .map(|(year, values)| {
            let sample = sorted_sample(values);
            YearSummary {
                year,
                count: sample.len(),
                mean: mean(&sample),
                p50: percentile(&sample, 0.50),
                p75: percentile(&sample, 0.75),
                p90: percentile(&sample, 0.90),
                p95: percentile(&sample, 0.95),
                p99: percentile(&sample, 0.99),
            }
        })
        .collect();
    summaries.sort_by_key(|s| s.year);
    summaries
}

pub fn top_earners(facts: &[CompFact], limit: usize) -> BTreeMap<i32, Vec<TopEarner>> {
    let mut by_year: BTreeMap<i32, Vec<&CompFact>> = BTreeMap::new();
    for fact in facts {
        by_year.entry(fact.year).or_default().push(fact);
    }

    by_year
        .into_iter()
        .map(|(year, mut year_facts)| {
            // Descending by compensation, with a name tie-break so equal
            // salaries rank identically run to run.
            year_facts.sort_by(|a, b| {
                b.total_comp
                    .total_cmp(&a.total_comp)
                    .then_with(|| a.last_name.cmp(&b.last_name))
                    .then_with(|| a.first_name.cmp(&b.first_name))
                    .then_with(|| a.employer_canonical.cmp(&b.employer_canonical))
            });
            let entries = year_facts
                .into_iter()
                .take(limit)
                .enumerate()
                .map(|(idx, f)| TopEarner {
                    rank: idx + 1,
                    person_key: f.person_key.clone(),
                    first_name: f.first_name.clone(),
                    last_name: f.last_name.clone(),
                    employer: f.employer_canonical.clone(),
                    job_title: f.job_canonical.clone(),
                    salary: f.salary,
                    benefits: f.benefits,
                    total_comp: f.total_comp,
                })
                .collect();
            (year, entries)
        })
        .collect()
}
