//! Stage 6b: per-employer and per-job metrics with retention and growth.
//!
//! Retention and growth are forward-looking against year+1 and only ever
//! measured over linked chains, so a person who changed employer counts as
//! departed rather than contributing a bogus growth sample. Both metrics are
//! omitted when undefined: the dataset's final year has no year+1, and an
//! entity with nobody retained has no growth distribution to take a median
//! of.

use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;
use tracing::info;

use crate::artifacts::{self, ArtifactPaths};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::pipeline::analytics::{mean, median, percentile, sorted_sample};
use crate::types::{CompFact, EntityYearMetric};

pub fn run(_config: &PipelineConfig, paths: &ArtifactPaths) -> Result<usize> {
    let facts: Vec<CompFact> = artifacts::load_records(&paths.fact_comp, "link_persons")?;
    info!(facts = facts.len(), "generating employer and job metrics");

    let employer_metrics = entity_metrics(&facts, |f| f.employer_id.as_str());
    artifacts::save_json(&paths.analytics_file("employer_metrics.json"), &employer_metrics)?;

    let job_metrics = entity_metrics(&facts, |f| f.job_id.as_str());
    artifacts::save_json(&paths.analytics_file("job_metrics.json"), &job_metrics)?;

    info!(
        employers = employer_metrics.len(),
        jobs = job_metrics.len(),
        "entity metrics written"
    );
    Ok(employer_metrics.len() + job_metrics.len())
}

/// Compute per-year metrics for every entity selected by `key`. Only
/// (entity, year) groups that actually have rows are emitted; zero-headcount
/// combinations never appear in the output.
pub fn entity_metrics<F>(facts: &[CompFact], key: F) -> BTreeMap<String, Vec<EntityYearMetric>>
where
    F: Fn(&CompFact) -> &str + Sync,
{
    let Some(final_year) = facts.iter().map(|f| f.year).max() else {
        return BTreeMap::new();
    };

    // person_key -> total_comp per (entity, year), for retention lookups
    let mut presence: HashMap<(&str, i32), HashMap<&str, f64>> = HashMap::new();
    for fact in facts {
        presence
            .entry((key(fact), fact.year))
            .or_default()
            .insert(fact.person_key.as_str(), fact.total_comp);
    }

    let groups: Vec<(&str, i32, &HashMap<&str, f64>)> = presence
        .iter()
        .map(|(&(entity, year), people)| (entity, year, people))
        .collect();

    let mut computed: Vec<(&str, EntityYearMetric)> = groups
        .into_par_iter()
        .map(|(entity, year, people)| {
            let sample = sorted_sample(people.values().copied().collect());
            let (retention_rate, growth_median) = if year == final_year {
                (None, None)
            } else {
                retention_and_growth(people, presence.get(&(entity, year + 1)))
            };
            let metric = EntityYearMetric {
                year,
                headcount: sample.len(),
                mean_pay: mean(&sample),
                p50: percentile(&sample, 0.50),
                p75: percentile(&sample, 0.75),
                p90: percentile(&sample, 0.90),
                p99: percentile(&sample, 0.99),
                retention_rate,
                growth_median,
            };
            (entity, metric)
        })
        .collect();

    computed.sort_by(|(ea, ma), (eb, mb)| ea.cmp(eb).then(ma.year.cmp(&mb.year)));

    let mut out: BTreeMap<String, Vec<EntityYearMetric>> = BTreeMap::new();
    for (entity, metric) in computed {
        out.entry(entity.to_string()).or_default().push(metric);
    }
    out
}

/// Retention = share of this year's people still present next year.
/// Growth = median relative compensation change over that retained subset.
fn retention_and_growth(
    current: &HashMap<&str, f64>,
    next: Option<&HashMap<&str, f64>>,
) -> (Option<f64>, Option<f64>) {
    let empty = HashMap::new();
    let next = next.unwrap_or(&empty);

    let mut retained = 0usize;
    let mut growth_sample = Vec::new();
    for (person, &comp) in current {
        if let Some(&next_comp) = next.get(person) {
            retained += 1;
            if comp > 0.0 {
                growth_sample.push((next_comp - comp) / comp);
            }
        }
    }

    let retention = Some(retained as f64 / current.len() as f64);
    let growth = if growth_sample.is_empty() {
        None
    } else {
        Some(median(&sorted_sample(growth_sample)))
    };
    (retention, growth)
}
