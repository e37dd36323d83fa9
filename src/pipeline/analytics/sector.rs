//! Stage 6c: sector-level metrics.
//!
//! Employers are assigned to exactly one sector by ordered keyword rules
//! over the canonical employer name; the first matching rule wins and
//! anything unmatched lands in the explicit "Other" bucket. The raw files'
//! own sector column is deliberately not trusted here: its wording drifts
//! across three decades, while the canonical name is stable by construction.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use tracing::info;

use crate::artifacts::{self, ArtifactPaths};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::pipeline::analytics::{mean, median, percentile, sorted_sample};
use crate::types::{CompFact, SectorYearMetric};

/// Ordered (keyword, sector) rules applied to the lowercased canonical
/// employer name.
const SECTOR_RULES: &[(&str, &str)] = &[
    ("hospital", "Hospitals"),
    ("health", "Hospitals"),
    ("university", "Universities & Colleges"),
    ("college", "Universities & Colleges"),
    ("school", "School Boards"),
    ("police", "Police"),
    ("hydro", "Energy"),
    ("power", "Energy"),
    ("electric", "Energy"),
    ("city of", "Municipalities"),
    ("town of", "Municipalities"),
    ("township", "Municipalities"),
    ("county of", "Municipalities"),
    ("municipality", "Municipalities"),
    ("ministry", "Provincial Government"),
];

pub const DEFAULT_SECTOR: &str = "Other";

const TOP_JOB_TITLES_PER_SECTOR: usize = 10;

#[derive(Debug, Serialize)]
pub struct SectorEntry {
    pub years: BTreeMap<i32, SectorYearMetric>,
    pub top_job_titles: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct OverallYear {
    pub headcount: usize,
    pub total_payroll: f64,
    pub mean_pay: f64,
    pub median_pay: f64,
}

#[derive(Debug, Serialize)]
pub struct OverallEntry {
    pub years: BTreeMap<i32, OverallYear>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SectorMetricsValue {
    Sector(SectorEntry),
    Overall(OverallEntry),
}

pub fn run(_config: &PipelineConfig, paths: &ArtifactPaths) -> Result<usize> {
    let facts: Vec<CompFact> = artifacts::load_records(&paths.fact_comp, "link_persons")?;
    info!(facts = facts.len(), "generating sector metrics");

    let output = sector_metrics(&facts);
    artifacts::save_json(&paths.analytics_file("sector_metrics.json"), &output)?;
    Ok(output.len())
}

/// First matching keyword rule wins; unmatched employers are "Other".
pub fn assign_sector(canonical_employer: &str) -> &'static str {
    let lowered = canonical_employer.to_lowercase();
    for &(keyword, sector) in SECTOR_RULES {
        if lowered.contains(keyword) {
            return sector;
        }
    }
    DEFAULT_SECTOR
}

pub fn sector_metrics(facts: &[CompFact]) -> BTreeMap<String, SectorMetricsValue> {
    let mut by_sector_year: BTreeMap<(&'static str, i32), Vec<&CompFact>> = BTreeMap::new();
    for fact in facts {
        let sector = assign_sector(&fact.employer_canonical);
        by_sector_year.entry((sector, fact.year)).or_default().push(fact);
    }

    // Per (sector, year) base stats, in year order per sector so the
    // year-over-year deltas can look at the previous available year.
    let mut entries: BTreeMap<String, SectorEntry> = BTreeMap::new();
    let mut prev_by_sector: HashMap<&'static str, (usize, f64)> = HashMap::new();
    for (&(sector, year), rows) in &by_sector_year {
        let sample = sorted_sample(rows.iter().map(|f| f.total_comp).collect());
        let employers: HashSet<&str> = rows.iter().map(|f| f.employer_id.as_str()).collect();
        let headcount = sample.len();
        let mean_pay = mean(&sample);

        let (yoy_headcount_growth, yoy_pay_growth) = match prev_by_sector.get(sector) {
            Some(&(prev_headcount, prev_mean)) if prev_headcount > 0 && prev_mean != 0.0 => (
                (headcount as f64 - prev_headcount as f64) / prev_headcount as f64,
                (mean_pay - prev_mean) / prev_mean,
            ),
            _ => (0.0, 0.0),
        };
        prev_by_sector.insert(sector, (headcount, mean_pay));

        let metric = SectorYearMetric {
            headcount,
            total_payroll: sample.iter().sum(),
            mean_pay,
            median_pay: median(&sample),
            p75: percentile(&sample, 0.75),
            p90: percentile(&sample, 0.90),
            p99: percentile(&sample, 0.99),
            min_pay: sample.first().copied().unwrap_or(0.0),
            max_pay: sample.last().copied().unwrap_or(0.0),
            unique_employers: employers.len(),
            yoy_headcount_growth,
            yoy_pay_growth,
        };
        entries
            .entry(sector.to_string())
            .or_insert_with(|| SectorEntry {
                years: BTreeMap::new(),
                top_job_titles: Vec::new(),
            })
            .years
            .insert(year, metric);
    }

    // Top job titles per sector across all years
    let mut title_counts: HashMap<&'static str, HashMap<&str, usize>> = HashMap::new();
    for fact in facts {
        let sector = assign_sector(&fact.employer_canonical);
        *title_counts
            .entry(sector)
            .or_default()
            .entry(fact.job_canonical.as_str())
            .or_insert(0) += 1;
    }
    for (sector, counts) in title_counts {
        let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        if let Some(entry) = entries.get_mut(sector) {
            entry.top_job_titles = ranked
                .into_iter()
                .take(TOP_JOB_TITLES_PER_SECTOR)
                .map(|(title, _)| title.to_string())
                .collect();
        }
    }

    let mut output: BTreeMap<String, SectorMetricsValue> = entries
        .into_iter()
        .map(|(sector, entry)| (sector, SectorMetricsValue::Sector(entry)))
        .collect();
    output.insert("_overall".to_string(), SectorMetricsValue::Overall(overall(facts)));
    output
}

/// Year totals across every sector combined.
fn overall(facts: &[CompFact]) -> OverallEntry {
    let mut by_year: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for fact in facts {
        by_year.entry(fact.year).or_default().push(fact.total_comp);
    }
    let years = by_year
        .into_iter()
        .map(|(year, values)| {
            let sample = sorted_sample(values);
            (
                year,
                OverallYear {
                    headcount: sample.len(),
                    total_payroll: sample.iter().sum(),
                    mean_pay: mean(&sample),
                    median_pay: median(&sample),
                },
            )
        })
        .collect();
    OverallEntry { years }
}
