//! Stage 5: data-quality checks over the fact table.
//!
//! Advisory by default: findings go to `data_quality_report.json` and never
//! mutate upstream data. The orchestrator only halts on high-severity
//! findings when `halt_on_validation_errors` is set.

use std::collections::{BTreeMap, HashMap};

use tracing::{info, warn};

use crate::artifacts::{self, ArtifactPaths};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::types::{CompFact, QualityFinding, Severity};

/// Flag, do not reject: some executives really are paid this much.
const OUTLIER_THRESHOLD: f64 = 2_000_000.0;
/// Headcount drops are only meaningful for employers of some size.
const DROP_BASELINE_HEADCOUNT: usize = 50;

pub fn run(config: &PipelineConfig, paths: &ArtifactPaths) -> Result<usize> {
    let facts: Vec<CompFact> = artifacts::load_records(&paths.fact_comp, "link_persons")?;
    info!(facts = facts.len(), "running data-quality checks");

    let findings = check_all(&facts);
    artifacts::save_json(&paths.analytics_file("data_quality_report.json"), &findings)?;

    let high_count: usize = findings
        .iter()
        .filter(|f| f.severity == Severity::High)
        .map(|f| f.count)
        .sum();
    if high_count > 0 {
        warn!(high_count, "high-severity data-quality findings");
        if config.halt_on_validation_errors {
            return Err(PipelineError::ValidationHalt { high_count });
        }
    }
    Ok(findings.len())
}

pub fn check_all(facts: &[CompFact]) -> Vec<QualityFinding> {
    vec![
        check_missing_fields(facts),
        check_salary_outliers(facts),
        check_non_positive_comp(facts),
        check_headcount_drops(facts),
        check_exact_duplicates(facts),
        summary(facts),
    ]
}

/// Null or empty critical fields. Compensation of exactly zero is handled by
/// the non-positive check; here we only look at identity fields.
fn check_missing_fields(facts: &[CompFact]) -> QualityFinding {
    let count = facts
        .iter()
        .filter(|f| {
            f.first_name.trim().is_empty()
                || f.last_name.trim().is_empty()
                || f.employer_canonical.trim().is_empty()
        })
        .count();
    QualityFinding {
        check: "missing_critical_fields".to_string(),
        severity: Severity::High,
        count,
        detail: "rows with an empty name or employer".to_string(),
    }
}

fn check_salary_outliers(facts: &[CompFact]) -> QualityFinding {
    let count = facts.iter().filter(|f| f.total_comp > OUTLIER_THRESHOLD).count();
    QualityFinding {
        check: "salary_outlier_high".to_string(),
        severity: Severity::Medium,
        count,
        detail: format!("rows with total_comp above ${OUTLIER_THRESHOLD:.0} (flagged, not rejected)"),
    }
}

/// Zero conflates "unreported" with "cleaned invalid token" from ingest, so
/// non-positive compensation is a genuine data error.
fn check_non_positive_comp(facts: &[CompFact]) -> QualityFinding {
    let count = facts.iter().filter(|f| f.total_comp <= 0.0).count();
    QualityFinding {
        check: "non_positive_compensation".to_string(),
        severity: Severity::High,
        count,
        detail: "rows with total_comp <= 0".to_string(),
    }
}

/// A year-over-year employer headcount drop above 50% usually signals an
/// ingestion or coverage problem, not a real workforce collapse.
fn check_headcount_drops(facts: &[CompFact]) -> QualityFinding {
    let mut headcounts: HashMap<&str, BTreeMap<i32, usize>> = HashMap::new();
    for fact in facts {
        *headcounts
            .entry(fact.employer_id.as_str())
            .or_default()
            .entry(fact.year)
            .or_insert(0) += 1;
    }

    let mut count = 0;
    for by_year in headcounts.values() {
        let series: Vec<(&i32, &usize)> = by_year.iter().collect();
        for window in series.windows(2) {
            let (&prev_year, &prev_count) = window[0];
            let (&curr_year, &curr_count) = window[1];
            if curr_year == prev_year + 1
                && prev_count >= DROP_BASELINE_HEADCOUNT
                && (curr_count as f64) < (prev_count as f64) * 0.5
            {
                count += 1;
            }
        }
    }
    QualityFinding {
        check: "headcount_drop_over_50pct".to_string(),
        severity: Severity::Medium,
        count,
        detail: format!(
            "employer-year pairs where headcount fell by more than half (baseline >= {DROP_BASELINE_HEADCOUNT})"
        ),
    }
}

fn check_exact_duplicates(facts: &[CompFact]) -> QualityFinding {
    let mut groups: HashMap<(String, String, String, i32, u64), usize> = HashMap::new();
    for fact in facts {
        let key = (
            fact.first_name.clone(),
            fact.last_name.clone(),
            fact.employer_id.clone(),
            fact.year,
            fact.total_comp.to_bits(),
        );
        *groups.entry(key).or_insert(0) += 1;
    }
    let count = groups.values().filter(|&&n| n > 1).map(|&n| n).sum::<usize>();
    QualityFinding {
        check: "exact_duplicates".to_string(),
        severity: Severity::Low,
        count,
        detail: "rows sharing name, employer, year, and total_comp".to_string(),
    }
}

fn summary(facts: &[CompFact]) -> QualityFinding {
    let years: Vec<i32> = facts.iter().map(|f| f.year).collect();
    let min_year = years.iter().min().copied().unwrap_or(0);
    let max_year = years.iter().max().copied().unwrap_or(0);
    let employers: std::collections::HashSet<&str> =
        facts.iter().map(|f| f.employer_id.as_str()).collect();
    QualityFinding {
        check: "summary".to_string(),
        severity: Severity::Info,
        count: facts.len(),
        detail: format!(
            "{} rows, years {min_year}-{max_year}, {} distinct employers",
            facts.len(),
            employers.len()
        ),
    }
}
