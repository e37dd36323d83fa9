use serde::{Deserialize, Serialize};

/// One raw disclosure record after column normalization. Text fields are
/// trimmed but otherwise untouched; currency fields are already numeric.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StagingRow {
    pub year: i32,
    /// Sector label as printed in the source file, when the file carries one.
    /// Kept for debugging only; metric sectors come from keyword rules.
    #[serde(default)]
    pub sector_label: String,
    pub last_name: String,
    pub first_name: String,
    pub employer: String,
    pub job_title: String,
    pub salary: f64,
    pub benefits: f64,
    pub total_comp: f64,
}

/// A staging row enriched with canonical employer identity (post stage 2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployerEnrichedRow {
    #[serde(flatten)]
    pub row: StagingRow,
    pub employer_id: String,
    pub employer_canonical: String,
}

/// A staging row enriched with both canonical identities (post stage 3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullyEnrichedRow {
    #[serde(flatten)]
    pub base: EmployerEnrichedRow,
    pub job_id: String,
    pub job_canonical: String,
    pub job_family: String,
}

/// Canonical employer entity. `employer_id` is content-addressed from
/// `canonical_name` (see `identity::stable_id`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmployerDim {
    pub employer_id: String,
    pub canonical_name: String,
}

/// Canonical job entity with its inferred family.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobDim {
    pub job_id: String,
    pub canonical_title: String,
    pub job_family: String,
}

/// One compensation record with resolved foreign keys. `person_key` is a
/// chain continuity marker assigned by the person linker, not a real-world
/// identifier: it breaks on employer change, a year gap over two, or
/// ambiguity. Display fields are denormalized so the top-earners output
/// needs no joins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompFact {
    pub year: i32,
    pub person_key: String,
    pub employer_id: String,
    pub job_id: String,
    pub salary: f64,
    pub benefits: f64,
    pub total_comp: f64,
    pub first_name: String,
    pub last_name: String,
    pub employer_canonical: String,
    pub job_canonical: String,
    pub job_family: String,
}

/// Severity of a data-quality finding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
}

/// One row of the data-quality report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityFinding {
    pub check: String,
    pub severity: Severity,
    pub count: usize,
    pub detail: String,
}

/// Per-year distribution summary over total compensation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearSummary {
    pub year: i32,
    pub count: usize,
    pub mean: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

/// One top-earner entry within a year, ranked 1..=N by total compensation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopEarner {
    pub rank: usize,
    pub person_key: String,
    pub first_name: String,
    pub last_name: String,
    pub employer: String,
    pub job_title: String,
    pub salary: f64,
    pub benefits: f64,
    pub total_comp: f64,
}

/// Per-year metrics for one employer or one job.
///
/// `retention_rate` and `growth_median` are forward-looking against year+1
/// and are omitted (None) when undefined: the dataset's final year has no
/// year+1, and an entity with no retained people has no growth sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityYearMetric {
    pub year: i32,
    pub headcount: usize,
    pub mean_pay: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p99: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub growth_median: Option<f64>,
}

/// Per-year metrics for one sector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorYearMetric {
    pub headcount: usize,
    pub total_payroll: f64,
    pub mean_pay: f64,
    pub median_pay: f64,
    pub p75: f64,
    pub p90: f64,
    pub p99: f64,
    pub min_pay: f64,
    pub max_pay: f64,
    pub unique_employers: usize,
    pub yoy_headcount_growth: f64,
    pub yoy_pay_growth: f64,
}

/// Search index entry for an employer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployerIndexEntry {
    pub id: String,
    pub name: String,
}

/// Search index entry for a job title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobIndexEntry {
    pub id: String,
    pub title: String,
    pub family: String,
}
