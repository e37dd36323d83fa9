//! Runs the pipeline stages in fixed dependency order.
//!
//! Stages hand off through on-disk artifacts only, so resuming from an
//! arbitrary stage just trusts the prior outputs that already exist; the
//! artifact loaders report a named missing dependency if they do not. On any
//! stage failure the run halts immediately: once an upstream invariant is
//! gone, no later stage's output can be trusted.

use std::time::Instant;

use tracing::{error, info};

use crate::artifacts::ArtifactPaths;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::pipeline;

pub struct Stage {
    pub name: &'static str,
    pub description: &'static str,
    run: fn(&PipelineConfig, &ArtifactPaths) -> Result<usize>,
}

pub const STAGES: &[Stage] = &[
    Stage {
        name: "ingest",
        description: "Consolidate raw CSVs into the staging table",
        run: pipeline::ingest::run,
    },
    Stage {
        name: "normalize_employers",
        description: "Canonicalize employer names and assign IDs",
        run: pipeline::normalize::employers::run,
    },
    Stage {
        name: "normalize_jobs",
        description: "Standardize job titles and infer families",
        run: pipeline::normalize::jobs::run,
    },
    Stage {
        name: "link_persons",
        description: "Link individuals across years into chains",
        run: pipeline::link::run,
    },
    Stage {
        name: "validate",
        description: "Run data-quality checks over the fact table",
        run: pipeline::validate::run,
    },
    Stage {
        name: "analytics_basic",
        description: "Generate year summaries and top earners",
        run: pipeline::analytics::basic::run,
    },
    Stage {
        name: "analytics_employer_job",
        description: "Generate employer and job metrics",
        run: pipeline::analytics::employer_job::run,
    },
    Stage {
        name: "analytics_sector",
        description: "Generate sector-level analytics",
        run: pipeline::analytics::sector::run,
    },
    Stage {
        name: "search_index",
        description: "Export employer and job search indexes",
        run: pipeline::search_index::run,
    },
];

#[derive(Debug, Default, Clone)]
pub struct RunOptions {
    /// Run exactly one named stage.
    pub stage: Option<String>,
    /// Resume from a named stage, trusting earlier outputs on disk.
    pub from: Option<String>,
    /// Run only the validation stage.
    pub validate_only: bool,
    /// Skip the validation stage in a full run.
    pub skip_validation: bool,
}

#[derive(Debug)]
pub struct StageOutcome {
    pub name: &'static str,
    pub seconds: f64,
    pub rows: usize,
}

#[derive(Debug)]
pub struct PipelineReport {
    pub completed: Vec<StageOutcome>,
    pub failed: Option<(String, String)>,
}

impl PipelineReport {
    pub fn success(&self) -> bool {
        self.failed.is_none()
    }

    pub fn total_seconds(&self) -> f64 {
        self.completed.iter().map(|o| o.seconds).sum()
    }
}

/// Resolve which stages a set of options selects, in pipeline order.
pub fn select_stages(options: &RunOptions) -> Result<Vec<&'static Stage>> {
    let mut selected: Vec<&'static Stage> = if options.validate_only {
        STAGES.iter().filter(|s| s.name == "validate").collect()
    } else if let Some(name) = &options.stage {
        let stage = STAGES
            .iter()
            .find(|s| s.name == name.as_str())
            .ok_or_else(|| PipelineError::UnknownStage(name.clone()))?;
        vec![stage]
    } else if let Some(name) = &options.from {
        let start = STAGES
            .iter()
            .position(|s| s.name == name.as_str())
            .ok_or_else(|| PipelineError::UnknownStage(name.clone()))?;
        STAGES[start..].iter().collect()
    } else {
        STAGES.iter().collect()
    };

    if options.skip_validation && !options.validate_only {
        selected.retain(|s| s.name != "validate");
    }
    Ok(selected)
}

pub fn run(config: &PipelineConfig, options: &RunOptions) -> Result<PipelineReport> {
    let stages = select_stages(options)?;
    let paths = ArtifactPaths::from_config(config);

    let mut report = PipelineReport {
        completed: Vec::new(),
        failed: None,
    };

    for stage in stages {
        println!("\n{}", "=".repeat(60));
        println!("📦 Stage: {}", stage.name);
        println!("   {}", stage.description);
        println!("{}", "=".repeat(60));
        info!(stage = stage.name, "stage starting");

        let start = Instant::now();
        match (stage.run)(config, &paths) {
            Ok(rows) => {
                let seconds = start.elapsed().as_secs_f64();
                println!("✅ {} completed in {:.1}s ({} rows)", stage.name, seconds, rows);
                info!(stage = stage.name, seconds, rows, "stage complete");
                report.completed.push(StageOutcome {
                    name: stage.name,
                    seconds,
                    rows,
                });
            }
            Err(e) => {
                let seconds = start.elapsed().as_secs_f64();
                println!("❌ {} failed after {:.1}s: {}", stage.name, seconds, e);
                error!(stage = stage.name, error = %e, "stage failed, halting pipeline");
                report.failed = Some((stage.name.to_string(), e.to_string()));
                break;
            }
        }
    }

    print_summary(&report);
    Ok(report)
}

fn print_summary(report: &PipelineReport) {
    println!("\n{}", "=".repeat(60));
    println!("📊 Pipeline Summary");
    println!("{}", "=".repeat(60));
    for outcome in &report.completed {
        println!("   ✅ {:<24} {:>8.1}s {:>12} rows", outcome.name, outcome.seconds, outcome.rows);
    }
    match &report.failed {
        Some((stage, message)) => {
            println!("   ❌ {stage}: {message}");
            println!("   ⛔ Pipeline halted at stage: {stage}");
        }
        None => println!("   All stages completed successfully"),
    }
    println!("   Total time: {:.1}s", report.total_seconds());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(stages: &[&Stage]) -> Vec<&'static str> {
        stages.iter().map(|s| s.name).collect()
    }

    #[test]
    fn test_full_run_selects_all_stages_in_order() {
        let stages = select_stages(&RunOptions::default()).unwrap();
        assert_eq!(
            names(&stages),
            vec![
                "ingest",
                "normalize_employers",
                "normalize_jobs",
                "link_persons",
                "validate",
                "analytics_basic",
                "analytics_employer_job",
                "analytics_sector",
                "search_index",
            ]
        );
    }

    #[test]
    fn test_single_stage_selection() {
        let options = RunOptions {
            stage: Some("link_persons".to_string()),
            ..Default::default()
        };
        assert_eq!(names(&select_stages(&options).unwrap()), vec!["link_persons"]);
    }

    #[test]
    fn test_resume_from_stage() {
        let options = RunOptions {
            from: Some("validate".to_string()),
            ..Default::default()
        };
        assert_eq!(
            names(&select_stages(&options).unwrap()),
            vec![
                "validate",
                "analytics_basic",
                "analytics_employer_job",
                "analytics_sector",
                "search_index",
            ]
        );
    }

    #[test]
    fn test_validate_only_and_skip_validation() {
        let options = RunOptions {
            validate_only: true,
            ..Default::default()
        };
        assert_eq!(names(&select_stages(&options).unwrap()), vec!["validate"]);

        let options = RunOptions {
            skip_validation: true,
            ..Default::default()
        };
        assert!(!names(&select_stages(&options).unwrap()).contains(&"validate"));
    }

    #[test]
    fn test_unknown_stage_is_an_error() {
        let options = RunOptions {
            stage: Some("make_coffee".to_string()),
            ..Default::default()
        };
        assert!(select_stages(&options).is_err());
    }
}
