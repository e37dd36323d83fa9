use std::fs;
use std::path::Path;

use anyhow::Result;
use tempfile::tempdir;

use sunshine_etl::config::PipelineConfig;
use sunshine_etl::identity::stable_id;
use sunshine_etl::orchestrator::{self, RunOptions};

/// Lay out a small raw dataset: two disclosure years with drifting headers,
/// an aliased employer spelling, a placeholder salary token, and one person
/// ("Jane Doe") appearing in both years at the same employer.
fn write_fixture(root: &Path) -> Result<PipelineConfig> {
    let raw_dir = root.join("raw");
    fs::create_dir_all(&raw_dir)?;
    fs::write(
        raw_dir.join("2019.csv"),
        "Sector,Surname,First Name,Salary Paid,Taxable Benefits,Employer,Position\n\
         Municipalities,Doe,Jane,\"$80,000.00\",0,\"TORONTO, CITY OF\",Analyst\n\
         Municipalities,Chan,Wei,\"$120,000.00\",-,\"TORONTO, CITY OF\",Manager\n\
         Hospitals,Singh,Priya,\"$150,000.00\",\"$2,000.00\",St Marys Hospital,Registered Nurse\n",
    )?;
    fs::write(
        raw_dir.join("2020.csv"),
        "Sector,Last Name,First Name,Salary,Benefits,Employer,Job Title\n\
         Municipalities,Doe,Jane,\"$88,000.00\",0,City of Toronto,Analyst\n\
         Hospitals,Singh,Priya,\"$155,000.00\",\"$2,000.00\",St Marys Hospital,Registered Nurse\n\
         Hospitals,Blank,Pay,-,0,St Marys Hospital,Orderly\n",
    )?;

    let dict_dir = root.join("dictionaries");
    fs::create_dir_all(&dict_dir)?;
    fs::write(
        dict_dir.join("employer_aliases.csv"),
        "raw,canonical\n\"TORONTO, CITY OF\",CITY OF TORONTO\n",
    )?;

    Ok(PipelineConfig {
        raw_dir,
        staging_dir: root.join("staging"),
        curated_dir: root.join("curated"),
        analytics_dir: root.join("analytics"),
        employer_aliases: dict_dir.join("employer_aliases.csv"),
        job_aliases: dict_dir.join("job_title_aliases.csv"),
        ..Default::default()
    })
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

#[test]
fn test_full_pipeline_end_to_end() -> Result<()> {
    let dir = tempdir()?;
    let config = write_fixture(dir.path())?;

    let report = orchestrator::run(&config, &RunOptions::default())?;
    assert!(report.success(), "pipeline failed: {:?}", report.failed);
    assert_eq!(report.completed.len(), 9);

    let analytics = config.analytics_dir.clone();

    // Year summary covers both years in order
    let summary = read_json(&analytics.join("year_summary.json"))?;
    let years: Vec<i64> = summary
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["year"].as_i64().unwrap())
        .collect();
    assert_eq!(years, vec![2019, 2020]);

    // The aliased and plainly spelled employer collapse to one canonical ID
    let toronto_id = stable_id("CITY OF TORONTO");
    let employer_metrics = read_json(&analytics.join("employer_metrics.json"))?;
    let toronto = employer_metrics[&toronto_id].as_array().unwrap();
    assert_eq!(toronto.len(), 2);

    // 2019: Jane Doe retained (linked chain), Wei Chan not seen in 2020.
    // Growth is measured over the retained subset only: +10% for Jane.
    let y2019 = &toronto[0];
    assert_eq!(y2019["year"], 2019);
    assert_eq!(y2019["headcount"], 2);
    assert!((y2019["retention_rate"].as_f64().unwrap() - 0.5).abs() < 1e-9);
    assert!((y2019["growth_median"].as_f64().unwrap() - 0.10).abs() < 1e-9);

    // Final year: retention/growth absent, not zero
    let y2020 = &toronto[1];
    assert_eq!(y2020["year"], 2020);
    assert!(y2020.get("retention_rate").is_none());
    assert!(y2020.get("growth_median").is_none());

    // The "-" salary row ingested as 0.0 instead of failing, and the
    // validator reports it as a high-severity finding
    let report = read_json(&analytics.join("data_quality_report.json"))?;
    let non_positive = report
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["check"] == "non_positive_compensation")
        .unwrap();
    assert_eq!(non_positive["severity"], "High");
    assert_eq!(non_positive["count"], 1);

    // Search index has exactly one Toronto entry under the shared ID
    let index = read_json(&analytics.join("search_index.json"))?;
    let toronto_entries: Vec<&serde_json::Value> = index["employers"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|e| e["name"] == "CITY OF TORONTO")
        .collect();
    assert_eq!(toronto_entries.len(), 1);
    assert_eq!(toronto_entries[0]["id"], toronto_id.as_str());

    // Sector metrics carry both keyword-derived sectors plus _overall
    let sectors = read_json(&analytics.join("sector_metrics.json"))?;
    assert!(sectors.get("Municipalities").is_some());
    assert!(sectors.get("Hospitals").is_some());
    assert!(sectors.get("_overall").is_some());

    // Top earners are ranked from 1 within each year
    let top = read_json(&analytics.join("top_earners.json"))?;
    let top_2019 = top["2019"].as_array().unwrap();
    assert_eq!(top_2019[0]["rank"], 1);
    assert_eq!(top_2019[0]["last_name"], "Singh");

    Ok(())
}

#[test]
fn test_rerun_is_byte_identical() -> Result<()> {
    let dir = tempdir()?;
    let config = write_fixture(dir.path())?;

    let outputs = [
        "year_summary.json",
        "top_earners.json",
        "employer_metrics.json",
        "job_metrics.json",
        "sector_metrics.json",
        "search_index.json",
        "data_quality_report.json",
    ];

    assert!(orchestrator::run(&config, &RunOptions::default())?.success());
    let first: Vec<Vec<u8>> = outputs
        .iter()
        .map(|name| fs::read(config.analytics_dir.join(name)).unwrap())
        .collect();

    assert!(orchestrator::run(&config, &RunOptions::default())?.success());
    for (name, before) in outputs.iter().zip(&first) {
        let after = fs::read(config.analytics_dir.join(name))?;
        assert_eq!(&after, before, "{name} changed between identical runs");
    }
    Ok(())
}

#[test]
fn test_resume_without_upstream_artifacts_names_dependency() -> Result<()> {
    let dir = tempdir()?;
    let config = write_fixture(dir.path())?;

    let options = RunOptions {
        from: Some("link_persons".to_string()),
        ..Default::default()
    };
    let report = orchestrator::run(&config, &options)?;
    assert!(!report.success());
    let (stage, message) = report.failed.unwrap();
    assert_eq!(stage, "link_persons");
    assert!(message.contains("normalize_jobs"), "message was: {message}");
    Ok(())
}

#[test]
fn test_resume_from_stage_reuses_prior_outputs() -> Result<()> {
    let dir = tempdir()?;
    let config = write_fixture(dir.path())?;

    assert!(orchestrator::run(&config, &RunOptions::default())?.success());

    // Wipe analytics and rerun only the aggregation tail
    fs::remove_dir_all(&config.analytics_dir)?;
    let options = RunOptions {
        from: Some("analytics_basic".to_string()),
        ..Default::default()
    };
    let report = orchestrator::run(&config, &options)?;
    assert!(report.success());
    assert!(config.analytics_dir.join("year_summary.json").exists());
    assert!(config.analytics_dir.join("search_index.json").exists());
    Ok(())
}

#[test]
fn test_validate_only_mode() -> Result<()> {
    let dir = tempdir()?;
    let config = write_fixture(dir.path())?;

    assert!(orchestrator::run(&config, &RunOptions::default())?.success());
    fs::remove_dir_all(&config.analytics_dir)?;

    let options = RunOptions {
        validate_only: true,
        ..Default::default()
    };
    let report = orchestrator::run(&config, &options)?;
    assert!(report.success());
    assert_eq!(report.completed.len(), 1);
    assert!(config.analytics_dir.join("data_quality_report.json").exists());
    assert!(!config.analytics_dir.join("year_summary.json").exists());
    Ok(())
}

#[test]
fn test_halt_on_validation_errors() -> Result<()> {
    let dir = tempdir()?;
    let mut config = write_fixture(dir.path())?;
    config.halt_on_validation_errors = true;

    // The fixture contains a zero-compensation row, a High finding
    let report = orchestrator::run(&config, &RunOptions::default())?;
    assert!(!report.success());
    let (stage, _) = report.failed.unwrap();
    assert_eq!(stage, "validate");
    // The report is still written before the halt
    assert!(config.analytics_dir.join("data_quality_report.json").exists());
    // No aggregation stage ran after the halt
    assert!(!config.analytics_dir.join("year_summary.json").exists());
    Ok(())
}

#[test]
fn test_unreadable_file_is_fatal() -> Result<()> {
    let dir = tempdir()?;
    let config = write_fixture(dir.path())?;
    // A year file with none of the required columns
    fs::write(config.raw_dir.join("2021.csv"), "Nothing,Useful\n1,2\n")?;

    let report = orchestrator::run(&config, &RunOptions::default())?;
    assert!(!report.success());
    assert_eq!(report.failed.unwrap().0, "ingest");
    Ok(())
}
