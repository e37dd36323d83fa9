//! Stage 1: consolidate heterogeneous raw CSV files into the staging table.
//!
//! Source files are one per disclosure year (`<year>.csv`) with close to
//! three decades of header drift between them. Headers are mapped onto the
//! canonical schema through a configurable column map, currency formatting
//! is stripped, and placeholder tokens become 0.0. A malformed row is
//! dropped and counted; an unreadable file fails the run because every
//! downstream stage assumes full-year coverage.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use encoding_rs::WINDOWS_1252;
use tracing::{info, warn};

use crate::artifacts::{self, ArtifactPaths};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::types::StagingRow;

/// Built-in header mappings (lowercased source header -> canonical column).
/// Config `column_map` entries are merged over these.
const DEFAULT_COLUMN_MAP: &[(&str, &str)] = &[
    ("sector", "sector"),
    ("last name", "last_name"),
    ("surname", "last_name"),
    ("last_name", "last_name"),
    ("first name", "first_name"),
    ("first_name", "first_name"),
    ("salary paid", "salary"),
    ("salary", "salary"),
    ("taxable benefits", "benefits"),
    ("benefits", "benefits"),
    ("employer", "employer"),
    ("job title", "job_title"),
    ("position", "job_title"),
    ("job_title", "job_title"),
    ("jobtitle", "job_title"),
];

const REQUIRED_COLUMNS: &[&str] = &[
    "last_name",
    "first_name",
    "salary",
    "benefits",
    "employer",
    "job_title",
];

pub fn run(config: &PipelineConfig, paths: &ArtifactPaths) -> Result<usize> {
    let files = discover_year_files(&config.raw_dir)?;
    if files.is_empty() {
        return Err(PipelineError::Config(format!(
            "no <year>.csv files found in '{}'",
            config.raw_dir.display()
        )));
    }

    let column_map = build_column_map(&config.column_map);
    let mut all_rows = Vec::new();
    for (year, path) in &files {
        let rows = ingest_file(path, *year, &column_map)?;
        info!(year, rows = rows.len(), "ingested file");
        all_rows.extend(rows);
    }

    artifacts::save_records(&paths.stg_rows, &all_rows)?;
    Ok(all_rows.len())
}

/// Find raw files whose stem parses as a year, sorted by year so the
/// staging table is deterministic regardless of directory order.
fn discover_year_files(raw_dir: &Path) -> Result<Vec<(i32, PathBuf)>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(raw_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        match stem.parse::<i32>() {
            Ok(year) if (1900..2100).contains(&year) => files.push((year, path)),
            _ => warn!(file = %path.display(), "skipping file without a year stem"),
        }
    }
    files.sort();
    Ok(files)
}

fn build_column_map(overrides: &HashMap<String, String>) -> HashMap<String, String> {
    let mut map: HashMap<String, String> = DEFAULT_COLUMN_MAP
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    for (k, v) in overrides {
        map.insert(k.trim().to_lowercase(), v.clone());
    }
    map
}

fn ingest_file(path: &Path, year: i32, column_map: &HashMap<String, String>) -> Result<Vec<StagingRow>> {
    let raw = fs::read(path).map_err(|e| PipelineError::Ingest {
        file: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let text = decode_text(&raw);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    // Map header positions onto canonical columns
    let headers = reader.headers().map_err(|e| PipelineError::Ingest {
        file: path.to_path_buf(),
        message: format!("unreadable header row: {e}"),
    })?;
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for (idx, header) in headers.iter().enumerate() {
        let key = header.trim().to_lowercase();
        if let Some(canonical) = column_map.get(&key) {
            positions.entry(canonical.as_str()).or_insert(idx);
        }
    }
    for required in REQUIRED_COLUMNS {
        if !positions.contains_key(required) {
            return Err(PipelineError::Ingest {
                file: path.to_path_buf(),
                message: format!("missing required column '{required}' after header mapping"),
            });
        }
    }

    let field = |record: &csv::StringRecord, name: &str| -> String {
        positions
            .get(name)
            .and_then(|&idx| record.get(idx))
            .unwrap_or("")
            .trim()
            .to_string()
    };

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "dropping malformed row");
                dropped += 1;
                continue;
            }
        };
        let salary = match clean_currency(&field(&record, "salary")) {
            Some(v) => v,
            None => {
                warn!(file = %path.display(), "dropping row with unparseable salary");
                dropped += 1;
                continue;
            }
        };
        let benefits = match clean_currency(&field(&record, "benefits")) {
            Some(v) => v,
            None => {
                warn!(file = %path.display(), "dropping row with unparseable benefits");
                dropped += 1;
                continue;
            }
        };
        rows.push(StagingRow {
            year,
            sector_label: field(&record, "sector"),
            last_name: field(&record, "last_name"),
            first_name: field(&record, "first_name"),
            employer: field(&record, "employer"),
            job_title: field(&record, "job_title"),
            salary,
            benefits,
            total_comp: salary + benefits,
        });
    }
    if dropped > 0 {
        warn!(file = %path.display(), dropped, "rows dropped during ingest");
    }
    Ok(rows)
}

/// Decode file bytes as UTF-8, falling back to Windows-1252 (a Latin-1
/// superset) for the older disclosure files.
fn decode_text(raw: &[u8]) -> String {
    match std::str::from_utf8(raw) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = WINDOWS_1252.decode(raw);
            decoded.into_owned()
        }
    }
}

/// Strip currency formatting and parse. Placeholder tokens (`-`, empty)
/// become 0.0; anything else non-numeric is None so the caller can drop the
/// row.
fn clean_currency(value: &str) -> Option<f64> {
    let cleaned = value.replace(['$', ','], "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned == "-" {
        return Some(0.0);
    }
    cleaned.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_clean_currency_strips_formatting() {
        assert_eq!(clean_currency("$100,123.45"), Some(100_123.45));
        assert_eq!(clean_currency("88000"), Some(88_000.0));
    }

    #[test]
    fn test_clean_currency_placeholder_tokens() {
        assert_eq!(clean_currency("-"), Some(0.0));
        assert_eq!(clean_currency(""), Some(0.0));
        assert_eq!(clean_currency("  "), Some(0.0));
    }

    #[test]
    fn test_clean_currency_rejects_garbage() {
        assert_eq!(clean_currency("abc"), None);
    }

    #[test]
    fn test_ingest_file_maps_headers_and_cleans_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2019.csv");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "Sector,Surname,First Name,Salary Paid,Taxable Benefits,Employer,Position").unwrap();
        writeln!(f, "Municipalities,Doe,Jane,\"$80,000.00\",-,City of Toronto,Analyst").unwrap();
        let rows = ingest_file(&path, 2019, &build_column_map(&HashMap::new())).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.last_name, "Doe");
        assert_eq!(row.job_title, "Analyst");
        assert_eq!(row.salary, 80_000.0);
        assert_eq!(row.benefits, 0.0);
        assert_eq!(row.total_comp, 80_000.0);
    }

    #[test]
    fn test_ingest_file_fails_on_missing_required_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2001.csv");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "Surname,Salary Paid").unwrap();
        writeln!(f, "Doe,100000").unwrap();
        let err = ingest_file(&path, 2001, &build_column_map(&HashMap::new())).unwrap_err();
        assert!(err.to_string().contains("first_name"));
    }

    #[test]
    fn test_ingest_file_latin1_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1998.csv");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(b"Surname,First Name,Salary,Benefits,Employer,Job Title\n").unwrap();
        // 0xC9 is 'E' with acute accent in Windows-1252, invalid as UTF-8
        f.write_all(b"G\xC9NIER,Marie,101000,0,Hydro One,Engineer\n").unwrap();
        let rows = ingest_file(&path, 1998, &build_column_map(&HashMap::new())).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].last_name, "G\u{c9}NIER");
    }

    #[test]
    fn test_discover_skips_non_year_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("2020.csv"), "x").unwrap();
        fs::write(dir.path().join("readme.csv"), "x").unwrap();
        fs::write(dir.path().join("2019.csv"), "x").unwrap();
        let files = discover_year_files(dir.path()).unwrap();
        let years: Vec<i32> = files.iter().map(|(y, _)| *y).collect();
        assert_eq!(years, vec![2019, 2020]);
    }
}
