use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::error::{PipelineError, Result};

/// Pipeline configuration, loaded from `config.toml`. Every field has a
/// default so the pipeline runs against the conventional directory layout
/// with no config file at all.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory of raw per-year CSV files (`<year>.csv`).
    pub raw_dir: PathBuf,
    /// Directory for intermediate staging artifacts.
    pub staging_dir: PathBuf,
    /// Directory for curated dimension and fact artifacts.
    pub curated_dir: PathBuf,
    /// Directory for the final JSON analytics artifacts.
    pub analytics_dir: PathBuf,
    /// Curated employer alias dictionary (CSV with `raw,canonical` columns).
    pub employer_aliases: PathBuf,
    /// Curated job-title alias dictionary (same shape).
    pub job_aliases: PathBuf,
    /// Extra source-header mappings merged over the built-in column map.
    pub column_map: HashMap<String, String>,
    /// How many earners to keep per year in `top_earners.json`.
    pub top_earners_limit: usize,
    /// Promote high-severity validation findings to a pipeline halt.
    pub halt_on_validation_errors: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            staging_dir: PathBuf::from("data/staging"),
            curated_dir: PathBuf::from("data/curated"),
            analytics_dir: PathBuf::from("data/analytics"),
            employer_aliases: PathBuf::from("dictionaries/employer_aliases.csv"),
            job_aliases: PathBuf::from("dictionaries/job_title_aliases.csv"),
            column_map: HashMap::new(),
            top_earners_limit: 100,
            halt_on_validation_errors: false,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from an explicit path, or from `config.toml` in the
    /// working directory when present, falling back to defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                let content = fs::read_to_string(p).map_err(|e| {
                    PipelineError::Config(format!("failed to read config file '{}': {}", p.display(), e))
                })?;
                Ok(toml::from_str(&content)?)
            }
            None => {
                let default_path = Path::new("config.toml");
                if default_path.exists() {
                    let content = fs::read_to_string(default_path)?;
                    Ok(toml::from_str(&content)?)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

/// An alias dictionary maps a raw source string to its curated canonical
/// form. These are human-maintained lookup tables, injected as data so
/// curation never requires a redeploy.
#[derive(Debug, Clone, Default)]
pub struct AliasDictionary {
    map: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct AliasRecord {
    raw: String,
    canonical: String,
}

impl AliasDictionary {
    /// Load an alias dictionary from a CSV file. A missing file is not an
    /// error: curation starts empty and grows over time.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "alias dictionary not found, continuing without aliases");
            return Ok(Self::default());
        }
        let mut reader = csv::Reader::from_path(path)?;
        let mut map = HashMap::new();
        for record in reader.deserialize() {
            let record: AliasRecord = record?;
            map.insert(record.raw, record.canonical);
        }
        Ok(Self { map })
    }

    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            map: pairs.into_iter().collect(),
        }
    }

    /// Look up the canonical form for a raw string, exact match only.
    pub fn resolve(&self, raw: &str) -> Option<&str> {
        self.map.get(raw).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
