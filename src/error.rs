use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Ingestion failed for {}: {message}", file.display())]
    Ingest { file: PathBuf, message: String },

    #[error("Missing input artifact {}: run the '{produced_by}' stage first", path.display())]
    MissingArtifact { produced_by: String, path: PathBuf },

    #[error("Validation reported {high_count} high-severity finding(s) and halt_on_validation_errors is set")]
    ValidationHalt { high_count: usize },

    #[error("Unknown stage: {0}")]
    UnknownStage(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
