pub mod artifacts;
pub mod config;
pub mod error;
pub mod identity;
pub mod logging;
pub mod orchestrator;
pub mod pipeline;
pub mod types;

pub use error::{PipelineError, Result};
