// Pipeline stages in dependency order: ingest, normalize, link, validate,
// aggregate, index.

pub mod analytics;
pub mod ingest;
pub mod link;
pub mod normalize;
pub mod search_index;
pub mod validate;
