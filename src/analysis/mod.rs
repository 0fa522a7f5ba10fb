pub mod extract;
pub mod prompt;
pub mod schema;
pub mod service;

pub use extract::ExtractionStrategy;
pub use service::{AnalysisError, AnalysisSettings, Analyzer};
