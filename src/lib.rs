pub mod analysis;
pub mod config;
pub mod error;
pub mod llm;
pub mod routes;
pub mod telemetry;

use std::sync::Arc;

pub use config::Config;

use analysis::Analyzer;

#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<Analyzer>,
}
