pub mod backend;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod routes;
pub mod telemetry;

use std::sync::Arc;

pub use config::Config;

use backend::ReportSource;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub source: Arc<dyn ReportSource>,
}
