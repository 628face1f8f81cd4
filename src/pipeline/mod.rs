pub mod assemble;
pub mod fetch;
pub mod orchestrator;
pub mod structure;

pub use assemble::EvaluationReport;
pub use orchestrator::{ReportRequest, generate_report};
pub use structure::{Segmented, structure};
