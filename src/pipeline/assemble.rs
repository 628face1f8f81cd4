use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::structure::Segmented;
use crate::report::{ReportStatus, Section};

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub id: Uuid,
    pub file_path: String,
    pub status: ReportStatus,
    pub warning: Option<&'static str>,
    pub question_count: usize,
    pub sections: Vec<Section>,
    pub raw: String,
    pub generated_at: DateTime<Utc>,
    pub generation_duration_ms: u64,
    pub trace_id: Option<String>,
}

pub struct AssembleParams<'a> {
    pub file_path: &'a str,
    pub raw: String,
    pub segmented: Segmented,
    pub duration: Duration,
    pub trace_id: Option<String>,
}

#[tracing::instrument(
    name = "pipeline_stage assemble",
    skip(params),
    fields(pipeline.stage = "assemble", report.id)
)]
pub fn assemble(params: AssembleParams<'_>) -> EvaluationReport {
    let id = Uuid::new_v4();
    tracing::Span::current().record("report.id", id.to_string());

    let Segmented {
        sections,
        status,
        question_count,
    } = params.segmented;

    EvaluationReport {
        id,
        file_path: params.file_path.to_string(),
        status,
        warning: status.warning(),
        question_count,
        sections,
        raw: params.raw,
        generated_at: Utc::now(),
        generation_duration_ms: params.duration.as_millis() as u64,
        trace_id: params.trace_id,
    }
}
