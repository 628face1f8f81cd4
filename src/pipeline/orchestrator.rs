use opentelemetry::KeyValue;
use serde::Deserialize;

use crate::backend::ReportSource;
use crate::error::{AppError, current_trace_id};
use crate::report::ReportStatus;
use crate::telemetry::metrics::{
    REPORT_GENERATION_DURATION, REPORT_QUESTIONS, REPORT_SECTIONS, REPORT_UNSTRUCTURED_COUNT,
};

use super::assemble::{self, AssembleParams, EvaluationReport};
use super::{fetch, structure};

#[derive(Debug, Clone, Deserialize)]
pub struct ReportRequest {
    pub file_paths: Vec<String>,
}

impl ReportRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.file_paths.is_empty() {
            return Err(AppError::Validation("file_paths must not be empty".into()));
        }
        if self.file_paths.iter().any(|p| p.trim().is_empty()) {
            return Err(AppError::Validation(
                "file_paths must not contain blank entries".into(),
            ));
        }
        Ok(())
    }

    /// Only the first uploaded file is evaluated.
    pub fn primary_path(&self) -> Option<&str> {
        self.file_paths.first().map(|p| p.trim())
    }
}

#[tracing::instrument(
    name = "pipeline report",
    skip(source, request),
    fields(
        report.id,
        report.file_paths = request.file_paths.len(),
        report.sections,
        report.duration_ms,
    )
)]
pub async fn generate_report(
    source: &dyn ReportSource,
    request: &ReportRequest,
) -> Result<EvaluationReport, AppError> {
    request.validate()?;
    let file_path = request
        .primary_path()
        .ok_or_else(|| AppError::Validation("file_paths must not be empty".into()))?;

    let start = std::time::Instant::now();
    let trace_id = current_trace_id();

    // Stage 1: Ask the backend to evaluate the uploaded file
    let raw = fetch::fetch(source, file_path).await?;

    // Stage 2: Segment the free-text report
    let segmented = structure::structure(&raw);

    // Stage 3: Assemble the response
    let duration = start.elapsed();
    let report = assemble::assemble(AssembleParams {
        file_path,
        raw,
        segmented,
        duration,
        trace_id,
    });

    let status_kv = KeyValue::new("report.status", report.status.as_str());
    REPORT_GENERATION_DURATION.record(duration.as_secs_f64(), &[status_kv.clone()]);
    REPORT_SECTIONS.record(report.sections.len() as f64, &[status_kv.clone()]);
    REPORT_QUESTIONS.record(report.question_count as f64, &[]);
    if report.status != ReportStatus::Structured {
        REPORT_UNSTRUCTURED_COUNT.add(1, &[status_kv]);
    }

    let span = tracing::Span::current();
    span.record("report.id", report.id.to_string());
    span.record("report.sections", report.sections.len());
    span.record("report.duration_ms", report.generation_duration_ms);

    tracing::info!(
        report.id = %report.id,
        report.questions = report.question_count,
        "Evaluation report generated"
    );

    Ok(report)
}
