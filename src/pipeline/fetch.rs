use crate::backend::ReportSource;
use crate::error::AppError;

#[tracing::instrument(
    name = "pipeline_stage fetch",
    skip(source),
    fields(
        pipeline.stage = "fetch",
        backend.name = source.name(),
        report.length,
    )
)]
pub async fn fetch(source: &dyn ReportSource, file_path: &str) -> Result<String, AppError> {
    let raw = source
        .generate(&[file_path.to_string()])
        .await
        .map_err(|e| AppError::Backend(e.to_string()))?;

    tracing::Span::current().record("report.length", raw.len());
    tracing::debug!(report.raw = %raw, "Raw report received");

    Ok(raw)
}
