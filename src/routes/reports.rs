use axum::{Json, extract::State, http::header, response::IntoResponse};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::AppResult;
use crate::pipeline::{EvaluationReport, ReportRequest, Segmented, generate_report, structure};
use crate::report::{ReportStatus, Section, render_markdown};

#[derive(Debug, Deserialize)]
pub struct RawReportBody {
    pub report: String,
}

#[derive(Debug, Serialize)]
pub struct SegmentResponse {
    pub status: ReportStatus,
    pub warning: Option<&'static str>,
    pub question_count: usize,
    pub sections: Vec<Section>,
}

impl From<Segmented> for SegmentResponse {
    fn from(segmented: Segmented) -> Self {
        Self {
            status: segmented.status,
            warning: segmented.status.warning(),
            question_count: segmented.question_count,
            sections: segmented.sections,
        }
    }
}

pub async fn segment_report(Json(body): Json<RawReportBody>) -> Json<SegmentResponse> {
    Json(structure(&body.report).into())
}

pub async fn render_report(Json(body): Json<RawReportBody>) -> impl IntoResponse {
    let segmented = structure(&body.report);
    (
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        render_markdown(&segmented.sections),
    )
}

pub async fn generate(
    State(state): State<AppState>,
    Json(body): Json<ReportRequest>,
) -> AppResult<Json<EvaluationReport>> {
    let report = generate_report(state.source.as_ref(), &body).await?;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_report_body_deserialize() {
        let body: RawReportBody =
            serde_json::from_str(r#"{"report": "- **Student Details**:"}"#).unwrap();
        assert_eq!(body.report, "- **Student Details**:");
    }

    #[test]
    fn test_raw_report_body_requires_report() {
        assert!(serde_json::from_str::<RawReportBody>("{}").is_err());
    }

    #[test]
    fn test_segment_response_from_empty() {
        let response = SegmentResponse::from(structure(""));
        assert_eq!(response.status, ReportStatus::Empty);
        assert_eq!(response.warning, Some("No evaluation report available."));
        assert!(response.sections.is_empty());
    }
}
