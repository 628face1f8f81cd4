use crate::report::{ReportStatus, Section, assess, segment};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segmented {
    pub sections: Vec<Section>,
    pub status: ReportStatus,
    pub question_count: usize,
}

#[tracing::instrument(
    name = "pipeline_stage segment",
    skip(raw),
    fields(
        pipeline.stage = "segment",
        report.length = raw.len(),
        report.sections,
        report.questions,
        report.status,
    )
)]
pub fn structure(raw: &str) -> Segmented {
    let sections = segment(raw);
    let status = assess(&sections);
    let question_count = sections
        .iter()
        .filter(|s| matches!(s, Section::Question { .. }))
        .count();

    let span = tracing::Span::current();
    span.record("report.sections", sections.len());
    span.record("report.questions", question_count);
    span.record("report.status", status.as_str());

    if let Some(warning) = status.warning() {
        tracing::warn!(report.status = status.as_str(), "{warning}");
    }

    Segmented {
        sections,
        status,
        question_count,
    }
}
