use std::fmt::Write;

use serde::Serialize;

use super::segment::{Fields, QUESTION_NUMBER, Section};

pub const ORIGINAL_QUESTION: &str = "Original Question";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecklistItem {
    pub label: &'static str,
    pub icon: &'static str,
}

/// Labels shown for each question, in display order.
pub static QUESTION_CHECKLIST: [ChecklistItem; 9] = [
    ChecklistItem {
        label: QUESTION_NUMBER,
        icon: "🔢",
    },
    ChecklistItem {
        label: ORIGINAL_QUESTION,
        icon: "❓",
    },
    ChecklistItem {
        label: "Mark Range",
        icon: "📊",
    },
    ChecklistItem {
        label: "Content Validity",
        icon: "✅",
    },
    ChecklistItem {
        label: "Key Concepts Present",
        icon: "🔑",
    },
    ChecklistItem {
        label: "Missing or Incorrect Concepts",
        icon: "❌",
    },
    ChecklistItem {
        label: "Content Sufficiency and Quality",
        icon: "📝",
    },
    ChecklistItem {
        label: "Mark Justification",
        icon: "⚖️",
    },
    ChecklistItem {
        label: "Suggestions for Improvement",
        icon: "💡",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Structured,
    Unstructured,
    Empty,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::Structured => "structured",
            ReportStatus::Unstructured => "unstructured",
            ReportStatus::Empty => "empty",
        }
    }

    pub fn warning(self) -> Option<&'static str> {
        match self {
            ReportStatus::Structured => None,
            ReportStatus::Unstructured => {
                Some("The report could not be parsed into sections; showing raw text.")
            }
            ReportStatus::Empty => Some("No evaluation report available."),
        }
    }
}

pub fn assess(sections: &[Section]) -> ReportStatus {
    if sections.is_empty() {
        return ReportStatus::Empty;
    }
    let structured = sections
        .iter()
        .any(|s| matches!(s, Section::Student { .. } | Section::Question { .. }));
    if structured {
        ReportStatus::Structured
    } else {
        ReportStatus::Unstructured
    }
}

pub fn question_title(index: usize, fields: &Fields) -> String {
    let number = fields.get(QUESTION_NUMBER).filter(|v| !v.is_empty());
    let original = fields.get(ORIGINAL_QUESTION).filter(|v| !v.is_empty());
    match (number, original) {
        (Some(number), Some(original)) => format!("{number}: {original}"),
        _ => format!("Question {}", index + 1),
    }
}

/// Checklist labels present in `fields` with a non-empty value.
pub fn checklist_entries(fields: &Fields) -> Vec<(&'static ChecklistItem, &str)> {
    QUESTION_CHECKLIST
        .iter()
        .filter_map(|item| {
            fields
                .get(item.label)
                .filter(|value| !value.is_empty())
                .map(|value| (item, value))
        })
        .collect()
}

/// Renders the sections, led by the status warning for empty or
/// unstructured reports.
pub fn render_markdown(sections: &[Section]) -> String {
    let mut out = String::new();

    if let Some(warning) = assess(sections).warning() {
        out.push_str("> ");
        out.push_str(warning);
        out.push('\n');
    }

    for section in sections {
        if !out.is_empty() {
            out.push('\n');
        }
        // Writing into a String cannot fail.
        let _ = match section {
            Section::Student { fields } => render_student(&mut out, fields),
            Section::Header { title } => writeln!(out, "### {title}\n\n---"),
            Section::Question { index, fields } => render_question(&mut out, *index, fields),
            Section::Raw { text } => {
                let fence = fence_for(text);
                writeln!(out, "{fence}text\n{text}\n{fence}")
            }
        };
    }

    out
}

/// A backtick fence longer than any backtick run inside `text`.
fn fence_for(text: &str) -> String {
    let longest = text
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    "`".repeat((longest + 1).max(3))
}

fn render_student(out: &mut String, fields: &Fields) -> std::fmt::Result {
    writeln!(out, "### Student Details\n")?;
    for (label, value) in fields.iter() {
        writeln!(out, "- **{label}**: {value}")?;
    }
    Ok(())
}

fn render_question(out: &mut String, index: usize, fields: &Fields) -> std::fmt::Result {
    writeln!(out, "#### {}\n", question_title(index, fields))?;
    for (item, value) in checklist_entries(fields) {
        writeln!(out, "{} **{}**:\n\n{}\n", item.icon, item.label, value)?;
    }
    Ok(())
}
