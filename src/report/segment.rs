//! Splits a raw evaluation report into typed sections.
//!
//! Reports arrive as loosely formatted Markdown bullets (`- **Key**: value`)
//! grouped under a "Student Details" marker and a "Question-by-Question
//! Evaluation" marker. Parsing is best effort: anything unrecognized degrades
//! to a single [`Section::Raw`] instead of failing.

use serde::ser::{Serialize, SerializeMap, Serializer};

pub const STUDENT_MARKER: &str = "- **Student Details**:";
pub const EVALUATION_MARKER: &str = "- **Question-by-Question Evaluation**:";
pub const QUESTION_NUMBER: &str = "Question Number";
pub const HEADER_TITLE: &str = "Question-by-Question Evaluation";

/// Ordered label/value pairs. Overwriting a label keeps its first-seen position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields(Vec<(String, String)>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == label)
            .map(|(_, value)| value.as_str())
    }

    pub fn set(&mut self, label: &str, value: &str) {
        match self.0.iter_mut().find(|(key, _)| key == label) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.0.push((label.to_string(), value.to_string())),
        }
    }

    pub fn last_label(&self) -> Option<&str> {
        self.0.last().map(|(key, _)| key.as_str())
    }

    /// Appends `text` to the value of the last label in order.
    pub fn append_to_last(&mut self, text: &str) {
        if let Some((_, value)) = self.0.last_mut() {
            value.push_str(text);
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (key, value) in iter {
            let (key, value): (String, String) = (key.into(), value.into());
            fields.set(&key, &value);
        }
        fields
    }
}

impl Serialize for Fields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Section {
    Student { fields: Fields },
    Header { title: String },
    Question { index: usize, fields: Fields },
    Raw { text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Mode {
    #[default]
    Preamble,
    Student,
    Questions,
}

#[derive(Debug, Default)]
struct SegmentState {
    mode: Mode,
    student: Option<Fields>,
    questions: Vec<Fields>,
    current: Option<Fields>,
}

impl SegmentState {
    fn feed(mut self, line: &str) -> Self {
        let trimmed = trim_text(line);

        if trimmed.starts_with(STUDENT_MARKER) {
            self.mode = Mode::Student;
            self.student = Some(Fields::new());
            return self;
        }

        if trimmed.starts_with(EVALUATION_MARKER) {
            self.mode = Mode::Questions;
            self.seal();
            return self;
        }

        match parse_field(trimmed) {
            Some((key, value)) => match self.mode {
                Mode::Student => {
                    if let Some(student) = self.student.as_mut() {
                        student.set(key, value);
                    }
                }
                Mode::Questions if key == QUESTION_NUMBER => {
                    self.seal();
                    let mut question = Fields::new();
                    question.set(key, value);
                    self.current = Some(question);
                }
                Mode::Questions => {
                    if let Some(question) = self.current.as_mut() {
                        question.set(key, value);
                    }
                }
                Mode::Preamble => {}
            },
            None => {
                // Continuation text belongs to the last field of the open
                // question, even while in student mode. An empty label takes
                // no continuation.
                let open = self
                    .current
                    .as_mut()
                    .filter(|q| q.last_label().is_some_and(|label| !label.is_empty()));
                if let Some(question) = open {
                    question.append_to_last(&format!("\n{trimmed}"));
                }
            }
        }

        self
    }

    fn seal(&mut self) {
        if let Some(question) = self.current.take() {
            self.questions.push(question);
        }
    }

    fn into_sections(mut self) -> Vec<Section> {
        self.seal();

        let mut sections = Vec::with_capacity(self.questions.len() + 2);
        if let Some(fields) = self.student {
            sections.push(Section::Student { fields });
        }
        if !self.questions.is_empty() {
            sections.push(Section::Header {
                title: HEADER_TITLE.to_string(),
            });
            sections.extend(
                self.questions
                    .into_iter()
                    .enumerate()
                    .map(|(index, fields)| Section::Question { index, fields }),
            );
        }
        sections
    }
}

/// Matches `-<ws>**<key>**:<value>`, taking the shortest key.
pub(crate) fn parse_field(line: &str) -> Option<(&str, &str)> {
    let rest = line
        .strip_prefix('-')?
        .trim_start_matches(is_blank)
        .strip_prefix("**")?;
    let end = rest.find("**:")?;
    Some((trim_text(&rest[..end]), trim_text(&rest[end + 3..])))
}

/// Whitespace plus the byte-order mark some generators prepend.
fn is_blank(c: char) -> bool {
    c.is_whitespace() || c == '\u{feff}'
}

fn trim_text(s: &str) -> &str {
    s.trim_matches(is_blank)
}

pub(crate) fn normalize(raw: &str) -> String {
    trim_text(&raw.replace("\r\n", "\n")).to_string()
}

pub fn segment(raw: &str) -> Vec<Section> {
    let normalized = normalize(raw);

    let mut sections = normalized
        .split('\n')
        .fold(SegmentState::default(), SegmentState::feed)
        .into_sections();

    if sections.is_empty() && !normalized.is_empty() {
        sections.push(Section::Raw { text: normalized });
    }

    sections
}
