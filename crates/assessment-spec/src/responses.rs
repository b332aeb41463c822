use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_cbor::{to_vec, value::to_value};
use serde_json::Value;

use crate::spec::JobId;

/// Placeholder recorded for an uploaded file; the content itself is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

/// A single answer. Text, numeric and single-choice answers are strings,
/// multi-choice answers are arrays, uploads are file placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Answer {
    Text(String),
    Choices(Vec<String>),
    File(FileRef),
}

impl Answer {
    /// Empty string, empty selection, or a file without a name.
    pub fn is_empty(&self) -> bool {
        match self {
            Answer::Text(text) => text.is_empty(),
            Answer::Choices(choices) => choices.is_empty(),
            Answer::File(file) => file.name.is_empty(),
        }
    }

    /// Scalar view used by conditional comparisons; arrays have none.
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Answer::Text(text) => Some(text),
            Answer::File(file) => Some(&file.name),
            Answer::Choices(_) => None,
        }
    }

    /// Human-readable rendering.
    pub fn display(&self) -> String {
        match self {
            Answer::Text(text) => text.clone(),
            Answer::Choices(choices) => choices.join(", "),
            Answer::File(file) => file.name.clone(),
        }
    }
}

/// Answers keyed by question id for one fill-out session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ResponseSet {
    answers: BTreeMap<String, Answer>,
}

impl ResponseSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, question_id: &str) -> Option<&Answer> {
        self.answers.get(question_id)
    }

    pub fn set(&mut self, question_id: impl Into<String>, answer: Answer) {
        self.answers.insert(question_id.into(), answer);
    }

    pub fn remove(&mut self, question_id: &str) -> Option<Answer> {
        self.answers.remove(question_id)
    }

    pub fn contains(&self, question_id: &str) -> bool {
        self.answers.contains_key(question_id)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Answer)> {
        self.answers.iter()
    }

    /// Parses a JSON object of answers; `null` counts as an empty set.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        if value.is_null() {
            return Ok(Self::new());
        }
        serde_json::from_value(value.clone())
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(&self.answers).unwrap_or_else(|_| Value::Object(Default::default()))
    }
}

impl FromIterator<(String, Answer)> for ResponseSet {
    fn from_iter<T: IntoIterator<Item = (String, Answer)>>(iter: T) -> Self {
        Self {
            answers: iter.into_iter().collect(),
        }
    }
}

/// A submitted response set as recorded by the data layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment_id: Option<String>,
    pub job_id: JobId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_id: Option<u64>,
    pub responses: ResponseSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<String>,
}

impl Submission {
    pub fn new(job_id: JobId, responses: ResponseSet) -> Self {
        Self {
            id: None,
            assessment_id: None,
            job_id,
            candidate_id: None,
            responses,
            submitted_at: None,
        }
    }

    /// Serializes the submission as canonical CBOR bytes.
    pub fn to_cbor(&self) -> Result<Vec<u8>, serde_cbor::Error> {
        let canonical = to_value(self)?;
        to_vec(&canonical)
    }

    /// Serializes the submission as indented JSON for debugging.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn answers_deserialize_by_shape() {
        let responses: ResponseSet = serde_json::from_value(json!({
            "q1": "yes",
            "q2": ["React", "Vue"],
            "q3": { "name": "cv.pdf", "sizeBytes": 2048 }
        }))
        .expect("deserialize");

        assert_eq!(responses.get("q1"), Some(&Answer::Text("yes".into())));
        assert!(matches!(responses.get("q2"), Some(Answer::Choices(items)) if items.len() == 2));
        assert!(matches!(responses.get("q3"), Some(Answer::File(file)) if file.name == "cv.pdf"));
    }

    #[test]
    fn emptiness_follows_answer_shape() {
        assert!(Answer::Text(String::new()).is_empty());
        assert!(Answer::Choices(vec![]).is_empty());
        assert!(!Answer::Text(" ".into()).is_empty());
    }

    #[test]
    fn submission_encodes_to_cbor() {
        let mut responses = ResponseSet::new();
        responses.set("q1", Answer::Text("yes".into()));
        let bytes = Submission::new(7, responses).to_cbor().expect("cbor");
        assert!(!bytes.is_empty());
    }
}
