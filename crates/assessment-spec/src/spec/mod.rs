pub mod assessment;
pub mod conditional;
pub mod question;

pub use assessment::{
    Assessment, DEFAULT_SECTION_TITLE, FALLBACK_TITLE, JobId, Section, default_assessment,
};
pub use conditional::{Condition, Conditional};
pub use question::{FileRules, NumericRules, Question, QuestionKind, QuestionType, TextRules};

/// JSON Schema of the assessment document.
pub fn assessment_json_schema() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(Assessment)).unwrap_or(serde_json::Value::Null)
}
