use thiserror::Error;

/// Edits rejected because they would break a structural invariant. A rejected
/// edit leaves the assessment untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralConstraintError {
    #[error("assessment must have at least one section")]
    LastSection,
    #[error("question '{question_id}' must keep at least one option")]
    LastOption { question_id: String },
    #[error("choice question '{question_id}' has no options")]
    EmptyOptions { question_id: String },
    #[error("section index {index} is out of range ({len} sections)")]
    SectionOutOfRange { index: usize, len: usize },
    #[error("question index {index} is out of range in section {section} ({len} questions)")]
    QuestionOutOfRange {
        section: usize,
        index: usize,
        len: usize,
    },
    #[error("option index {index} is out of range for question '{question_id}' ({len} options)")]
    OptionOutOfRange {
        question_id: String,
        index: usize,
        len: usize,
    },
    #[error("question '{question_id}' is not a choice question")]
    NotChoice { question_id: String },
    #[error("question '{0}' not found")]
    UnknownQuestion(String),
    #[error("id '{0}' is used more than once")]
    DuplicateId(String),
    #[error("question ids cannot be changed (was '{from}', now '{to}')")]
    IdChanged { from: String, to: String },
    #[error("conditional logic forms a cycle: {}", path.join(" -> "))]
    ConditionalCycle { path: Vec<String> },
}
