//! Input capture: turns raw UI input into stored answers.
//!
//! Limits that the form controls enforce while typing (text length, file
//! restrictions, option membership) are applied here, so values that break
//! them never reach the response set.

use globset::{GlobBuilder, GlobSetBuilder};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::responses::{Answer, FileRef};
use crate::spec::{FileRules, Question, QuestionKind, QuestionType};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Raw input gesture for a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Input {
    /// Typed text, for text and numeric questions.
    Text { value: String },
    /// Radio selection on a single-choice question.
    Select { option: String },
    /// Checkbox toggle on a multi-choice question.
    Toggle { option: String },
    /// File picked for an upload question.
    File {
        name: String,
        #[serde(default)]
        size_bytes: Option<u64>,
    },
    /// Clears the current answer.
    Clear,
}

impl Input {
    pub fn text(value: impl Into<String>) -> Self {
        Input::Text {
            value: value.into(),
        }
    }

    pub fn select(option: impl Into<String>) -> Self {
        Input::Select {
            option: option.into(),
        }
    }

    pub fn toggle(option: impl Into<String>) -> Self {
        Input::Toggle {
            option: option.into(),
        }
    }

    pub fn file(name: impl Into<String>, size_bytes: Option<u64>) -> Self {
        Input::File {
            name: name.into(),
            size_bytes,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Input::Text { .. } => "text",
            Input::Select { .. } => "select",
            Input::Toggle { .. } => "toggle",
            Input::File { .. } => "file",
            Input::Clear => "clear",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CaptureError {
    #[error("question '{question_id}' ({expected}) does not accept {input} input")]
    InputMismatch {
        question_id: String,
        expected: QuestionType,
        input: &'static str,
    },
    #[error("'{option}' is not an option of question '{question_id}'")]
    UnknownOption { question_id: String, option: String },
    #[error("file '{name}' is not an allowed type (allowed: {allowed})")]
    FileTypeNotAllowed { name: String, allowed: String },
    #[error("file '{name}' exceeds the {max_size_mb}MB limit")]
    FileTooLarge { name: String, max_size_mb: f64 },
    #[error("invalid allowed types pattern: {0}")]
    Pattern(String),
}

/// Applies `input` to the current answer of `question`. `Ok(None)` means the
/// answer is cleared.
pub fn capture(
    question: &Question,
    current: Option<&Answer>,
    input: Input,
) -> Result<Option<Answer>, CaptureError> {
    match (&question.kind, input) {
        (_, Input::Clear) => Ok(None),
        (
            QuestionKind::ShortText { validation } | QuestionKind::LongText { validation },
            Input::Text { value },
        ) => Ok(Some(Answer::Text(truncate(value, validation.max_length)))),
        (QuestionKind::Numeric { .. }, Input::Text { value }) => Ok(Some(Answer::Text(value))),
        (QuestionKind::SingleChoice { options }, Input::Select { option }) => {
            ensure_option(question, options, &option)?;
            Ok(Some(Answer::Text(option)))
        }
        (QuestionKind::MultiChoice { options }, Input::Toggle { option }) => {
            ensure_option(question, options, &option)?;
            let mut selected = match current {
                Some(Answer::Choices(selected)) => selected.clone(),
                _ => Vec::new(),
            };
            if let Some(position) = selected.iter().position(|item| *item == option) {
                selected.remove(position);
            } else {
                selected.push(option);
            }
            Ok(Some(Answer::Choices(selected)))
        }
        (QuestionKind::FileUpload { validation }, Input::File { name, size_bytes }) => {
            check_file(validation, &name, size_bytes)?;
            Ok(Some(Answer::File(FileRef { name, size_bytes })))
        }
        (_, input) => Err(CaptureError::InputMismatch {
            question_id: question.id.clone(),
            expected: question.question_type(),
            input: input.label(),
        }),
    }
}

fn truncate(value: String, max_length: Option<usize>) -> String {
    match max_length {
        Some(max) if value.chars().count() > max => value.chars().take(max).collect(),
        _ => value,
    }
}

fn ensure_option(question: &Question, options: &[String], option: &str) -> Result<(), CaptureError> {
    if options.iter().any(|candidate| candidate == option) {
        Ok(())
    } else {
        Err(CaptureError::UnknownOption {
            question_id: question.id.clone(),
            option: option.to_string(),
        })
    }
}

fn check_file(rules: &FileRules, name: &str, size_bytes: Option<u64>) -> Result<(), CaptureError> {
    let extensions = rules.extensions();
    if !extensions.is_empty() {
        let mut builder = GlobSetBuilder::new();
        for extension in &extensions {
            let glob = GlobBuilder::new(&format!("*.{}", extension))
                .case_insensitive(true)
                .literal_separator(false)
                .build()
                .map_err(|err| CaptureError::Pattern(err.to_string()))?;
            builder.add(glob);
        }
        let set = builder
            .build()
            .map_err(|err| CaptureError::Pattern(err.to_string()))?;
        if !set.is_match(name) {
            return Err(CaptureError::FileTypeNotAllowed {
                name: name.to_string(),
                allowed: rules.allowed_types.clone().unwrap_or_default(),
            });
        }
    }

    if let (Some(max_size_mb), Some(size)) = (rules.max_size, size_bytes)
        && size as f64 > max_size_mb * BYTES_PER_MB
    {
        return Err(CaptureError::FileTooLarge {
            name: name.to_string(),
            max_size_mb,
        });
    }

    Ok(())
}
