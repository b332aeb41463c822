use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config::QuestionDefaults;
use crate::spec::conditional::Conditional;

/// Supported question types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    ShortText,
    LongText,
    SingleChoice,
    MultiChoice,
    Numeric,
    FileUpload,
}

impl QuestionType {
    pub const ALL: [QuestionType; 6] = [
        QuestionType::ShortText,
        QuestionType::LongText,
        QuestionType::SingleChoice,
        QuestionType::MultiChoice,
        QuestionType::Numeric,
        QuestionType::FileUpload,
    ];

    /// Wire name, matching the `type` tag of serialized questions.
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::ShortText => "short-text",
            QuestionType::LongText => "long-text",
            QuestionType::SingleChoice => "single-choice",
            QuestionType::MultiChoice => "multi-choice",
            QuestionType::Numeric => "numeric",
            QuestionType::FileUpload => "file-upload",
        }
    }

    /// Label shown on the editor badge.
    pub fn label(&self) -> &'static str {
        match self {
            QuestionType::ShortText => "Short Text",
            QuestionType::LongText => "Long Text",
            QuestionType::SingleChoice => "Single Choice",
            QuestionType::MultiChoice => "Multiple Choice",
            QuestionType::Numeric => "Numeric",
            QuestionType::FileUpload => "File Upload",
        }
    }

    pub fn is_choice(&self) -> bool {
        matches!(self, QuestionType::SingleChoice | QuestionType::MultiChoice)
    }

    pub fn is_text(&self) -> bool {
        matches!(self, QuestionType::ShortText | QuestionType::LongText)
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for QuestionType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        QuestionType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| format!("unknown question type '{}'", value))
    }
}

/// Constraints for short and long text answers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TextRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

/// Range constraints for numeric answers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct NumericRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// Restrictions for file uploads. `max_size` is expressed in megabytes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<f64>,
    /// Comma-separated extensions, e.g. `.pdf,.docx`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_types: Option<String>,
}

impl FileRules {
    /// Allowed extensions normalized to lowercase without the leading dot.
    pub fn extensions(&self) -> Vec<String> {
        self.allowed_types
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect()
    }
}

/// Type-specific payload of a question. The `type` tag is flattened into the
/// question object so documents keep the `{"type": "numeric", "validation": ...}`
/// shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum QuestionKind {
    ShortText {
        #[serde(default)]
        validation: TextRules,
    },
    LongText {
        #[serde(default)]
        validation: TextRules,
    },
    SingleChoice {
        #[serde(default)]
        options: Vec<String>,
    },
    MultiChoice {
        #[serde(default)]
        options: Vec<String>,
    },
    Numeric {
        #[serde(default)]
        validation: NumericRules,
    },
    FileUpload {
        #[serde(default)]
        validation: FileRules,
    },
}

impl QuestionKind {
    /// Builds the payload for a fresh question of `kind` using the editor defaults.
    pub fn with_defaults(kind: QuestionType, defaults: &QuestionDefaults) -> Self {
        let placeholder_options = || {
            (1..=defaults.choice_option_count)
                .map(|index| format!("Option {}", index))
                .collect::<Vec<_>>()
        };
        match kind {
            QuestionType::ShortText => QuestionKind::ShortText {
                validation: TextRules {
                    max_length: Some(defaults.short_text_max_length),
                },
            },
            QuestionType::LongText => QuestionKind::LongText {
                validation: TextRules {
                    max_length: Some(defaults.long_text_max_length),
                },
            },
            QuestionType::SingleChoice => QuestionKind::SingleChoice {
                options: placeholder_options(),
            },
            QuestionType::MultiChoice => QuestionKind::MultiChoice {
                options: placeholder_options(),
            },
            QuestionType::Numeric => QuestionKind::Numeric {
                validation: NumericRules {
                    min: Some(defaults.numeric_min),
                    max: Some(defaults.numeric_max),
                },
            },
            QuestionType::FileUpload => QuestionKind::FileUpload {
                validation: FileRules {
                    max_size: Some(defaults.file_max_size_mb),
                    allowed_types: None,
                },
            },
        }
    }

    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionKind::ShortText { .. } => QuestionType::ShortText,
            QuestionKind::LongText { .. } => QuestionType::LongText,
            QuestionKind::SingleChoice { .. } => QuestionType::SingleChoice,
            QuestionKind::MultiChoice { .. } => QuestionType::MultiChoice,
            QuestionKind::Numeric { .. } => QuestionType::Numeric,
            QuestionKind::FileUpload { .. } => QuestionType::FileUpload,
        }
    }
}

/// Definition of a single question inside a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Question {
    pub id: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
    /// Prompt text.
    #[serde(default)]
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional: Option<Conditional>,
}

impl Question {
    /// Creates an empty, optional question of `kind` populated with defaults.
    pub fn new(id: impl Into<String>, kind: QuestionType, defaults: &QuestionDefaults) -> Self {
        Self {
            id: id.into(),
            kind: QuestionKind::with_defaults(kind, defaults),
            question: String::new(),
            description: None,
            required: false,
            conditional: None,
        }
    }

    pub fn question_type(&self) -> QuestionType {
        self.kind.question_type()
    }

    /// Options of a choice question, `None` for every other type.
    pub fn options(&self) -> Option<&[String]> {
        match &self.kind {
            QuestionKind::SingleChoice { options } | QuestionKind::MultiChoice { options } => {
                Some(options)
            }
            _ => None,
        }
    }

    pub fn options_mut(&mut self) -> Option<&mut Vec<String>> {
        match &mut self.kind {
            QuestionKind::SingleChoice { options } | QuestionKind::MultiChoice { options } => {
                Some(options)
            }
            _ => None,
        }
    }

    /// Character limit enforced when capturing text input.
    pub fn max_length(&self) -> Option<usize> {
        match &self.kind {
            QuestionKind::ShortText { validation } | QuestionKind::LongText { validation } => {
                validation.max_length
            }
            _ => None,
        }
    }

    /// Short hint about the constraints, used by renderers.
    pub fn constraint_hint(&self) -> Option<String> {
        match &self.kind {
            QuestionKind::ShortText { validation } | QuestionKind::LongText { validation } => {
                validation
                    .max_length
                    .map(|max| format!("Up to {} characters", max))
            }
            QuestionKind::Numeric { validation } => match (validation.min, validation.max) {
                (Some(min), Some(max)) => Some(format!("Between {} and {}", min, max)),
                (Some(min), None) => Some(format!("At least {}", min)),
                (None, Some(max)) => Some(format!("At most {}", max)),
                (None, None) => None,
            },
            QuestionKind::FileUpload { validation } => {
                let mut parts = Vec::new();
                if let Some(max_size) = validation.max_size {
                    parts.push(format!("Max size: {}MB", max_size));
                }
                if let Some(allowed) = validation
                    .allowed_types
                    .as_deref()
                    .filter(|allowed| !allowed.trim().is_empty())
                {
                    parts.push(format!("Allowed: {}", allowed));
                }
                (!parts.is_empty()).then(|| parts.join(" • "))
            }
            QuestionKind::SingleChoice { .. } | QuestionKind::MultiChoice { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_question_keeps_document_shape() {
        let question: Question = serde_json::from_value(json!({
            "id": "years",
            "type": "numeric",
            "question": "Years of experience",
            "required": true,
            "validation": { "min": 0, "max": 40 }
        }))
        .expect("deserialize");

        assert_eq!(question.question_type(), QuestionType::Numeric);
        let value = serde_json::to_value(&question).expect("serialize");
        assert_eq!(value["type"], "numeric");
        assert_eq!(value["validation"]["max"], 40.0);
    }

    #[test]
    fn choice_defaults_have_three_placeholders() {
        let question = Question::new("q", QuestionType::MultiChoice, &QuestionDefaults::default());
        assert_eq!(
            question.options().expect("options"),
            ["Option 1", "Option 2", "Option 3"]
        );
    }

    #[test]
    fn file_rules_normalize_extensions() {
        let rules = FileRules {
            max_size: None,
            allowed_types: Some(".PDF, docx,,".into()),
        };
        assert_eq!(rules.extensions(), vec!["pdf", "docx"]);
    }

    #[test]
    fn question_type_parses_wire_names() {
        assert_eq!(
            "file-upload".parse::<QuestionType>(),
            Ok(QuestionType::FileUpload)
        );
        assert!("essay".parse::<QuestionType>().is_err());
    }
}
