use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::responses::{Answer, ResponseSet};
use crate::spec::conditional::parse_number;
use crate::spec::{Assessment, Question, QuestionKind};
use crate::visibility::VisibilityMap;

/// Machine-readable violation codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ViolationCode {
    Required,
    BelowMin,
    AboveMax,
}

/// A failed rule for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Violation {
    pub question_id: String,
    pub code: ViolationCode,
    pub message: String,
}

/// Violations keyed by question id; questions without violations are absent.
pub type ViolationMap = BTreeMap<String, Vec<Violation>>;

/// Evaluates every rule that applies to `question` against `value`.
pub fn validate(question: &Question, value: Option<&Answer>) -> Vec<Violation> {
    let mut violations = Vec::new();

    if question.required && value.is_none_or(Answer::is_empty) {
        violations.push(violation(
            question,
            ViolationCode::Required,
            "This question is required".into(),
        ));
    }

    if let QuestionKind::Numeric { validation } = &question.kind
        && let Some(number) = value.and_then(Answer::as_scalar).and_then(parse_number)
    {
        if let Some(min) = validation.min
            && number < min
        {
            violations.push(violation(
                question,
                ViolationCode::BelowMin,
                format!("Value must be at least {}", min),
            ));
        }
        if let Some(max) = validation.max
            && number > max
        {
            violations.push(violation(
                question,
                ViolationCode::AboveMax,
                format!("Value must be at most {}", max),
            ));
        }
    }

    violations
}

/// Validates every visible question; hidden questions are skipped entirely.
pub fn validate_responses(
    assessment: &Assessment,
    responses: &ResponseSet,
    visibility: &VisibilityMap,
) -> ViolationMap {
    let mut map = ViolationMap::new();
    for question in assessment.questions() {
        if !visibility.get(&question.id).copied().unwrap_or(true) {
            continue;
        }
        let violations = validate(question, responses.get(&question.id));
        if !violations.is_empty() {
            map.insert(question.id.clone(), violations);
        }
    }
    map
}

fn violation(question: &Question, code: ViolationCode, message: String) -> Violation {
    Violation {
        question_id: question.id.clone(),
        code,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QuestionDefaults;
    use crate::spec::{Condition, Conditional, QuestionType};

    fn numeric(required: bool) -> Question {
        let mut question = Question::new("age", QuestionType::Numeric, &QuestionDefaults::default());
        question.required = required;
        question
    }

    #[test]
    fn required_rejects_missing_and_empty_answers() {
        let question = numeric(true);
        assert_eq!(validate(&question, None)[0].code, ViolationCode::Required);
        assert_eq!(
            validate(&question, Some(&Answer::Text(String::new())))[0].message,
            "This question is required"
        );
        assert!(validate(&numeric(false), None).is_empty());
    }

    #[test]
    fn numeric_bounds_produce_messages() {
        let question = numeric(false);
        let below = validate(&question, Some(&Answer::Text("-1".into())));
        assert_eq!(below[0].message, "Value must be at least 0");
        let above = validate(&question, Some(&Answer::Text("101".into())));
        assert_eq!(above[0].code, ViolationCode::AboveMax);
        assert_eq!(above[0].message, "Value must be at most 100");
        assert!(validate(&question, Some(&Answer::Text("100".into()))).is_empty());
    }

    #[test]
    fn unparseable_numbers_skip_range_checks() {
        let question = numeric(true);
        assert!(validate(&question, Some(&Answer::Text("abc".into()))).is_empty());
    }

    #[test]
    fn hidden_questions_are_not_validated() {
        let mut gate = Question::new("gate", QuestionType::ShortText, &QuestionDefaults::default());
        gate.required = false;
        let mut follow_up = numeric(true);
        follow_up.conditional = Some(Conditional::new("gate", Condition::Equals, "yes"));

        let mut assessment = Assessment::new(1, "Validation", "s");
        assessment.sections[0].questions = vec![gate, follow_up];

        let responses = ResponseSet::new();
        let visibility = crate::visibility::resolve_visibility(&assessment, &responses);
        assert!(validate_responses(&assessment, &responses, &visibility).is_empty());

        let mut responses = ResponseSet::new();
        responses.set("gate", Answer::Text("yes".into()));
        let visibility = crate::visibility::resolve_visibility(&assessment, &responses);
        let violations = validate_responses(&assessment, &responses, &visibility);
        assert_eq!(violations.keys().collect::<Vec<_>>(), vec!["age"]);
    }
}
