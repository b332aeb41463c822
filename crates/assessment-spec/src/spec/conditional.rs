use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::responses::Answer;

/// Comparison applied by a conditional rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum Condition {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Equals => "equals",
            Condition::NotEquals => "notEquals",
            Condition::GreaterThan => "greaterThan",
            Condition::LessThan => "lessThan",
        }
    }
}

/// Visibility rule: show the owning question when the answer to `depends_on`
/// satisfies `condition` against `value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Conditional {
    pub depends_on: String,
    pub condition: Condition,
    #[serde(default)]
    pub value: String,
}

impl Conditional {
    pub fn new(depends_on: impl Into<String>, condition: Condition, value: impl Into<String>) -> Self {
        Self {
            depends_on: depends_on.into(),
            condition,
            value: value.into(),
        }
    }

    /// Evaluates the rule against the dependency's current answer.
    pub fn evaluate(&self, response: Option<&Answer>) -> bool {
        match self.condition {
            Condition::Equals => self.equals(response),
            Condition::NotEquals => !self.equals(response),
            Condition::GreaterThan => {
                compare_numeric(response, &self.value).is_some_and(|(lhs, rhs)| lhs > rhs)
            }
            Condition::LessThan => {
                compare_numeric(response, &self.value).is_some_and(|(lhs, rhs)| lhs < rhs)
            }
        }
    }

    fn equals(&self, response: Option<&Answer>) -> bool {
        response
            .and_then(Answer::as_scalar)
            .is_some_and(|text| text == self.value)
    }
}

fn compare_numeric(response: Option<&Answer>, comparand: &str) -> Option<(f64, f64)> {
    let lhs = parse_number(response?.as_scalar()?)?;
    let rhs = parse_number(comparand)?;
    Some((lhs, rhs))
}

/// Parses a trimmed decimal, rejecting NaN and infinities.
pub(crate) fn parse_number(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> Answer {
        Answer::Text(value.into())
    }

    #[test]
    fn equals_is_strict_string_comparison() {
        let rule = Conditional::new("q1", Condition::Equals, "5");
        assert!(rule.evaluate(Some(&text("5"))));
        assert!(!rule.evaluate(Some(&text("5.0"))));
        assert!(!rule.evaluate(None));
    }

    #[test]
    fn not_equals_shows_when_absent() {
        let rule = Conditional::new("q1", Condition::NotEquals, "yes");
        assert!(rule.evaluate(None));
        assert!(!rule.evaluate(Some(&text("yes"))));
    }

    #[test]
    fn numeric_comparisons_require_numbers_on_both_sides() {
        let rule = Conditional::new("q1", Condition::GreaterThan, "3");
        assert!(rule.evaluate(Some(&text("3.5"))));
        assert!(!rule.evaluate(Some(&text("abc"))));
        assert!(!rule.evaluate(None));

        let rule = Conditional::new("q1", Condition::LessThan, "n/a");
        assert!(!rule.evaluate(Some(&text("1"))));
    }

    #[test]
    fn arrays_never_equal_a_scalar() {
        let rule = Conditional::new("q1", Condition::Equals, "React");
        assert!(!rule.evaluate(Some(&Answer::Choices(vec!["React".into()]))));
    }
}
