use std::collections::{BTreeMap, BTreeSet};

use crate::responses::ResponseSet;
use crate::spec::{Assessment, Question};

pub type VisibilityMap = BTreeMap<String, bool>;

/// Local rule: a question without a conditional is always visible, otherwise
/// its rule is evaluated against the dependency's current answer.
pub fn is_visible(question: &Question, responses: &ResponseSet) -> bool {
    match &question.conditional {
        Some(conditional) => conditional.evaluate(responses.get(&conditional.depends_on)),
        None => true,
    }
}

/// Resolves visibility for every question in the assessment.
///
/// A question is visible when its own rule holds and the question it depends
/// on (if that question exists) is visible too, so hiding a question also
/// hides everything chained behind it. Cycles are broken by falling back to
/// the local rule for the question that closes the loop.
pub fn resolve_visibility(assessment: &Assessment, responses: &ResponseSet) -> VisibilityMap {
    let questions: BTreeMap<&str, &Question> = assessment
        .questions()
        .map(|question| (question.id.as_str(), question))
        .collect();

    let mut resolved = VisibilityMap::new();
    let mut in_progress = BTreeSet::new();
    for question in assessment.questions() {
        resolve_one(
            question,
            &questions,
            responses,
            &mut resolved,
            &mut in_progress,
        );
    }
    resolved
}

fn resolve_one(
    question: &Question,
    questions: &BTreeMap<&str, &Question>,
    responses: &ResponseSet,
    resolved: &mut VisibilityMap,
    in_progress: &mut BTreeSet<String>,
) -> bool {
    if let Some(visible) = resolved.get(&question.id) {
        return *visible;
    }

    let local = is_visible(question, responses);
    let visible = match &question.conditional {
        Some(conditional) if local => match questions.get(conditional.depends_on.as_str()) {
            Some(parent) if in_progress.contains(&parent.id) => {
                tracing::warn!(
                    question = %question.id,
                    depends_on = %parent.id,
                    "conditional cycle detected while resolving visibility"
                );
                true
            }
            Some(parent) => {
                in_progress.insert(question.id.clone());
                let parent_visible = resolve_one(parent, questions, responses, resolved, in_progress);
                in_progress.remove(&question.id);
                parent_visible
            }
            None => true,
        },
        _ => local,
    };

    resolved.insert(question.id.clone(), visible);
    visible
}

/// Returns the first dependency cycle, as the list of question ids walked from
/// the start of the loop back to it.
pub fn find_cycle(assessment: &Assessment) -> Option<Vec<String>> {
    let edges: BTreeMap<&str, &str> = assessment
        .questions()
        .filter_map(|question| {
            question
                .conditional
                .as_ref()
                .map(|conditional| (question.id.as_str(), conditional.depends_on.as_str()))
        })
        .collect();

    let mut cleared = BTreeSet::new();
    for start in edges.keys() {
        if cleared.contains(start) {
            continue;
        }
        let mut path: Vec<&str> = Vec::new();
        let mut current = *start;
        loop {
            if let Some(position) = path.iter().position(|id| *id == current) {
                let mut cycle: Vec<String> = path[position..].iter().map(|id| id.to_string()).collect();
                cycle.push(current.to_string());
                return Some(cycle);
            }
            if cleared.contains(current) {
                break;
            }
            path.push(current);
            match edges.get(current) {
                Some(next) => current = *next,
                None => break,
            }
        }
        cleared.extend(path);
    }
    None
}

/// Conditionals pointing at question ids that do not exist in the assessment,
/// as `(question, depends_on)` pairs.
pub fn dangling_dependencies(assessment: &Assessment) -> Vec<(String, String)> {
    let ids: BTreeSet<&str> = assessment
        .questions()
        .map(|question| question.id.as_str())
        .collect();
    assessment
        .questions()
        .filter_map(|question| {
            let conditional = question.conditional.as_ref()?;
            (!ids.contains(conditional.depends_on.as_str()))
                .then(|| (question.id.clone(), conditional.depends_on.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QuestionDefaults;
    use crate::responses::Answer;
    use crate::spec::{Condition, Conditional, QuestionType};

    fn question(id: &str, conditional: Option<Conditional>) -> Question {
        let mut question = Question::new(id, QuestionType::ShortText, &QuestionDefaults::default());
        question.conditional = conditional;
        question
    }

    fn assessment(questions: Vec<Question>) -> Assessment {
        let mut assessment = Assessment::new(1, "Visibility", "s");
        assessment.sections[0].questions = questions;
        assessment
    }

    fn answers(pairs: &[(&str, &str)]) -> ResponseSet {
        pairs
            .iter()
            .map(|(id, value)| (id.to_string(), Answer::Text(value.to_string())))
            .collect()
    }

    #[test]
    fn hidden_parent_hides_dependents() {
        let assessment = assessment(vec![
            question("q1", None),
            question("q2", Some(Conditional::new("q1", Condition::Equals, "yes"))),
            question("q3", Some(Conditional::new("q2", Condition::NotEquals, "skip"))),
        ]);

        let map = resolve_visibility(&assessment, &answers(&[("q1", "no")]));
        assert_eq!(map.get("q1"), Some(&true));
        assert_eq!(map.get("q2"), Some(&false));
        assert_eq!(map.get("q3"), Some(&false));

        let map = resolve_visibility(&assessment, &answers(&[("q1", "yes")]));
        assert_eq!(map.get("q2"), Some(&true));
        assert_eq!(map.get("q3"), Some(&true));
    }

    #[test]
    fn dangling_dependency_uses_local_rule() {
        let assessment = assessment(vec![question(
            "q1",
            Some(Conditional::new("gone", Condition::NotEquals, "x")),
        )]);
        let map = resolve_visibility(&assessment, &ResponseSet::new());
        assert_eq!(map.get("q1"), Some(&true));
        assert_eq!(
            dangling_dependencies(&assessment),
            vec![("q1".to_string(), "gone".to_string())]
        );
    }

    #[test]
    fn cycles_are_reported_and_do_not_hang_resolution() {
        let assessment = assessment(vec![
            question("a", Some(Conditional::new("b", Condition::NotEquals, "x"))),
            question("b", Some(Conditional::new("a", Condition::NotEquals, "x"))),
            question("c", None),
        ]);
        let cycle = find_cycle(&assessment).expect("cycle");
        assert_eq!(cycle.first(), cycle.last());
        assert_eq!(cycle.len(), 3);

        let map = resolve_visibility(&assessment, &ResponseSet::new());
        assert_eq!(map.len(), 3);
        assert_eq!(map.get("a"), Some(&true));
    }

    #[test]
    fn acyclic_chain_has_no_cycle() {
        let assessment = assessment(vec![
            question("a", None),
            question("b", Some(Conditional::new("a", Condition::Equals, "1"))),
            question("c", Some(Conditional::new("b", Condition::Equals, "1"))),
        ]);
        assert_eq!(find_cycle(&assessment), None);
    }
}
