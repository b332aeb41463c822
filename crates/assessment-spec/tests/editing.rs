use std::collections::BTreeSet;

use assessment_spec::edit::{delete_option, delete_section, duplicate_section, move_question};
use assessment_spec::{
    Assessment, AssessmentBuilder, IdGenerator, QuestionType, StructuralConstraintError,
};

fn frontend() -> Assessment {
    serde_json::from_str(include_str!("../tests/fixtures/frontend.json")).expect("fixture")
}

fn question_ids(assessment: &Assessment, section: usize) -> Vec<String> {
    assessment.sections[section]
        .questions
        .iter()
        .map(|question| question.id.clone())
        .collect()
}

#[test]
fn single_section_cannot_be_deleted() {
    let mut assessment = frontend();
    assessment.sections.truncate(1);
    let before = assessment.clone();
    assert_eq!(
        delete_section(&assessment, 0),
        Err(StructuralConstraintError::LastSection)
    );
    assert_eq!(assessment, before);
}

#[test]
fn duplicated_section_has_only_fresh_ids() {
    let assessment = frontend();
    let existing = assessment.all_ids();
    let next = duplicate_section(&assessment, 0, &mut IdGenerator::new()).expect("duplicate");

    let copy = &next.sections[1];
    let source = &assessment.sections[0];
    assert!(!existing.contains(&copy.id));
    for question in &copy.questions {
        assert!(!existing.contains(&question.id));
    }
    assert_eq!(copy.title, format!("{} (Copy)", source.title));
    assert_eq!(copy.description, source.description);
    assert_eq!(copy.questions.len(), source.questions.len());
    for (copied, original) in copy.questions.iter().zip(&source.questions) {
        let mut reidentified = original.clone();
        reidentified.id = copied.id.clone();
        assert_eq!(copied, &reidentified);
    }

    let all: Vec<String> = next
        .sections
        .iter()
        .flat_map(|section| {
            std::iter::once(section.id.clone())
                .chain(section.questions.iter().map(|question| question.id.clone()))
        })
        .collect();
    let unique: BTreeSet<&String> = all.iter().collect();
    assert_eq!(unique.len(), all.len());
}

#[test]
fn same_section_moves_only_reorder() {
    let assessment = frontend();
    let before = question_ids(&assessment, 0);

    for from in 0..before.len() {
        for to in 0..=before.len() {
            let next = move_question(&assessment, 0, from, 0, to).expect("move");
            let mut after = question_ids(&next, 0);
            if from == to {
                assert_eq!(after, before);
            }
            after.sort();
            let mut sorted = before.clone();
            sorted.sort();
            assert_eq!(after, sorted);
        }
    }
}

#[test]
fn last_option_is_protected() {
    let mut assessment = frontend();
    let question = &mut assessment.sections[0].questions[0];
    if let Some(options) = question.options_mut() {
        options.truncate(1);
    }
    assert!(matches!(
        delete_option(&assessment, 0, 0, 0),
        Err(StructuralConstraintError::LastOption { .. })
    ));
}

#[test]
fn moving_question_across_sections() {
    let assessment = frontend();
    let next = move_question(&assessment, 1, 1, 0, 0).expect("move");
    assert_eq!(
        question_ids(&next, 0),
        vec!["question-5", "question-1", "question-2", "question-3"]
    );
    assert_eq!(question_ids(&next, 1), vec!["question-4"]);
}

#[test]
fn deleted_question_ids_are_not_reissued() {
    let mut builder = AssessmentBuilder::new(frontend());
    builder.delete_question(0, 1).expect("delete question-2");
    builder.delete_question(1, 1).expect("delete question-5");

    let added = builder.add_question(QuestionType::ShortText).expect("add");
    assert_eq!(added, "question-6");

    let dependent = builder
        .assessment()
        .question("question-3")
        .expect("dependent question kept");
    let depends_on = &dependent.conditional.as_ref().expect("conditional").depends_on;
    assert_eq!(depends_on, "question-2");
    assert!(builder.assessment().question(depends_on).is_none());

    // A new builder over the saved document picks up after the dangling target too.
    let mut reopened = AssessmentBuilder::new(builder.into_assessment());
    let next = reopened.add_question(QuestionType::Numeric).expect("add");
    assert_eq!(next, "question-7");
}

