//! Structural editing of assessments.
//!
//! Every operation borrows the current assessment and returns a complete
//! replacement. Rejected edits return a [`StructuralConstraintError`] and the
//! input is left as it was.

use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config::QuestionDefaults;
use crate::error::StructuralConstraintError;
use crate::ids::IdGenerator;
use crate::spec::{Assessment, Conditional, Question, QuestionType, Section};
use crate::visibility::find_cycle;

type EditResult = Result<Assessment, StructuralConstraintError>;

const COPY_SUFFIX: &str = " (Copy)";

/// Partial update of a section's header fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct SectionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

pub fn set_title(assessment: &Assessment, title: impl Into<String>) -> Assessment {
    let mut next = assessment.clone();
    next.title = title.into();
    next
}

/// Appends an empty `Section N` section.
pub fn add_section(assessment: &Assessment, ids: &mut IdGenerator) -> Assessment {
    let mut next = assessment.clone();
    let id = ids.section_id(&assessment.all_ids());
    let title = format!("Section {}", assessment.sections.len() + 1);
    next.sections.push(Section::new(id, title));
    next
}

pub fn delete_section(assessment: &Assessment, index: usize) -> EditResult {
    section_at(assessment, index)?;
    if assessment.sections.len() <= 1 {
        return Err(StructuralConstraintError::LastSection);
    }
    let mut next = assessment.clone();
    next.sections.remove(index);
    Ok(next)
}

/// Deep-copies a section right after the source, re-identifying the section
/// and every question in it.
pub fn duplicate_section(assessment: &Assessment, index: usize, ids: &mut IdGenerator) -> EditResult {
    let source = section_at(assessment, index)?;
    let mut taken = assessment.all_ids();

    let mut copy = source.clone();
    copy.id = fresh_section_id(ids, &mut taken);
    copy.title = format!("{}{}", source.title, COPY_SUFFIX);
    for question in &mut copy.questions {
        question.id = fresh_question_id(ids, &mut taken);
    }

    let mut next = assessment.clone();
    next.sections.insert(index + 1, copy);
    Ok(next)
}

pub fn move_section(assessment: &Assessment, from: usize, to: usize) -> EditResult {
    section_at(assessment, from)?;
    section_at(assessment, to)?;
    let mut next = assessment.clone();
    let section = next.sections.remove(from);
    next.sections.insert(to, section);
    Ok(next)
}

pub fn update_section(assessment: &Assessment, index: usize, patch: SectionPatch) -> EditResult {
    section_at(assessment, index)?;
    let mut next = assessment.clone();
    let section = &mut next.sections[index];
    if let Some(title) = patch.title {
        section.title = title;
    }
    if let Some(description) = patch.description {
        section.description = description;
    }
    Ok(next)
}

/// Appends a question of `kind` populated with type defaults.
pub fn add_question(
    assessment: &Assessment,
    section: usize,
    kind: QuestionType,
    ids: &mut IdGenerator,
    defaults: &QuestionDefaults,
) -> EditResult {
    section_at(assessment, section)?;
    let id = ids.question_id(&assessment.all_ids());
    let mut next = assessment.clone();
    next.sections[section]
        .questions
        .push(Question::new(id, kind, defaults));
    Ok(next)
}

pub fn delete_question(assessment: &Assessment, section: usize, index: usize) -> EditResult {
    question_at(assessment, section, index)?;
    let mut next = assessment.clone();
    next.sections[section].questions.remove(index);
    Ok(next)
}

/// Copies a question right after the source with a fresh id and a
/// `(Copy)` suffix on the prompt.
pub fn duplicate_question(
    assessment: &Assessment,
    section: usize,
    index: usize,
    ids: &mut IdGenerator,
) -> EditResult {
    let source = question_at(assessment, section, index)?;
    let mut copy = source.clone();
    copy.id = ids.question_id(&assessment.all_ids());
    copy.question = format!("{}{}", source.question, COPY_SUFFIX);

    let mut next = assessment.clone();
    next.sections[section].questions.insert(index + 1, copy);
    Ok(next)
}

/// Relocates a question within or across sections.
///
/// Dropping onto an index inserts before the question currently there. For a
/// same-section move to a later index, the removal has already shifted that
/// question down by one, so the insertion point moves with it.
pub fn move_question(
    assessment: &Assessment,
    from_section: usize,
    from_index: usize,
    to_section: usize,
    to_index: usize,
) -> EditResult {
    question_at(assessment, from_section, from_index)?;
    let target = section_at(assessment, to_section)?;
    if to_index > target.questions.len() {
        return Err(StructuralConstraintError::QuestionOutOfRange {
            section: to_section,
            index: to_index,
            len: target.questions.len(),
        });
    }
    if from_section == to_section && from_index == to_index {
        return Ok(assessment.clone());
    }

    let mut next = assessment.clone();
    let question = next.sections[from_section].questions.remove(from_index);
    let insert_at = if from_section == to_section && from_index < to_index {
        to_index - 1
    } else {
        to_index
    };
    let questions = &mut next.sections[to_section].questions;
    let insert_at = insert_at.min(questions.len());
    questions.insert(insert_at, question);
    Ok(next)
}

/// Applies `edit` to a copy of the question and re-checks its invariants:
/// the id is unchanged, choice questions keep an option, and conditional
/// logic stays acyclic.
pub fn update_question(
    assessment: &Assessment,
    section: usize,
    index: usize,
    edit: impl FnOnce(&mut Question),
) -> EditResult {
    let original = question_at(assessment, section, index)?;
    let mut next = assessment.clone();
    let question = &mut next.sections[section].questions[index];
    edit(question);

    if question.id != original.id {
        return Err(StructuralConstraintError::IdChanged {
            from: original.id.clone(),
            to: question.id.clone(),
        });
    }
    if question.options().is_some_and(|options| options.is_empty()) {
        return Err(StructuralConstraintError::LastOption {
            question_id: question.id.clone(),
        });
    }
    let conditional_changed = question.conditional != original.conditional;
    if conditional_changed && let Some(path) = find_cycle(&next) {
        return Err(StructuralConstraintError::ConditionalCycle { path });
    }
    Ok(next)
}

/// Attaches, replaces or (with `None`) removes the question's conditional.
pub fn set_conditional(
    assessment: &Assessment,
    section: usize,
    index: usize,
    conditional: Option<Conditional>,
) -> EditResult {
    update_question(assessment, section, index, |question| {
        question.conditional = conditional;
    })
}

/// Appends an `Option N` placeholder to a choice question.
pub fn add_option(assessment: &Assessment, section: usize, index: usize) -> EditResult {
    choice_options(assessment, section, index)?;
    update_question(assessment, section, index, |question| {
        if let Some(options) = question.options_mut() {
            let label = format!("Option {}", options.len() + 1);
            options.push(label);
        }
    })
}

pub fn update_option(
    assessment: &Assessment,
    section: usize,
    index: usize,
    option: usize,
    value: impl Into<String>,
) -> EditResult {
    option_at(assessment, section, index, option)?;
    let value = value.into();
    update_question(assessment, section, index, |question| {
        if let Some(options) = question.options_mut() {
            options[option] = value;
        }
    })
}

/// Removes an option; the last remaining option cannot be removed.
pub fn delete_option(
    assessment: &Assessment,
    section: usize,
    index: usize,
    option: usize,
) -> EditResult {
    option_at(assessment, section, index, option)?;
    update_question(assessment, section, index, |question| {
        if let Some(options) = question.options_mut() {
            options.remove(option);
        }
    })
}

/// Full structural check for assessments arriving from outside the builder.
pub fn check_structure(assessment: &Assessment) -> Result<(), StructuralConstraintError> {
    if assessment.sections.is_empty() {
        return Err(StructuralConstraintError::LastSection);
    }

    let mut seen = BTreeSet::new();
    for section in &assessment.sections {
        if !seen.insert(section.id.as_str()) {
            return Err(StructuralConstraintError::DuplicateId(section.id.clone()));
        }
        for question in &section.questions {
            if !seen.insert(question.id.as_str()) {
                return Err(StructuralConstraintError::DuplicateId(question.id.clone()));
            }
            if question.options().is_some_and(|options| options.is_empty()) {
                return Err(StructuralConstraintError::EmptyOptions {
                    question_id: question.id.clone(),
                });
            }
        }
    }

    match find_cycle(assessment) {
        Some(path) => Err(StructuralConstraintError::ConditionalCycle { path }),
        None => Ok(()),
    }
}

fn fresh_section_id(ids: &mut IdGenerator, taken: &mut BTreeSet<String>) -> String {
    let id = ids.section_id(taken);
    taken.insert(id.clone());
    id
}

fn fresh_question_id(ids: &mut IdGenerator, taken: &mut BTreeSet<String>) -> String {
    let id = ids.question_id(taken);
    taken.insert(id.clone());
    id
}

fn section_at(assessment: &Assessment, index: usize) -> Result<&Section, StructuralConstraintError> {
    assessment
        .sections
        .get(index)
        .ok_or(StructuralConstraintError::SectionOutOfRange {
            index,
            len: assessment.sections.len(),
        })
}

fn question_at(
    assessment: &Assessment,
    section: usize,
    index: usize,
) -> Result<&Question, StructuralConstraintError> {
    let questions = &section_at(assessment, section)?.questions;
    questions
        .get(index)
        .ok_or(StructuralConstraintError::QuestionOutOfRange {
            section,
            index,
            len: questions.len(),
        })
}

fn choice_options(
    assessment: &Assessment,
    section: usize,
    index: usize,
) -> Result<&[String], StructuralConstraintError> {
    let question = question_at(assessment, section, index)?;
    question
        .options()
        .ok_or_else(|| StructuralConstraintError::NotChoice {
            question_id: question.id.clone(),
        })
}

fn option_at(
    assessment: &Assessment,
    section: usize,
    index: usize,
    option: usize,
) -> Result<(), StructuralConstraintError> {
    let options = choice_options(assessment, section, index)?;
    if option < options.len() {
        Ok(())
    } else {
        let question = &assessment.sections[section].questions[index];
        Err(StructuralConstraintError::OptionOutOfRange {
            question_id: question.id.clone(),
            index: option,
            len: options.len(),
        })
    }
}
