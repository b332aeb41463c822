//! Editor orchestration.
//!
//! The builder owns the assessment being edited. Every gesture runs one
//! operation from [`crate::edit`] and hands the complete replacement to the
//! change handler, which is where hosts wire persistence or re-rendering.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config::QuestionDefaults;
use crate::edit::{self, SectionPatch};
use crate::error::StructuralConstraintError;
use crate::ids::IdGenerator;
use crate::spec::{Assessment, Conditional, Question, QuestionType};

/// Grid coordinate of a question inside the assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DragSource {
    pub section_index: usize,
    pub question_index: usize,
}

impl DragSource {
    pub fn new(section_index: usize, question_index: usize) -> Self {
        Self {
            section_index,
            question_index,
        }
    }
}

/// Serializable form of every builder gesture, used by hosts that drive the
/// builder through JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum BuilderCommand {
    SetTitle {
        title: String,
    },
    SelectSection {
        index: usize,
    },
    AddSection,
    DeleteSection {
        index: usize,
    },
    DuplicateSection {
        index: usize,
    },
    MoveSection {
        from: usize,
        to: usize,
    },
    UpdateSection {
        index: usize,
        #[serde(flatten)]
        patch: SectionPatch,
    },
    AddQuestion {
        #[serde(rename = "type")]
        kind: QuestionType,
    },
    DeleteQuestion {
        section: usize,
        index: usize,
    },
    DuplicateQuestion {
        section: usize,
        index: usize,
    },
    MoveQuestion {
        from: DragSource,
        to: DragSource,
    },
    ReplaceQuestion {
        section: usize,
        index: usize,
        question: Question,
    },
    AddOption {
        section: usize,
        index: usize,
    },
    UpdateOption {
        section: usize,
        index: usize,
        option: usize,
        value: String,
    },
    DeleteOption {
        section: usize,
        index: usize,
        option: usize,
    },
    SetConditional {
        section: usize,
        index: usize,
        #[serde(default)]
        conditional: Option<Conditional>,
    },
    DragStart {
        source: DragSource,
    },
    DragOver {
        target: DragSource,
    },
    Drop {
        target: DragSource,
    },
}

pub type ChangeHandler = Box<dyn FnMut(&Assessment)>;

pub struct AssessmentBuilder {
    assessment: Assessment,
    active_section: usize,
    drag_source: Option<DragSource>,
    ids: IdGenerator,
    defaults: QuestionDefaults,
    on_change: Option<ChangeHandler>,
}

impl AssessmentBuilder {
    pub fn new(assessment: Assessment) -> Self {
        Self::with_defaults(assessment, QuestionDefaults::default())
    }

    pub fn with_defaults(assessment: Assessment, defaults: QuestionDefaults) -> Self {
        Self {
            ids: IdGenerator::for_assessment(&assessment),
            assessment,
            active_section: 0,
            drag_source: None,
            defaults,
            on_change: None,
        }
    }

    /// Registers the handler that receives every replacement assessment.
    pub fn on_change(mut self, handler: impl FnMut(&Assessment) + 'static) -> Self {
        self.on_change = Some(Box::new(handler));
        self
    }

    pub fn assessment(&self) -> &Assessment {
        &self.assessment
    }

    pub fn into_assessment(self) -> Assessment {
        self.assessment
    }

    pub fn active_section(&self) -> usize {
        self.active_section
    }

    pub fn drag_source(&self) -> Option<DragSource> {
        self.drag_source
    }

    /// Section and question counts shown in the editor header.
    pub fn stats(&self) -> (usize, usize) {
        (
            self.assessment.sections.len(),
            self.assessment.question_count(),
        )
    }

    pub fn select_section(&mut self, index: usize) -> Result<(), StructuralConstraintError> {
        if index >= self.assessment.sections.len() {
            return Err(StructuralConstraintError::SectionOutOfRange {
                index,
                len: self.assessment.sections.len(),
            });
        }
        self.active_section = index;
        Ok(())
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        let next = edit::set_title(&self.assessment, title);
        self.commit("set_title", next);
    }

    pub fn add_section(&mut self) {
        let next = edit::add_section(&self.assessment, &mut self.ids);
        self.active_section = next.sections.len() - 1;
        self.commit("add_section", next);
    }

    pub fn delete_section(&mut self, index: usize) -> Result<(), StructuralConstraintError> {
        let next = self.guard("delete_section", edit::delete_section(&self.assessment, index))?;
        if self.active_section >= index {
            self.active_section = self.active_section.saturating_sub(1);
        }
        self.commit("delete_section", next);
        Ok(())
    }

    pub fn duplicate_section(&mut self, index: usize) -> Result<(), StructuralConstraintError> {
        let result = edit::duplicate_section(&self.assessment, index, &mut self.ids);
        let next = self.guard("duplicate_section", result)?;
        self.active_section = index + 1;
        self.commit("duplicate_section", next);
        Ok(())
    }

    pub fn move_section(&mut self, from: usize, to: usize) -> Result<(), StructuralConstraintError> {
        let next = self.guard("move_section", edit::move_section(&self.assessment, from, to))?;
        self.active_section = to;
        self.commit("move_section", next);
        Ok(())
    }

    pub fn update_section(
        &mut self,
        index: usize,
        patch: SectionPatch,
    ) -> Result<(), StructuralConstraintError> {
        let result = edit::update_section(&self.assessment, index, patch);
        let next = self.guard("update_section", result)?;
        self.commit("update_section", next);
        Ok(())
    }

    /// Appends a question of `kind` to the active section and returns its id.
    pub fn add_question(&mut self, kind: QuestionType) -> Result<String, StructuralConstraintError> {
        let section = self.active_section;
        let result = edit::add_question(
            &self.assessment,
            section,
            kind,
            &mut self.ids,
            &self.defaults,
        );
        let next = self.guard("add_question", result)?;
        let id = next.sections[section]
            .questions
            .last()
            .map(|question| question.id.clone())
            .unwrap_or_default();
        self.commit("add_question", next);
        Ok(id)
    }

    pub fn delete_question(
        &mut self,
        section: usize,
        index: usize,
    ) -> Result<(), StructuralConstraintError> {
        let result = edit::delete_question(&self.assessment, section, index);
        let next = self.guard("delete_question", result)?;
        self.commit("delete_question", next);
        Ok(())
    }

    pub fn duplicate_question(
        &mut self,
        section: usize,
        index: usize,
    ) -> Result<(), StructuralConstraintError> {
        let result = edit::duplicate_question(&self.assessment, section, index, &mut self.ids);
        let next = self.guard("duplicate_question", result)?;
        self.commit("duplicate_question", next);
        Ok(())
    }

    pub fn move_question(
        &mut self,
        from: DragSource,
        to: DragSource,
    ) -> Result<(), StructuralConstraintError> {
        let result = edit::move_question(
            &self.assessment,
            from.section_index,
            from.question_index,
            to.section_index,
            to.question_index,
        );
        let next = self.guard("move_question", result)?;
        self.commit("move_question", next);
        Ok(())
    }

    /// Edits a question in place; see [`edit::update_question`] for the checks.
    pub fn update_question(
        &mut self,
        section: usize,
        index: usize,
        change: impl FnOnce(&mut Question),
    ) -> Result<(), StructuralConstraintError> {
        let result = edit::update_question(&self.assessment, section, index, change);
        let next = self.guard("update_question", result)?;
        self.commit("update_question", next);
        Ok(())
    }

    pub fn add_option(&mut self, section: usize, index: usize) -> Result<(), StructuralConstraintError> {
        let next = self.guard("add_option", edit::add_option(&self.assessment, section, index))?;
        self.commit("add_option", next);
        Ok(())
    }

    pub fn update_option(
        &mut self,
        section: usize,
        index: usize,
        option: usize,
        value: impl Into<String>,
    ) -> Result<(), StructuralConstraintError> {
        let result = edit::update_option(&self.assessment, section, index, option, value);
        let next = self.guard("update_option", result)?;
        self.commit("update_option", next);
        Ok(())
    }

    pub fn delete_option(
        &mut self,
        section: usize,
        index: usize,
        option: usize,
    ) -> Result<(), StructuralConstraintError> {
        let result = edit::delete_option(&self.assessment, section, index, option);
        let next = self.guard("delete_option", result)?;
        self.commit("delete_option", next);
        Ok(())
    }

    pub fn set_conditional(
        &mut self,
        section: usize,
        index: usize,
        conditional: Option<Conditional>,
    ) -> Result<(), StructuralConstraintError> {
        let result = edit::set_conditional(&self.assessment, section, index, conditional);
        let next = self.guard("set_conditional", result)?;
        self.commit("set_conditional", next);
        Ok(())
    }

    /// Records where a question drag started.
    pub fn drag_start(&mut self, source: DragSource) {
        self.drag_source = Some(source);
    }

    /// Hover over a drop target. Accepting the hover is all that is needed;
    /// nothing changes until the drop.
    pub fn drag_over(&mut self, _target: DragSource) {}

    /// Completes a drag. Returns `Ok(true)` when a question moved; dropping
    /// without a recorded source or back onto the source does nothing.
    pub fn drop(&mut self, target: DragSource) -> Result<bool, StructuralConstraintError> {
        let Some(source) = self.drag_source.take() else {
            return Ok(false);
        };
        if source == target {
            return Ok(false);
        }
        self.move_question(source, target)?;
        Ok(true)
    }

    /// Runs a serialized gesture.
    pub fn apply(&mut self, command: BuilderCommand) -> Result<(), StructuralConstraintError> {
        match command {
            BuilderCommand::SetTitle { title } => {
                self.set_title(title);
                Ok(())
            }
            BuilderCommand::SelectSection { index } => self.select_section(index),
            BuilderCommand::AddSection => {
                self.add_section();
                Ok(())
            }
            BuilderCommand::DeleteSection { index } => self.delete_section(index),
            BuilderCommand::DuplicateSection { index } => self.duplicate_section(index),
            BuilderCommand::MoveSection { from, to } => self.move_section(from, to),
            BuilderCommand::UpdateSection { index, patch } => self.update_section(index, patch),
            BuilderCommand::AddQuestion { kind } => self.add_question(kind).map(|_| ()),
            BuilderCommand::DeleteQuestion { section, index } => {
                self.delete_question(section, index)
            }
            BuilderCommand::DuplicateQuestion { section, index } => {
                self.duplicate_question(section, index)
            }
            BuilderCommand::MoveQuestion { from, to } => self.move_question(from, to),
            BuilderCommand::ReplaceQuestion {
                section,
                index,
                question,
            } => self.update_question(section, index, |current| *current = question),
            BuilderCommand::AddOption { section, index } => self.add_option(section, index),
            BuilderCommand::UpdateOption {
                section,
                index,
                option,
                value,
            } => self.update_option(section, index, option, value),
            BuilderCommand::DeleteOption {
                section,
                index,
                option,
            } => self.delete_option(section, index, option),
            BuilderCommand::SetConditional {
                section,
                index,
                conditional,
            } => self.set_conditional(section, index, conditional),
            BuilderCommand::DragStart { source } => {
                self.drag_start(source);
                Ok(())
            }
            BuilderCommand::DragOver { target } => {
                self.drag_over(target);
                Ok(())
            }
            BuilderCommand::Drop { target } => self.drop(target).map(|_| ()),
        }
    }

    /// Copies the identifiers the data layer assigned on save, without
    /// touching anything edited since.
    pub fn adopt_saved(&mut self, saved: &Assessment) {
        if self.assessment.job_id == saved.job_id {
            self.assessment.id = saved.id.clone();
            self.assessment.created_at = saved.created_at.clone();
        }
    }

    fn guard(
        &self,
        operation: &'static str,
        result: Result<Assessment, StructuralConstraintError>,
    ) -> Result<Assessment, StructuralConstraintError> {
        result.inspect_err(|err| {
            tracing::warn!(operation, error = %err, "assessment edit rejected");
        })
    }

    fn commit(&mut self, operation: &'static str, next: Assessment) {
        self.assessment = next;
        tracing::debug!(
            operation,
            sections = self.assessment.sections.len(),
            questions = self.assessment.question_count(),
            active_section = self.active_section,
            "assessment edited"
        );
        if let Some(handler) = self.on_change.as_mut() {
            handler(&self.assessment);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn builder() -> AssessmentBuilder {
        AssessmentBuilder::new(Assessment::new(3, "Backend", "general"))
    }

    #[test]
    fn every_edit_reaches_the_change_handler() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut builder = builder().on_change(move |assessment| {
            sink.borrow_mut().push(assessment.sections.len());
        });

        builder.add_section();
        builder.add_section();
        builder.delete_section(0).expect("delete");

        assert_eq!(*seen.borrow(), vec![2, 3, 2]);
    }

    #[test]
    fn rejected_edit_does_not_notify() {
        let calls = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&calls);
        let mut builder = builder().on_change(move |_| *counter.borrow_mut() += 1);

        assert_eq!(
            builder.delete_section(0),
            Err(StructuralConstraintError::LastSection)
        );
        assert_eq!(*calls.borrow(), 0);
        assert_eq!(builder.assessment().sections.len(), 1);
    }

    #[test]
    fn active_section_follows_section_edits() {
        let mut builder = builder();
        builder.add_section();
        assert_eq!(builder.active_section(), 1);
        builder.add_section();
        assert_eq!(builder.active_section(), 2);

        builder.delete_section(1).expect("delete");
        assert_eq!(builder.active_section(), 1);

        builder.duplicate_section(0).expect("duplicate");
        assert_eq!(builder.active_section(), 1);
        assert_eq!(builder.assessment().sections[1].title, "General Questions (Copy)");

        builder.move_section(0, 2).expect("move");
        assert_eq!(builder.active_section(), 2);

        builder.select_section(0).expect("select");
        builder.delete_section(2).expect("delete");
        assert_eq!(builder.active_section(), 0);
    }

    #[test]
    fn drop_without_source_is_a_no_op() {
        let mut builder = builder();
        builder.add_question(QuestionType::ShortText).expect("add");
        let before = builder.assessment().clone();
        assert_eq!(builder.drop(DragSource::new(0, 0)), Ok(false));
        assert_eq!(builder.assessment(), &before);
    }

    #[test]
    fn drag_and_drop_moves_question_and_clears_source() {
        let mut builder = builder();
        let first = builder.add_question(QuestionType::ShortText).expect("add");
        let second = builder.add_question(QuestionType::Numeric).expect("add");
        let third = builder.add_question(QuestionType::LongText).expect("add");

        builder.drag_start(DragSource::new(0, 2));
        builder.drag_over(DragSource::new(0, 1));
        assert_eq!(builder.drag_source(), Some(DragSource::new(0, 2)));
        assert_eq!(builder.drop(DragSource::new(0, 0)), Ok(true));
        assert_eq!(builder.drag_source(), None);

        let ids: Vec<_> = builder.assessment().sections[0]
            .questions
            .iter()
            .map(|question| question.id.clone())
            .collect();
        assert_eq!(ids, vec![third, first, second]);
    }

    #[test]
    fn drop_onto_source_leaves_order_unchanged() {
        let mut builder = builder();
        builder.add_question(QuestionType::ShortText).expect("add");
        builder.add_question(QuestionType::Numeric).expect("add");
        let before = builder.assessment().clone();

        builder.drag_start(DragSource::new(0, 1));
        assert_eq!(builder.drop(DragSource::new(0, 1)), Ok(false));
        assert_eq!(builder.assessment(), &before);
        assert_eq!(builder.drag_source(), None);
    }

    #[test]
    fn commands_deserialize_from_json() {
        let mut builder = builder();
        let command: BuilderCommand =
            serde_json::from_str(r#"{"command": "add_question", "type": "single-choice"}"#)
                .expect("command");
        builder.apply(command).expect("apply");

        let command: BuilderCommand = serde_json::from_str(
            r#"{"command": "update_section", "index": 0, "title": "Basics"}"#,
        )
        .expect("command");
        builder.apply(command).expect("apply");

        let section = &builder.assessment().sections[0];
        assert_eq!(section.title, "Basics");
        assert_eq!(section.questions.len(), 1);
    }
}
