//! Fill-out state machine for candidates.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capture::{CaptureError, Input, capture};
use crate::edit::check_structure;
use crate::error::StructuralConstraintError;
use crate::responses::ResponseSet;
use crate::spec::{Assessment, Section};
use crate::validate::{ViolationMap, validate_responses};
use crate::visibility::{VisibilityMap, dangling_dependencies, resolve_visibility};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeState {
    Editing,
    Validating,
    Submitted,
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("unknown question '{0}'")]
    UnknownQuestion(String),
    #[error("assessment was already submitted")]
    AlreadySubmitted,
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Structure(#[from] StructuralConstraintError),
}

/// Result of a submission attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// At least one visible question failed; the runtime is back in `Editing`.
    Blocked(ViolationMap),
    /// Every visible question passed; carries the full response set.
    Submitted(ResponseSet),
}

impl SubmitOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, SubmitOutcome::Submitted(_))
    }
}

pub type SubmitHandler = Box<dyn FnMut(&ResponseSet)>;

pub struct AssessmentRuntime {
    assessment: Assessment,
    responses: ResponseSet,
    violations: ViolationMap,
    state: RuntimeState,
    current_section: usize,
    on_submit: Option<SubmitHandler>,
}

impl AssessmentRuntime {
    /// Starts a fill-out session. Schemas with duplicate ids, empty choice
    /// lists or conditional cycles are rejected.
    pub fn new(assessment: Assessment) -> Result<Self, RuntimeError> {
        check_structure(&assessment)?;
        for (question, depends_on) in dangling_dependencies(&assessment) {
            tracing::warn!(
                question = %question,
                depends_on = %depends_on,
                "conditional refers to a missing question"
            );
        }
        Ok(Self {
            assessment,
            responses: ResponseSet::new(),
            violations: ViolationMap::new(),
            state: RuntimeState::Editing,
            current_section: 0,
            on_submit: None,
        })
    }

    /// Starts from previously captured answers.
    pub fn with_responses(mut self, responses: ResponseSet) -> Self {
        self.responses = responses;
        self
    }

    pub fn on_submit(mut self, handler: impl FnMut(&ResponseSet) + 'static) -> Self {
        self.on_submit = Some(Box::new(handler));
        self
    }

    pub fn assessment(&self) -> &Assessment {
        &self.assessment
    }

    pub fn state(&self) -> RuntimeState {
        self.state
    }

    pub fn responses(&self) -> &ResponseSet {
        &self.responses
    }

    /// Violations from the last blocked submission.
    pub fn violations(&self) -> &ViolationMap {
        &self.violations
    }

    pub fn visibility(&self) -> VisibilityMap {
        resolve_visibility(&self.assessment, &self.responses)
    }

    pub fn is_visible(&self, question_id: &str) -> bool {
        self.visibility().get(question_id).copied().unwrap_or(false)
    }

    /// Records input for a question. No validation runs here.
    pub fn answer(&mut self, question_id: &str, input: Input) -> Result<(), RuntimeError> {
        if self.state == RuntimeState::Submitted {
            return Err(RuntimeError::AlreadySubmitted);
        }
        let question = self
            .assessment
            .question(question_id)
            .ok_or_else(|| RuntimeError::UnknownQuestion(question_id.to_string()))?;
        match capture(question, self.responses.get(question_id), input)? {
            Some(answer) => self.responses.set(question_id, answer),
            None => {
                self.responses.remove(question_id);
            }
        }
        Ok(())
    }

    /// Validates the visible questions and either blocks with violations or
    /// completes the session.
    pub fn submit(&mut self) -> Result<SubmitOutcome, RuntimeError> {
        if self.state == RuntimeState::Submitted {
            return Err(RuntimeError::AlreadySubmitted);
        }
        self.state = RuntimeState::Validating;
        let visibility = self.visibility();
        let violations = validate_responses(&self.assessment, &self.responses, &visibility);

        if !violations.is_empty() {
            tracing::info!(
                job_id = self.assessment.job_id,
                questions = violations.len(),
                "submission blocked by validation"
            );
            self.violations = violations.clone();
            self.state = RuntimeState::Editing;
            return Ok(SubmitOutcome::Blocked(violations));
        }

        self.violations.clear();
        self.state = RuntimeState::Submitted;
        tracing::info!(
            job_id = self.assessment.job_id,
            answers = self.responses.len(),
            "assessment submitted"
        );
        if let Some(handler) = self.on_submit.as_mut() {
            handler(&self.responses);
        }
        Ok(SubmitOutcome::Submitted(self.responses.clone()))
    }

    pub fn current_section_index(&self) -> usize {
        self.current_section
    }

    pub fn current_section(&self) -> Option<&Section> {
        self.assessment.sections.get(self.current_section)
    }

    /// Advances to the next section; returns `false` on the last one.
    pub fn next_section(&mut self) -> bool {
        if self.current_section + 1 < self.assessment.sections.len() {
            self.current_section += 1;
            true
        } else {
            false
        }
    }

    /// Goes back one section; returns `false` on the first one.
    pub fn previous_section(&mut self) -> bool {
        if self.current_section > 0 {
            self.current_section -= 1;
            true
        } else {
            false
        }
    }

    pub fn go_to_section(&mut self, index: usize) -> Result<(), RuntimeError> {
        let len = self.assessment.sections.len();
        if index >= len {
            return Err(StructuralConstraintError::SectionOutOfRange { index, len }.into());
        }
        self.current_section = index;
        Ok(())
    }
}
