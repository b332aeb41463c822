use serde_json::{Map, Value, json};

use crate::{
    responses::{Answer, ResponseSet},
    responses_schema,
    runtime::AssessmentRuntime,
    spec::{Assessment, QuestionType},
    validate::ViolationMap,
    visibility::resolve_visibility,
};

/// Status labels returned by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// A visible required question is still unanswered.
    NeedInput,
    /// The last submission was blocked by violations.
    Blocked,
    /// Every visible required question has an answer.
    Complete,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::NeedInput => "need_input",
            RenderStatus::Blocked => "blocked",
            RenderStatus::Complete => "complete",
        }
    }
}

/// Progress counters over visible questions.
#[derive(Debug, Clone)]
pub struct RenderProgress {
    pub answered: usize,
    pub total: usize,
}

/// Describes a single question for render outputs.
#[derive(Debug, Clone)]
pub struct RenderQuestion {
    pub id: String,
    /// 1-based position among the visible questions of its section.
    pub number: Option<usize>,
    pub prompt: String,
    pub description: Option<String>,
    pub kind: QuestionType,
    pub required: bool,
    pub hint: Option<String>,
    pub visible: bool,
    pub current_value: Option<Answer>,
    pub options: Option<Vec<String>>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RenderSection {
    pub id: String,
    pub title: String,
    pub description: String,
    pub questions: Vec<RenderQuestion>,
}

/// Collected payload used by both text and JSON renderers.
#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub title: String,
    pub job_id: u64,
    pub status: RenderStatus,
    pub next_question_id: Option<String>,
    pub current_section: usize,
    pub progress: RenderProgress,
    pub sections: Vec<RenderSection>,
    pub schema: Value,
}

/// Build the renderer payload from the assessment, answers and the
/// violations of the last submission.
pub fn build_render_payload(
    assessment: &Assessment,
    responses: &ResponseSet,
    violations: &ViolationMap,
    current_section: usize,
) -> RenderPayload {
    let visibility = resolve_visibility(assessment, responses);
    let is_visible = |id: &str| visibility.get(id).copied().unwrap_or(true);
    let is_answered = |id: &str| responses.get(id).is_some_and(|answer| !answer.is_empty());

    let mut answered = 0;
    let mut total = 0;
    let mut next_question_id = None;
    for question in assessment.questions() {
        if !is_visible(&question.id) {
            continue;
        }
        total += 1;
        if is_answered(&question.id) {
            answered += 1;
        } else if question.required && next_question_id.is_none() {
            next_question_id = Some(question.id.clone());
        }
    }

    let sections = assessment
        .sections
        .iter()
        .map(|section| {
            let mut number = 0;
            let questions = section
                .questions
                .iter()
                .map(|question| {
                    let visible = is_visible(&question.id);
                    if visible {
                        number += 1;
                    }
                    RenderQuestion {
                        id: question.id.clone(),
                        number: visible.then_some(number),
                        prompt: question.question.clone(),
                        description: question.description.clone(),
                        kind: question.question_type(),
                        required: question.required,
                        hint: question.constraint_hint(),
                        visible,
                        current_value: responses.get(&question.id).cloned(),
                        options: question.options().map(<[String]>::to_vec),
                        errors: violations
                            .get(&question.id)
                            .map(|list| list.iter().map(|v| v.message.clone()).collect())
                            .unwrap_or_default(),
                    }
                })
                .collect();
            RenderSection {
                id: section.id.clone(),
                title: section.title.clone(),
                description: section.description.clone(),
                questions,
            }
        })
        .collect();

    let status = if !violations.is_empty() {
        RenderStatus::Blocked
    } else if next_question_id.is_some() {
        RenderStatus::NeedInput
    } else {
        RenderStatus::Complete
    };

    RenderPayload {
        title: assessment.title.clone(),
        job_id: assessment.job_id,
        status,
        next_question_id,
        current_section: current_section.min(assessment.sections.len().saturating_sub(1)),
        progress: RenderProgress { answered, total },
        sections,
        schema: responses_schema::generate(assessment, &visibility),
    }
}

/// Payload for the current state of a running fill-out session.
pub fn runtime_payload(runtime: &AssessmentRuntime) -> RenderPayload {
    build_render_payload(
        runtime.assessment(),
        runtime.responses(),
        runtime.violations(),
        runtime.current_section_index(),
    )
}

/// Render the payload as a structured JSON-friendly value.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let sections = payload
        .sections
        .iter()
        .map(|section| {
            let questions = section
                .questions
                .iter()
                .map(|question| {
                    let mut map = Map::new();
                    map.insert("id".into(), Value::String(question.id.clone()));
                    map.insert("number".into(), json!(question.number));
                    map.insert("prompt".into(), Value::String(question.prompt.clone()));
                    map.insert(
                        "description".into(),
                        question
                            .description
                            .clone()
                            .map(Value::String)
                            .unwrap_or(Value::Null),
                    );
                    map.insert("type".into(), Value::String(question.kind.as_str().into()));
                    map.insert("label".into(), Value::String(question.kind.label().into()));
                    map.insert("required".into(), Value::Bool(question.required));
                    if let Some(hint) = &question.hint {
                        map.insert("hint".into(), Value::String(hint.clone()));
                    }
                    if let Some(current_value) = &question.current_value {
                        map.insert("current_value".into(), json!(current_value));
                    }
                    if let Some(options) = &question.options {
                        map.insert("options".into(), json!(options));
                    }
                    if !question.errors.is_empty() {
                        map.insert("errors".into(), json!(question.errors));
                    }
                    map.insert("visible".into(), Value::Bool(question.visible));
                    Value::Object(map)
                })
                .collect::<Vec<_>>();
            json!({
                "id": section.id,
                "title": section.title,
                "description": section.description,
                "questions": questions,
            })
        })
        .collect::<Vec<_>>();

    json!({
        "title": payload.title,
        "job_id": payload.job_id,
        "status": payload.status.as_str(),
        "next_question_id": payload.next_question_id,
        "current_section": payload.current_section,
        "progress": {
            "answered": payload.progress.answered,
            "total": payload.progress.total,
        },
        "sections": sections,
        "schema": payload.schema,
    })
}

/// Render the payload as human-friendly text.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Assessment: {} (job {})", payload.title, payload.job_id));
    lines.push(format!(
        "Status: {} ({}/{})",
        payload.status.as_str(),
        payload.progress.answered,
        payload.progress.total
    ));
    if let Some(next_question) = &payload.next_question_id {
        lines.push(format!("Next question: {}", next_question));
    }

    let section_count = payload.sections.len();
    for (index, section) in payload.sections.iter().enumerate() {
        lines.push(String::new());
        lines.push(format!(
            "Section {} of {}: {}",
            index + 1,
            section_count,
            section.title
        ));
        if !section.description.is_empty() {
            lines.push(format!("  {}", section.description));
        }
        for question in section.questions.iter().filter(|question| question.visible) {
            let mut entry = format!(
                "{}. {}",
                question.number.unwrap_or_default(),
                question.prompt
            );
            if question.required {
                entry.push_str(" *");
            }
            entry.push_str(&format!(" [{}]", question.kind.label()));
            lines.push(entry);
            if let Some(description) = &question.description {
                lines.push(format!("   {}", description));
            }
            if let Some(options) = &question.options {
                for option in options {
                    lines.push(format!("   ( ) {}", option));
                }
            }
            if let Some(hint) = &question.hint {
                lines.push(format!("   {}", hint));
            }
            if let Some(value) = &question.current_value {
                lines.push(format!("   = {}", value.display()));
            }
            for error in &question.errors {
                lines.push(format!("   ! {}", error));
            }
        }
    }

    lines.join("\n")
}
