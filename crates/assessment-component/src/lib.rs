use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

use assessment_spec::visibility::dangling_dependencies;
use assessment_spec::{
    Assessment, AssessmentBuilder, AssessmentRuntime, BuilderCommand, ConfigError, EngineConfig,
    Input, JobId, RenderPayload, ResponseSet, RuntimeError, StructuralConstraintError,
    SubmitOutcome, Submission, build_render_payload, check_structure,
    render_json_ui as spec_render_json_ui, render_text as spec_render_text, resolve_visibility,
    responses_schema, runtime_payload, validate_responses as spec_validate_responses,
};

const DEFAULT_ASSESSMENT: &str = include_str!("../../assessment-spec/tests/fixtures/screening.json");

#[derive(Debug, Error)]
enum ComponentError {
    #[error("failed to parse config/{0}")]
    ConfigParse(#[source] serde_json::Error),
    #[error("invalid engine config: {0}")]
    EngineConfig(#[from] ConfigError),
    #[error("failed to parse input: {0}")]
    InputParse(#[source] serde_json::Error),
    #[error("assessment for job {0} is not available")]
    AssessmentUnavailable(JobId),
    #[error("json encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),
    #[error("edit rejected: {0}")]
    Structure(#[from] StructuralConstraintError),
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

#[derive(Debug, Deserialize, Serialize, Default)]
struct ComponentConfig {
    #[serde(default)]
    assessment_json: Option<String>,
    #[serde(default)]
    engine_config: Option<Value>,
}

fn parse_config(config_json: &str) -> Result<ComponentConfig, ComponentError> {
    if config_json.trim().is_empty() {
        Ok(ComponentConfig::default())
    } else {
        serde_json::from_str(config_json).map_err(ComponentError::ConfigParse)
    }
}

fn load_assessment(config_json: &str) -> Result<Assessment, ComponentError> {
    let config = parse_config(config_json)?;
    let assessment_json = config
        .assessment_json
        .as_deref()
        .unwrap_or(DEFAULT_ASSESSMENT);
    serde_json::from_str(assessment_json).map_err(ComponentError::ConfigParse)
}

fn engine_config(config_json: &str) -> Result<EngineConfig, ComponentError> {
    match parse_config(config_json)?.engine_config {
        Some(value) => Ok(EngineConfig::from_json_str(&value.to_string())?),
        None => Ok(EngineConfig::default()),
    }
}

fn ensure_assessment(job_id: JobId, config_json: &str) -> Result<Assessment, ComponentError> {
    let assessment = load_assessment(config_json)?;
    if assessment.job_id != job_id {
        Err(ComponentError::AssessmentUnavailable(job_id))
    } else {
        Ok(assessment)
    }
}

/// A blank string means no answers yet; anything else must be a response object.
fn parse_responses(responses_json: &str) -> Result<ResponseSet, ComponentError> {
    if responses_json.trim().is_empty() {
        return Ok(ResponseSet::new());
    }
    let value: Value = serde_json::from_str(responses_json).map_err(ComponentError::InputParse)?;
    ResponseSet::from_value(&value).map_err(ComponentError::InputParse)
}

fn respond(result: Result<Value, ComponentError>) -> String {
    match result {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|error| {
            json!({"error": format!("json encode: {}", error)}).to_string()
        }),
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

fn respond_string(result: Result<String, ComponentError>) -> String {
    match result {
        Ok(value) => value,
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Value, ComponentError> {
    serde_json::to_value(value).map_err(ComponentError::JsonEncode)
}

pub fn describe(job_id: JobId, config_json: &str) -> String {
    respond(ensure_assessment(job_id, config_json).and_then(|assessment| encode(&assessment)))
}

/// Structural check of the configured assessment; dangling conditionals are
/// reported as warnings.
pub fn check_assessment(config_json: &str) -> String {
    respond(load_assessment(config_json).map(|assessment| {
        let warnings = dangling_dependencies(&assessment)
            .into_iter()
            .map(|(question, depends_on)| {
                Value::String(format!(
                    "question '{}' depends on missing question '{}'",
                    question, depends_on
                ))
            })
            .collect::<Vec<_>>();
        match check_structure(&assessment) {
            Ok(()) => json!({ "valid": true, "warnings": warnings }),
            Err(err) => json!({ "valid": false, "error": err.to_string(), "warnings": warnings }),
        }
    }))
}

pub fn get_responses_schema(job_id: JobId, config_json: &str, responses_json: &str) -> String {
    let schema = ensure_assessment(job_id, config_json).and_then(|assessment| {
        let responses = parse_responses(responses_json)?;
        let visibility = resolve_visibility(&assessment, &responses);
        Ok(responses_schema(&assessment, &visibility))
    });
    respond(schema)
}

pub fn validate_responses(job_id: JobId, config_json: &str, responses_json: &str) -> String {
    let validation = ensure_assessment(job_id, config_json).and_then(|assessment| {
        let responses = parse_responses(responses_json)?;
        let visibility = resolve_visibility(&assessment, &responses);
        let violations = spec_validate_responses(&assessment, &responses, &visibility);
        Ok(json!({
            "valid": violations.is_empty(),
            "violations": encode(&violations)?,
        }))
    });
    respond(validation)
}

fn render_payload(
    job_id: JobId,
    config_json: &str,
    responses_json: &str,
) -> Result<RenderPayload, ComponentError> {
    let assessment = ensure_assessment(job_id, config_json)?;
    let responses = parse_responses(responses_json)?;
    Ok(build_render_payload(
        &assessment,
        &responses,
        &Default::default(),
        0,
    ))
}

pub fn render_text(job_id: JobId, config_json: &str, responses_json: &str) -> String {
    respond_string(
        render_payload(job_id, config_json, responses_json)
            .map(|payload| spec_render_text(&payload)),
    )
}

pub fn render_json_ui(job_id: JobId, config_json: &str, responses_json: &str) -> String {
    respond(
        render_payload(job_id, config_json, responses_json)
            .map(|payload| spec_render_json_ui(&payload)),
    )
}

fn progress(payload: &RenderPayload) -> Value {
    json!({
        "answered": payload.progress.answered,
        "total": payload.progress.total,
    })
}

/// Applies one input gesture to the stored responses. Nothing is validated
/// until [`submit_all`].
pub fn submit_patch(
    job_id: JobId,
    config_json: &str,
    responses_json: &str,
    question_id: &str,
    input_json: &str,
) -> String {
    respond(ensure_assessment(job_id, config_json).and_then(|assessment| {
        let input: Input = serde_json::from_str(input_json).map_err(ComponentError::InputParse)?;
        let mut runtime =
            AssessmentRuntime::new(assessment)?.with_responses(parse_responses(responses_json)?);
        runtime.answer(question_id, input)?;
        let payload = runtime_payload(&runtime);
        Ok(json!({
            "status": payload.status.as_str(),
            "next_question_id": payload.next_question_id,
            "progress": progress(&payload),
            "responses": runtime.responses().to_value(),
        }))
    }))
}

pub fn submit_all(job_id: JobId, config_json: &str, responses_json: &str) -> String {
    respond(ensure_assessment(job_id, config_json).and_then(|assessment| {
        let mut runtime =
            AssessmentRuntime::new(assessment)?.with_responses(parse_responses(responses_json)?);
        match runtime.submit()? {
            SubmitOutcome::Blocked(violations) => {
                let payload = runtime_payload(&runtime);
                Ok(json!({
                    "status": "blocked",
                    "progress": progress(&payload),
                    "responses": runtime.responses().to_value(),
                    "violations": encode(&violations)?,
                }))
            }
            SubmitOutcome::Submitted(responses) => {
                let submission = Submission::new(job_id, responses);
                Ok(json!({
                    "status": "submitted",
                    "submission": encode(&submission)?,
                }))
            }
        }
    }))
}

/// Runs one builder command against the configured assessment and returns the
/// replacement document.
pub fn apply_edit(job_id: JobId, config_json: &str, command_json: &str) -> String {
    respond(ensure_assessment(job_id, config_json).and_then(|assessment| {
        let config = engine_config(config_json)?;
        let command: BuilderCommand =
            serde_json::from_str(command_json).map_err(ComponentError::InputParse)?;
        let mut builder = AssessmentBuilder::with_defaults(assessment, config.defaults);
        builder.apply(command)?;
        let mut value = encode(builder.assessment())?;
        if let Some(object) = value.as_object_mut() {
            object.insert(
                "stats".into(),
                Value::Object(Map::from_iter([
                    ("sections".to_string(), json!(builder.stats().0)),
                    ("questions".to_string(), json!(builder.stats().1)),
                ])),
            );
        }
        Ok(value)
    }))
}
