use serde_json::{Map, Value, json};

use crate::spec::{Assessment, Question, QuestionKind};
use crate::visibility::VisibilityMap;

/// Generates a response-set JSON schema restricted to the visible questions.
pub fn generate(assessment: &Assessment, visibility: &VisibilityMap) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for question in assessment.questions() {
        if !visibility.get(&question.id).copied().unwrap_or(true) {
            continue;
        }
        properties.insert(question.id.clone(), question_schema(question));
        if question.required {
            required.push(Value::String(question.id.clone()));
        }
    }

    let mut root = Map::new();
    root.insert("type".into(), Value::String("object".into()));
    root.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        root.insert("required".into(), Value::Array(required));
    }

    Value::Object(root)
}

fn question_schema(question: &Question) -> Value {
    let mut schema = Map::new();
    match &question.kind {
        QuestionKind::ShortText { validation } | QuestionKind::LongText { validation } => {
            schema.insert("type".into(), Value::String("string".into()));
            if let Some(max_length) = validation.max_length {
                schema.insert("maxLength".into(), Value::Number(max_length.into()));
            }
        }
        QuestionKind::SingleChoice { options } => {
            schema.insert("type".into(), Value::String("string".into()));
            schema.insert("enum".into(), string_array(options));
        }
        QuestionKind::MultiChoice { options } => {
            schema.insert("type".into(), Value::String("array".into()));
            schema.insert("uniqueItems".into(), Value::Bool(true));
            schema.insert(
                "items".into(),
                json!({ "type": "string", "enum": string_array(options) }),
            );
        }
        QuestionKind::Numeric { validation } => {
            // Numeric answers are kept as typed, so bounds are advisory.
            schema.insert("type".into(), Value::String("string".into()));
            if let Some(min) = validation.min.and_then(number_from_f64) {
                schema.insert("x-minimum".into(), min);
            }
            if let Some(max) = validation.max.and_then(number_from_f64) {
                schema.insert("x-maximum".into(), max);
            }
        }
        QuestionKind::FileUpload { validation } => {
            schema.insert("type".into(), Value::String("object".into()));
            schema.insert(
                "properties".into(),
                json!({
                    "name": { "type": "string" },
                    "sizeBytes": { "type": "integer", "minimum": 0 }
                }),
            );
            schema.insert("required".into(), json!(["name"]));
            if let Some(max_size) = validation.max_size.and_then(number_from_f64) {
                schema.insert("x-max-size-mb".into(), max_size);
            }
            if let Some(allowed) = &validation.allowed_types {
                schema.insert("x-allowed-types".into(), Value::String(allowed.clone()));
            }
        }
    }

    if !question.question.is_empty() {
        schema.insert("title".into(), Value::String(question.question.clone()));
    }
    if let Some(description) = &question.description {
        schema.insert("description".into(), Value::String(description.clone()));
    }

    Value::Object(schema)
}

fn string_array(values: &[String]) -> Value {
    Value::Array(values.iter().cloned().map(Value::String).collect())
}

fn number_from_f64(value: f64) -> Option<Value> {
    serde_json::Number::from_f64(value).map(Value::Number)
}
