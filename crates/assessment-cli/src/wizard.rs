use std::fmt::Write;

use assessment_spec::{
    Answer, QuestionType, RenderPayload, RenderQuestion, RenderStatus, Submission, ViolationMap,
};

/// Controls which bits of state the fill presenter prints.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum Verbosity {
    /// Clean output: question prompts only.
    Clean,
    /// Verbose output: status, visible questions, hints.
    Verbose,
}

impl Verbosity {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Clean
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}

/// Prints prompts and outcomes while a candidate fills an assessment.
pub struct WizardPresenter {
    verbosity: Verbosity,
    header_printed: bool,
    current_section: Option<usize>,
    show_responses_json: bool,
}

impl WizardPresenter {
    pub fn new(verbosity: Verbosity, show_responses_json: bool) -> Self {
        Self {
            verbosity,
            header_printed: false,
            current_section: None,
            show_responses_json,
        }
    }

    pub fn show_header(&mut self, payload: &RenderPayload) {
        if self.header_printed {
            return;
        }
        println!("Assessment: {}", payload.title);
        self.header_printed = true;
    }

    pub fn show_status(&self, payload: &RenderPayload) {
        if self.verbosity.is_verbose() {
            println!(
                "Status: {} ({}/{})",
                payload.status.as_str(),
                payload.progress.answered,
                payload.progress.total
            );
            self.print_visible_questions(payload);
        } else if payload.status == RenderStatus::NeedInput && payload.progress.total == 0 {
            println!("No visible questions are available; check your conditional logic.");
        }
    }

    /// Prints the section banner when the prompt moves into a new section.
    pub fn enter_section(&mut self, payload: &RenderPayload, index: usize) {
        if self.current_section == Some(index) {
            return;
        }
        if let Some(section) = payload.sections.get(index) {
            println!(
                "Section {} of {}: {}",
                index + 1,
                payload.sections.len(),
                section.title
            );
            if !section.description.is_empty() {
                println!("{}", section.description);
            }
        }
        self.current_section = Some(index);
    }

    fn print_visible_questions(&self, payload: &RenderPayload) {
        println!("Visible questions:");
        for question in payload
            .sections
            .iter()
            .flat_map(|section| section.questions.iter())
            .filter(|question| question.visible)
        {
            let mut entry = format!(" - {} ({})", question.id, question.prompt);
            if question.required {
                entry.push_str(" [required]");
            }
            if let Some(value) = &question.current_value {
                entry.push_str(&format!(" = {}", value.display()));
            }
            println!("{}", entry);
        }
    }

    pub fn show_prompt(&self, prompt: &PromptContext) {
        let mut line = format!("{}. {}", prompt.number, prompt.title);
        if prompt.required {
            line.push_str(" *");
        }
        if let Some(hint) = &prompt.input_hint {
            line.push(' ');
            line.push_str(hint);
        }
        println!("{}", line);
        if let Some(description) = &prompt.description {
            println!("{}", description);
        }
        for (index, option) in prompt.options.iter().enumerate() {
            println!("  {}) {}", index + 1, option);
        }
        if self.verbosity.is_verbose()
            && let Some(constraint) = &prompt.constraint
        {
            println!("{}", constraint);
        }
        if let Some(current) = &prompt.current {
            println!("Current answer: {}", current.display());
        }
        for error in &prompt.errors {
            println!("  ! {}", error);
        }
    }

    pub fn show_parse_error(&self, error: &AnswerParseError) {
        eprintln!("Invalid answer: {}", error.user_message);
        if let Some(debug) = &error.debug_message {
            eprintln!("  Expected: {}", debug);
        }
    }

    pub fn show_violations(&self, violations: &ViolationMap) {
        eprintln!("Submission blocked:");
        for violation in violations.values().flatten() {
            eprintln!("  {}: {}", violation.question_id, violation.message);
        }
    }

    pub fn show_completion(&self, submission: &Submission) {
        println!("Done ✅");
        match submission.to_cbor() {
            Ok(bytes) => {
                println!("Responses (CBOR hex): {}", encode_hex(&bytes));
            }
            Err(err) => {
                eprintln!("Failed to serialize responses to CBOR: {}", err);
            }
        }
        if self.show_responses_json {
            match submission.to_json_pretty() {
                Ok(pretty) => println!("{}", pretty),
                Err(err) => {
                    eprintln!("Failed to serialize responses to JSON: {}", err);
                }
            }
        }
    }
}

/// Context used to format a single prompt.
pub struct PromptContext {
    pub number: usize,
    pub title: String,
    pub description: Option<String>,
    pub required: bool,
    pub input_hint: Option<String>,
    pub constraint: Option<String>,
    pub options: Vec<String>,
    pub current: Option<Answer>,
    pub errors: Vec<String>,
}

impl PromptContext {
    pub fn new(question: &RenderQuestion) -> Self {
        Self {
            number: question.number.unwrap_or(1),
            title: if question.prompt.is_empty() {
                question.id.clone()
            } else {
                question.prompt.clone()
            },
            description: question.description.clone(),
            required: question.required,
            input_hint: input_hint(question.kind),
            constraint: question.hint.clone(),
            options: question.options.clone().unwrap_or_default(),
            current: question.current_value.clone(),
            errors: question.errors.clone(),
        }
    }
}

fn input_hint(kind: QuestionType) -> Option<String> {
    match kind {
        QuestionType::SingleChoice => Some("(pick one: number or label)".to_string()),
        QuestionType::MultiChoice => Some("(comma separated numbers or labels)".to_string()),
        QuestionType::Numeric => Some("(number)".to_string()),
        QuestionType::FileUpload => Some("(path to file)".to_string()),
        QuestionType::ShortText | QuestionType::LongText => None,
    }
}

/// Error produced when parsing answers from the user.
#[derive(Debug)]
pub struct AnswerParseError {
    pub user_message: String,
    pub debug_message: Option<String>,
}

impl AnswerParseError {
    pub fn new(user_message: impl Into<String>, debug_message: Option<String>) -> Self {
        Self {
            user_message: user_message.into(),
            debug_message,
        }
    }
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut encoded = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(&mut encoded, "{:02x}", byte);
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_encoding_is_lowercase_pairs() {
        assert_eq!(encode_hex(&[0x00, 0xab, 0x7f]), "00ab7f");
    }
}
