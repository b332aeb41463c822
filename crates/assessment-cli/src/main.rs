mod wizard;

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use assessment_component::{
    apply_edit, check_assessment, get_responses_schema, render_json_ui, render_text,
    validate_responses,
};
use assessment_spec::{
    Assessment, AssessmentRuntime, EngineConfig, Input, JobId, QuestionType, RenderPayload,
    RenderQuestion, ResponseSet, RuntimeError, Submission, SubmitOutcome, assessment_json_schema,
    default_assessment, runtime_payload,
};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde_json::{Value, json};
use wizard::{AnswerParseError, PromptContext, Verbosity, WizardPresenter};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Job assessment authoring and fill-out CLI",
    long_about = "Creates, edits, checks and renders job-specific candidate assessments, and runs them interactively in a text shell"
)]
struct Cli {
    /// Engine configuration JSON (question defaults, store latency).
    #[arg(long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RenderMode {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Create the default assessment skeleton for a job.
    New {
        /// Job the assessment belongs to.
        #[arg(long, value_name = "ID")]
        job_id: JobId,
        /// Job title; the assessment is titled "<job title> Assessment".
        #[arg(long, value_name = "TITLE")]
        job_title: Option<String>,
        /// Output file (defaults to stdout).
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
        /// Overwrite the output file if present.
        #[arg(long)]
        force: bool,
    },
    /// Apply one builder command (JSON) to an assessment.
    Edit {
        #[arg(long, value_name = "ASSESSMENT")]
        assessment: PathBuf,
        /// Builder command, e.g. '{"command": "add_section"}'.
        #[arg(long = "command", value_name = "JSON")]
        command_json: String,
        /// Write the result back to the assessment file instead of stdout.
        #[arg(long)]
        write: bool,
    },
    /// Check the structure of an assessment.
    Check {
        #[arg(long, value_name = "ASSESSMENT")]
        assessment: PathBuf,
    },
    /// Print the assessment document schema, or the response schema of an assessment.
    Schema {
        #[arg(long, value_name = "ASSESSMENT")]
        assessment: Option<PathBuf>,
        /// Responses used to resolve which questions are visible.
        #[arg(long, value_name = "RESPONSES", requires = "assessment")]
        responses: Option<PathBuf>,
    },
    /// Render an assessment with optional responses.
    Render {
        #[arg(long, value_name = "ASSESSMENT")]
        assessment: PathBuf,
        #[arg(long, value_name = "RESPONSES")]
        responses: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// Validate responses against an assessment.
    Validate {
        #[arg(long, value_name = "ASSESSMENT")]
        assessment: PathBuf,
        #[arg(long, value_name = "RESPONSES")]
        responses: PathBuf,
    },
    /// Fill out an assessment interactively.
    Fill {
        #[arg(long, value_name = "ASSESSMENT")]
        assessment: PathBuf,
        /// Optional JSON file with initial responses.
        #[arg(long, value_name = "RESPONSES")]
        responses: Option<PathBuf>,
        /// Show status, visible questions and constraint hints.
        #[arg(long)]
        details: bool,
        /// Also print the submission as JSON.
        #[arg(long)]
        responses_json: bool,
    },
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(&cli);
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::New {
            job_id,
            job_title,
            out,
            force,
        } => run_new(job_id, job_title, out, force),
        Command::Edit {
            assessment,
            command_json,
            write,
        } => run_edit(&config, assessment, &command_json, write),
        Command::Check { assessment } => run_check(assessment),
        Command::Schema {
            assessment,
            responses,
        } => run_schema(assessment, responses),
        Command::Render {
            assessment,
            responses,
            format,
        } => run_render(assessment, responses, format),
        Command::Validate {
            assessment,
            responses,
        } => run_validate(assessment, responses),
        Command::Fill {
            assessment,
            responses,
            details,
            responses_json,
        } => run_fill(assessment, responses, details, responses_json),
    }
}

fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "warn",
        1 => "assessment_spec=debug,talentflow_assessments=debug,warn",
        _ => "assessment_spec=trace,talentflow_assessments=trace,info",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(io::stderr)
                .init();
        }
    }
}

fn load_config(path: Option<&Path>) -> CliResult<EngineConfig> {
    match path {
        Some(path) => {
            let config = EngineConfig::from_path(path)?;
            tracing::debug!(path = %path.display(), "engine config loaded");
            Ok(config)
        }
        None => Ok(EngineConfig::default()),
    }
}

fn run_new(
    job_id: JobId,
    job_title: Option<String>,
    out: Option<PathBuf>,
    force: bool,
) -> CliResult<()> {
    let assessment = default_assessment(job_id, job_title.as_deref());
    let pretty = serde_json::to_string_pretty(&assessment)?;

    match out {
        Some(path) => {
            if path.exists() && !force {
                return Err(format!(
                    "{} already exists; pass --force to overwrite",
                    path.display()
                )
                .into());
            }
            fs::write(&path, pretty)?;
            println!("Assessment written to {}", path.display());
        }
        None => println!("{}", pretty),
    }
    Ok(())
}

fn run_edit(
    config: &EngineConfig,
    assessment_path: PathBuf,
    command_json: &str,
    write: bool,
) -> CliResult<()> {
    let (raw, assessment) = read_assessment(&assessment_path)?;
    let component_config = json!({
        "assessment_json": raw,
        "engine_config": serde_json::to_value(config)?,
    })
    .to_string();
    let mut edited = parse_component_result(&apply_edit(
        assessment.job_id,
        &component_config,
        command_json,
    ))?;
    let stats = edited
        .as_object_mut()
        .and_then(|object| object.remove("stats"))
        .unwrap_or(Value::Null);
    let pretty = serde_json::to_string_pretty(&edited)?;

    if write {
        fs::write(&assessment_path, pretty)?;
        println!(
            "Updated {} ({} sections, {} questions)",
            assessment_path.display(),
            stats["sections"],
            stats["questions"]
        );
    } else {
        println!("{}", pretty);
    }
    Ok(())
}

fn run_check(assessment_path: PathBuf) -> CliResult<()> {
    let raw = fs::read_to_string(&assessment_path)?;
    let config = json!({ "assessment_json": raw }).to_string();
    let result = parse_component_result(&check_assessment(&config))?;
    if let Some(warnings) = result["warnings"].as_array() {
        for warning in warnings.iter().filter_map(Value::as_str) {
            eprintln!("warning: {}", warning);
        }
    }
    if result["valid"].as_bool().unwrap_or(false) {
        println!("Assessment is valid");
        Ok(())
    } else {
        Err(result["error"]
            .as_str()
            .unwrap_or("assessment is invalid")
            .to_string()
            .into())
    }
}

fn run_schema(assessment_path: Option<PathBuf>, responses_path: Option<PathBuf>) -> CliResult<()> {
    let schema = match assessment_path {
        None => assessment_json_schema(),
        Some(path) => {
            let (raw, assessment) = read_assessment(&path)?;
            let responses = read_responses_json(responses_path.as_deref())?;
            let config = json!({ "assessment_json": raw }).to_string();
            parse_component_result(&get_responses_schema(
                assessment.job_id,
                &config,
                &responses,
            ))?
        }
    };
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn run_render(
    assessment_path: PathBuf,
    responses_path: Option<PathBuf>,
    mode: RenderMode,
) -> CliResult<()> {
    let (raw, assessment) = read_assessment(&assessment_path)?;
    let responses = read_responses_json(responses_path.as_deref())?;
    let config = json!({ "assessment_json": raw }).to_string();
    match mode {
        RenderMode::Text => {
            let text = render_text(assessment.job_id, &config, &responses);
            if let Ok(value) = serde_json::from_str::<Value>(&text) {
                parse_component_result(&value.to_string())?;
            }
            println!("{}", text);
        }
        RenderMode::Json => {
            let ui = parse_component_result(&render_json_ui(
                assessment.job_id,
                &config,
                &responses,
            ))?;
            println!("{}", serde_json::to_string_pretty(&ui)?);
        }
    }
    Ok(())
}

fn run_validate(assessment_path: PathBuf, responses_path: PathBuf) -> CliResult<()> {
    let (raw, assessment) = read_assessment(&assessment_path)?;
    let responses = fs::read_to_string(responses_path)?;
    let config = json!({ "assessment_json": raw }).to_string();
    let result = parse_component_result(&validate_responses(
        assessment.job_id,
        &config,
        &responses,
    ))?;
    if result["valid"].as_bool().unwrap_or(false) {
        println!("Responses are valid");
        return Ok(());
    }
    if let Some(violations) = result["violations"].as_object() {
        for (question_id, list) in violations {
            for violation in list.as_array().into_iter().flatten() {
                eprintln!(
                    "  {}: {}",
                    question_id,
                    violation["message"].as_str().unwrap_or_default()
                );
            }
        }
    }
    Err("responses failed validation".into())
}

fn run_fill(
    assessment_path: PathBuf,
    responses_path: Option<PathBuf>,
    details: bool,
    responses_json: bool,
) -> CliResult<()> {
    let (_, assessment) = read_assessment(&assessment_path)?;
    let job_id = assessment.job_id;
    let initial: ResponseSet = match responses_path {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => ResponseSet::new(),
    };
    let mut settled: BTreeSet<String> = initial.iter().map(|(id, _)| id.clone()).collect();
    let mut runtime = AssessmentRuntime::new(assessment)?.with_responses(initial);
    let mut presenter = WizardPresenter::new(Verbosity::from_verbose(details), responses_json);

    loop {
        let payload = runtime_payload(&runtime);
        presenter.show_header(&payload);

        let Some((section_index, question)) = next_pending(&payload, &settled) else {
            match runtime.submit()? {
                SubmitOutcome::Submitted(responses) => {
                    presenter.show_completion(&Submission::new(job_id, responses));
                    break;
                }
                SubmitOutcome::Blocked(violations) => {
                    presenter.show_violations(&violations);
                    for question_id in violations.keys() {
                        settled.remove(question_id);
                    }
                    continue;
                }
            }
        };

        presenter.enter_section(&payload, section_index);
        presenter.show_status(&payload);
        let prompt = PromptContext::new(question);
        let inputs = prompt_question(&prompt, question, &presenter)?;
        match apply_inputs(&mut runtime, &question.id, inputs) {
            Ok(()) => {
                settled.insert(question.id.clone());
            }
            Err(RuntimeError::Capture(err)) => {
                presenter.show_parse_error(&AnswerParseError::new(err.to_string(), None));
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}

/// First visible question that has not been answered or skipped yet.
fn next_pending<'a>(
    payload: &'a RenderPayload,
    settled: &BTreeSet<String>,
) -> Option<(usize, &'a RenderQuestion)> {
    payload
        .sections
        .iter()
        .enumerate()
        .flat_map(|(index, section)| section.questions.iter().map(move |question| (index, question)))
        .find(|(_, question)| question.visible && !settled.contains(&question.id))
}

fn apply_inputs(
    runtime: &mut AssessmentRuntime,
    question_id: &str,
    inputs: Vec<Input>,
) -> Result<(), RuntimeError> {
    for input in inputs {
        runtime.answer(question_id, input)?;
    }
    Ok(())
}

fn prompt_question(
    prompt: &PromptContext,
    question: &RenderQuestion,
    presenter: &WizardPresenter,
) -> CliResult<Vec<Input>> {
    loop {
        presenter.show_prompt(prompt);
        print!("> ");
        io::stdout().flush()?;
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Err("input ended before the assessment was submitted".into());
        }

        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("exit") {
            return Err("fill aborted by user".into());
        }

        match parse_answer(question, trimmed) {
            Ok(inputs) => return Ok(inputs),
            Err(err) => presenter.show_parse_error(&err),
        }
    }
}

/// Turns one line of user input into the capture gestures for `question`.
/// An empty line keeps the current answer, or skips an optional question.
fn parse_answer(question: &RenderQuestion, raw: &str) -> Result<Vec<Input>, AnswerParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        let answered = question
            .current_value
            .as_ref()
            .is_some_and(|answer| !answer.is_empty());
        if question.required && !answered {
            return Err(AnswerParseError::new(
                "This question requires an answer.",
                None,
            ));
        }
        return Ok(Vec::new());
    }

    match question.kind {
        QuestionType::ShortText | QuestionType::LongText => Ok(vec![Input::text(raw)]),
        QuestionType::Numeric => parse_numeric(raw),
        QuestionType::SingleChoice => Ok(vec![Input::select(resolve_option(question, raw)?)]),
        QuestionType::MultiChoice => parse_multi_choice(question, raw),
        QuestionType::FileUpload => Ok(vec![parse_file(raw)]),
    }
}

fn parse_numeric(raw: &str) -> Result<Vec<Input>, AnswerParseError> {
    match raw.parse::<f64>() {
        Ok(number) if number.is_finite() => Ok(vec![Input::text(raw)]),
        _ => Err(AnswerParseError::new(
            "Please enter a number.",
            Some("expected number".to_string()),
        )),
    }
}

fn parse_multi_choice(question: &RenderQuestion, raw: &str) -> Result<Vec<Input>, AnswerParseError> {
    let mut selected: Vec<String> = Vec::new();
    for token in raw.split(',').map(str::trim).filter(|token| !token.is_empty()) {
        let option = resolve_option(question, token)?;
        if !selected.contains(&option) {
            selected.push(option);
        }
    }
    let mut inputs = vec![Input::Clear];
    inputs.extend(selected.into_iter().map(Input::toggle));
    Ok(inputs)
}

/// Accepts a 1-based option number or an option label (case-insensitive).
fn resolve_option(question: &RenderQuestion, token: &str) -> Result<String, AnswerParseError> {
    let options = question.options.as_deref().unwrap_or_default();
    if let Ok(number) = token.parse::<usize>()
        && (1..=options.len()).contains(&number)
    {
        return Ok(options[number - 1].clone());
    }
    options
        .iter()
        .find(|option| option.eq_ignore_ascii_case(token))
        .cloned()
        .ok_or_else(|| {
            AnswerParseError::new(
                format!("'{}' is not one of the options.", token),
                Some(format!("one of: {}", options.join(", "))),
            )
        })
}

fn parse_file(raw: &str) -> Input {
    let path = Path::new(raw);
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| raw.to_string());
    let size = fs::metadata(path).ok().map(|metadata| metadata.len());
    Input::file(name, size)
}

fn read_assessment(path: &Path) -> CliResult<(String, Assessment)> {
    let raw = fs::read_to_string(path)?;
    let assessment = serde_json::from_str(&raw)
        .map_err(|err| format!("{} is not a valid assessment: {}", path.display(), err))?;
    Ok((raw, assessment))
}

fn read_responses_json(path: Option<&Path>) -> CliResult<String> {
    match path {
        Some(path) => Ok(fs::read_to_string(path)?),
        None => Ok("{}".to_string()),
    }
}

fn parse_component_result(response: &str) -> CliResult<Value> {
    let value: Value = serde_json::from_str(response)?;
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        Err(error.into())
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_cmd::Command;
    use assessment_spec::Answer;
    use std::fs;
    use tempfile::TempDir;

    const SCREENING: &str = include_str!("../../assessment-spec/tests/fixtures/screening.json");

    fn question(kind: QuestionType, required: bool, options: Option<Vec<&str>>) -> RenderQuestion {
        RenderQuestion {
            id: "q".into(),
            number: Some(1),
            prompt: "Prompt".into(),
            description: None,
            kind,
            required,
            hint: None,
            visible: true,
            current_value: None,
            options: options.map(|list| list.into_iter().map(String::from).collect()),
            errors: Vec::new(),
        }
    }

    fn screening_file(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("screening.json");
        fs::write(&path, SCREENING).expect("write fixture");
        path
    }

    #[test]
    fn parse_answer_accepts_option_number_or_label() {
        let q = question(QuestionType::SingleChoice, true, Some(vec!["yes", "no"]));
        assert_eq!(parse_answer(&q, "2").unwrap(), vec![Input::select("no")]);
        assert_eq!(parse_answer(&q, "YES").unwrap(), vec![Input::select("yes")]);
        assert!(parse_answer(&q, "3").is_err());
    }

    #[test]
    fn parse_answer_multi_choice_replaces_selection() {
        let q = question(QuestionType::MultiChoice, false, Some(vec!["React", "Vue", "Svelte"]));
        assert_eq!(
            parse_answer(&q, "3, react, 3").unwrap(),
            vec![Input::Clear, Input::toggle("Svelte"), Input::toggle("React")]
        );
    }

    #[test]
    fn parse_answer_requires_value_for_required_questions() {
        let q = question(QuestionType::ShortText, true, None);
        assert!(parse_answer(&q, "").is_err());

        let mut answered = question(QuestionType::ShortText, true, None);
        answered.current_value = Some(Answer::Text("kept".into()));
        assert!(parse_answer(&answered, "").unwrap().is_empty());

        let optional = question(QuestionType::LongText, false, None);
        assert!(parse_answer(&optional, "").unwrap().is_empty());
    }

    #[test]
    fn parse_answer_numeric_rejects_words() {
        let q = question(QuestionType::Numeric, true, None);
        assert!(parse_answer(&q, "five").is_err());
        assert_eq!(parse_answer(&q, "5").unwrap(), vec![Input::text("5")]);
    }

    #[test]
    fn fill_skips_hidden_follow_up() -> CliResult<()> {
        let dir = TempDir::new()?;
        let path = screening_file(&dir);
        let mut cmd = Command::cargo_bin("talentflow-assessments")?;
        let output = cmd
            .arg("fill")
            .arg("--assessment")
            .arg(&path)
            .arg("--responses-json")
            .write_stdin("2\n")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let stdout = String::from_utf8(output)?;
        assert!(stdout.contains("Done ✅"));
        assert!(!stdout.contains("How many years"));
        assert!(stdout.contains("\"q1\": \"no\""));
        Ok(())
    }

    #[test]
    fn fill_reprompts_after_blocked_submission() -> CliResult<()> {
        let dir = TempDir::new()?;
        let path = screening_file(&dir);
        let mut cmd = Command::cargo_bin("talentflow-assessments")?;
        let assert = cmd
            .arg("fill")
            .arg("--assessment")
            .arg(&path)
            .write_stdin("yes\n20\n5\n")
            .assert()
            .success();
        let output = assert.get_output();
        let stderr = String::from_utf8(output.stderr.clone())?;
        let stdout = String::from_utf8(output.stdout.clone())?;
        assert!(stderr.contains("Value must be at most 10"));
        assert!(stdout.contains("Done ✅"));
        Ok(())
    }

    #[test]
    fn fill_fails_when_input_ends() -> CliResult<()> {
        let dir = TempDir::new()?;
        let path = screening_file(&dir);
        let mut cmd = Command::cargo_bin("talentflow-assessments")?;
        cmd.arg("fill")
            .arg("--assessment")
            .arg(&path)
            .write_stdin("yes\n")
            .assert()
            .failure();
        Ok(())
    }
}
