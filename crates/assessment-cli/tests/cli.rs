use std::fs;

use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use serde_json::Value;

const SCREENING: &str = include_str!("../../assessment-spec/tests/fixtures/screening.json");
const FRONTEND: &str = include_str!("../../assessment-spec/tests/fixtures/frontend.json");

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn cli() -> Command {
    Command::cargo_bin("talentflow-assessments").expect("binary built")
}

fn stdout_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn check_accepts_fixture_assessment() -> TestResult {
    let temp = TempDir::new()?;
    let assessment = temp.child("frontend.json");
    assessment.write_str(FRONTEND)?;

    let output = cli()
        .arg("check")
        .arg("--assessment")
        .arg(assessment.path())
        .assert()
        .success()
        .get_output()
        .clone();
    assert!(stdout_of(&output).contains("Assessment is valid"));
    Ok(())
}

#[test]
fn check_rejects_cyclic_conditionals() -> TestResult {
    let temp = TempDir::new()?;
    let mut value: Value = serde_json::from_str(SCREENING)?;
    value["sections"][0]["questions"][0]["conditional"] = serde_json::json!({
        "dependsOn": "q2",
        "condition": "equals",
        "value": "1"
    });
    let assessment = temp.child("cyclic.json");
    assessment.write_str(&value.to_string())?;

    let output = cli()
        .arg("check")
        .arg("--assessment")
        .arg(assessment.path())
        .assert()
        .failure()
        .get_output()
        .clone();
    assert!(stderr_of(&output).contains("q1"));
    Ok(())
}

#[test]
fn validate_reports_out_of_range_answer() -> TestResult {
    let temp = TempDir::new()?;
    let assessment = temp.child("screening.json");
    assessment.write_str(SCREENING)?;
    let responses = temp.child("responses.json");
    responses.write_str(r#"{"q1": "yes", "q2": "15"}"#)?;

    let output = cli()
        .arg("validate")
        .arg("--assessment")
        .arg(assessment.path())
        .arg("--responses")
        .arg(responses.path())
        .assert()
        .failure()
        .get_output()
        .clone();
    assert!(stderr_of(&output).contains("q2: Value must be at most 10"));
    Ok(())
}

#[test]
fn validate_ignores_hidden_required_question() -> TestResult {
    let temp = TempDir::new()?;
    let assessment = temp.child("screening.json");
    assessment.write_str(SCREENING)?;
    let responses = temp.child("responses.json");
    responses.write_str(r#"{"q1": "no"}"#)?;

    let output = cli()
        .arg("validate")
        .arg("--assessment")
        .arg(assessment.path())
        .arg("--responses")
        .arg(responses.path())
        .assert()
        .success()
        .get_output()
        .clone();
    assert!(stdout_of(&output).contains("Responses are valid"));
    Ok(())
}

#[test]
fn render_text_lists_visible_questions() -> TestResult {
    let temp = TempDir::new()?;
    let assessment = temp.child("screening.json");
    assessment.write_str(SCREENING)?;

    let output = cli()
        .arg("render")
        .arg("--assessment")
        .arg(assessment.path())
        .assert()
        .success()
        .get_output()
        .clone();
    let stdout = stdout_of(&output);
    assert!(stdout.contains("Assessment: Screening Assessment (job 1)"));
    assert!(stdout.contains("1. Are you currently employed? *"));
    assert!(!stdout.contains("How many years"));
    Ok(())
}

#[test]
fn render_json_reports_progress() -> TestResult {
    let temp = TempDir::new()?;
    let assessment = temp.child("screening.json");
    assessment.write_str(SCREENING)?;
    let responses = temp.child("responses.json");
    responses.write_str(r#"{"q1": "yes"}"#)?;

    let output = cli()
        .arg("render")
        .arg("--assessment")
        .arg(assessment.path())
        .arg("--responses")
        .arg(responses.path())
        .arg("--format")
        .arg("json")
        .assert()
        .success()
        .get_output()
        .clone();
    let ui: Value = serde_json::from_str(&stdout_of(&output))?;
    assert_eq!(ui["status"], "need_input");
    assert_eq!(ui["next_question_id"], "q2");
    assert_eq!(ui["progress"]["answered"], 1);
    assert_eq!(ui["progress"]["total"], 2);
    Ok(())
}

#[test]
fn schema_without_assessment_describes_the_document() -> TestResult {
    let output = cli().arg("schema").assert().success().get_output().clone();
    let schema: Value = serde_json::from_str(&stdout_of(&output))?;
    assert!(schema["properties"].get("sections").is_some());
    Ok(())
}

#[test]
fn schema_for_assessment_omits_hidden_questions() -> TestResult {
    let temp = TempDir::new()?;
    let assessment = temp.child("screening.json");
    assessment.write_str(SCREENING)?;

    let output = cli()
        .arg("schema")
        .arg("--assessment")
        .arg(assessment.path())
        .assert()
        .success()
        .get_output()
        .clone();
    let schema: Value = serde_json::from_str(&stdout_of(&output))?;
    assert!(schema["properties"].get("q1").is_some());
    assert!(schema["properties"].get("q2").is_none());
    Ok(())
}

#[test]
fn edit_writes_new_section_back() -> TestResult {
    let temp = TempDir::new()?;
    let assessment = temp.child("screening.json");
    assessment.write_str(SCREENING)?;

    let output = cli()
        .arg("edit")
        .arg("--assessment")
        .arg(assessment.path())
        .arg("--command")
        .arg(r#"{"command": "add_section"}"#)
        .arg("--write")
        .assert()
        .success()
        .get_output()
        .clone();
    assert!(stdout_of(&output).contains("(2 sections, 2 questions)"));

    let saved: Value = serde_json::from_str(&fs::read_to_string(assessment.path())?)?;
    assert_eq!(saved["sections"].as_array().map(Vec::len), Some(2));
    assert!(saved.get("stats").is_none());
    Ok(())
}

#[test]
fn edit_refuses_to_delete_last_option() -> TestResult {
    let temp = TempDir::new()?;
    let mut value: Value = serde_json::from_str(SCREENING)?;
    value["sections"][0]["questions"][0]["options"] = serde_json::json!(["yes"]);
    let assessment = temp.child("single.json");
    assessment.write_str(&value.to_string())?;

    cli()
        .arg("edit")
        .arg("--assessment")
        .arg(assessment.path())
        .arg("--command")
        .arg(r#"{"command": "delete_option", "section": 0, "index": 0, "option": 0}"#)
        .assert()
        .failure();
    Ok(())
}

#[test]
fn new_writes_default_skeleton() -> TestResult {
    let temp = TempDir::new()?;
    let out = temp.child("job-7.json");

    cli()
        .arg("new")
        .arg("--job-id")
        .arg("7")
        .arg("--job-title")
        .arg("Backend Engineer")
        .arg("--out")
        .arg(out.path())
        .assert()
        .success();

    let created: Value = serde_json::from_str(&fs::read_to_string(out.path())?)?;
    assert_eq!(created["jobId"], 7);
    assert_eq!(created["title"], "Backend Engineer Assessment");
    assert_eq!(created["sections"].as_array().map(Vec::len), Some(1));

    cli()
        .arg("new")
        .arg("--job-id")
        .arg("7")
        .arg("--out")
        .arg(out.path())
        .assert()
        .failure();
    Ok(())
}
