use assessment_spec::{
    Answer, Assessment, AssessmentRuntime, Input, RenderStatus, ResponseSet, ViolationMap,
    build_render_payload, render_json_ui, render_text, runtime_payload,
};

fn fixture(name: &str) -> &'static str {
    match name {
        "frontend" => include_str!("../tests/fixtures/frontend.json"),
        "screening" => include_str!("../tests/fixtures/screening.json"),
        _ => panic!("unknown fixture {}", name),
    }
}

fn load(name: &str) -> Assessment {
    serde_json::from_str(fixture(name)).expect("deserialize")
}

#[test]
fn render_text_lists_sections_and_hints() {
    let assessment = load("frontend");
    let payload = build_render_payload(&assessment, &ResponseSet::new(), &ViolationMap::new(), 0);

    assert_eq!(payload.status, RenderStatus::NeedInput);
    assert_eq!(payload.next_question_id.as_deref(), Some("question-1"));

    let text = render_text(&payload);
    assert!(text.contains("Section 1 of 2: Technical Skills"));
    assert!(text.contains("Max size: 5MB • Allowed: .pdf,.docx"));
    assert!(text.contains("Between 0 and 30"));
    assert!(!text.contains("Describe a complex component"));
}

#[test]
fn render_json_ui_exposes_visibility_and_progress() {
    let assessment = load("frontend");
    let mut responses = ResponseSet::new();
    responses.set("question-2", Answer::Text("4".into()));
    let payload = build_render_payload(&assessment, &responses, &ViolationMap::new(), 1);

    let ui = render_json_ui(&payload);
    assert_eq!(ui["title"], "Frontend Developer Assessment");
    assert_eq!(ui["current_section"], 1);
    assert_eq!(ui["progress"]["answered"], 1);
    assert_eq!(ui["progress"]["total"], 5);

    let questions = ui["sections"][0]["questions"].as_array().expect("questions");
    assert_eq!(questions[2]["visible"], true);
    assert_eq!(questions[2]["number"], 3);
    assert_eq!(questions[0]["label"], "Multiple Choice");
    assert!(ui["schema"]["properties"].get("question-3").is_some());
}

#[test]
fn blocked_runtime_renders_errors() {
    let assessment = load("screening");
    let mut runtime = AssessmentRuntime::new(assessment).expect("runtime");
    runtime.answer("q1", Input::select("yes")).expect("answer");
    runtime.answer("q2", Input::text("20")).expect("answer");
    assert!(!runtime.submit().expect("submit").is_submitted());

    let payload = runtime_payload(&runtime);
    assert_eq!(payload.status, RenderStatus::Blocked);
    let text = render_text(&payload);
    assert!(text.contains("! Value must be at most 10"));

    let ui = render_json_ui(&payload);
    assert_eq!(
        ui["sections"][0]["questions"][1]["errors"][0],
        "Value must be at most 10"
    );
}
