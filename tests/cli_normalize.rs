use predicates::prelude::*;
use serde_json::Value;

fn normalize_stdout(args: &[&str], stdin: &str) -> Value {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("storybook");
    let output = cmd
        .arg("normalize")
        .args(args)
        .write_stdin(stdin)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    serde_json::from_slice(&output).expect("normalize prints json")
}

#[test]
fn fenced_model_output_becomes_story_json() {
    let raw = "좋아요!\n```json\n{\"title\":\"숲속 모험\",\"scenes\":[{\"description\":\"나무가 인사했어요.\",\"imagePrompt\":\"talking tree\"}],\"growthPoint\":\"용기를 냈어요.\",\"detectedMode\":\"creative\"}\n```";
    let story = normalize_stdout(&[], raw);

    assert_eq!(story["title"], "숲속 모험");
    assert_eq!(story["detectedMode"], "creative");
    assert_eq!(story["scenes"][0]["description"], "나무가 인사했어요.");
    assert_eq!(story["scenes"][0]["imagePrompt"], "talking tree");
    assert!(story["scenes"][0].get("imageUrl").is_none());
}

#[test]
fn truncated_output_keeps_complete_scenes_and_uses_mode_hint() {
    let raw = r#"{
  "title": "잘린 이야기",
  "scenes": [
    { "description": "첫 장면", "imagePrompt": "first" },
    { "description": "둘째 장면", "imagePrompt": "second" },
    { "description": "셋째 장"#;
    let story = normalize_stdout(&["--mode", "daily"], raw);

    assert_eq!(story["title"], "잘린 이야기");
    assert_eq!(story["scenes"].as_array().map(Vec::len), Some(2));
    assert_eq!(story["scenes"][1]["description"], "둘째 장면");
    assert_eq!(story["detectedMode"], "daily");
    assert_eq!(story["growthPoint"], "오늘도 우리 아이는 한 뼘 더 자랐어요.");
}

#[test]
fn unparseable_output_falls_back_to_single_page() {
    let story = normalize_stdout(&["--mode", "hero"], "미안해요, 오늘은 못 만들겠어요.");

    assert_eq!(story["title"], "우리 아이의 특별한 하루");
    assert_eq!(story["detectedMode"], "hero");
    assert_eq!(story["scenes"].as_array().map(Vec::len), Some(1));
    assert_eq!(
        story["scenes"][0]["description"],
        "미안해요, 오늘은 못 만들겠어요."
    );
}

#[test]
fn reads_model_output_from_input_file() {
    let temp = tempfile::TempDir::new().expect("create temp dir");
    let path = temp.path().join("raw.txt");
    std::fs::write(
        &path,
        r#"{"title":"파일 이야기","scenes":[{"description":"a","imagePrompt":"b"}],"growthPoint":"c","detectedMode":"hero"}"#,
    )
    .expect("write raw output");

    let story = normalize_stdout(&["--input", path.to_str().expect("utf-8 path")], "");
    assert_eq!(story["title"], "파일 이야기");
    assert_eq!(story["detectedMode"], "hero");
}

#[test]
fn missing_input_file_fails() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("storybook");
    cmd.args(["normalize", "--input", "/definitely/not/here.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("read model output"));
}

#[test]
fn rust_log_debug_emits_debug_line_to_stderr() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("storybook");
    cmd.env("RUST_LOG", "debug")
        .arg("normalize")
        .write_stdin("{}")
        .assert()
        .success()
        .stderr(predicate::str::contains("parsed cli"));
}
