use predicates::prelude::*;

const STORY: &str = r#"{
  "title": "달님과 산책",
  "scenes": [
    { "description": "지우는 밤하늘을 올려다봤어요.", "imagePrompt": "a child looking at the moon" }
  ],
  "growthPoint": "밤도 무섭지 않게 되었어요.",
  "detectedMode": "daily"
}"#;

fn write_story(dir: &tempfile::TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("story.json");
    std::fs::write(&path, contents).expect("write story");
    path
}

fn play_cmd() -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("storybook");
    cmd.env_remove("GEMINI_API_KEY")
        .env("STORYBOOK_TTS_ENABLED", "false")
        .timeout(std::time::Duration::from_secs(30));
    cmd
}

#[test]
fn autoplay_prints_every_page_and_stops_at_the_end() {
    let temp = tempfile::TempDir::new().expect("create temp dir");
    let story = write_story(&temp, STORY);

    play_cmd()
        .args(["play", "--dwell-secs", "0.05", "--story"])
        .arg(&story)
        .assert()
        .success()
        .stdout(predicate::str::contains("[1/3] 달님과 산책 (데일리 성장 일기)"))
        .stdout(predicate::str::contains("[2/3] 장면 1"))
        .stdout(predicate::str::contains("지우는 밤하늘을 올려다봤어요."))
        .stdout(predicate::str::contains("[3/3] 밤도 무섭지 않게 되었어요."));
}

#[test]
fn interactive_mode_quits_on_q() {
    let temp = tempfile::TempDir::new().expect("create temp dir");
    let story = write_story(&temp, STORY);

    play_cmd()
        .args(["play", "--interactive", "--story"])
        .arg(&story)
        .write_stdin("q\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("[1/3] 달님과 산책"))
        .stdout(predicate::str::contains("[2/3]").not());
}

#[test]
fn story_without_scenes_is_rejected() {
    let temp = tempfile::TempDir::new().expect("create temp dir");
    let story = write_story(
        &temp,
        r#"{"title":"빈 이야기","scenes":[],"growthPoint":"x","detectedMode":"daily"}"#,
    );

    play_cmd()
        .args(["play", "--story"])
        .arg(&story)
        .assert()
        .failure()
        .stderr(predicate::str::contains("story has no scenes"));
}

#[test]
fn non_positive_dwell_is_rejected() {
    let temp = tempfile::TempDir::new().expect("create temp dir");
    let story = write_story(&temp, STORY);

    play_cmd()
        .args(["play", "--dwell-secs", "0", "--story"])
        .arg(&story)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--dwell-secs must be > 0"));
}

#[test]
fn huge_dwell_is_rejected() {
    let temp = tempfile::TempDir::new().expect("create temp dir");
    let story = write_story(&temp, STORY);

    play_cmd()
        .args(["play", "--dwell-secs", "1e20", "--story"])
        .arg(&story)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--dwell-secs out of range"));
}
