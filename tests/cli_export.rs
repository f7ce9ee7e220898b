use predicates::prelude::*;

const STORY: &str = r#"{
  "title": "달님과 산책",
  "scenes": [
    { "description": "지우는 밤하늘을 봤어요.", "imagePrompt": "a child looking at the moon" },
    { "description": "달님이 인사했어요.", "imagePrompt": "the moon waving" }
  ],
  "growthPoint": "밤도 무섭지 않아요.",
  "detectedMode": "daily"
}"#;

const STORY_TEXT: &str = "달님과 산책
📔 데일리 성장 일기


장면 1
지우는 밤하늘을 봤어요.

[Image Prompt]
a child looking at the moon

---

장면 2
달님이 인사했어요.

[Image Prompt]
the moon waving


💡 오늘의 성장 포인트
밤도 무섭지 않아요.
";

fn write_story(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("story.json");
    std::fs::write(&path, STORY).expect("write story");
    path
}

#[test]
fn export_prints_story_text() {
    let temp = tempfile::TempDir::new().expect("create temp dir");
    let story = write_story(&temp);

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("storybook");
    cmd.args(["export", "--story"])
        .arg(&story)
        .assert()
        .success()
        .stdout(STORY_TEXT);
}

#[test]
fn export_to_dir_names_file_after_title() {
    let temp = tempfile::TempDir::new().expect("create temp dir");
    let story = write_story(&temp);
    let out_dir = temp.path().join("exports");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("storybook");
    cmd.args(["export", "--story"])
        .arg(&story)
        .arg("--out-dir")
        .arg(&out_dir)
        .assert()
        .success()
        .stdout("");

    let written = std::fs::read_to_string(out_dir.join("달님과 산책.txt")).expect("read export");
    assert_eq!(written, STORY_TEXT);

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("storybook");
    cmd.args(["export", "--story"])
        .arg(&story)
        .arg("--out-dir")
        .arg(&out_dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("output already exists"));
}

#[test]
fn export_rejects_invalid_story_json() {
    let temp = tempfile::TempDir::new().expect("create temp dir");
    let story = temp.path().join("story.json");
    std::fs::write(&story, "not json").expect("write story");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("storybook");
    cmd.args(["export", "--story"])
        .arg(&story)
        .assert()
        .failure()
        .stderr(predicate::str::contains("parse story json"));
}
