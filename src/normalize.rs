//! Recovers a [`Narrative`] from raw model output.
//!
//! The model is asked for a JSON object but may wrap it in prose or Markdown fences,
//! or stop mid-object when it hits the output token limit. [`normalize`] always returns
//! a usable narrative: it extracts the most likely JSON span, runs the recovery
//! strategies in order, and otherwise degrades to a single-scene fallback.

use std::io::Read as _;

use anyhow::Context as _;
use serde::Deserialize;

use crate::cli::NormalizeArgs;
use crate::formats::{Category, Narrative, Scene};

pub const FALLBACK_TITLE: &str = "우리 아이의 특별한 하루";
pub const DEFAULT_SUMMARY_NOTE: &str = "오늘도 우리 아이는 한 뼘 더 자랐어요.";
pub const FALLBACK_IMAGE_DESCRIPTION: &str =
    "A heartwarming children's book illustration of a young child";
pub const FALLBACK_NARRATION_CHARS: usize = 500;

/// Why a strategy gave up on the candidate payload.
#[derive(Debug, thiserror::Error)]
pub enum Rejection {
    /// Not well-formed JSON; the next strategy may still recover it.
    #[error("malformed payload: {0}")]
    Malformed(String),
    /// Well-formed but missing required story fields; no strategy can fix that.
    #[error("incomplete payload: {0}")]
    Incomplete(String),
}

type Strategy = fn(&str, Option<Category>) -> Result<Narrative, Rejection>;

const STRATEGIES: &[(&str, Strategy)] = &[
    ("strict", parse_strict),
    ("truncation_repair", parse_truncated),
];

pub fn normalize(raw_text: &str, mode_hint: Option<Category>) -> Narrative {
    let candidate = extract_candidate(raw_text);
    tracing::debug!(
        raw_len = raw_text.len(),
        candidate_len = candidate.len(),
        "normalize model output"
    );

    for &(name, strategy) in STRATEGIES {
        match strategy(candidate, mode_hint) {
            Ok(narrative) => {
                tracing::debug!(
                    strategy = name,
                    scenes = narrative.scenes.len(),
                    "normalized model output"
                );
                return narrative;
            }
            Err(Rejection::Malformed(reason)) => {
                tracing::debug!(strategy = name, reason = %reason, "strategy rejected payload");
            }
            Err(err @ Rejection::Incomplete(_)) => {
                tracing::warn!(strategy = name, error = %err, "payload is missing story fields");
                break;
            }
        }
    }

    tracing::warn!(
        raw_len = raw_text.len(),
        "could not recover a story from model output; using fallback"
    );
    fallback(raw_text, mode_hint)
}

/// Fenced `json` block, else any fenced block, then first `{` .. last `}`.
pub fn extract_candidate(raw_text: &str) -> &str {
    let text = fenced_block(raw_text, Some("json"))
        .or_else(|| fenced_block(raw_text, None))
        .unwrap_or(raw_text);
    brace_span(text).unwrap_or(text)
}

fn fenced_block<'a>(text: &'a str, tag: Option<&str>) -> Option<&'a str> {
    let mut search_from = 0;
    while let Some(rel) = text[search_from..].find("```") {
        let open = search_from + rel;
        let after_fence = open + 3;
        let body_start = match tag {
            Some(tag) => {
                if !text[after_fence..].starts_with(tag) {
                    search_from = after_fence;
                    continue;
                }
                after_fence + tag.len()
            }
            None => after_fence,
        };
        let close = text[body_start..].find("```")? + body_start;
        return Some(text[body_start..close].trim());
    }
    None
}

fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

#[derive(Debug, Deserialize)]
struct StoryPayload {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    scenes: Option<Vec<ScenePayload>>,
    #[serde(default, rename = "growthPoint")]
    growth_point: Option<String>,
    #[serde(default, rename = "detectedMode")]
    detected_mode: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScenePayload {
    #[serde(default)]
    description: Option<String>,
    #[serde(default, rename = "imagePrompt")]
    image_prompt: Option<String>,
    #[serde(default, rename = "imageUrl")]
    image_url: Option<String>,
}

fn parse_strict(candidate: &str, mode_hint: Option<Category>) -> Result<Narrative, Rejection> {
    let value: serde_json::Value =
        serde_json::from_str(candidate).map_err(|err| Rejection::Malformed(err.to_string()))?;
    let payload: StoryPayload = serde_json::from_value(value)
        .map_err(|err| Rejection::Incomplete(format!("unexpected shape: {err}")))?;
    narrative_from_payload(payload, mode_hint)
}

/// Cut after the last complete scene and close the object ourselves.
fn parse_truncated(candidate: &str, mode_hint: Option<Category>) -> Result<Narrative, Rejection> {
    let repaired = repair_truncated(candidate, mode_hint)
        .ok_or_else(|| Rejection::Malformed("no complete scene to recover".to_owned()))?;
    tracing::info!(
        kept_len = repaired.len(),
        "recovered truncated model output"
    );
    parse_strict(&repaired, mode_hint)
}

fn repair_truncated(candidate: &str, mode_hint: Option<Category>) -> Option<String> {
    let end = last_closed_scene_end(candidate)?;
    let category = mode_hint.unwrap_or(Category::Creative);
    let summary = serde_json::Value::String(DEFAULT_SUMMARY_NOTE.to_owned());
    Some(format!(
        "{}\n  ],\n  \"growthPoint\": {summary},\n  \"detectedMode\": \"{category}\"\n}}",
        &candidate[..end]
    ))
}

/// Byte offset just past the `}` closing the last complete element of the root
/// object's `scenes` array.
fn last_closed_scene_end(candidate: &str) -> Option<usize> {
    let mut stack: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut string_start = 0usize;
    let mut last_root_string: Option<&str> = None;
    let mut in_scenes = false;
    let mut last_end = None;

    for (idx, byte) in candidate.bytes().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
                if stack.len() == 1 {
                    last_root_string = Some(&candidate[string_start..idx]);
                }
            }
            continue;
        }

        match byte {
            b'"' => {
                in_string = true;
                string_start = idx + 1;
            }
            b'{' => stack.push(b'{'),
            b'[' => {
                if stack == [b'{'] {
                    in_scenes = last_root_string == Some("scenes");
                }
                stack.push(b'[');
            }
            b'}' => {
                if stack.pop() != Some(b'{') {
                    return last_end;
                }
                if in_scenes && stack == [b'{', b'['] {
                    last_end = Some(idx + 1);
                }
            }
            b']' => {
                if stack.pop() != Some(b'[') {
                    return last_end;
                }
                if stack.len() == 1 {
                    in_scenes = false;
                }
            }
            _ => {}
        }
    }

    last_end
}

fn narrative_from_payload(
    payload: StoryPayload,
    mode_hint: Option<Category>,
) -> Result<Narrative, Rejection> {
    let title = non_empty(payload.title).ok_or_else(|| missing("title"))?;
    let scenes = payload.scenes.ok_or_else(|| missing("scenes"))?;
    if scenes.is_empty() {
        return Err(Rejection::Incomplete("`scenes` is empty".to_owned()));
    }
    let summary_note = non_empty(payload.growth_point).ok_or_else(|| missing("growthPoint"))?;

    let scenes = scenes
        .into_iter()
        .enumerate()
        .map(|(idx, scene)| {
            let narration_text = non_empty(scene.description).ok_or_else(|| {
                Rejection::Incomplete(format!("scene {} is missing `description`", idx + 1))
            })?;
            let image_description = non_empty(scene.image_prompt).ok_or_else(|| {
                Rejection::Incomplete(format!("scene {} is missing `imagePrompt`", idx + 1))
            })?;
            Ok(Scene {
                narration_text,
                image_description,
                image_url: non_empty(scene.image_url),
            })
        })
        .collect::<Result<Vec<_>, Rejection>>()?;

    let category = payload
        .detected_mode
        .as_deref()
        .and_then(Category::parse)
        .or(mode_hint)
        .unwrap_or(Category::Daily);

    Ok(Narrative {
        title,
        scenes,
        summary_note,
        category,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn missing(field: &str) -> Rejection {
    Rejection::Incomplete(format!("missing `{field}`"))
}

/// Offline entry point: raw model output in, story JSON out.
pub fn run(args: NormalizeArgs) -> anyhow::Result<()> {
    let raw = match args.input.as_deref() {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("read model output: {path}"))?,
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("read model output from stdin")?;
            raw
        }
    };

    let narrative = normalize(&raw, args.mode);
    let json = serde_json::to_string_pretty(&narrative).context("serialize story json")?;
    println!("{json}");
    Ok(())
}

/// Last resort: keep whatever the model said as a single page.
pub fn fallback(raw_text: &str, mode_hint: Option<Category>) -> Narrative {
    let mut narration_text: String = raw_text.chars().take(FALLBACK_NARRATION_CHARS).collect();
    if narration_text.trim().is_empty() {
        narration_text = FALLBACK_TITLE.to_owned();
    }

    Narrative {
        title: FALLBACK_TITLE.to_owned(),
        scenes: vec![Scene {
            narration_text,
            image_description: FALLBACK_IMAGE_DESCRIPTION.to_owned(),
            image_url: None,
        }],
        summary_note: DEFAULT_SUMMARY_NOTE.to_owned(),
        category: mode_hint.unwrap_or(Category::Daily),
    }
}
