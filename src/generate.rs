use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;

use anyhow::Context as _;

use crate::cli::GenerateArgs;
use crate::formats::{Category, Narrative};
use crate::gemini::{GeminiClient, GeminiConfig, InlineImage};
use crate::normalize::normalize;
use crate::prompt;

#[derive(Debug, Clone)]
pub struct StoryRequest {
    pub user_input: String,
    pub image: Option<InlineImage>,
    pub mode: Option<Category>,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("GEMINI_API_KEY is not set")]
    MissingApiKey,
    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

impl StoryRequest {
    pub fn validate(&self) -> Result<(), GenerateError> {
        if self.user_input.trim().is_empty() {
            return Err(GenerateError::InvalidInput(
                "story input is required".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Validates the request, calls the model once, and normalizes whatever comes back.
pub async fn generate_story(
    client: &GeminiClient,
    request: &StoryRequest,
) -> Result<Narrative, GenerateError> {
    request.validate()?;
    if client.config().api_key.is_none() {
        return Err(GenerateError::MissingApiKey);
    }

    let prompt = prompt::story_prompt(&request.user_input, request.mode, request.image.is_some());
    let raw = client
        .generate_text(&prompt, request.image.as_ref())
        .await
        .context("generate story")?;

    let narrative = normalize(&raw, request.mode);
    tracing::info!(
        title = %narrative.title,
        scenes = narrative.scenes.len(),
        category = %narrative.category,
        "story generated"
    );
    Ok(narrative)
}

pub async fn run(args: GenerateArgs) -> anyhow::Result<()> {
    let image = match args.image.as_deref() {
        Some(path) => Some(read_image(Path::new(path))?),
        None => None,
    };
    let request = StoryRequest {
        user_input: args.prompt,
        image,
        mode: args.mode,
    };

    let client = GeminiClient::new(GeminiConfig::from_env())?;
    let narrative = generate_story(&client, &request).await?;
    let json = serde_json::to_string_pretty(&narrative).context("serialize story json")?;

    match args.out.as_deref() {
        Some(out) => write_output(out, &json, args.force)?,
        None => println!("{json}"),
    }
    Ok(())
}

fn read_image(path: &Path) -> anyhow::Result<InlineImage> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read image: {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    let mime_type = match ext.as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("heic") => "image/heic",
        _ => "image/jpeg",
    };
    Ok(InlineImage::from_bytes(mime_type, &bytes))
}

pub(crate) fn write_output(path: &str, contents: &str, force: bool) -> anyhow::Result<()> {
    if Path::new(path).exists() && !force {
        anyhow::bail!("output already exists: {path}");
    }
    if let Some(parent) = Path::new(path).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir: {}", parent.display()))?;
    }

    let mut options = OpenOptions::new();
    options.write(true);
    if force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }

    let mut file = options
        .open(path)
        .with_context(|| format!("open output: {path}"))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("write output: {path}"))?;
    file.write_all(b"\n")
        .with_context(|| format!("write output: {path}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_input_is_rejected_before_any_call() {
        let request = StoryRequest {
            user_input: "  \n".to_owned(),
            image: None,
            mode: None,
        };
        assert!(matches!(
            request.validate(),
            Err(GenerateError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn missing_api_key_is_its_own_error() -> anyhow::Result<()> {
        let client = GeminiClient::new(GeminiConfig::default())?;
        let request = StoryRequest {
            user_input: "달나라 여행".to_owned(),
            image: None,
            mode: Some(Category::Hero),
        };
        let err = generate_story(&client, &request).await.unwrap_err();
        assert!(matches!(err, GenerateError::MissingApiKey));
        Ok(())
    }

    #[test]
    fn image_mime_type_follows_extension() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let path = temp.path().join("kid.PNG");
        std::fs::write(&path, [1u8, 2, 3])?;
        let image = read_image(&path)?;
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.data_base64, "AQID");
        Ok(())
    }

    #[test]
    fn write_output_refuses_to_overwrite_without_force() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let path = temp.path().join("nested").join("story.json");
        let path = path.to_str().expect("utf-8 temp path");

        write_output(path, "{}", false)?;
        assert!(write_output(path, "{}", false).is_err());
        write_output(path, "{\"a\":1}", true)?;
        assert_eq!(std::fs::read_to_string(path)?, "{\"a\":1}\n");
        Ok(())
    }
}
