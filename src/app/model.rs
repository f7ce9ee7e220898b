use serde::{Deserialize, Serialize};

use crate::formats::Category;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateStoryBody {
    /// Photo as a data URL (`data:image/jpeg;base64,...`).
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub user_input: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
}

impl GenerateStoryBody {
    /// Unknown or blank modes mean "let the model decide".
    pub fn mode(&self) -> Option<Category> {
        self.mode.as_deref().and_then(Category::parse)
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref().filter(|image| !image.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateAudioBody {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateAudioResponse {
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
