use serde::{Deserialize, Serialize};

/// Story category. The model reports it as `detectedMode`; callers pass one as a hint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Daily,
    Creative,
    Hero,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Creative => "creative",
            Self::Hero => "hero",
        }
    }

    /// Lenient parse used on model output: surrounding whitespace and case are ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "daily" => Some(Self::Daily),
            "creative" => Some(Self::Creative),
            "hero" => Some(Self::Hero),
            _ => None,
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Self::Daily => "📔",
            Self::Creative => "✨",
            Self::Hero => "🦸",
        }
    }

    /// Label shown on the cover page.
    pub fn label(self) -> &'static str {
        match self {
            Self::Daily => "데일리 성장 일기",
            Self::Creative => "창작 동화",
            Self::Hero => "사진 속 주인공",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(rename = "description")]
    pub narration_text: String,
    #[serde(rename = "imagePrompt")]
    pub image_description: String,
    #[serde(rename = "imageUrl", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Narrative {
    pub title: String,
    pub scenes: Vec<Scene>,
    #[serde(rename = "growthPoint")]
    pub summary_note: String,
    #[serde(rename = "detectedMode")]
    pub category: Category,
}

/// One page of the storybook viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page<'a> {
    Cover {
        title: &'a str,
        category: Category,
    },
    Scene {
        number: usize,
        scene: &'a Scene,
    },
    Summary {
        note: &'a str,
    },
}

impl<'a> Page<'a> {
    /// Text handed to speech synthesis while this page is shown.
    pub fn narration(&self) -> &'a str {
        match *self {
            Page::Cover { title, .. } => title,
            Page::Scene { scene, .. } => &scene.narration_text,
            Page::Summary { note } => note,
        }
    }
}

impl Narrative {
    /// Cover + one page per scene + closing summary page.
    pub fn total_pages(&self) -> usize {
        self.scenes.len() + 2
    }

    pub fn page(&self, index: usize) -> Option<Page<'_>> {
        if index == 0 {
            return Some(Page::Cover {
                title: &self.title,
                category: self.category,
            });
        }
        if let Some(scene) = self.scenes.get(index - 1) {
            return Some(Page::Scene {
                number: index,
                scene,
            });
        }
        if index == self.scenes.len() + 1 {
            return Some(Page::Summary {
                note: &self.summary_note,
            });
        }
        None
    }

    /// Plain-text rendition for saving or sharing: heading, scenes split by `---`,
    /// then the growth point.
    pub fn to_text(&self) -> String {
        let scenes = self
            .scenes
            .iter()
            .enumerate()
            .map(|(idx, scene)| {
                format!(
                    "\n장면 {}\n{}\n\n[Image Prompt]\n{}\n",
                    idx + 1,
                    scene.narration_text,
                    scene.image_description
                )
            })
            .collect::<Vec<_>>()
            .join("\n---\n");
        let text = format!(
            "{}\n{} {}\n\n{scenes}\n\n💡 오늘의 성장 포인트\n{}",
            self.title,
            self.category.icon(),
            self.category.label(),
            self.summary_note
        );
        text.trim().to_owned()
    }

    /// `<title>.txt`, with characters that are unsafe in file names replaced.
    pub fn text_file_name(&self) -> String {
        let stem: String = self
            .title
            .trim()
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect();
        if stem.is_empty() {
            "story.txt".to_owned()
        } else {
            format!("{stem}.txt")
        }
    }

    /// Attaches a rendered illustration to a scene after the fact.
    pub fn attach_image_url(&mut self, scene_index: usize, url: impl Into<String>) -> bool {
        match self.scenes.get_mut(scene_index) {
            Some(scene) => {
                scene.image_url = Some(url.into());
                true
            }
            None => false,
        }
    }
}
