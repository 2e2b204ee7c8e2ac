//! Request and result types for one generation call.

use serde::{Deserialize, Serialize};

/// The closed set of models the target UI exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Model {
    /// Whatever model the UI currently has active.
    #[default]
    Default,
    /// "Image 4.0"
    ImageFour,
    /// "Nano Banana"
    NanoBanana,
}

impl Model {
    /// URL path segment used by the HTTP boundary.
    pub fn variant(&self) -> &'static str {
        match self {
            Model::Default => "default",
            Model::ImageFour => "image-4",
            Model::NanoBanana => "nano-banana",
        }
    }

    /// Visible label in the target UI's model selector.
    pub fn display_name(&self) -> &'static str {
        match self {
            Model::Default => "default",
            Model::ImageFour => "Image 4.0",
            Model::NanoBanana => "Nano Banana",
        }
    }

    pub fn from_variant(variant: &str) -> Option<Self> {
        match variant {
            "default" => Some(Model::Default),
            "image-4" => Some(Model::ImageFour),
            "nano-banana" => Some(Model::NanoBanana),
            _ => None,
        }
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One incoming generation request. Ephemeral, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model: Model,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, model: Model) -> Self {
        Self {
            prompt: prompt.into(),
            model,
        }
    }
}

/// One extracted result image. `index` is 1-based, in row-major render order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub url: String,
    pub index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_round_trip() {
        for model in [Model::Default, Model::ImageFour, Model::NanoBanana] {
            assert_eq!(Model::from_variant(model.variant()), Some(model));
        }
        assert_eq!(Model::from_variant("image-5"), None);
    }

    #[test]
    fn display_names_match_ui_labels() {
        assert_eq!(Model::ImageFour.display_name(), "Image 4.0");
        assert_eq!(Model::NanoBanana.display_name(), "Nano Banana");
    }

    #[test]
    fn generated_image_serializes_url_and_index() {
        let image = GeneratedImage {
            url: "https://cdn.example/i.png".to_string(),
            index: 1,
        };
        let json = serde_json::to_string(&image).unwrap();
        assert_eq!(json, "{\"url\":\"https://cdn.example/i.png\",\"index\":1}");
    }
}
