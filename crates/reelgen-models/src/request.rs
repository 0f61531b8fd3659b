//! Generation request, quality tiers and aspect ratios.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use validator::{Validate, ValidationError};

use crate::prompt::{NormalizedItem, PromptList};

/// Body of `POST /generate-images`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// Prompts to generate, in output order
    #[validate(custom(function = "validate_prompts"))]
    pub prompts: PromptList,

    /// Quality tier literal (`"high"` or anything else)
    #[serde(default)]
    pub quality: String,

    /// Aspect ratio as `W:H`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,

    /// Stream progress as server-sent events
    #[serde(default)]
    pub stream: bool,

    /// Project used to namespace output objects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

fn validate_prompts(prompts: &PromptList) -> Result<(), ValidationError> {
    if prompts.is_empty() {
        return Err(ValidationError::new("prompts_empty")
            .with_message("at least one prompt is required".into()));
    }
    if prompts.items().iter().any(|item| item.text().trim().is_empty()) {
        return Err(ValidationError::new("prompt_blank")
            .with_message("prompt text must not be empty".into()));
    }
    Ok(())
}

impl GenerationRequest {
    /// Coerced quality tier.
    pub fn quality_tier(&self) -> QualityTier {
        QualityTier::coerce(&self.quality)
    }

    /// Requested aspect ratio; the default when none was given.
    pub fn parse_aspect_ratio(&self) -> Result<AspectRatio, AspectRatioParseError> {
        match self.aspect_ratio.as_deref() {
            Some(raw) => raw.parse(),
            None => Ok(AspectRatio::default()),
        }
    }

    /// Parsed aspect ratio, falling back to the default on bad input.
    pub fn aspect_ratio(&self) -> AspectRatio {
        self.parse_aspect_ratio().unwrap_or_default()
    }

    /// Project id, ignoring blank values.
    pub fn project_id(&self) -> Option<&str> {
        self.project_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Work items in origin order.
    pub fn items(&self) -> Vec<NormalizedItem> {
        self.prompts.normalize()
    }
}

/// Image quality tier understood by the generation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    High,
    #[default]
    Basic,
}

impl QualityTier {
    /// Map a caller-supplied literal to a tier.
    ///
    /// Only the exact literal `"high"` selects [`QualityTier::High`]; every
    /// other value collapses to [`QualityTier::Basic`] without an error.
    pub fn coerce(value: &str) -> Self {
        if value == "high" {
            QualityTier::High
        } else {
            QualityTier::Basic
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::High => "high",
            QualityTier::Basic => "basic",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aspect ratio (width:height).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    /// Widescreen (16:9), the default for video frames
    pub const LANDSCAPE: AspectRatio = AspectRatio {
        width: 16,
        height: 9,
    };

    /// Portrait (9:16) for shorts
    pub const PORTRAIT: AspectRatio = AspectRatio {
        width: 9,
        height: 16,
    };

    /// Square (1:1)
    pub const SQUARE: AspectRatio = AspectRatio {
        width: 1,
        height: 1,
    };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl FromStr for AspectRatio {
    type Err = AspectRatioParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() != 2 {
            return Err(AspectRatioParseError::InvalidFormat(s.to_string()));
        }

        let width = parts[0]
            .trim()
            .parse()
            .map_err(|_| AspectRatioParseError::InvalidNumber(parts[0].to_string()))?;
        let height = parts[1]
            .trim()
            .parse()
            .map_err(|_| AspectRatioParseError::InvalidNumber(parts[1].to_string()))?;

        if width == 0 || height == 0 {
            return Err(AspectRatioParseError::ZeroValue);
        }

        Ok(AspectRatio { width, height })
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::LANDSCAPE
    }
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum AspectRatioParseError {
    #[error("Invalid aspect ratio format: {0}, expected 'W:H'")]
    InvalidFormat(String),
    #[error("Invalid number in aspect ratio: {0}")]
    InvalidNumber(String),
    #[error("Aspect ratio cannot have zero values")]
    ZeroValue,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: &str) -> GenerationRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_quality_coercion() {
        assert_eq!(QualityTier::coerce("high"), QualityTier::High);
        assert_eq!(QualityTier::coerce("basic"), QualityTier::Basic);
        assert_eq!(QualityTier::coerce("HIGH"), QualityTier::Basic);
        assert_eq!(QualityTier::coerce("ultra"), QualityTier::Basic);
        assert_eq!(QualityTier::coerce(""), QualityTier::Basic);
    }

    #[test]
    fn test_aspect_ratio_parse() {
        assert_eq!("9:16".parse::<AspectRatio>().unwrap(), AspectRatio::PORTRAIT);
        assert_eq!(" 16 : 9 ".parse::<AspectRatio>().unwrap(), AspectRatio::LANDSCAPE);
        assert!("16x9".parse::<AspectRatio>().is_err());
        assert!("0:9".parse::<AspectRatio>().is_err());
        assert_eq!(AspectRatio::SQUARE.to_string(), "1:1");
    }

    #[test]
    fn test_request_defaults() {
        let req = request(r#"{"prompts": ["a"]}"#);
        assert!(!req.stream);
        assert_eq!(req.quality_tier(), QualityTier::Basic);
        assert_eq!(req.aspect_ratio(), AspectRatio::LANDSCAPE);
        assert_eq!(req.project_id(), None);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_request_camel_case_fields() {
        let req = request(
            r#"{"prompts": ["a"], "quality": "high", "aspectRatio": "9:16", "stream": true, "projectId": "p1"}"#,
        );
        assert!(req.stream);
        assert_eq!(req.quality_tier(), QualityTier::High);
        assert_eq!(req.aspect_ratio(), AspectRatio::PORTRAIT);
        assert_eq!(req.project_id(), Some("p1"));
    }

    #[test]
    fn test_bad_aspect_ratio_falls_back() {
        let req = request(r#"{"prompts": ["a"], "aspectRatio": "wide"}"#);
        assert!(req.parse_aspect_ratio().is_err());
        assert_eq!(req.aspect_ratio(), AspectRatio::LANDSCAPE);

        let req = request(r#"{"prompts": ["a"]}"#);
        assert_eq!(req.parse_aspect_ratio(), Ok(AspectRatio::LANDSCAPE));
    }

    #[test]
    fn test_empty_prompts_rejected() {
        let req = request(r#"{"prompts": []}"#);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_blank_prompt_rejected() {
        let req = request(r#"{"prompts": ["a castle", "   "]}"#);
        assert!(req.validate().is_err());
    }
}
