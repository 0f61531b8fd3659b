//! Prompt items and their normalization into launchable work items.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A prompt annotated with a caller-supplied index and a time range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimedPrompt {
    /// Caller-supplied index, used verbatim in the output filename
    pub index: u32,
    /// Prompt text
    pub prompt: String,
    /// Segment start in seconds
    pub start_time: f64,
    /// Segment end in seconds
    pub end_time: f64,
}

/// The `prompts` array as sent by the caller.
///
/// The shape is decided once, when the request body is parsed. A list is
/// either all bare strings or all timed objects; mixed lists are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum PromptList {
    /// `[{index, prompt, startTime, endTime}, ...]`
    Timed(Vec<TimedPrompt>),
    /// `["prompt", ...]`
    Plain(Vec<String>),
}

impl PromptList {
    pub fn len(&self) -> usize {
        match self {
            PromptList::Timed(items) => items.len(),
            PromptList::Plain(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate the list as explicit prompt items.
    pub fn items(&self) -> Vec<PromptItem> {
        match self {
            PromptList::Timed(items) => items.iter().cloned().map(PromptItem::Timed).collect(),
            PromptList::Plain(items) => items.iter().cloned().map(PromptItem::Plain).collect(),
        }
    }

    /// Normalize every prompt into a work item with its origin index and
    /// target filename.
    pub fn normalize(&self) -> Vec<NormalizedItem> {
        self.items()
            .into_iter()
            .enumerate()
            .map(|(origin_index, item)| item.normalize(origin_index))
            .collect()
    }
}

/// One prompt, either bare or annotated.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptItem {
    Plain(String),
    Timed(TimedPrompt),
}

impl PromptItem {
    /// Prompt text regardless of variant.
    pub fn text(&self) -> &str {
        match self {
            PromptItem::Plain(prompt) => prompt,
            PromptItem::Timed(timed) => &timed.prompt,
        }
    }

    /// Output filename for this item.
    ///
    /// Plain prompts are numbered from their position (1-based). Timed
    /// prompts use the caller's index and time range as given.
    pub fn filename(&self, origin_index: usize) -> String {
        match self {
            PromptItem::Plain(_) => format!("image_{}.png", origin_index + 1),
            PromptItem::Timed(timed) => format!(
                "image_{}_{}s-{}s.png",
                timed.index, timed.start_time, timed.end_time
            ),
        }
    }

    pub fn normalize(self, origin_index: usize) -> NormalizedItem {
        let filename = self.filename(origin_index);
        NormalizedItem {
            origin_index,
            prompt: self.text().trim().to_string(),
            filename,
        }
    }
}

/// A prompt ready to be launched as a remote job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedItem {
    /// Position in the caller's input sequence
    pub origin_index: usize,
    /// Prompt text (trimmed, non-empty after validation)
    pub prompt: String,
    /// Target filename in the object store
    pub filename: String,
}
