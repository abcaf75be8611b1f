//! Record shapes served by the dataset API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Image metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    #[serde(alias = "image_id")]
    pub id: u64,
    pub url: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub coco_id: Option<u64>,
    #[serde(default)]
    pub flickr_id: Option<u64>,
}

/// A described rectangle within an image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    #[serde(alias = "region_id")]
    pub id: u64,
    /// Id of the image the region belongs to.
    pub image: u64,
    pub phrase: String,
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

/// A question/answer pair about an image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    #[serde(alias = "qa_id")]
    pub id: u64,
    pub image: u64,
    pub question: String,
    pub answer: String,
}

/// Question categories the QA endpoints filter on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QaType {
    What,
    Where,
    When,
    Why,
    Who,
    How,
}

impl QaType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::What => "what",
            Self::Where => "where",
            Self::When => "when",
            Self::Why => "why",
            Self::Who => "who",
            Self::How => "how",
        }
    }
}

impl std::fmt::Display for QaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The API answers missing resources with `{"detail": "Not found."}`.
pub(crate) fn is_not_found(value: &Value) -> bool {
    value.get("detail").and_then(Value::as_str) == Some("Not found.")
}
