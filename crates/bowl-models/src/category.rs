//! Motion categories (pitch types).

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classifier input length used for categories without a trained length.
pub const DEFAULT_SEQUENCE_LEN: usize = 278;

/// Error parsing a motion category tag.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CategoryError {
    #[error("motion category must not be empty")]
    Empty,

    #[error("motion category contains a path separator: {0}")]
    InvalidCharacters(String),
}

/// Motion category the athlete's delivery is compared against.
///
/// Known categories have a trained classifier length; any other tag is
/// carried as [`MotionCategory::Custom`] and uses [`DEFAULT_SEQUENCE_LEN`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MotionCategory {
    Stroker,
    TwoHand,
    Thumbless,
    Cranker,
    Custom(String),
}

impl MotionCategory {
    pub fn as_str(&self) -> &str {
        match self {
            MotionCategory::Stroker => "stroker",
            MotionCategory::TwoHand => "twohand",
            MotionCategory::Thumbless => "thumbless",
            MotionCategory::Cranker => "cranker",
            MotionCategory::Custom(tag) => tag,
        }
    }

    /// Fixed sequence length the classifier for this category expects.
    pub fn expected_sequence_len(&self) -> usize {
        match self {
            MotionCategory::TwoHand => 310,
            MotionCategory::Cranker => 375,
            MotionCategory::Stroker => 268,
            MotionCategory::Thumbless => 292,
            MotionCategory::Custom(_) => DEFAULT_SEQUENCE_LEN,
        }
    }

    /// Storage key of the reference sequence: `{category}/{category}_001`.
    pub fn reference_key(&self) -> String {
        format!("{0}/{0}_001", self.as_str())
    }
}

impl fmt::Display for MotionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MotionCategory {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        if tag.is_empty() {
            return Err(CategoryError::Empty);
        }

        // Localized names used by the mobile client map onto the same categories.
        let category = match tag {
            "stroker" | "스트로커" => MotionCategory::Stroker,
            "twohand" | "투핸드" => MotionCategory::TwoHand,
            "thumbless" | "덤리스" => MotionCategory::Thumbless,
            "cranker" | "크랭커" => MotionCategory::Cranker,
            other => {
                if other.contains(['/', '\\']) || other.contains("..") {
                    return Err(CategoryError::InvalidCharacters(other.to_string()));
                }
                MotionCategory::Custom(other.to_string())
            }
        };
        Ok(category)
    }
}

impl TryFrom<String> for MotionCategory {
    type Error = CategoryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MotionCategory> for String {
    fn from(category: MotionCategory) -> Self {
        category.as_str().to_string()
    }
}

impl JsonSchema for MotionCategory {
    fn schema_name() -> String {
        "MotionCategory".to_string()
    }

    fn json_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        String::json_schema(gen)
    }
}
