use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Scoring method that produced a classification result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Algorithm {
	ConditionClassifier,
	IntentClassifier,
	VectorSimilarity,
	KeywordMatch,
}
impl Algorithm {
	pub const ALL: [Self; 4] =
		[Self::ConditionClassifier, Self::IntentClassifier, Self::VectorSimilarity, Self::KeywordMatch];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::ConditionClassifier => "CONDITION_CLASSIFIER",
			Self::IntentClassifier => "INTENT_CLASSIFIER",
			Self::VectorSimilarity => "VECTOR_SIMILARITY",
			Self::KeywordMatch => "KEYWORD_MATCH",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_uppercase().as_str() {
			"CONDITION_CLASSIFIER" => Some(Self::ConditionClassifier),
			"INTENT_CLASSIFIER" => Some(Self::IntentClassifier),
			"VECTOR_SIMILARITY" => Some(Self::VectorSimilarity),
			"KEYWORD_MATCH" => Some(Self::KeywordMatch),
			_ => None,
		}
	}

	/// Keyword matches carry no confidence score.
	pub fn scores_confidence(self) -> bool {
		!matches!(self, Self::KeywordMatch)
	}
}

impl Display for Algorithm {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}
