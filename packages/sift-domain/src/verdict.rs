use serde::{Deserialize, Serialize};

pub const FAILURE_CODE: &str = "FAILURE";

/// Terminal outcome of one scored algorithm for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
	Failure,
	Success,
}
impl Outcome {
	/// Only the literal `FAILURE` code counts as a failure; absent or other codes do not.
	pub fn from_code(code: Option<&str>) -> Self {
		match code {
			Some(FAILURE_CODE) => Self::Failure,
			_ => Self::Success,
		}
	}

	pub fn is_failure(self) -> bool {
		matches!(self, Self::Failure)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseType {
	Responded,
	Unresponded,
}
impl ResponseType {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Responded => "RESPONDED",
			Self::Unresponded => "UNRESPONDED",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_uppercase().as_str() {
			"RESPONDED" => Some(Self::Responded),
			"UNRESPONDED" => Some(Self::Unresponded),
			_ => None,
		}
	}
}

/// A record is unresponded only when the condition, intent, and vector algorithms all failed.
pub fn classify(condition: Outcome, intent: Outcome, vector: Outcome) -> ResponseType {
	if condition.is_failure() && intent.is_failure() && vector.is_failure() {
		ResponseType::Unresponded
	} else {
		ResponseType::Responded
	}
}

/// Same rule over raw stored codes.
pub fn classify_codes(
	condition: Option<&str>,
	intent: Option<&str>,
	vector: Option<&str>,
) -> ResponseType {
	classify(Outcome::from_code(condition), Outcome::from_code(intent), Outcome::from_code(vector))
}
