use std::cmp::Ordering;

use crate::{Algorithm, Confidence, ConfidenceError};

/// One scoring attempt of one algorithm for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationHit {
	pub result_id: i64,
	pub log_id: i64,
	pub algorithm: Algorithm,
	pub intent_id: Option<i64>,
	pub confidence: Option<Confidence>,
}
impl ClassificationHit {
	/// Builds a hit from a stored row. A confidence stored for an algorithm that does not score one
	/// is ignored.
	pub fn from_stored(
		result_id: i64,
		log_id: i64,
		algorithm: Algorithm,
		intent_id: Option<i64>,
		confidence: Option<&str>,
	) -> Result<Self, ConfidenceError> {
		let confidence = match confidence {
			Some(raw) if algorithm.scores_confidence() => Some(Confidence::parse(raw)?),
			_ => None,
		};

		Ok(Self { result_id, log_id, algorithm, intent_id, confidence })
	}

	/// Winner order: higher confidence first, a missing confidence below any present one, then the
	/// lower `result_id`.
	pub fn rank_cmp(&self, other: &Self) -> Ordering {
		self.confidence
			.cmp(&other.confidence)
			.then_with(|| other.result_id.cmp(&self.result_id))
	}
}
