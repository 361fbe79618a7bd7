//! Best classification per record, resolved in two batched phases: one grouped lookup of
//! classification hits for the whole id set, then one intent-metadata lookup for the winners.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use sift_domain::{Algorithm, ClassificationHit, Confidence, batch};
use sift_storage::store::HistoryStore;

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestClassification {
	pub intent_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub intent_id: Option<i64>,
	pub confidence: Option<Confidence>,
}

/// Winners of all four algorithms, keyed by `log_id`.
#[derive(Debug, Clone, Default)]
pub struct AlgorithmResults {
	pub condition: HashMap<i64, BestClassification>,
	pub intent: HashMap<i64, BestClassification>,
	pub vector: HashMap<i64, BestClassification>,
	pub keyword: HashMap<i64, BestClassification>,
}

/// Resolves the winning classification of `algorithm` for each of `log_ids`.
///
/// Records without any result are absent from the map. The intent name and id are present only
/// when the winner references an intent that exists in intent metadata.
pub async fn resolve_best_per_record(
	store: &dyn HistoryStore,
	log_ids: &[i64],
	algorithm: Algorithm,
) -> Result<HashMap<i64, BestClassification>> {
	if log_ids.is_empty() {
		return Ok(HashMap::new());
	}

	let hits = store
		.best_classifications(log_ids, algorithm)
		.await
		.map_err(|err| Error::store(format!("aggregate:{algorithm}"), err))?;
	let hit_count = hits.len();
	let winners = batch::best_by_key(hits, |hit| hit.log_id, ClassificationHit::rank_cmp);
	let mut intent_ids = winners.values().filter_map(|hit| hit.intent_id).collect::<Vec<_>>();

	intent_ids.sort_unstable();
	intent_ids.dedup();

	let names = if intent_ids.is_empty() {
		HashMap::new()
	} else {
		store
			.intents(&intent_ids)
			.await
			.map_err(|err| Error::store("intent_lookup", err))?
			.into_iter()
			.map(|meta| (meta.intent_id, meta.name))
			.collect::<HashMap<_, _>>()
	};

	tracing::debug!(
		algorithm = algorithm.as_str(),
		requested = log_ids.len(),
		hits = hit_count,
		winners = winners.len(),
		intents = names.len(),
		"Resolved best classifications."
	);

	Ok(winners
		.into_iter()
		.map(|(log_id, hit)| {
			let intent_name = hit.intent_id.and_then(|intent_id| names.get(&intent_id).cloned());
			let intent_id = intent_name.as_ref().and(hit.intent_id);

			(log_id, BestClassification { intent_name, intent_id, confidence: hit.confidence })
		})
		.collect())
}

/// Runs the aggregator for every algorithm. Any failing algorithm fails the whole call.
pub async fn resolve_all(
	store: &dyn HistoryStore,
	log_ids: &[i64],
	concurrent: bool,
) -> Result<AlgorithmResults> {
	if concurrent {
		let (condition, intent, vector, keyword) = tokio::try_join!(
			resolve_best_per_record(store, log_ids, Algorithm::ConditionClassifier),
			resolve_best_per_record(store, log_ids, Algorithm::IntentClassifier),
			resolve_best_per_record(store, log_ids, Algorithm::VectorSimilarity),
			resolve_best_per_record(store, log_ids, Algorithm::KeywordMatch),
		)?;

		return Ok(AlgorithmResults { condition, intent, vector, keyword });
	}

	Ok(AlgorithmResults {
		condition: resolve_best_per_record(store, log_ids, Algorithm::ConditionClassifier).await?,
		intent: resolve_best_per_record(store, log_ids, Algorithm::IntentClassifier).await?,
		vector: resolve_best_per_record(store, log_ids, Algorithm::VectorSimilarity).await?,
		keyword: resolve_best_per_record(store, log_ids, Algorithm::KeywordMatch).await?,
	})
}
