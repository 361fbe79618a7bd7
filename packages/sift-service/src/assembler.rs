use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use sift_domain::{ResponseType, verdict::classify_codes};
use sift_storage::models::BaseRow;

use crate::aggregator::{AlgorithmResults, BestClassification};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityExtraction {
	pub code: Option<String>,
	pub label: Option<String>,
	pub alias: Option<String>,
}

/// Dialogue node and scenario the record was routed to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeContext {
	pub node_label: Option<String>,
	pub scenario_name: Option<String>,
	pub scenario_version: Option<String>,
	pub model_ref_1: Option<String>,
	pub model_ref_2: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRow {
	pub log_id: i64,
	pub session_id: String,
	pub query: String,
	pub response_type: ResponseType,
	pub entity: EntityExtraction,
	pub node: NodeContext,
	pub condition: Option<BestClassification>,
	pub intent: Option<BestClassification>,
	pub vector: Option<BestClassification>,
	pub keyword: Option<BestClassification>,
	#[serde(with = "crate::time_serde")]
	pub analyzed_at: OffsetDateTime,
}

/// Merges base rows with the per-algorithm winners, keeping the base row order.
pub fn assemble(
	rows: Vec<BaseRow>,
	results: &AlgorithmResults,
	include_intent_ids: bool,
) -> Vec<HistoryRow> {
	let pick = |map: &HashMap<i64, BestClassification>, log_id: i64| {
		map.get(&log_id).cloned().map(|mut best| {
			if !include_intent_ids {
				best.intent_id = None;
			}

			best
		})
	};

	rows.into_iter()
		.map(|row| HistoryRow {
			response_type: classify_codes(
				row.condition_result.as_deref(),
				row.intent_result.as_deref(),
				row.vector_result.as_deref(),
			),
			condition: pick(&results.condition, row.log_id),
			intent: pick(&results.intent, row.log_id),
			vector: pick(&results.vector, row.log_id),
			keyword: pick(&results.keyword, row.log_id),
			log_id: row.log_id,
			session_id: row.session_id,
			query: row.query_text,
			entity: EntityExtraction {
				code: row.entity_code,
				label: row.entity_label,
				alias: row.entity_alias,
			},
			node: NodeContext {
				node_label: row.node_label,
				scenario_name: row.scenario_name,
				scenario_version: row.scenario_version,
				model_ref_1: row.model_ref_1,
				model_ref_2: row.model_ref_2,
			},
			analyzed_at: row.analyzed_at,
		})
		.collect()
}
