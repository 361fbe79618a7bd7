use time::OffsetDateTime;

/// One processed utterance as written by the upstream pipeline.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnalysisLog {
	pub log_id: i64,
	pub tenant_id: String,
	pub session_id: String,
	pub query_text: String,
	pub analyzed_at: OffsetDateTime,
}

/// Result-detail row: the three failure flags plus the matched dialogue node.
#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct AnalysisLogResult {
	pub log_id: i64,
	pub condition_result: Option<String>,
	pub intent_result: Option<String>,
	pub vector_result: Option<String>,
	pub node_label: Option<String>,
	pub scenario_id: Option<i64>,
	pub version_id: Option<i64>,
	pub model_ref_1: Option<String>,
	pub model_ref_2: Option<String>,
}

#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct AnalysisLogEntity {
	pub log_id: i64,
	pub entity_code: Option<String>,
	pub entity_label: Option<String>,
	pub entity_alias: Option<String>,
}

/// Classification attempt as stored; `confidence` is the decimal text.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnalysisLogIntent {
	pub result_id: i64,
	pub log_id: i64,
	pub algorithm: String,
	pub intent_id: Option<i64>,
	pub confidence: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct IntentMeta {
	pub intent_id: i64,
	pub name: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Scenario {
	pub scenario_id: i64,
	pub name: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScenarioVersion {
	pub version_id: i64,
	pub scenario_id: i64,
	pub version: String,
}

/// Base projection of one record joined with its entity, result detail, and scenario metadata.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct BaseRow {
	pub log_id: i64,
	pub session_id: String,
	pub query_text: String,
	pub analyzed_at: OffsetDateTime,
	pub condition_result: Option<String>,
	pub intent_result: Option<String>,
	pub vector_result: Option<String>,
	pub entity_code: Option<String>,
	pub entity_label: Option<String>,
	pub entity_alias: Option<String>,
	pub node_label: Option<String>,
	pub scenario_name: Option<String>,
	pub scenario_version: Option<String>,
	pub model_ref_1: Option<String>,
	pub model_ref_2: Option<String>,
}
