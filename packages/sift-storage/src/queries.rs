//! Write-side statements used to seed history tables. The service itself never writes.

use sqlx::{Executor, Postgres};

use crate::{
	Result,
	models::{
		AnalysisLog, AnalysisLogEntity, AnalysisLogIntent, AnalysisLogResult, IntentMeta, Scenario,
		ScenarioVersion,
	},
};

pub async fn insert_log<'e, E>(executor: E, log: &AnalysisLog) -> Result<()>
where
	E: Executor<'e, Database = Postgres>,
{
	sqlx::query(
		"\
INSERT INTO analysis_logs (log_id, tenant_id, session_id, query_text, analyzed_at)
VALUES ($1, $2, $3, $4, $5)",
	)
	.bind(log.log_id)
	.bind(log.tenant_id.as_str())
	.bind(log.session_id.as_str())
	.bind(log.query_text.as_str())
	.bind(log.analyzed_at)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn insert_log_result<'e, E>(executor: E, result: &AnalysisLogResult) -> Result<()>
where
	E: Executor<'e, Database = Postgres>,
{
	sqlx::query(
		"\
INSERT INTO analysis_log_results (
	log_id,
	condition_result,
	intent_result,
	vector_result,
	node_label,
	scenario_id,
	version_id,
	model_ref_1,
	model_ref_2
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
	)
	.bind(result.log_id)
	.bind(result.condition_result.as_deref())
	.bind(result.intent_result.as_deref())
	.bind(result.vector_result.as_deref())
	.bind(result.node_label.as_deref())
	.bind(result.scenario_id)
	.bind(result.version_id)
	.bind(result.model_ref_1.as_deref())
	.bind(result.model_ref_2.as_deref())
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn insert_log_entity<'e, E>(executor: E, entity: &AnalysisLogEntity) -> Result<()>
where
	E: Executor<'e, Database = Postgres>,
{
	sqlx::query(
		"\
INSERT INTO analysis_log_entities (log_id, entity_code, entity_label, entity_alias)
VALUES ($1, $2, $3, $4)",
	)
	.bind(entity.log_id)
	.bind(entity.entity_code.as_deref())
	.bind(entity.entity_label.as_deref())
	.bind(entity.entity_alias.as_deref())
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn insert_log_intent<'e, E>(executor: E, intent: &AnalysisLogIntent) -> Result<()>
where
	E: Executor<'e, Database = Postgres>,
{
	sqlx::query(
		"\
INSERT INTO analysis_log_intents (result_id, log_id, algorithm, intent_id, confidence)
VALUES ($1, $2, $3, $4, CAST($5 AS numeric))",
	)
	.bind(intent.result_id)
	.bind(intent.log_id)
	.bind(intent.algorithm.as_str())
	.bind(intent.intent_id)
	.bind(intent.confidence.as_deref())
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn insert_intent_meta<'e, E>(executor: E, meta: &IntentMeta) -> Result<()>
where
	E: Executor<'e, Database = Postgres>,
{
	sqlx::query("INSERT INTO intent_meta (intent_id, name) VALUES ($1, $2)")
		.bind(meta.intent_id)
		.bind(meta.name.as_str())
		.execute(executor)
		.await?;

	Ok(())
}

pub async fn insert_scenario<'e, E>(executor: E, scenario: &Scenario) -> Result<()>
where
	E: Executor<'e, Database = Postgres>,
{
	sqlx::query("INSERT INTO scenarios (scenario_id, name) VALUES ($1, $2)")
		.bind(scenario.scenario_id)
		.bind(scenario.name.as_str())
		.execute(executor)
		.await?;

	Ok(())
}

pub async fn insert_scenario_version<'e, E>(executor: E, version: &ScenarioVersion) -> Result<()>
where
	E: Executor<'e, Database = Postgres>,
{
	sqlx::query("INSERT INTO scenario_versions (version_id, scenario_id, version) VALUES ($1, $2, $3)")
		.bind(version.version_id)
		.bind(version.scenario_id)
		.bind(version.version.as_str())
		.execute(executor)
		.await?;

	Ok(())
}
