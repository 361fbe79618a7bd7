//! In-process history store for tests and local tooling. Mirrors the PostgreSQL store's semantics.

use std::{
	collections::{HashMap, HashSet},
	future,
	sync::{Mutex, MutexGuard, PoisonError},
};

use sift_domain::{
	Algorithm, ClassificationHit, ResponseType, filter::FilterSubject, verdict::classify_codes,
};

use crate::{
	Error, Result,
	models::{
		AnalysisLog, AnalysisLogEntity, AnalysisLogIntent, AnalysisLogResult, BaseRow, IntentMeta,
		Scenario, ScenarioVersion,
	},
	store::{BoxFuture, HistoryStore, IdScan, RowFetch},
};

#[derive(Default)]
struct Tables {
	logs: Vec<AnalysisLog>,
	results: HashMap<i64, AnalysisLogResult>,
	entities: HashMap<i64, AnalysisLogEntity>,
	intents: Vec<AnalysisLogIntent>,
	intent_meta: HashMap<i64, String>,
	scenarios: HashMap<i64, String>,
	versions: HashMap<i64, String>,
}

#[derive(Default)]
pub struct MemoryHistoryStore {
	tables: Mutex<Tables>,
}
impl MemoryHistoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert_log(&self, log: AnalysisLog) {
		self.tables().logs.push(log);
	}

	pub fn insert_log_result(&self, result: AnalysisLogResult) {
		self.tables().results.insert(result.log_id, result);
	}

	pub fn insert_log_entity(&self, entity: AnalysisLogEntity) {
		self.tables().entities.insert(entity.log_id, entity);
	}

	pub fn insert_log_intent(&self, intent: AnalysisLogIntent) {
		self.tables().intents.push(intent);
	}

	pub fn insert_intent_meta(&self, meta: IntentMeta) {
		self.tables().intent_meta.insert(meta.intent_id, meta.name);
	}

	pub fn insert_scenario(&self, scenario: Scenario) {
		self.tables().scenarios.insert(scenario.scenario_id, scenario.name);
	}

	pub fn insert_scenario_version(&self, version: ScenarioVersion) {
		self.tables().versions.insert(version.version_id, version.version);
	}

	fn tables(&self) -> MutexGuard<'_, Tables> {
		self.tables.lock().unwrap_or_else(PoisonError::into_inner)
	}

	fn select_ids(&self, scan: &IdScan) -> Result<Vec<i64>> {
		let tables = self.tables();
		let mut ids = tables
			.logs
			.iter()
			.filter(|log| log.tenant_id == scan.tenant_id)
			.filter(|log| {
				scan.predicate.as_ref().is_none_or(|predicate| {
					predicate.matches(&FilterSubject {
						log_id: log.log_id,
						session_id: &log.session_id,
						query_text: &log.query_text,
						analyzed_at: log.analyzed_at,
					})
				})
			})
			.filter(|log| {
				scan.response_type.is_none_or(|wanted| response_type(&tables, log.log_id) == wanted)
			})
			.map(|log| log.log_id)
			.collect::<Vec<_>>();

		ids.sort_unstable();

		Ok(ids)
	}

	fn select_best_classifications(
		&self,
		log_ids: &[i64],
		algorithm: Algorithm,
	) -> Result<Vec<ClassificationHit>> {
		let wanted = log_ids.iter().copied().collect::<HashSet<_>>();
		let tables = self.tables();

		tables
			.intents
			.iter()
			.filter(|row| wanted.contains(&row.log_id) && row.algorithm == algorithm.as_str())
			.map(|row| -> Result<ClassificationHit> {
				Ok(ClassificationHit::from_stored(
					row.result_id,
					row.log_id,
					algorithm,
					row.intent_id,
					row.confidence.as_deref(),
				)?)
			})
			.collect()
	}

	fn select_intents(&self, intent_ids: &[i64]) -> Result<Vec<IntentMeta>> {
		let tables = self.tables();

		Ok(intent_ids
			.iter()
			.collect::<HashSet<_>>()
			.into_iter()
			.filter_map(|intent_id| {
				tables
					.intent_meta
					.get(intent_id)
					.map(|name| IntentMeta { intent_id: *intent_id, name: name.clone() })
			})
			.collect())
	}

	fn select_rows(&self, fetch: &RowFetch) -> Result<Vec<BaseRow>> {
		let wanted = fetch.log_ids.iter().copied().collect::<HashSet<_>>();
		let tables = self.tables();
		let mut rows = tables
			.logs
			.iter()
			.filter(|log| wanted.contains(&log.log_id))
			.map(|log| base_row(&tables, log))
			.collect::<Vec<_>>();

		rows.sort_by(|a, b| b.analyzed_at.cmp(&a.analyzed_at).then_with(|| b.log_id.cmp(&a.log_id)));

		let Some(window) = fetch.window else {
			return Ok(rows);
		};

		if i64::try_from(window.offset).is_err() {
			return Err(Error::InvalidArgument(format!(
				"Page offset {} is out of range.",
				window.offset
			)));
		}

		let offset = usize::try_from(window.offset).unwrap_or(usize::MAX);

		Ok(rows.into_iter().skip(offset).take(window.limit as usize).collect())
	}
}

impl HistoryStore for MemoryHistoryStore {
	fn scan_ids<'a>(&'a self, scan: &'a IdScan) -> BoxFuture<'a, Result<Vec<i64>>> {
		Box::pin(future::ready(self.select_ids(scan)))
	}

	fn best_classifications<'a>(
		&'a self,
		log_ids: &'a [i64],
		algorithm: Algorithm,
	) -> BoxFuture<'a, Result<Vec<ClassificationHit>>> {
		Box::pin(future::ready(self.select_best_classifications(log_ids, algorithm)))
	}

	fn intents<'a>(&'a self, intent_ids: &'a [i64]) -> BoxFuture<'a, Result<Vec<IntentMeta>>> {
		Box::pin(future::ready(self.select_intents(intent_ids)))
	}

	fn fetch_rows<'a>(&'a self, fetch: &'a RowFetch) -> BoxFuture<'a, Result<Vec<BaseRow>>> {
		Box::pin(future::ready(self.select_rows(fetch)))
	}
}

fn response_type(tables: &Tables, log_id: i64) -> ResponseType {
	match tables.results.get(&log_id) {
		Some(result) => classify_codes(
			result.condition_result.as_deref(),
			result.intent_result.as_deref(),
			result.vector_result.as_deref(),
		),
		None => classify_codes(None, None, None),
	}
}

fn base_row(tables: &Tables, log: &AnalysisLog) -> BaseRow {
	let result = tables.results.get(&log.log_id);
	let entity = tables.entities.get(&log.log_id);

	BaseRow {
		log_id: log.log_id,
		session_id: log.session_id.clone(),
		query_text: log.query_text.clone(),
		analyzed_at: log.analyzed_at,
		condition_result: result.and_then(|r| r.condition_result.clone()),
		intent_result: result.and_then(|r| r.intent_result.clone()),
		vector_result: result.and_then(|r| r.vector_result.clone()),
		entity_code: entity.and_then(|e| e.entity_code.clone()),
		entity_label: entity.and_then(|e| e.entity_label.clone()),
		entity_alias: entity.and_then(|e| e.entity_alias.clone()),
		node_label: result.and_then(|r| r.node_label.clone()),
		scenario_name: result
			.and_then(|r| r.scenario_id)
			.and_then(|id| tables.scenarios.get(&id).cloned()),
		scenario_version: result
			.and_then(|r| r.version_id)
			.and_then(|id| tables.versions.get(&id).cloned()),
		model_ref_1: result.and_then(|r| r.model_ref_1.clone()),
		model_ref_2: result.and_then(|r| r.model_ref_2.clone()),
	}
}
