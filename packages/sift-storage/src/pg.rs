use sqlx::{PgPool, Postgres, QueryBuilder};

use sift_domain::{
	Algorithm, ClassificationHit, ResponseType,
	filter::{FilterExpr, FilterField, FilterValue},
	verdict::FAILURE_CODE,
};

use crate::{
	Error, Result,
	db::Db,
	models::{AnalysisLogIntent, BaseRow, IntentMeta},
	store::{BoxFuture, HistoryStore, IdScan, RowFetch},
};

const BASE_ROW_SELECT: &str = "\
SELECT
	l.log_id,
	l.session_id,
	l.query_text,
	l.analyzed_at,
	r.condition_result,
	r.intent_result,
	r.vector_result,
	e.entity_code,
	e.entity_label,
	e.entity_alias,
	r.node_label,
	s.name AS scenario_name,
	v.version AS scenario_version,
	r.model_ref_1,
	r.model_ref_2
FROM analysis_logs l
LEFT JOIN analysis_log_entities e ON e.log_id = l.log_id
LEFT JOIN analysis_log_results r ON r.log_id = l.log_id
LEFT JOIN scenarios s ON s.scenario_id = r.scenario_id
LEFT JOIN scenario_versions v ON v.version_id = r.version_id
WHERE l.log_id = ANY(";

/// PostgreSQL-backed history store.
#[derive(Clone)]
pub struct PgHistoryStore {
	pool: PgPool,
}
impl PgHistoryStore {
	pub fn new(db: &Db) -> Self {
		Self { pool: db.pool.clone() }
	}

	async fn select_ids(&self, scan: &IdScan) -> Result<Vec<i64>> {
		let mut builder = id_scan_query(scan);

		tracing::debug!(sql = builder.sql(), "Scanning history ids.");

		let ids: Vec<i64> = builder.build_query_scalar().fetch_all(&self.pool).await?;

		Ok(ids)
	}

	async fn select_best_classifications(
		&self,
		log_ids: &[i64],
		algorithm: Algorithm,
	) -> Result<Vec<ClassificationHit>> {
		let rows: Vec<AnalysisLogIntent> = sqlx::query_as(
			"\
SELECT DISTINCT ON (log_id)
	result_id,
	log_id,
	algorithm,
	intent_id,
	confidence::text AS confidence
FROM analysis_log_intents
WHERE log_id = ANY($1) AND algorithm = $2
ORDER BY log_id, confidence DESC NULLS LAST, result_id ASC",
		)
		.bind(log_ids)
		.bind(algorithm.as_str())
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(classification_hit).collect()
	}

	async fn select_intents(&self, intent_ids: &[i64]) -> Result<Vec<IntentMeta>> {
		let rows = sqlx::query_as("SELECT intent_id, name FROM intent_meta WHERE intent_id = ANY($1)")
			.bind(intent_ids)
			.fetch_all(&self.pool)
			.await?;

		Ok(rows)
	}

	async fn select_rows(&self, fetch: &RowFetch) -> Result<Vec<BaseRow>> {
		let mut builder = QueryBuilder::<Postgres>::new(BASE_ROW_SELECT);

		builder.push_bind(fetch.log_ids.as_slice());
		builder.push(") ORDER BY l.analyzed_at DESC, l.log_id DESC");

		if let Some(window) = fetch.window {
			let offset = i64::try_from(window.offset).map_err(|_| {
				Error::InvalidArgument(format!("Page offset {} is out of range.", window.offset))
			})?;

			builder.push(" OFFSET ");
			builder.push_bind(offset);
			builder.push(" LIMIT ");
			builder.push_bind(i64::from(window.limit));
		}

		tracing::debug!(records = fetch.log_ids.len(), window = ?fetch.window, "Fetching base rows.");

		let rows: Vec<BaseRow> = builder.build_query_as().fetch_all(&self.pool).await?;

		Ok(rows)
	}
}

impl HistoryStore for PgHistoryStore {
	fn scan_ids<'a>(&'a self, scan: &'a IdScan) -> BoxFuture<'a, Result<Vec<i64>>> {
		Box::pin(self.select_ids(scan))
	}

	fn best_classifications<'a>(
		&'a self,
		log_ids: &'a [i64],
		algorithm: Algorithm,
	) -> BoxFuture<'a, Result<Vec<ClassificationHit>>> {
		Box::pin(self.select_best_classifications(log_ids, algorithm))
	}

	fn intents<'a>(&'a self, intent_ids: &'a [i64]) -> BoxFuture<'a, Result<Vec<IntentMeta>>> {
		Box::pin(self.select_intents(intent_ids))
	}

	fn fetch_rows<'a>(&'a self, fetch: &'a RowFetch) -> BoxFuture<'a, Result<Vec<BaseRow>>> {
		Box::pin(self.select_rows(fetch))
	}
}

fn classification_hit(row: AnalysisLogIntent) -> Result<ClassificationHit> {
	let algorithm = Algorithm::parse(&row.algorithm).ok_or_else(|| {
		Error::Decode(format!("Unknown algorithm '{}' on result {}.", row.algorithm, row.result_id))
	})?;

	Ok(ClassificationHit::from_stored(
		row.result_id,
		row.log_id,
		algorithm,
		row.intent_id,
		row.confidence.as_deref(),
	)?)
}

fn id_scan_query(scan: &IdScan) -> QueryBuilder<'_, Postgres> {
	let mut builder = QueryBuilder::<Postgres>::new("SELECT l.log_id FROM analysis_logs l");

	if scan.needs_result_detail() {
		builder.push(" LEFT JOIN analysis_log_results r ON r.log_id = l.log_id");
	}

	builder.push(" WHERE l.tenant_id = ");
	builder.push_bind(scan.tenant_id.as_str());

	if let Some(predicate) = &scan.predicate {
		builder.push(" AND (");
		push_predicate(&mut builder, predicate);
		builder.push(")");
	}

	match scan.response_type {
		Some(ResponseType::Unresponded) => {
			builder.push(" AND ");
			push_unresponded(&mut builder);
		},
		Some(ResponseType::Responded) => {
			builder.push(" AND NOT ");
			push_unresponded(&mut builder);
		},
		None => {},
	}

	builder.push(" ORDER BY l.log_id");

	builder
}

// A missing result-detail row leaves the conjunction NULL; COALESCE keeps it on the responded side
// so the two response-type filters partition the tenant's records.
fn push_unresponded(builder: &mut QueryBuilder<'_, Postgres>) {
	builder.push("COALESCE(r.condition_result = ");
	builder.push_bind(FAILURE_CODE);
	builder.push(" AND r.intent_result = ");
	builder.push_bind(FAILURE_CODE);
	builder.push(" AND r.vector_result = ");
	builder.push_bind(FAILURE_CODE);
	builder.push(", FALSE)");
}

fn column(field: FilterField) -> &'static str {
	match field {
		FilterField::LogId => "l.log_id",
		FilterField::SessionId => "l.session_id",
		FilterField::QueryText => "l.query_text",
		FilterField::AnalyzedAt => "l.analyzed_at",
	}
}

fn push_value(builder: &mut QueryBuilder<'_, Postgres>, value: &FilterValue) {
	match value {
		FilterValue::String(value) => {
			builder.push_bind(value.clone());
		},
		FilterValue::Integer(value) => {
			builder.push_bind(*value);
		},
		FilterValue::DateTime(value) => {
			builder.push_bind(*value);
		},
	}
}

fn push_comparison(
	builder: &mut QueryBuilder<'_, Postgres>,
	field: FilterField,
	op: &str,
	value: &FilterValue,
) {
	builder.push(column(field));
	builder.push(" ");
	builder.push(op);
	builder.push(" ");
	push_value(builder, value);
}

fn push_group(builder: &mut QueryBuilder<'_, Postgres>, nodes: &[FilterExpr], joiner: &str) {
	builder.push("(");

	for (index, node) in nodes.iter().enumerate() {
		if index > 0 {
			builder.push(joiner);
		}

		push_predicate(builder, node);
	}

	builder.push(")");
}

fn push_predicate(builder: &mut QueryBuilder<'_, Postgres>, expr: &FilterExpr) {
	match expr {
		FilterExpr::And(nodes) => push_group(builder, nodes, " AND "),
		FilterExpr::Or(nodes) => push_group(builder, nodes, " OR "),
		FilterExpr::Not(node) => {
			builder.push("NOT (");
			push_predicate(builder, node);
			builder.push(")");
		},
		FilterExpr::Eq { field, value } => push_comparison(builder, *field, "=", value),
		FilterExpr::Neq { field, value } => push_comparison(builder, *field, "<>", value),
		FilterExpr::Gt { field, value } => push_comparison(builder, *field, ">", value),
		FilterExpr::Gte { field, value } => push_comparison(builder, *field, ">=", value),
		FilterExpr::Lt { field, value } => push_comparison(builder, *field, "<", value),
		FilterExpr::Lte { field, value } => push_comparison(builder, *field, "<=", value),
		FilterExpr::In { field, values } => {
			builder.push(column(*field));
			builder.push(" IN (");

			for (index, value) in values.iter().enumerate() {
				if index > 0 {
					builder.push(", ");
				}

				push_value(builder, value);
			}

			builder.push(")");
		},
		FilterExpr::Contains { field, value } => {
			builder.push("strpos(");
			builder.push(column(*field));
			builder.push(", ");
			builder.push_bind(value.clone());
			builder.push(") > 0");
		},
	}
}

#[cfg(test)]
mod tests {
	use sqlx::{Postgres, QueryBuilder};

	use sift_domain::{
		ResponseType,
		filter::{FilterExpr, FilterField, FilterValue},
	};

	use crate::{
		pg::{id_scan_query, push_predicate},
		store::IdScan,
	};

	#[test]
	fn compiles_nested_predicate_with_bound_values() {
		let expr = FilterExpr::And(vec![
			FilterExpr::Eq { field: FilterField::SessionId, value: FilterValue::String("s".into()) },
			FilterExpr::Not(Box::new(FilterExpr::In {
				field: FilterField::LogId,
				values: vec![FilterValue::Integer(1), FilterValue::Integer(2)],
			})),
			FilterExpr::Contains { field: FilterField::QueryText, value: "parcel".into() },
		]);
		let mut builder = QueryBuilder::<Postgres>::new("");

		push_predicate(&mut builder, &expr);

		assert_eq!(
			builder.sql(),
			"(l.session_id = $1 AND NOT (l.log_id IN ($2, $3)) AND strpos(l.query_text, $4) > 0)"
		);
	}

	#[test]
	fn id_scan_joins_result_detail_only_for_response_type_filters() {
		let plain = IdScan::new("t1").with_predicate(Some(FilterExpr::Eq {
			field: FilterField::SessionId,
			value: FilterValue::String("s".into()),
		}));

		assert_eq!(
			id_scan_query(&plain).sql(),
			"SELECT l.log_id FROM analysis_logs l WHERE l.tenant_id = $1 AND (l.session_id = $2) \
ORDER BY l.log_id"
		);

		let unresponded = plain.clone().with_response_type(Some(ResponseType::Unresponded));
		let responded = plain.with_response_type(Some(ResponseType::Responded));
		let unresponded_sql = id_scan_query(&unresponded).sql().to_string();
		let responded_sql = id_scan_query(&responded).sql().to_string();

		for sql in [&unresponded_sql, &responded_sql] {
			assert!(sql.contains("LEFT JOIN analysis_log_results r ON r.log_id = l.log_id"));
		}

		assert!(unresponded_sql.contains(
			" AND COALESCE(r.condition_result = $3 AND r.intent_result = $4 AND r.vector_result = $5, FALSE)"
		));
		assert!(responded_sql.contains(" AND NOT COALESCE("));
	}
}
