use time::OffsetDateTime;

use sift_domain::{Algorithm, Confidence, ResponseType};
use sift_storage::{
	models::{AnalysisLog, AnalysisLogIntent, AnalysisLogResult, IntentMeta},
	queries,
	store::{HistoryStore, IdScan, RowFetch, Window},
};
use sift_testkit::TestDatabase;

fn log(log_id: i64, tenant_id: &str, seconds: i64) -> AnalysisLog {
	AnalysisLog {
		log_id,
		tenant_id: tenant_id.to_string(),
		session_id: format!("session-{}", log_id % 2),
		query_text: format!("where is parcel {log_id}"),
		analyzed_at: OffsetDateTime::from_unix_timestamp(1_700_000_000 + seconds)
			.expect("timestamp"),
	}
}

fn intent(result_id: i64, log_id: i64, confidence: Option<&str>) -> AnalysisLogIntent {
	AnalysisLogIntent {
		result_id,
		log_id,
		algorithm: Algorithm::IntentClassifier.as_str().to_string(),
		intent_id: Some(result_id),
		confidence: confidence.map(str::to_string),
	}
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SIFT_PG_DSN to run."]
async fn schema_bootstrap_is_idempotent() {
	let Some(base_dsn) = sift_testkit::env_dsn() else {
		eprintln!("Skipping schema_bootstrap_is_idempotent; set SIFT_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let history = test_db.history().await.expect("Failed to bootstrap history tables.");
	let db = &history.db;

	db.ensure_schema().await.expect("Failed to re-run schema bootstrap.");

	let count: i64 = sqlx::query_scalar(
		"SELECT count(*) FROM information_schema.tables WHERE table_name = 'analysis_log_intents'",
	)
	.fetch_one(&db.pool)
	.await
	.expect("Failed to query schema tables.");

	assert_eq!(count, 1);

	history.close().await;
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SIFT_PG_DSN to run."]
async fn scans_partition_and_rows_page_in_order() {
	let Some(base_dsn) = sift_testkit::env_dsn() else {
		eprintln!("Skipping scans_partition_and_rows_page_in_order; set SIFT_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let history = test_db.history().await.expect("Failed to bootstrap history tables.");
	let (db, store) = (&history.db, &history.store);

	for (log_id, tenant_id, seconds) in [(1, "t1", 10), (2, "t1", 20), (3, "t1", 20), (4, "t2", 5)] {
		queries::insert_log(&db.pool, &log(log_id, tenant_id, seconds)).await.expect("insert log");
	}
	for (log_id, intent_code) in [(1, "FAILURE"), (2, "SUCCESS"), (4, "FAILURE")] {
		let result = AnalysisLogResult {
			log_id,
			condition_result: Some("FAILURE".to_string()),
			intent_result: Some(intent_code.to_string()),
			vector_result: Some("FAILURE".to_string()),
			..Default::default()
		};

		queries::insert_log_result(&db.pool, &result).await.expect("insert result");
	}

	let all = store.scan_ids(&IdScan::new("t1")).await.expect("scan");
	let unresponded = store
		.scan_ids(&IdScan::new("t1").with_response_type(Some(ResponseType::Unresponded)))
		.await
		.expect("scan");
	let responded = store
		.scan_ids(&IdScan::new("t1").with_response_type(Some(ResponseType::Responded)))
		.await
		.expect("scan");

	assert_eq!(all, vec![1, 2, 3]);
	assert_eq!(unresponded, vec![1]);
	assert_eq!(responded, vec![2, 3]);

	let rows = store
		.fetch_rows(&RowFetch { log_ids: all, window: Some(Window { offset: 0, limit: 2 }) })
		.await
		.expect("rows");

	assert_eq!(rows.iter().map(|row| row.log_id).collect::<Vec<_>>(), vec![3, 2]);
	assert_eq!(rows[1].intent_result.as_deref(), Some("SUCCESS"));
	assert_eq!(rows[0].condition_result, None);

	history.close().await;
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SIFT_PG_DSN to run."]
async fn best_classification_is_resolved_in_the_database() {
	let Some(base_dsn) = sift_testkit::env_dsn() else {
		eprintln!(
			"Skipping best_classification_is_resolved_in_the_database; set SIFT_PG_DSN to run."
		);

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let history = test_db.history().await.expect("Failed to bootstrap history tables.");
	let (db, store) = (&history.db, &history.store);

	queries::insert_log(&db.pool, &log(1, "t1", 0)).await.expect("insert log");
	queries::insert_log(&db.pool, &log(2, "t1", 0)).await.expect("insert log");

	for row in [
		intent(30, 1, Some("0.5")),
		intent(20, 1, Some("0.91")),
		intent(10, 1, Some("0.910")),
		intent(40, 2, None),
		intent(50, 2, Some("0.01")),
	] {
		queries::insert_log_intent(&db.pool, &row).await.expect("insert intent");
	}

	queries::insert_intent_meta(&db.pool, &IntentMeta { intent_id: 10, name: "refund".into() })
		.await
		.expect("insert intent meta");

	let mut hits = store
		.best_classifications(&[1, 2], Algorithm::IntentClassifier)
		.await
		.expect("hits");

	hits.sort_by_key(|hit| hit.log_id);

	assert_eq!(hits.len(), 2);
	assert_eq!(hits[0].result_id, 10);
	assert_eq!(hits[0].confidence, Some(Confidence::parse("0.91").expect("confidence")));
	assert_eq!(hits[1].result_id, 50);

	let intents = store.intents(&[10, 99]).await.expect("intents");

	assert_eq!(intents, vec![IntentMeta { intent_id: 10, name: "refund".into() }]);

	history.close().await;
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
