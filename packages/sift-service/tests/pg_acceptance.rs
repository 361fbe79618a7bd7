use std::sync::Arc;

use time::OffsetDateTime;

use sift_config::{Config, History, Postgres, Service, Storage};
use sift_domain::{Algorithm, ResponseType};
use sift_service::{HistoryQuery, PagedViewRequest, SiftService};
use sift_storage::{
	db::Db,
	models::{AnalysisLog, AnalysisLogIntent, AnalysisLogResult, IntentMeta},
	queries,
};
use sift_testkit::TestDatabase;

fn config(dsn: String) -> Config {
	Config {
		service: Service { log_level: "info".to_string() },
		storage: Storage { postgres: Postgres { dsn, pool_max_conns: 4 } },
		history: History { default_page_size: 2, max_page_size: 100, concurrent_aggregation: true },
	}
}

async fn seed(db: &Db) {
	for log_id in 1..=5 {
		let log = AnalysisLog {
			log_id,
			tenant_id: "t1".to_string(),
			session_id: "s".to_string(),
			query_text: format!("utterance {log_id}"),
			analyzed_at: OffsetDateTime::from_unix_timestamp(1_700_000_000 + log_id)
				.expect("timestamp"),
		};

		queries::insert_log(&db.pool, &log).await.expect("insert log");
	}

	let failed = AnalysisLogResult {
		log_id: 1,
		condition_result: Some("FAILURE".to_string()),
		intent_result: Some("FAILURE".to_string()),
		vector_result: Some("FAILURE".to_string()),
		..Default::default()
	};

	queries::insert_log_result(&db.pool, &failed).await.expect("insert result");

	for (result_id, confidence, intent_id) in [(1, "0.40", 10), (2, "0.91", 20)] {
		let intent = AnalysisLogIntent {
			result_id,
			log_id: 5,
			algorithm: Algorithm::ConditionClassifier.as_str().to_string(),
			intent_id: Some(intent_id),
			confidence: Some(confidence.to_string()),
		};

		queries::insert_log_intent(&db.pool, &intent).await.expect("insert intent");
	}
	for (intent_id, name) in [(10, "greeting"), (20, "refund")] {
		queries::insert_intent_meta(&db.pool, &IntentMeta { intent_id, name: name.to_string() })
			.await
			.expect("insert intent meta");
	}
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SIFT_PG_DSN to run."]
async fn history_views_over_postgres() {
	let Some(base_dsn) = sift_testkit::env_dsn() else {
		eprintln!("Skipping history_views_over_postgres; set SIFT_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let history = test_db.history().await.expect("Failed to bootstrap history tables.");

	seed(&history.db).await;

	let service =
		SiftService::new(config(test_db.dsn().to_string()), Arc::new(history.store.clone()));
	let query = HistoryQuery { tenant_id: "t1".to_string(), ..Default::default() };
	let export = service.export_view(query.clone()).await.expect("export");

	assert_eq!(export.rows.iter().map(|row| row.log_id).collect::<Vec<_>>(), vec![5, 4, 3, 2, 1]);

	let winner = export.rows[0].condition.as_ref().expect("condition winner");

	assert_eq!(winner.intent_name.as_deref(), Some("refund"));
	assert_eq!(winner.intent_id, Some(20));
	assert_eq!(winner.confidence.as_ref().map(|c| c.as_str()), Some("0.91"));

	let unresponded = service
		.export_view(HistoryQuery { response_type: Some(ResponseType::Unresponded), ..query.clone() })
		.await
		.expect("export");

	assert_eq!(unresponded.rows.iter().map(|row| row.log_id).collect::<Vec<_>>(), vec![1]);

	let page = service
		.paged_view(PagedViewRequest { query, offset: 2, limit: 2 })
		.await
		.expect("page");

	assert_eq!(page.total_count, 5);
	assert_eq!(page.rows.iter().map(|row| row.log_id).collect::<Vec<_>>(), vec![3, 2]);

	drop(service);
	history.close().await;
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
