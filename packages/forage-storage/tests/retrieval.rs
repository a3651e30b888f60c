use serde_json::json;
use time::{Duration, OffsetDateTime};
use tokio::runtime::Runtime;
use uuid::Uuid;

use forage_config::Postgres;
use forage_storage::{
	db::Db,
	docs,
	models::NewDocument,
	retrieval::{self, HybridArgs, KeywordArgs, VectorArgs},
};
use forage_testkit::TestDatabase;

fn doc(title: &str, content: &str, embedding: Option<Vec<f32>>) -> NewDocument {
	let now = OffsetDateTime::now_utc();

	NewDocument {
		id: Uuid::new_v4(),
		title: title.to_string(),
		content: content.to_string(),
		metadata: json!({}),
		embedding,
		created_at: now,
		updated_at: now,
	}
}

#[test]
#[ignore = "Requires external Postgres. Set FORAGE_PG_DSN to run."]
fn schema_bootstraps_and_is_idempotent() {
	let Some(base_dsn) = forage_testkit::env_dsn() else {
		eprintln!("Skipping schema_bootstraps_and_is_idempotent; set FORAGE_PG_DSN to run this test.");

		return;
	};
	let rt = Runtime::new().expect("Failed to build runtime.");

	rt.block_on(async {
		let test_db =
			TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
		let cfg = Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 1 };
		let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

		db.ensure_schema(3).await.expect("Failed to ensure schema.");
		db.ensure_schema(3).await.expect("Failed to ensure schema twice.");

		let tables: i64 = sqlx::query_scalar(
			"SELECT count(*) FROM information_schema.tables WHERE table_name = 'documents'",
		)
		.fetch_one(&db.pool)
		.await
		.expect("Failed to query schema tables.");

		assert_eq!(tables, 1);

		let embedding_columns: i64 = sqlx::query_scalar(
			"\
SELECT count(*)
FROM information_schema.columns
WHERE table_name = 'documents' AND column_name = 'embedding'",
		)
		.fetch_one(&db.pool)
		.await
		.expect("Failed to query schema columns.");

		assert_eq!(embedding_columns, 1);

		test_db.cleanup().await.expect("Failed to cleanup test database.");
	});
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set FORAGE_PG_DSN to run."]
async fn hybrid_ranks_title_matches_before_content_and_vector() {
	let Some(base_dsn) = forage_testkit::env_dsn() else {
		eprintln!(
			"Skipping hybrid_ranks_title_matches_before_content_and_vector; set FORAGE_PG_DSN to run this test."
		);

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let cfg = Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 1 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema(3).await.expect("Failed to ensure schema.");

	let title_doc =
		doc("Quarterly Report 2024", "totals only", Some(vec![0.0, 1.0, 0.0]));
	let content_doc = doc("Misc notes", "the quarterly numbers", Some(vec![0.0, 0.0, 1.0]));
	let vector_doc = doc("Unrelated", "nothing lexical here", Some(vec![1.0, 0.0, 0.0]));

	for seeded in [&title_doc, &content_doc, &vector_doc] {
		docs::insert_document(&db.pool, seeded).await.expect("Failed to insert document.");
	}

	let terms = vec!["quarterly".to_string()];
	let rows = retrieval::hybrid(&db.pool, HybridArgs {
		embedding: &[1.0, 0.0, 0.0],
		terms: &terms,
		base_floor: -0.2,
		title_weight: 0.5,
		content_weight: 0.3,
		limit: 10,
	})
	.await
	.expect("Failed to run hybrid retrieval.");

	assert_eq!(
		rows.iter().map(|row| row.id).collect::<Vec<_>>(),
		vec![title_doc.id, content_doc.id, vector_doc.id],
	);
	assert_eq!(rows[0].priority, 1);
	assert_eq!(rows[1].priority, 2);
	assert_eq!(rows[2].priority, 3);
	assert!((rows[0].boost - 0.5).abs() < 1e-6, "title boost was {}", rows[0].boost);
	assert!((rows[1].boost - 0.3).abs() < 1e-6, "content boost was {}", rows[1].boost);
	assert!((rows[2].boost).abs() < 1e-6, "vector boost was {}", rows[2].boost);
	assert!((rows[2].base_similarity - 1.0).abs() < 1e-3);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set FORAGE_PG_DSN to run."]
async fn hybrid_floor_excludes_rows_without_lexical_matches() {
	let Some(base_dsn) = forage_testkit::env_dsn() else {
		eprintln!(
			"Skipping hybrid_floor_excludes_rows_without_lexical_matches; set FORAGE_PG_DSN to run this test."
		);

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let cfg = Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 1 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema(3).await.expect("Failed to ensure schema.");

	let near = doc("Close", "semantically close", Some(vec![1.0, 0.0, 0.0]));
	let far = doc("Far", "orthogonal", Some(vec![0.0, 1.0, 0.0]));

	for seeded in [&near, &far] {
		docs::insert_document(&db.pool, seeded).await.expect("Failed to insert document.");
	}

	let rows = retrieval::hybrid(&db.pool, HybridArgs {
		embedding: &[1.0, 0.0, 0.0],
		terms: &[],
		base_floor: 0.1,
		title_weight: 0.5,
		content_weight: 0.3,
		limit: 10,
	})
	.await
	.expect("Failed to run hybrid retrieval.");

	assert_eq!(rows.iter().map(|row| row.id).collect::<Vec<_>>(), vec![near.id]);
	assert_eq!(rows[0].priority, 3);
	assert!((rows[0].boost).abs() < 1e-6);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set FORAGE_PG_DSN to run."]
async fn keyword_prefers_title_matches_then_recency() {
	let Some(base_dsn) = forage_testkit::env_dsn() else {
		eprintln!(
			"Skipping keyword_prefers_title_matches_then_recency; set FORAGE_PG_DSN to run this test."
		);

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let cfg = Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 1 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema(3).await.expect("Failed to ensure schema.");

	let old_title = NewDocument {
		updated_at: OffsetDateTime::now_utc() - Duration::days(2),
		..doc("Budget plan", "last year", None)
	};
	let new_title = doc("Budget review", "this year", None);
	let content_only = doc("Meeting notes", "the budget line moved", None);

	for seeded in [&old_title, &new_title, &content_only] {
		docs::insert_document(&db.pool, seeded).await.expect("Failed to insert document.");
	}

	let terms = vec!["budget".to_string()];
	let rows = retrieval::keyword(&db.pool, KeywordArgs {
		terms: &terms,
		placeholder_similarity: 0.5,
		limit: 10,
	})
	.await
	.expect("Failed to run keyword retrieval.");

	assert_eq!(
		rows.iter().map(|row| row.id).collect::<Vec<_>>(),
		vec![new_title.id, old_title.id, content_only.id],
	);
	assert!(rows.iter().all(|row| (row.base_similarity - 0.5).abs() < 1e-6));
	assert_eq!(rows[0].priority, 1);
	assert_eq!(rows[2].priority, 2);

	let empty = retrieval::keyword(&db.pool, KeywordArgs {
		terms: &[],
		placeholder_similarity: 0.5,
		limit: 10,
	})
	.await
	.expect("Failed to run keyword retrieval with no terms.");

	assert!(empty.is_empty());

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set FORAGE_PG_DSN to run."]
async fn keyword_treats_wildcards_literally() {
	let Some(base_dsn) = forage_testkit::env_dsn() else {
		eprintln!(
			"Skipping keyword_treats_wildcards_literally; set FORAGE_PG_DSN to run this test."
		);

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let cfg = Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 1 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema(3).await.expect("Failed to ensure schema.");

	let literal = doc("Progress: 100% done", "", None);
	let lookalike = doc("Progress: 100x done", "", None);

	for seeded in [&literal, &lookalike] {
		docs::insert_document(&db.pool, seeded).await.expect("Failed to insert document.");
	}

	let terms = vec!["100%".to_string()];
	let rows = retrieval::keyword(&db.pool, KeywordArgs {
		terms: &terms,
		placeholder_similarity: 0.5,
		limit: 10,
	})
	.await
	.expect("Failed to run keyword retrieval.");

	assert_eq!(rows.iter().map(|row| row.id).collect::<Vec<_>>(), vec![literal.id]);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set FORAGE_PG_DSN to run."]
async fn vector_applies_the_threshold_strictly() {
	let Some(base_dsn) = forage_testkit::env_dsn() else {
		eprintln!(
			"Skipping vector_applies_the_threshold_strictly; set FORAGE_PG_DSN to run this test."
		);

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let cfg = Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 1 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema(3).await.expect("Failed to ensure schema.");

	let exact = doc("Exact", "", Some(vec![1.0, 0.0, 0.0]));
	let close = doc("Close", "", Some(vec![1.0, 1.0, 0.0]));
	let orthogonal = doc("Orthogonal", "", Some(vec![0.0, 1.0, 0.0]));

	for seeded in [&exact, &close, &orthogonal] {
		docs::insert_document(&db.pool, seeded).await.expect("Failed to insert document.");
	}

	let query = [1.0, 0.0, 0.0];
	let strict = retrieval::vector(&db.pool, VectorArgs {
		embedding: &query,
		threshold: 0.9,
		limit: 10,
	})
	.await
	.expect("Failed to run vector retrieval.");

	assert_eq!(strict.iter().map(|row| row.id).collect::<Vec<_>>(), vec![exact.id]);

	let relaxed = retrieval::vector(&db.pool, VectorArgs {
		embedding: &query,
		threshold: 0.5,
		limit: 10,
	})
	.await
	.expect("Failed to run vector retrieval.");

	assert_eq!(relaxed.iter().map(|row| row.id).collect::<Vec<_>>(), vec![exact.id, close.id]);
	assert!((relaxed[1].base_similarity - 0.707).abs() < 1e-2);
	assert!(relaxed.iter().all(|row| row.priority == 3 && row.boost == 0.0));

	// An orthogonal embedding sits exactly at similarity 0 and must not clear a zero
	// threshold.
	let floor = retrieval::vector(&db.pool, VectorArgs {
		embedding: &query,
		threshold: 0.0,
		limit: 10,
	})
	.await
	.expect("Failed to run vector retrieval.");

	assert_eq!(floor.iter().map(|row| row.id).collect::<Vec<_>>(), vec![exact.id, close.id]);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set FORAGE_PG_DSN to run."]
async fn insert_and_count_documents() {
	let Some(base_dsn) = forage_testkit::env_dsn() else {
		eprintln!("Skipping insert_and_count_documents; set FORAGE_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let cfg = Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 1 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema(3).await.expect("Failed to ensure schema.");

	assert_eq!(docs::count_documents(&db.pool).await.expect("Failed to count."), 0);

	let with_embedding = doc("A", "a", Some(vec![1.0, 0.0, 0.0]));
	let without_embedding = doc("B", "b", None);

	for seeded in [&with_embedding, &without_embedding] {
		docs::insert_document(&db.pool, seeded).await.expect("Failed to insert document.");
	}

	assert_eq!(docs::count_documents(&db.pool).await.expect("Failed to count."), 2);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
