use time::{Duration, OffsetDateTime};

use coach_config::Postgres;
use coach_storage::{campaigns, counters, db::Db, documents};
use coach_testkit::TestDatabase;

async fn connect(test_db: &TestDatabase) -> Db {
	let cfg = Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 2 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	db
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COACH_PG_DSN to run."]
async fn schema_is_idempotent_and_counters_are_per_collection() {
	let Some(base_dsn) = coach_testkit::env_dsn() else {
		eprintln!("Skipping schema_is_idempotent_and_counters_are_per_collection; set COACH_PG_DSN.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = connect(&test_db).await;

	db.ensure_schema().await.expect("Second schema pass must succeed.");

	let first = counters::next_id(&db.pool, "clients").await.expect("Failed to allocate id.");
	let second = counters::next_id(&db.pool, "clients").await.expect("Failed to allocate id.");
	let other = counters::next_id(&db.pool, "leads").await.expect("Failed to allocate id.");

	assert_eq!(first, 1);
	assert_eq!(second, 2);
	assert_eq!(other, 1);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COACH_PG_DSN to run."]
async fn last_number_follows_the_highest_suffix() {
	let Some(base_dsn) = coach_testkit::env_dsn() else {
		eprintln!("Skipping last_number_follows_the_highest_suffix; set COACH_PG_DSN.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = connect(&test_db).await;
	let now = OffsetDateTime::now_utc();

	for (id, number) in [(1_i64, "FACT-2026-002"), (2, "FACT-2026-007"), (3, "DEV-2026-011")] {
		sqlx::query(
			"\
INSERT INTO documents (id, client_id, type, number, status, date, created_at, updated_at)
VALUES ($1, 1, 'invoice', $2, 'draft', $3, $4, $4)",
		)
		.bind(id)
		.bind(number)
		.bind(now.date())
		.bind(now)
		.execute(&db.pool)
		.await
		.expect("Failed to insert document.");
	}

	let mut tx = db.pool.begin().await.expect("Failed to begin transaction.");
	let last = documents::last_number_with_prefix(&mut tx, "FACT-2026-")
		.await
		.expect("Failed to read the last number.");

	tx.commit().await.expect("Failed to commit.");

	assert_eq!(last, 7);

	let removed = documents::delete_lines(&db.pool, 1).await.expect("Failed to delete lines.");

	assert_eq!(removed, 0);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COACH_PG_DSN to run."]
async fn queue_claims_only_sending_campaigns_and_completes_drained_ones() {
	let Some(base_dsn) = coach_testkit::env_dsn() else {
		eprintln!(
			"Skipping queue_claims_only_sending_campaigns_and_completes_drained_ones; set COACH_PG_DSN."
		);

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = connect(&test_db).await;
	let now = OffsetDateTime::now_utc();

	for (id, status) in [(1_i64, "sending"), (2, "paused")] {
		sqlx::query(
			"\
INSERT INTO email_campaigns (id, name, subject, body, status, created_by, created_at, updated_at)
VALUES ($1, 'Campagne', 'Objet', 'Corps', $2, 1, $3, $3)",
		)
		.bind(id)
		.bind(status)
		.bind(now)
		.execute(&db.pool)
		.await
		.expect("Failed to insert campaign.");
	}
	for (id, campaign_id) in [(1_i64, 1_i64), (2, 1), (3, 2)] {
		sqlx::query(
			"\
INSERT INTO email_queue (
	id, campaign_id, lead_id, to_email, subject, body, status, scheduled_at, created_at, updated_at
)
VALUES ($1, $2, $1, 'lead@example.com', 'Objet', 'Corps', 'pending', $3, $3, $3)",
		)
		.bind(id)
		.bind(campaign_id)
		.bind(now - Duration::minutes(1))
		.execute(&db.pool)
		.await
		.expect("Failed to insert queue item.");
	}

	let claimed = campaigns::claim_pending(&db.pool, 10, now).await.expect("Failed to claim.");

	assert_eq!(claimed.iter().map(|item| item.id).collect::<Vec<_>>(), vec![1, 2]);
	assert!(claimed.iter().all(|item| item.status == "sending"));
	assert!(campaigns::complete_drained(&db.pool, now).await.expect("Complete failed.").is_empty());

	campaigns::mark_sent(&db.pool, 1, now).await.expect("Failed to mark sent.");
	campaigns::mark_failed(&db.pool, 2, "smtp down", now).await.expect("Failed to mark failed.");

	assert_eq!(campaigns::sent_since(&db.pool, now - Duration::hours(1)).await.expect("Count."), 1);

	let completed = campaigns::complete_drained(&db.pool, now).await.expect("Complete failed.");

	assert_eq!(completed, vec![1]);

	let (sent, failed): (i32, i32) =
		sqlx::query_as("SELECT sent_count, failed_count FROM email_campaigns WHERE id = 1")
			.fetch_one(&db.pool)
			.await
			.expect("Failed to read campaign.");

	assert_eq!((sent, failed), (1, 1));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COACH_PG_DSN to run."]
async fn renewed_leases_survive_stale_release_and_lost_ones_report_false() {
	let Some(base_dsn) = coach_testkit::env_dsn() else {
		eprintln!(
			"Skipping renewed_leases_survive_stale_release_and_lost_ones_report_false; set COACH_PG_DSN."
		);

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = connect(&test_db).await;
	let claimed_at = OffsetDateTime::now_utc() - Duration::minutes(30);

	sqlx::query(
		"\
INSERT INTO email_campaigns (id, name, subject, body, status, created_by, created_at, updated_at)
VALUES (1, 'Campagne', 'Objet', 'Corps', 'sending', 1, $1, $1)",
	)
	.bind(claimed_at)
	.execute(&db.pool)
	.await
	.expect("Failed to insert campaign.");

	for id in [1_i64, 2] {
		sqlx::query(
			"\
INSERT INTO email_queue (
	id, campaign_id, lead_id, to_email, subject, body, status, scheduled_at, created_at, updated_at
)
VALUES ($1, 1, $1, 'lead@example.com', 'Objet', 'Corps', 'sending', $2, $2, $2)",
		)
		.bind(id)
		.bind(claimed_at)
		.execute(&db.pool)
		.await
		.expect("Failed to insert queue item.");
	}

	let now = OffsetDateTime::now_utc();

	assert!(campaigns::renew_lease(&db.pool, 1, now).await.expect("Failed to renew."));

	let released = campaigns::release_stale(&db.pool, now - Duration::minutes(10))
		.await
		.expect("Failed to release.");

	assert_eq!(released, 1);
	assert!(!campaigns::renew_lease(&db.pool, 2, now).await.expect("Failed to renew."));

	let statuses: Vec<String> =
		sqlx::query_scalar("SELECT status FROM email_queue ORDER BY id")
			.fetch_all(&db.pool)
			.await
			.expect("Failed to read queue.");

	assert_eq!(statuses, vec!["sending".to_string(), "pending".to_string()]);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
