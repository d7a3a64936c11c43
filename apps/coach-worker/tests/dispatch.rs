use std::sync::{Arc, Mutex};

use serde_json::json;

use coach_config::{
	App, Campaigns, Config, Postgres, Security, Service, Signatures, Smtp, Storage, Stripe,
};
use coach_providers::mailer::OutgoingEmail;
use coach_service::{BoxFuture, CoachService, Mailer, Providers};
use coach_storage::db::Db;
use coach_testkit::TestDatabase;
use coach_worker::worker::{self, WorkerState};

#[derive(Default)]
struct RecordingMailer {
	sent: Mutex<Vec<OutgoingEmail>>,
}
impl RecordingMailer {
	fn sent(&self) -> Vec<OutgoingEmail> {
		self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
	}
}
impl Mailer for RecordingMailer {
	fn send<'a>(
		&'a self,
		_cfg: &'a Smtp,
		email: &'a OutgoingEmail,
	) -> BoxFuture<'a, coach_providers::Result<()>> {
		if let Ok(mut sent) = self.sent.lock() {
			sent.push(email.clone());
		}

		Box::pin(async { Ok(()) })
	}

	fn check<'a>(&'a self, _cfg: &'a Smtp) -> BoxFuture<'a, coach_providers::Result<bool>> {
		Box::pin(async { Ok(true) })
	}
}

fn test_config(dsn: String, daily_limit: u32) -> Config {
	Config {
		service: Service { http_bind: "127.0.0.1:0".to_string(), log_level: "info".to_string() },
		storage: Storage { postgres: Postgres { dsn, pool_max_conns: 2 } },
		smtp: Smtp {
			host: "smtp.example.test".to_string(),
			port: 587,
			user: "coach".to_string(),
			password: None,
			from: "Coach Digital <hello@coachdigital.test>".to_string(),
		},
		stripe: Stripe::default(),
		security: Security {
			bind_localhost_only: true,
			admin_token: "admin-token".to_string(),
			session_secret: "session-secret".to_string(),
			unsubscribe_secret: "unsubscribe-secret".to_string(),
			session_ttl_hours: 24,
		},
		app: App {
			public_url: "https://coachdigital.test".to_string(),
			owner_email: "owner@coachdigital.test".to_string(),
			owner_name: "Coach Digital".to_string(),
		},
		campaigns: Campaigns { send_delay_ms: 0, daily_limit, poll_interval_ms: 10, batch_size: 5 },
		signatures: Signatures::default(),
	}
}

async fn setup(
	daily_limit: u32,
) -> Option<(TestDatabase, CoachService, WorkerState, Arc<RecordingMailer>)> {
	let base_dsn = coach_testkit::env_dsn()?;
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let cfg = test_config(test_db.dsn().to_string(), daily_limit);
	let db = Db::connect(&cfg.storage.postgres).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	let mailer = Arc::new(RecordingMailer::default());
	let providers = Providers::new(mailer.clone());
	let worker_db =
		Db::connect(&cfg.storage.postgres).await.expect("Failed to connect to Postgres.");
	let state = WorkerState { db: worker_db, cfg: cfg.clone(), providers: providers.clone() };
	let service = CoachService::with_providers(cfg, db, providers);

	Some((test_db, service, state, mailer))
}

async fn started_campaign(service: &CoachService, emails: &[&str]) -> i64 {
	for (idx, email) in emails.iter().enumerate() {
		service
			.leads_create(
				serde_json::from_value(json!({
					"firstName": format!("Lead{idx}"),
					"lastName": "Test",
					"email": email,
					"isActivated": true
				}))
				.expect("Lead input must deserialize."),
			)
			.await
			.expect("Failed to create lead.");
	}

	let created = service
		.campaigns_create(
			serde_json::from_value(json!({
				"name": "Printemps",
				"subject": "Bonjour {{firstName}}",
				"body": "Bonjour {{firstName}}"
			}))
			.expect("Campaign input must deserialize."),
		)
		.await
		.expect("Failed to create campaign.");

	service
		.campaigns_start(coach_service::IdRequest { id: created.campaign_id })
		.await
		.expect("Failed to start campaign.");

	created.campaign_id
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COACH_PG_DSN to run."]
async fn started_campaigns_are_sent_tracked_and_completed() {
	let Some((test_db, service, state, mailer)) = setup(100).await else {
		eprintln!("Skipping started_campaigns_are_sent_tracked_and_completed; set COACH_PG_DSN.");

		return;
	};
	let campaign_id = started_campaign(&service, &["ana@example.test", "bob@example.test"]).await;
	let report = worker::dispatch_once(&state).await.expect("Dispatch failed.");

	assert_eq!(report.sent, 2);
	assert_eq!(report.failed, 0);
	assert_eq!(report.completed, vec![campaign_id]);

	let sent = mailer.sent();

	assert_eq!(sent.len(), 2);

	for email in &sent {
		assert!(email.subject.starts_with("Bonjour Lead"));
		assert!(email.html.contains("https://coachdigital.test/api/track/open/"));
		assert!(email.html.contains(&format!(
			"https://coachdigital.test/unsubscribe/{}/",
			email.to.replace('@', "%40")
		)));
	}

	let tracked: i64 = sqlx::query_scalar("SELECT count(*) FROM email_tracking")
		.fetch_one(&state.db.pool)
		.await
		.expect("Failed to count tracking rows.");
	let campaign = service
		.campaigns_get(coach_service::IdRequest { id: campaign_id })
		.await
		.expect("Failed to load campaign.");

	assert_eq!(tracked, 2);
	assert_eq!(campaign.status, "completed");
	assert_eq!(campaign.sent_count, 2);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COACH_PG_DSN to run."]
async fn daily_quota_holds_back_the_rest_of_the_queue() {
	let Some((test_db, service, state, mailer)) = setup(1).await else {
		eprintln!("Skipping daily_quota_holds_back_the_rest_of_the_queue; set COACH_PG_DSN.");

		return;
	};
	let campaign_id = started_campaign(&service, &["ana@example.test", "bob@example.test"]).await;
	let first = worker::dispatch_once(&state).await.expect("Dispatch failed.");
	let second = worker::dispatch_once(&state).await.expect("Dispatch failed.");

	assert_eq!(first.sent, 1);
	assert!(first.completed.is_empty());
	assert_eq!(second.sent, 0);
	assert_eq!(mailer.sent().len(), 1);

	let pending: i64 = sqlx::query_scalar(
		"SELECT count(*) FROM email_queue WHERE campaign_id = $1 AND status = 'pending'",
	)
	.bind(campaign_id)
	.fetch_one(&state.db.pool)
	.await
	.expect("Failed to count pending items.");

	assert_eq!(pending, 1);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
