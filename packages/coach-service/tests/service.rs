use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use coach_config::{
	App, Campaigns, Config, Postgres, Security, Service, Signatures, Smtp, Storage, Stripe,
};
use coach_providers::mailer::OutgoingEmail;
use coach_service::{BoxFuture, CoachService, Error, IdRequest, Mailer, Providers};
use coach_storage::db::Db;
use coach_testkit::TestDatabase;

#[derive(Default)]
struct RecordingMailer {
	sent: Mutex<Vec<OutgoingEmail>>,
}
impl RecordingMailer {
	fn subjects(&self) -> Vec<String> {
		self.sent
			.lock()
			.map(|sent| sent.iter().map(|email| email.subject.clone()).collect())
			.unwrap_or_default()
	}

	fn recipients(&self) -> Vec<String> {
		self.sent
			.lock()
			.map(|sent| sent.iter().map(|email| email.to.clone()).collect())
			.unwrap_or_default()
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

fn test_config(dsn: String) -> Config {
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
		stripe: Stripe { webhook_secret: Some("whsec_test".to_string()), tolerance_seconds: 300 },
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
		campaigns: Campaigns { send_delay_ms: 0, daily_limit: 10, poll_interval_ms: 10, batch_size: 5 },
		signatures: Signatures { default_expiry_days: 7 },
	}
}

fn input<T>(value: Value) -> T
where
	T: DeserializeOwned,
{
	serde_json::from_value(value).expect("Test input must deserialize.")
}

async fn setup() -> Option<(TestDatabase, CoachService, Arc<RecordingMailer>)> {
	let base_dsn = coach_testkit::env_dsn()?;
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let cfg = test_config(test_db.dsn().to_string());
	let db = Db::connect(&cfg.storage.postgres).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	let mailer = Arc::new(RecordingMailer::default());
	let service = CoachService::with_providers(cfg, db, Providers::new(mailer.clone()));

	Some((test_db, service, mailer))
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COACH_PG_DSN to run."]
async fn client_crud_round_trip() {
	let Some((test_db, service, _)) = setup().await else {
		eprintln!("Skipping client_crud_round_trip; set COACH_PG_DSN.");

		return;
	};
	let created = service
		.clients_create(input(json!({ "firstName": "Léa", "lastName": "Martin", "email": "lea@example.test" })))
		.await
		.expect("Failed to create client.");

	assert_eq!(created.id, 1);
	assert_eq!(created.category, "prospect");
	assert_eq!(created.status, "active");
	assert_eq!(created.country.as_deref(), Some("France"));

	let updated = service
		.clients_update(input(json!({ "id": created.id, "company": "Atelier Martin" })))
		.await
		.expect("Failed to update client.");

	assert_eq!(updated.company.as_deref(), Some("Atelier Martin"));
	assert_eq!(updated.email.as_deref(), Some("lea@example.test"));

	let found = service
		.clients_search(input(json!({ "query": "atelier" })))
		.await
		.expect("Failed to search clients.");

	assert_eq!(found.len(), 1);

	service.clients_delete(IdRequest { id: created.id }).await.expect("Failed to delete client.");

	let err = service.clients_get(IdRequest { id: created.id }).await.expect_err("Must be gone.");

	assert!(matches!(err, Error::NotFound { .. }));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COACH_PG_DSN to run."]
async fn documents_are_numbered_and_totalled() {
	let Some((test_db, service, _)) = setup().await else {
		eprintln!("Skipping documents_are_numbered_and_totalled; set COACH_PG_DSN.");

		return;
	};
	let client = service
		.clients_create(input(json!({ "firstName": "Léa", "lastName": "Martin" })))
		.await
		.expect("Failed to create client.");
	let create = |date: &str| {
		input::<coach_service::documents::CreateDocumentRequest>(json!({
			"clientId": client.id,
			"type": "invoice",
			"date": date,
			"lines": [
				{ "description": "Coaching", "quantity": 2.0, "unitPriceHt": 150.0, "tvaRate": 20.0 },
				{ "description": "Audit", "quantity": 1.0, "unitPriceHt": 99.99, "tvaRate": 20.0 }
			]
		}))
	};
	let first = service.documents_create(create("2026-03-02")).await.expect("Failed to create.");
	let second = service.documents_create(create("2026-03-05")).await.expect("Failed to create.");

	assert_eq!(first.document.number, "FACT-2026-001");
	assert_eq!(second.document.number, "FACT-2026-002");
	assert_eq!(first.document.status, "draft");
	assert_eq!(first.document.total_ht, 399.99);
	assert_eq!(first.document.total_tva, 80.0);
	assert_eq!(first.document.total_ttc, 479.99);
	assert_eq!(first.lines.iter().map(|line| line.sort_order).collect::<Vec<_>>(), vec![1, 2]);

	let paid = service
		.documents_update_status(input(json!({ "id": first.document.id, "status": "paid" })))
		.await
		.expect("Failed to update status.");

	assert!(paid.paid_at.is_some());

	let stats = service.dashboard_stats().await.expect("Failed to load stats.");

	assert_eq!(stats.total_revenue, 479.99);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COACH_PG_DSN to run."]
async fn signing_a_quote_accepts_it_and_alerts_the_owner() {
	let Some((test_db, service, mailer)) = setup().await else {
		eprintln!("Skipping signing_a_quote_accepts_it_and_alerts_the_owner; set COACH_PG_DSN.");

		return;
	};
	let client = service
		.clients_create(input(json!({ "firstName": "Léa", "lastName": "Martin" })))
		.await
		.expect("Failed to create client.");
	let quote = service
		.documents_create(input(json!({
			"clientId": client.id,
			"type": "quote",
			"lines": [{ "description": "Site vitrine", "quantity": 1.0, "unitPriceHt": 1200.0 }]
		})))
		.await
		.expect("Failed to create quote.");
	let request = service
		.signatures_send_request(input(json!({
			"documentId": quote.document.id,
			"signerName": "Léa Martin",
			"signerEmail": "lea@example.test"
		})))
		.await
		.expect("Failed to send signature request.");

	assert!(request.signature_url.starts_with("https://coachdigital.test/sign/"));

	let token = request.signature_url.rsplit('/').next().expect("URL must carry a token.");

	service
		.signatures_sign(input(json!({ "token": token, "signatureData": "data:image/png;base64,AA==" })))
		.await
		.expect("Failed to sign.");

	let again = service
		.signatures_sign(input(json!({ "token": token, "signatureData": "data:image/png;base64,AA==" })))
		.await
		.expect_err("Second signature must be refused.");

	assert_eq!(again.message(), "Document déjà signé");

	let document = service
		.documents_get(IdRequest { id: quote.document.id })
		.await
		.expect("Failed to load quote.");

	assert_eq!(document.document.status, "accepted");
	assert!(mailer.recipients().contains(&"lea@example.test".to_string()));
	assert!(mailer.subjects().iter().any(|subject| subject.contains("signé par Léa Martin")));

	let unread = service.notifications_unread_count().await.expect("Failed to count.");

	assert_eq!(unread.count, 1);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COACH_PG_DSN to run."]
async fn campaigns_skip_blacklisted_and_unreachable_leads() {
	let Some((test_db, service, _)) = setup().await else {
		eprintln!("Skipping campaigns_skip_blacklisted_and_unreachable_leads; set COACH_PG_DSN.");

		return;
	};

	for lead in [
		json!({ "firstName": "Ana", "lastName": "Roy", "email": "ana@example.test", "isActivated": true }),
		json!({ "firstName": "Bob", "lastName": "Roy", "email": "BOB@example.test", "isActivated": true }),
		json!({ "firstName": "Cyd", "lastName": "Roy", "isActivated": true }),
	] {
		service.leads_create(input(lead)).await.expect("Failed to create lead.");
	}

	let outcome = service
		.email_tracking_add_to_blacklist(input(json!({ "email": "bob@example.test" })))
		.await
		.expect("Failed to blacklist.");

	assert!(outcome.success);

	let created = service
		.campaigns_create(input(json!({
			"name": "Rentrée",
			"subject": "Bonjour {{firstName}}",
			"body": "<p>Bonjour {{firstName}}</p>"
		})))
		.await
		.expect("Failed to create campaign.");

	assert_eq!(created.total_recipients, 1);

	let subjects: Vec<String> =
		sqlx::query_scalar("SELECT subject FROM email_queue WHERE campaign_id = $1")
			.bind(created.campaign_id)
			.fetch_all(&service.db.pool)
			.await
			.expect("Failed to read queue.");

	assert_eq!(subjects, vec!["Bonjour Ana".to_string()]);

	let duplicate = service
		.email_tracking_add_to_blacklist(input(json!({ "email": "bob@example.test" })))
		.await
		.expect("Failed to blacklist.");

	assert_eq!(duplicate.error.as_deref(), Some("Email already blacklisted"));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COACH_PG_DSN to run."]
async fn portal_accounts_log_in_after_accepting_an_invitation() {
	let Some((test_db, service, _)) = setup().await else {
		eprintln!("Skipping portal_accounts_log_in_after_accepting_an_invitation; set COACH_PG_DSN.");

		return;
	};
	let client = service
		.clients_create(input(json!({ "firstName": "Léa", "lastName": "Martin" })))
		.await
		.expect("Failed to create client.");
	let invitation = service
		.client_auth_generate_invitation_token(input(json!({
			"clientId": client.id,
			"email": "lea@example.test"
		})))
		.await
		.expect("Failed to invite.");

	assert_eq!(invitation.token.len(), 32);

	let inactive = service
		.client_auth_authenticate(input(json!({ "email": "lea@example.test", "password": "secret" })))
		.await
		.expect_err("Accounts without a password cannot log in.");

	assert_eq!(inactive.message(), "Invalid credentials");

	service
		.client_auth_accept_invitation(input(json!({
			"token": invitation.token,
			"password": "correct horse"
		})))
		.await
		.expect("Failed to accept invitation.");

	let session = service
		.client_auth_authenticate(input(json!({
			"email": "Lea@Example.test",
			"password": "correct horse"
		})))
		.await
		.expect("Failed to authenticate.");

	assert_eq!(session.client_id, client.id);

	let claims = coach_providers::tokens::verify_session(
		"session-secret",
		&session.session_token,
		time::OffsetDateTime::now_utc().unix_timestamp(),
	)
	.expect("Session token must verify.");
	let profile = service.client_portal_me(&claims).await.expect("Failed to load profile.");

	assert_eq!(profile.user.email, "lea@example.test");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

async fn create_client(service: &CoachService) -> i64 {
	service
		.clients_create(input(json!({ "firstName": "Léa", "lastName": "Martin" })))
		.await
		.expect("Failed to create client.")
		.id
}

async fn create_quote(service: &CoachService, client_id: i64) -> i64 {
	service
		.documents_create(input(json!({
			"clientId": client_id,
			"type": "quote",
			"lines": [{ "description": "Site vitrine", "quantity": 1.0, "unitPriceHt": 1200.0 }]
		})))
		.await
		.expect("Failed to create quote.")
		.document
		.id
}

async fn signature_token(service: &CoachService, document_id: i64) -> String {
	let request = service
		.signatures_send_request(input(json!({
			"documentId": document_id,
			"signerName": "Léa <Martin>",
			"signerEmail": "lea@example.test"
		})))
		.await
		.expect("Failed to send signature request.");

	request.signature_url.rsplit('/').next().expect("URL must carry a token.").to_string()
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COACH_PG_DSN to run."]
async fn task_completion_time_follows_the_done_status() {
	let Some((test_db, service, _)) = setup().await else {
		eprintln!("Skipping task_completion_time_follows_the_done_status; set COACH_PG_DSN.");

		return;
	};
	let task = service
		.tasks_create(input(json!({ "title": "Maquette" })))
		.await
		.expect("Failed to create task.");

	assert_eq!(task.status, "todo");
	assert!(task.completed_at.is_none());

	let done = service
		.tasks_update(input(json!({ "id": task.id, "status": "done" })))
		.await
		.expect("Failed to complete task.");
	let completed_at = done.completed_at.expect("Done tasks carry a completion time.");
	let renamed = service
		.tasks_update(input(json!({ "id": task.id, "title": "Maquette v2" })))
		.await
		.expect("Failed to rename task.");

	assert_eq!(renamed.completed_at, Some(completed_at));

	let reopened = service
		.tasks_update(input(json!({ "id": task.id, "status": "in_progress" })))
		.await
		.expect("Failed to reopen task.");

	assert!(reopened.completed_at.is_none());

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COACH_PG_DSN to run."]
async fn updating_lines_replaces_them_and_recomputes_totals() {
	let Some((test_db, service, _)) = setup().await else {
		eprintln!("Skipping updating_lines_replaces_them_and_recomputes_totals; set COACH_PG_DSN.");

		return;
	};
	let client_id = create_client(&service).await;
	let created = service
		.documents_create(input(json!({
			"clientId": client_id,
			"type": "invoice",
			"isAcompteRequired": true,
			"acomptePercentage": 30.0,
			"lines": [
				{ "description": "Coaching", "quantity": 2.0, "unitPriceHt": 150.0, "tvaRate": 20.0 },
				{ "description": "Audit", "quantity": 1.0, "unitPriceHt": 100.0, "tvaRate": 20.0 }
			]
		})))
		.await
		.expect("Failed to create invoice.");

	assert_eq!(created.lines.len(), 2);

	let updated = service
		.documents_update(input(json!({
			"id": created.document.id,
			"subject": "Accompagnement",
			"lines": [{ "description": "Forfait", "quantity": 1.0, "unitPriceHt": 500.0, "tvaRate": 10.0 }]
		})))
		.await
		.expect("Failed to update invoice.");

	assert_eq!(updated.lines.len(), 1);
	assert_eq!(updated.lines[0].description, "Forfait");
	assert_eq!(updated.lines[0].sort_order, 1);
	assert_eq!(updated.document.total_ht, 500.0);
	assert_eq!(updated.document.total_tva, 50.0);
	assert_eq!(updated.document.total_ttc, 550.0);
	assert_eq!(updated.document.acompte_amount, Some(165.0));
	assert_eq!(updated.document.subject.as_deref(), Some("Accompagnement"));

	let untouched = service
		.documents_update(input(json!({ "id": created.document.id, "notes": "Merci" })))
		.await
		.expect("Failed to update notes.");

	assert_eq!(untouched.lines.len(), 1);
	assert_eq!(untouched.document.total_ttc, 550.0);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COACH_PG_DSN to run."]
async fn deleted_documents_do_not_free_their_number() {
	let Some((test_db, service, _)) = setup().await else {
		eprintln!("Skipping deleted_documents_do_not_free_their_number; set COACH_PG_DSN.");

		return;
	};
	let client_id = create_client(&service).await;
	let create = || {
		input::<coach_service::documents::CreateDocumentRequest>(json!({
			"clientId": client_id,
			"type": "invoice",
			"date": "2026-04-01",
			"lines": [{ "description": "Coaching", "quantity": 1.0, "unitPriceHt": 90.0 }]
		}))
	};
	let first = service.documents_create(create()).await.expect("Failed to create.");
	let second = service.documents_create(create()).await.expect("Failed to create.");

	service
		.documents_delete(IdRequest { id: first.document.id })
		.await
		.expect("Failed to delete invoice.");

	let third = service.documents_create(create()).await.expect("Numbering must not collide.");

	assert_eq!(second.document.number, "FACT-2026-002");
	assert_eq!(third.document.number, "FACT-2026-003");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COACH_PG_DSN to run."]
async fn blog_slugs_are_unique_and_first_publication_is_kept() {
	let Some((test_db, service, _)) = setup().await else {
		eprintln!("Skipping blog_slugs_are_unique_and_first_publication_is_kept; set COACH_PG_DSN.");

		return;
	};
	let created = service
		.blog_create(input(json!({ "title": "Bien démarrer", "content": "..." })))
		.await
		.expect("Failed to create post.");

	assert_eq!(created.slug, "bien-demarrer");

	let duplicate = service
		.blog_create(input(json!({ "title": "Bien démarrer", "content": "Encore" })))
		.await
		.expect_err("Duplicate slugs must be refused.");

	assert!(matches!(duplicate, Error::Conflict { .. }));

	let draft = service.blog_get(IdRequest { id: created.id }).await.expect("Failed to load.");

	assert!(draft.published_at.is_none());

	let published = service
		.blog_update(input(json!({ "id": created.id, "status": "published" })))
		.await
		.expect("Failed to publish.");
	let first_published_at = published.published_at.expect("Publishing sets the date.");

	service
		.blog_update(input(json!({ "id": created.id, "status": "draft" })))
		.await
		.expect("Failed to unpublish.");

	let republished = service
		.blog_update(input(json!({ "id": created.id, "status": "published" })))
		.await
		.expect("Failed to republish.");

	assert_eq!(republished.published_at, Some(first_published_at));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COACH_PG_DSN to run."]
async fn deleting_an_audience_moves_its_leads_to_the_fallback() {
	let Some((test_db, service, _)) = setup().await else {
		eprintln!("Skipping deleting_an_audience_moves_its_leads_to_the_fallback; set COACH_PG_DSN.");

		return;
	};

	service
		.audiences_create(input(json!({ "name": "Général" })))
		.await
		.expect("Failed to create fallback audience.");

	let vip = service
		.audiences_create(input(json!({ "name": "VIP", "color": "#F59E0B" })))
		.await
		.expect("Failed to create audience.");
	let lead = service
		.leads_create(input(json!({ "firstName": "Ana", "lastName": "Roy", "audience": "VIP" })))
		.await
		.expect("Failed to create lead.");

	service.audiences_delete(IdRequest { id: vip.id }).await.expect("Failed to delete audience.");

	let moved = service.leads_get(IdRequest { id: lead.lead_id }).await.expect("Failed to load.");
	let active = service.audiences_list().await.expect("Failed to list audiences.");

	assert_eq!(moved.audience.as_deref(), Some("Général"));
	assert_eq!(active.iter().map(|audience| audience.name.as_str()).collect::<Vec<_>>(), vec![
		"Général"
	]);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COACH_PG_DSN to run."]
async fn converting_a_lead_creates_an_active_client() {
	let Some((test_db, service, _)) = setup().await else {
		eprintln!("Skipping converting_a_lead_creates_an_active_client; set COACH_PG_DSN.");

		return;
	};
	let lead = service
		.leads_create(input(json!({
			"firstName": "Ana",
			"lastName": "Roy",
			"email": "ana@example.test",
			"company": "Roy & Fils"
		})))
		.await
		.expect("Failed to create lead.");
	let converted = service
		.leads_convert_to_client(input(json!({ "leadId": lead.lead_id })))
		.await
		.expect("Failed to convert lead.");
	let client = service
		.clients_get(IdRequest { id: converted.client_id })
		.await
		.expect("Failed to load client.");
	let lead = service.leads_get(IdRequest { id: lead.lead_id }).await.expect("Failed to load.");

	assert_eq!(client.category, "active");
	assert_eq!(client.status, "active");
	assert_eq!(client.email.as_deref(), Some("ana@example.test"));
	assert_eq!(client.company.as_deref(), Some("Roy & Fils"));
	assert_eq!(client.country.as_deref(), Some("France"));
	assert_eq!(lead.converted_to_client_id, Some(converted.client_id));
	assert!(lead.converted_at.is_some());

	let missing = service
		.leads_convert_to_client(input(json!({ "leadId": 999 })))
		.await
		.expect_err("Unknown leads cannot be converted.");

	assert!(matches!(missing, Error::NotFound { .. }));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COACH_PG_DSN to run."]
async fn declining_a_quote_rejects_it_and_closes_the_link() {
	let Some((test_db, service, mailer)) = setup().await else {
		eprintln!("Skipping declining_a_quote_rejects_it_and_closes_the_link; set COACH_PG_DSN.");

		return;
	};
	let client_id = create_client(&service).await;
	let quote_id = create_quote(&service, client_id).await;
	let token = signature_token(&service, quote_id).await;

	service
		.signatures_decline(input(json!({ "token": token, "reason": "Budget <serré>" })))
		.await
		.expect("Failed to decline.");

	let document =
		service.documents_get(IdRequest { id: quote_id }).await.expect("Failed to load quote.");

	assert_eq!(document.document.status, "rejected");

	let sign = service
		.signatures_sign(input(json!({ "token": token, "signatureData": "data:image/png;base64,AA==" })))
		.await
		.expect_err("Declined links cannot be signed.");

	assert_eq!(sign.message(), "Document déjà signé");

	let alert = mailer
		.sent
		.lock()
		.expect("Mailer lock poisoned.")
		.iter()
		.find(|email| email.subject.contains("refusé"))
		.cloned()
		.expect("The owner must be alerted.");

	assert!(alert.html.contains("Budget &lt;serré&gt;"));
	assert!(alert.html.contains("Léa &lt;Martin&gt;"));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COACH_PG_DSN to run."]
async fn concurrent_sign_and_decline_settle_on_one_outcome() {
	let Some((test_db, service, _)) = setup().await else {
		eprintln!("Skipping concurrent_sign_and_decline_settle_on_one_outcome; set COACH_PG_DSN.");

		return;
	};
	let client_id = create_client(&service).await;
	let quote_id = create_quote(&service, client_id).await;
	let token = signature_token(&service, quote_id).await;
	let (signed, declined) = tokio::join!(
		service.signatures_sign(input(json!({
			"token": token,
			"signatureData": "data:image/png;base64,AA=="
		}))),
		service.signatures_decline(input(json!({ "token": token }))),
	);

	assert!(signed.is_ok() != declined.is_ok());

	let status = service
		.documents_get(IdRequest { id: quote_id })
		.await
		.expect("Failed to load quote.")
		.document
		.status;

	assert_eq!(status, if signed.is_ok() { "accepted" } else { "rejected" });

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COACH_PG_DSN to run."]
async fn stopping_a_timer_completes_the_entry() {
	let Some((test_db, service, _)) = setup().await else {
		eprintln!("Skipping stopping_a_timer_completes_the_entry; set COACH_PG_DSN.");

		return;
	};
	let created = service
		.time_entries_create(input(json!({
			"title": "Atelier",
			"date": "2026-03-02",
			"period": "morning"
		})))
		.await
		.expect("Failed to create entry.");
	let idle = service
		.time_entries_stop_timer(IdRequest { id: created.id })
		.await
		.expect_err("Timers that never started cannot stop.");

	assert_eq!(idle.message(), "Entry not found or timer not started");

	let running = service
		.time_entries_start_timer(IdRequest { id: created.id })
		.await
		.expect("Failed to start timer.");

	assert_eq!(running.status, "in_progress");

	let stopped = service
		.time_entries_stop_timer(IdRequest { id: created.id })
		.await
		.expect("Failed to stop timer.");
	let entries = service
		.time_entries_list_by_date(input(json!({ "date": "2026-03-02" })))
		.await
		.expect("Failed to list entries.");

	assert!(stopped.success);
	assert_eq!(stopped.duration, 0);
	assert_eq!(entries.len(), 1);
	assert_eq!(entries[0].status, "completed");
	assert_eq!(entries[0].duration, Some(0));
	assert!(entries[0].end_time.is_some());

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COACH_PG_DSN to run."]
async fn only_the_first_document_view_alerts_the_owner() {
	let Some((test_db, service, mailer)) = setup().await else {
		eprintln!("Skipping only_the_first_document_view_alerts_the_owner; set COACH_PG_DSN.");

		return;
	};
	let client_id = create_client(&service).await;
	let quote_id = create_quote(&service, client_id).await;
	let tracking = service
		.document_tracking_create(input(json!({ "documentId": quote_id })))
		.await
		.expect("Failed to create tracking link.");

	for user_agent in ["Firefox", "Safari"] {
		let view = service
			.document_tracking_record_view(input(json!({
				"token": tracking.tracking_token,
				"userAgent": user_agent
			})))
			.await
			.expect("Failed to record view.");

		assert_eq!(view.document_id, quote_id);
	}

	let stored = service
		.document_tracking_get_by_document(input(json!({ "documentId": quote_id })))
		.await
		.expect("Failed to load tracking.")
		.expect("Tracking row must exist.");
	let views = service
		.document_tracking_get_views(input(json!({ "documentId": quote_id })))
		.await
		.expect("Failed to load views.");
	let alerts = mailer.subjects().iter().filter(|subject| subject.contains("ouvert par")).count();
	let unread = service.notifications_unread_count().await.expect("Failed to count.");

	assert_eq!(stored.view_count, 2);
	assert_eq!(views.len(), 2);
	assert_eq!(alerts, 1);
	assert_eq!(unread.count, 1);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COACH_PG_DSN to run."]
async fn retrying_failed_items_skips_blacklisted_addresses() {
	let Some((test_db, service, mailer)) = setup().await else {
		eprintln!("Skipping retrying_failed_items_skips_blacklisted_addresses; set COACH_PG_DSN.");

		return;
	};

	for lead in [
		json!({ "firstName": "Ana", "lastName": "Roy", "email": "ana@example.test", "isActivated": true }),
		json!({ "firstName": "Bob", "lastName": "Roy", "email": "bob@example.test", "isActivated": true }),
	] {
		service.leads_create(input(lead)).await.expect("Failed to create lead.");
	}

	let created = service
		.campaigns_create(input(json!({
			"name": "Rentrée",
			"subject": "Bonjour {{firstName}}",
			"body": "<p>Bonjour {{firstName}}</p>"
		})))
		.await
		.expect("Failed to create campaign.");

	sqlx::query(
		"UPDATE email_queue SET status = 'failed', error_message = 'timeout' WHERE campaign_id = $1",
	)
	.bind(created.campaign_id)
	.execute(&service.db.pool)
	.await
	.expect("Failed to fail queue items.");

	service
		.email_tracking_add_to_blacklist(input(json!({ "email": "bob@example.test" })))
		.await
		.expect("Failed to blacklist.");

	let report = service
		.campaigns_retry_failed(input(json!({ "campaignId": created.campaign_id })))
		.await
		.expect("Failed to retry.");

	assert_eq!(report.total, 2);
	assert_eq!(report.success, 1);
	assert_eq!(report.failed, 1);

	let sent = mailer.sent.lock().expect("Mailer lock poisoned.").clone();

	assert_eq!(sent.len(), 1);
	assert_eq!(sent[0].to, "ana@example.test");
	assert!(sent[0].html.contains("https://coachdigital.test/api/track/open/"));
	assert!(sent[0].html.contains("https://coachdigital.test/unsubscribe/ana%40example.test/"));

	let statuses: Vec<(String, String, Option<String>)> = sqlx::query_as(
		"\
SELECT to_email, status, error_message
FROM email_queue
WHERE campaign_id = $1
ORDER BY to_email",
	)
	.bind(created.campaign_id)
	.fetch_all(&service.db.pool)
	.await
	.expect("Failed to read queue.");

	assert_eq!(statuses[0].1, "sent");
	assert_eq!(statuses[1].0, "bob@example.test");
	assert_eq!(statuses[1].1, "failed");
	assert_eq!(statuses[1].2.as_deref(), Some("Email blacklisted"));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COACH_PG_DSN to run."]
async fn a_new_default_template_demotes_the_previous_one() {
	let Some((test_db, service, _)) = setup().await else {
		eprintln!("Skipping a_new_default_template_demotes_the_previous_one; set COACH_PG_DSN.");

		return;
	};
	let first = service
		.document_templates_create(input(json!({
			"type": "invoice",
			"name": "Sobre",
			"primaryColor": "#1E40AF",
			"isDefault": true
		})))
		.await
		.expect("Failed to create template.");
	let second = service
		.document_templates_create(input(json!({
			"type": "invoice",
			"name": "Coloré",
			"companyEmail": "contact@coachdigital.test",
			"isDefault": true
		})))
		.await
		.expect("Failed to create template.");
	let quote = service
		.document_templates_create(input(json!({ "type": "quote", "name": "Devis", "isDefault": true })))
		.await
		.expect("Failed to create template.");
	let default = service
		.document_templates_get_default(input(json!({ "type": "invoice" })))
		.await
		.expect("Failed to load default.")
		.expect("A default invoice template must exist.");

	assert_eq!(default.id, second.id);

	service
		.document_templates_update(input(json!({ "id": first.id, "isDefault": true, "logoUrl": "" })))
		.await
		.expect("Failed to update template.");

	let invoices = service
		.document_templates_list(input(json!({ "type": "invoice" })))
		.await
		.expect("Failed to list templates.");
	let quote_default = service
		.document_templates_get_default(input(json!({ "type": "quote" })))
		.await
		.expect("Failed to load default.");

	assert_eq!(invoices.iter().filter(|template| template.is_default).count(), 1);
	assert_eq!(invoices[0].id, first.id);
	assert_eq!(quote_default.map(|template| template.id), Some(quote.id));

	let bad_color = service
		.document_templates_create(input(json!({
			"type": "quote",
			"name": "Rouge",
			"primaryColor": "red"
		})))
		.await
		.expect_err("Colors must be hex.");

	assert!(matches!(bad_color, Error::InvalidRequest { .. }));

	service
		.document_templates_delete(IdRequest { id: quote.id })
		.await
		.expect("Failed to delete template.");

	assert!(
		service
			.document_templates_get(IdRequest { id: quote.id })
			.await
			.expect("Failed to load template.")
			.is_none()
	);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COACH_PG_DSN to run."]
async fn project_notes_and_variables_are_scoped_to_their_project() {
	let Some((test_db, service, _)) = setup().await else {
		eprintln!(
			"Skipping project_notes_and_variables_are_scoped_to_their_project; set COACH_PG_DSN."
		);

		return;
	};
	let client_id = create_client(&service).await;
	let project = service
		.projects_create(input(json!({ "clientId": client_id, "name": "Site vitrine" })))
		.await
		.expect("Failed to create project.");
	let note = service
		.project_notes_create(input(json!({
			"projectId": project.id,
			"title": "Kickoff",
			"content": "Valider la charte.",
			"tags": "design"
		})))
		.await
		.expect("Failed to create note.");

	assert!(!note.is_pinned);

	let pinned = service
		.project_notes_update(input(json!({ "id": note.id, "isPinned": true, "tags": "" })))
		.await
		.expect("Failed to update note.");

	assert!(pinned.is_pinned);
	assert!(pinned.tags.is_none());
	assert_eq!(pinned.title, "Kickoff");

	let variable = service
		.project_variables_create(input(json!({
			"projectId": project.id,
			"name": "FTP_PASSWORD",
			"value": "hunter2",
			"type": "credential"
		})))
		.await
		.expect("Failed to create variable.");

	assert!(variable.is_secret);

	let scope = json!({ "projectId": project.id });
	let notes = service.project_notes_list(input(scope.clone())).await.expect("Failed to list.");
	let variables = service.project_variables_list(input(scope)).await.expect("Failed to list.");
	let other = service
		.project_variables_list(input(json!({ "projectId": project.id + 1 })))
		.await
		.expect("Failed to list.");

	assert_eq!(notes.len(), 1);
	assert_eq!(variables.len(), 1);
	assert!(other.is_empty());

	let missing = service
		.project_notes_update(input(json!({ "id": 999, "title": "x" })))
		.await
		.expect_err("Unknown notes cannot be updated.");

	assert!(matches!(missing, Error::NotFound { .. }));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
