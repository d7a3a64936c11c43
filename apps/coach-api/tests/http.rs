use std::sync::{Arc, Mutex};

use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use time::OffsetDateTime;
use tower::util::ServiceExt;

use coach_api::{routes, state::AppState};
use coach_config::{
	App, Campaigns, Config, Postgres, Security, Service, Signatures, Smtp, Storage, Stripe,
};
use coach_providers::{mailer::OutgoingEmail, stripe};
use coach_service::{BoxFuture, Mailer, Providers};
use coach_testkit::TestDatabase;

const ADMIN_TOKEN: &str = "admin-token";
const WEBHOOK_SECRET: &str = "whsec_test";

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
		stripe: Stripe { webhook_secret: Some(WEBHOOK_SECRET.to_string()), tolerance_seconds: 300 },
		security: Security {
			bind_localhost_only: true,
			admin_token: ADMIN_TOKEN.to_string(),
			session_secret: "session-secret".to_string(),
			unsubscribe_secret: "unsubscribe-secret".to_string(),
			session_ttl_hours: 24,
		},
		app: App {
			public_url: "https://coachdigital.test".to_string(),
			owner_email: "owner@coachdigital.test".to_string(),
			owner_name: "Coach Digital".to_string(),
		},
		campaigns: Campaigns::default(),
		signatures: Signatures::default(),
	}
}

async fn test_state() -> Option<(TestDatabase, AppState, Arc<RecordingMailer>)> {
	let base_dsn = match coach_testkit::env_dsn() {
		Some(value) => value,
		None => {
			eprintln!("Skipping HTTP tests; set COACH_PG_DSN to run this test.");

			return None;
		},
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let mailer = Arc::new(RecordingMailer::default());
	let state = AppState::with_providers(
		test_config(test_db.dsn().to_string()),
		Providers::new(mailer.clone()),
	)
	.await
	.expect("Failed to initialize app state.");

	Some((test_db, state, mailer))
}

async fn test_app() -> Option<(TestDatabase, Router, Arc<RecordingMailer>)> {
	let (test_db, state, mailer) = test_state().await?;

	Some((test_db, routes::router(state), mailer))
}

async fn rpc(app: &Router, path: &str, token: Option<&str>, input: Value) -> (StatusCode, Value) {
	let mut request = Request::builder()
		.method("POST")
		.uri(format!("/api/trpc/{path}"))
		.header(header::CONTENT_TYPE, "application/json");

	if let Some(token) = token {
		request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
	}

	let response = app
		.clone()
		.oneshot(request.body(Body::from(input.to_string())).expect("Failed to build request."))
		.await
		.expect("Failed to call procedure.");
	let status = response.status();
	let body = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");

	(status, serde_json::from_slice(&body).expect("Failed to parse response."))
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COACH_PG_DSN to run."]
async fn health_ok() {
	let Some((test_db, app, _)) = test_app().await else {
		return;
	};
	let response = app
		.oneshot(Request::builder().uri("/health").body(Body::empty()).expect("Failed to build request."))
		.await
		.expect("Failed to call /health.");

	assert_eq!(response.status(), StatusCode::OK);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COACH_PG_DSN to run."]
async fn admin_procedures_require_the_admin_token() {
	let Some((test_db, app, _)) = test_app().await else {
		return;
	};
	let (status, body) = rpc(&app, "clients.list", None, Value::Null).await;

	assert_eq!(status, StatusCode::UNAUTHORIZED);
	assert_eq!(body["error_code"], "UNAUTHORIZED");

	let (status, body) = rpc(&app, "admin.exportDatabase", Some("forged"), Value::Null).await;

	assert_eq!(status, StatusCode::FORBIDDEN);
	assert_eq!(body["message"], "Accès refusé : admin uniquement");

	let (status, body) = rpc(&app, "clients.list", Some(ADMIN_TOKEN), Value::Null).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body, json!({ "result": { "data": [] } }));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COACH_PG_DSN to run."]
async fn queries_accept_input_in_the_query_string() {
	let Some((test_db, app, _)) = test_app().await else {
		return;
	};
	let (status, created) = rpc(
		&app,
		"clients.create",
		Some(ADMIN_TOKEN),
		json!({ "firstName": "Léa", "lastName": "Martin", "email": "lea@example.test" }),
	)
	.await;

	assert_eq!(status, StatusCode::OK);

	let id = created["result"]["data"]["id"].as_i64().expect("Client id must be returned.");
	let response = app
		.oneshot(
			Request::builder()
				.uri(format!("/api/trpc/clients.getById?input=%7B%22id%22%3A{id}%7D"))
				.header(header::AUTHORIZATION, format!("Bearer {ADMIN_TOKEN}"))
				.body(Body::empty())
				.expect("Failed to build request."),
		)
		.await
		.expect("Failed to call clients.getById.");

	assert_eq!(response.status(), StatusCode::OK);

	let body = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");
	let json: Value = serde_json::from_slice(&body).expect("Failed to parse response.");

	assert_eq!(json["result"]["data"]["email"], "lea@example.test");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COACH_PG_DSN to run."]
async fn open_pixel_is_served_for_unknown_ids() {
	let Some((test_db, app, _)) = test_app().await else {
		return;
	};
	let response = app
		.oneshot(
			Request::builder()
				.uri("/api/track/open/unknown")
				.body(Body::empty())
				.expect("Failed to build request."),
		)
		.await
		.expect("Failed to call the open pixel.");

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(response.headers()[header::CONTENT_TYPE], "image/gif");
	assert_eq!(response.headers()[header::PRAGMA], "no-cache");

	let body = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");

	assert_eq!(body.as_ref(), routes::TRACKING_PIXEL.as_slice());

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COACH_PG_DSN to run."]
async fn paid_checkout_marks_the_invoice_paid() {
	let Some((test_db, app, mailer)) = test_app().await else {
		return;
	};
	let (_, client) = rpc(
		&app,
		"clients.create",
		Some(ADMIN_TOKEN),
		json!({ "firstName": "Léa", "lastName": "Martin" }),
	)
	.await;
	let client_id = client["result"]["data"]["id"].as_i64().expect("Client id must be returned.");
	let (status, invoice) = rpc(
		&app,
		"documents.create",
		Some(ADMIN_TOKEN),
		json!({
			"clientId": client_id,
			"type": "invoice",
			"date": "2026-03-01",
			"lines": [{ "description": "Coaching", "quantity": 1, "unitPriceHt": 100, "tvaRate": 20 }]
		}),
	)
	.await;

	assert_eq!(status, StatusCode::OK);

	let invoice_id =
		invoice["result"]["data"]["document"]["id"].as_i64().expect("Invoice id must be returned.");
	let payload = json!({
		"id": "evt_live_1",
		"type": "checkout.session.completed",
		"data": { "object": {
			"id": "cs_1",
			"payment_status": "paid",
			"payment_intent": "pi_1",
			"metadata": { "invoice_id": invoice_id.to_string() }
		} }
	})
	.to_string();
	let signature = stripe::signature_header(
		payload.as_bytes(),
		WEBHOOK_SECRET,
		OffsetDateTime::now_utc().unix_timestamp(),
	)
	.expect("Failed to sign payload.");
	let response = app
		.clone()
		.oneshot(
			Request::builder()
				.method("POST")
				.uri("/api/stripe/webhook")
				.header("stripe-signature", signature)
				.body(Body::from(payload))
				.expect("Failed to build request."),
		)
		.await
		.expect("Failed to call the webhook.");

	assert_eq!(response.status(), StatusCode::OK);

	let (_, fetched) =
		rpc(&app, "documents.getById", Some(ADMIN_TOKEN), json!({ "id": invoice_id })).await;

	assert_eq!(fetched["result"]["data"]["document"]["status"], "paid");
	assert!(mailer.subjects().iter().any(|subject| subject.starts_with("💰 Paiement reçu")));

	let unsigned = app
		.oneshot(
			Request::builder()
				.method("POST")
				.uri("/api/stripe/webhook")
				.header("stripe-signature", "t=1,v1=00")
				.body(Body::from("{}"))
				.expect("Failed to build request."),
		)
		.await
		.expect("Failed to call the webhook.");

	assert_eq!(unsigned.status(), StatusCode::BAD_REQUEST);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

/// Creates a client with an active portal account and returns `(client_user_id, session_token)`.
async fn portal_login(app: &Router, email: &str) -> (i64, String) {
	let (_, client) = rpc(
		app,
		"clients.create",
		Some(ADMIN_TOKEN),
		json!({ "firstName": "Léa", "lastName": "Martin", "email": email }),
	)
	.await;
	let client_id = client["result"]["data"]["id"].as_i64().expect("Client id must be returned.");
	let (status, _) = rpc(
		app,
		"clientAuth.createClientUser",
		Some(ADMIN_TOKEN),
		json!({ "clientId": client_id, "email": email, "password": "correct horse" }),
	)
	.await;

	assert_eq!(status, StatusCode::OK);

	let (status, session) = rpc(
		app,
		"clientAuth.authenticate",
		None,
		json!({ "email": email, "password": "correct horse" }),
	)
	.await;

	assert_eq!(status, StatusCode::OK);

	let data = &session["result"]["data"];

	(
		data["id"].as_i64().expect("Portal user id must be returned."),
		data["sessionToken"].as_str().expect("Session token must be returned.").to_string(),
	)
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COACH_PG_DSN to run."]
async fn portal_users_only_mark_their_own_messages_read() {
	let Some((test_db, app, _)) = test_app().await else {
		return;
	};
	let (lea, lea_token) = portal_login(&app, "lea@example.test").await;
	let (_, bob_token) = portal_login(&app, "bob@example.test").await;
	let (_, sent) = rpc(
		&app,
		"messages.sendFromAdmin",
		Some(ADMIN_TOKEN),
		json!({ "recipientId": lea, "content": "Votre devis est prêt." }),
	)
	.await;
	let message_id =
		sent["result"]["data"]["messageId"].as_i64().expect("Message id must be returned.");
	let (status, _) =
		rpc(&app, "messages.markAsRead", Some(&bob_token), json!({ "id": message_id })).await;

	assert_eq!(status, StatusCode::NOT_FOUND);

	let (_, unread) = rpc(
		&app,
		"messages.countUnread",
		Some(ADMIN_TOKEN),
		json!({ "userId": lea, "userType": "client" }),
	)
	.await;

	assert_eq!(unread["result"]["data"]["count"], 1);

	let (status, _) =
		rpc(&app, "messages.markAsRead", Some(&lea_token), json!({ "id": message_id })).await;

	assert_eq!(status, StatusCode::OK);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set COACH_PG_DSN to run."]
async fn deactivated_portal_accounts_lose_access_immediately() {
	let Some((test_db, state, _)) = test_state().await else {
		return;
	};
	let app = routes::router(state.clone());
	let (lea, token) = portal_login(&app, "lea@example.test").await;
	let (status, _) = rpc(&app, "clientPortal.documents", Some(&token), Value::Null).await;

	assert_eq!(status, StatusCode::OK);

	sqlx::query("UPDATE client_users SET is_active = FALSE WHERE id = $1")
		.bind(lea)
		.execute(&state.service.db.pool)
		.await
		.expect("Failed to deactivate portal user.");

	for (path, input) in [
		("clientPortal.documents", Value::Null),
		("clientPortal.sendMessage", json!({ "content": "Bonjour" })),
		(
			"clientRequests.create",
			json!({ "requestType": "modification", "title": "Nouvelle page" }),
		),
		("messages.sendFromClient", json!({ "content": "Bonjour" })),
		("reviews.create", json!({ "rating": 5 })),
	] {
		let (status, body) = rpc(&app, path, Some(&token), input).await;

		assert_eq!(status, StatusCode::UNAUTHORIZED, "{path} must be refused.");
		assert_eq!(body["message"], "Session no longer valid");
	}

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
