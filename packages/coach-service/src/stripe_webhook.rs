//! Stripe payment callbacks.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::{CoachService, Error, Result};
use coach_domain::{
	status::{DocumentStatus, DocumentType, NotificationType},
	template,
};
use coach_providers::stripe;
use coach_storage::{date_serde, documents as document_rows};

const TEST_EVENT_PREFIX: &str = "evt_test_";

/// The part of a Stripe event envelope the webhook reads.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
	pub id: String,
	#[serde(rename = "type")]
	pub event_type: String,
	pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
	pub object: Value,
}

#[derive(Debug, Clone, Deserialize)]
struct CheckoutSession {
	id: String,
	#[serde(default)]
	payment_status: Option<String>,
	#[serde(default)]
	payment_intent: Option<String>,
	#[serde(default)]
	metadata: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum WebhookAck {
	Verified { verified: bool },
	Received { received: bool },
}

impl CoachService {
	/// Checks the `stripe-signature` header and decodes the event. Every failure is a client error.
	pub fn stripe_verify_event(&self, payload: &[u8], signature: &str) -> Result<StripeEvent> {
		let Some(secret) = self.cfg.stripe.webhook_secret.as_deref() else {
			return Err(Error::invalid("Webhook secret is not configured"));
		};

		stripe::verify_signature(
			payload,
			signature,
			secret,
			self.cfg.stripe.tolerance_seconds,
			OffsetDateTime::now_utc().unix_timestamp(),
		)
		.map_err(|err| Error::invalid(err.to_string()))?;

		serde_json::from_slice(payload).map_err(|err| Error::invalid(err.to_string()))
	}

	pub async fn stripe_apply_event(&self, event: StripeEvent) -> Result<WebhookAck> {
		if event.id.starts_with(TEST_EVENT_PREFIX) {
			tracing::info!(event_id = %event.id, "Stripe test event verified.");

			return Ok(WebhookAck::Verified { verified: true });
		}

		tracing::info!(event_id = %event.id, event_type = %event.event_type, "Stripe event received.");

		match event.event_type.as_str() {
			"checkout.session.completed" => {
				let session: CheckoutSession = serde_json::from_value(event.data.object)
					.map_err(|err| Error::invalid(err.to_string()))?;

				self.complete_checkout(session).await?;
			},
			"payment_intent.succeeded" => {
				tracing::info!(payment_intent = ?object_id(&event.data.object), "Payment intent succeeded.");
			},
			"payment_intent.payment_failed" => {
				tracing::warn!(payment_intent = ?object_id(&event.data.object), "Payment intent failed.");
			},
			other => {
				tracing::info!(event_type = %other, "Unhandled Stripe event type.");
			},
		}

		Ok(WebhookAck::Received { received: true })
	}

	/// Marks the invoice named in the session metadata as paid. Sessions that do not point at a
	/// paid invoice are logged and ignored.
	async fn complete_checkout(&self, session: CheckoutSession) -> Result<()> {
		let Some(invoice_id) = invoice_id(session.metadata.as_ref()) else {
			tracing::warn!(session_id = %session.id, "Checkout session has no usable invoice_id.");

			return Ok(());
		};
		let Some(invoice) = document_rows::fetch_document(&self.db.pool, invoice_id).await? else {
			tracing::warn!(invoice_id, "Checkout session points at a missing invoice.");

			return Ok(());
		};

		if DocumentType::parse(&invoice.doc_type) != Some(DocumentType::Invoice) {
			tracing::warn!(invoice_id, "Checkout session points at a document that is not an invoice.");

			return Ok(());
		}
		if session.payment_status.as_deref() != Some("paid") {
			tracing::info!(
				invoice_id,
				payment_status = ?session.payment_status,
				"Checkout session not paid yet."
			);

			return Ok(());
		}

		let now = OffsetDateTime::now_utc();

		sqlx::query(
			"\
UPDATE documents
SET
	status = $2,
	stripe_payment_intent_id = $3,
	stripe_checkout_session_id = $4,
	paid_at = $5,
	updated_at = $5
WHERE id = $1",
		)
		.bind(invoice.id)
		.bind(DocumentStatus::Paid.as_str())
		.bind(session.payment_intent.as_deref())
		.bind(&session.id)
		.bind(now)
		.execute(&self.db.pool)
		.await?;

		tracing::info!(invoice_id, number = %invoice.number, "Invoice marked as paid.");

		let client_name = self.client_display_name(invoice.client_id).await;
		let subject = format!("💰 Paiement reçu - Facture {}", invoice.number);
		let html = format!(
			"<h2>💰 Paiement reçu</h2>\
<p><strong>Client :</strong> {}</p>\
<p><strong>Facture :</strong> {}</p>\
<p><strong>Montant :</strong> {:.2} €</p>\
<p><strong>Date :</strong> {}</p>\
<p>Le paiement a été effectué via Stripe et la facture a été marquée comme payée.</p>",
			template::escape_html(&client_name),
			invoice.number,
			invoice.total_ttc,
			date_serde::format_fr(now.date()),
		);

		self.email_owner(subject.clone(), html).await;
		self.push_notification(
			"Paiement reçu",
			&format!("Facture {} payée par {client_name}", invoice.number),
			NotificationType::Success,
			Some(&format!("/documents/{}", invoice.id)),
		)
		.await;

		Ok(())
	}
}

/// `metadata.invoice_id`, sent by Stripe as a string.
fn invoice_id(metadata: Option<&Value>) -> Option<i64> {
	match metadata?.get("invoice_id")? {
		Value::String(raw) => raw.trim().parse().ok(),
		Value::Number(number) => number.as_i64(),
		_ => None,
	}
}

fn object_id(object: &Value) -> Option<&str> {
	object.get("id").and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn invoice_id_is_read_from_string_metadata() {
		assert_eq!(invoice_id(Some(&json!({ "invoice_id": "42" }))), Some(42));
		assert_eq!(invoice_id(Some(&json!({ "invoice_id": 7 }))), Some(7));
		assert_eq!(invoice_id(Some(&json!({ "invoice_id": "abc" }))), None);
		assert_eq!(invoice_id(Some(&json!({}))), None);
		assert_eq!(invoice_id(None), None);
	}

	#[test]
	fn acknowledgements_match_stripe_expectations() {
		assert_eq!(
			serde_json::to_value(WebhookAck::Received { received: true }).expect("Must serialize."),
			json!({ "received": true })
		);
		assert_eq!(
			serde_json::to_value(WebhookAck::Verified { verified: true }).expect("Must serialize."),
			json!({ "verified": true })
		);
	}

	#[test]
	fn events_decode_from_stripe_envelopes() {
		let event: StripeEvent = serde_json::from_value(json!({
			"id": "evt_1",
			"type": "checkout.session.completed",
			"data": { "object": { "id": "cs_1", "payment_status": "paid", "metadata": { "invoice_id": "3" } } }
		}))
		.expect("Must decode.");
		let session: CheckoutSession =
			serde_json::from_value(event.data.object).expect("Must decode session.");

		assert_eq!(event.event_type, "checkout.session.completed");
		assert_eq!(session.payment_status.as_deref(), Some("paid"));
		assert_eq!(invoice_id(session.metadata.as_ref()), Some(3));
	}
}
