pub mod admin;
pub mod audiences;
pub mod blog;
pub mod calendar;
pub mod campaigns;
pub mod client_auth;
pub mod client_portal;
pub mod client_requests;
pub mod clients;
pub mod company;
pub mod dashboard;
pub mod document_templates;
pub mod document_tracking;
pub mod documents;
pub mod email_templates;
pub mod email_tracking;
pub mod export;
pub mod leads;
pub mod messages;
pub mod notes;
pub mod notifications;
pub mod project_notes;
pub mod project_variables;
pub mod projects;
pub mod reminders;
pub mod reviews;
pub mod signatures;
pub mod smtp;
pub mod stripe_webhook;
pub mod tasks;
pub mod time_entries;
pub mod time_invoice;

mod error;

pub use error::{Error, Result};

use std::{future::Future, pin::Pin, sync::Arc};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use coach_config::{Config, Smtp};
use coach_domain::status::NotificationType;
use coach_providers::mailer::{self, OutgoingEmail};
use coach_storage::{counters, db::Db};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The single back-office account. Time entries, calendar events, notifications and admin
/// messages all belong to it.
pub const ADMIN_USER_ID: i64 = 1;

pub trait Mailer
where
	Self: Send + Sync,
{
	fn send<'a>(
		&'a self,
		cfg: &'a Smtp,
		email: &'a OutgoingEmail,
	) -> BoxFuture<'a, coach_providers::Result<()>>;

	fn check<'a>(&'a self, cfg: &'a Smtp) -> BoxFuture<'a, coach_providers::Result<bool>>;
}

#[derive(Clone)]
pub struct Providers {
	pub mailer: Arc<dyn Mailer>,
}
impl Providers {
	pub fn new(mailer: Arc<dyn Mailer>) -> Self {
		Self { mailer }
	}
}
impl Default for Providers {
	fn default() -> Self {
		Self { mailer: Arc::new(DefaultProviders) }
	}
}

pub struct CoachService {
	pub cfg: Config,
	pub db: Db,
	pub providers: Providers,
}
impl CoachService {
	pub fn new(cfg: Config, db: Db) -> Self {
		Self { cfg, db, providers: Providers::default() }
	}

	pub fn with_providers(cfg: Config, db: Db, providers: Providers) -> Self {
		Self { cfg, db, providers }
	}

	pub(crate) async fn send_email(
		&self,
		to: &str,
		subject: impl Into<String>,
		html: impl Into<String>,
	) -> Result<()> {
		let email = OutgoingEmail { to: to.to_string(), subject: subject.into(), html: html.into() };

		self.providers.mailer.send(&self.cfg.smtp, &email).await?;

		Ok(())
	}

	/// Emails the business owner. Failures are logged and swallowed.
	pub(crate) async fn email_owner(&self, subject: String, html: String) {
		let owner = self.cfg.app.owner_email.clone();

		if let Err(err) = self.send_email(&owner, subject.as_str(), html).await {
			tracing::warn!(error = %err, %subject, "Owner notification email failed.");
		}
	}

	/// Adds an entry to the admin notification feed. Failures are logged and swallowed.
	pub(crate) async fn push_notification(
		&self,
		title: &str,
		message: &str,
		kind: NotificationType,
		link: Option<&str>,
	) {
		if let Err(err) = self.insert_notification(title, message, kind, link).await {
			tracing::warn!(error = %err, %title, "Failed to record notification.");
		}
	}

	async fn insert_notification(
		&self,
		title: &str,
		message: &str,
		kind: NotificationType,
		link: Option<&str>,
	) -> Result<i64> {
		let now = OffsetDateTime::now_utc();
		let id = counters::next_id(&self.db.pool, "notifications").await?;

		sqlx::query(
			"\
INSERT INTO notifications (id, user_id, title, message, type, is_read, link, created_at, updated_at)
VALUES ($1, $2, $3, $4, $5, FALSE, $6, $7, $7)",
		)
		.bind(id)
		.bind(ADMIN_USER_ID)
		.bind(title)
		.bind(message)
		.bind(kind.as_str())
		.bind(link)
		.bind(now)
		.execute(&self.db.pool)
		.await?;

		Ok(id)
	}
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct IdRequest {
	pub id: i64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SuccessResponse {
	pub success: bool,
}
impl SuccessResponse {
	pub const OK: Self = Self { success: true };
}

/// Soft outcome used by public endpoints that report failure in the body instead of an error.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
	pub success: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}
impl Outcome {
	pub fn ok() -> Self {
		Self { success: true, error: None }
	}

	pub fn failed(error: &str) -> Self {
		Self { success: false, error: Some(error.to_string()) }
	}
}

struct DefaultProviders;

impl Mailer for DefaultProviders {
	fn send<'a>(
		&'a self,
		cfg: &'a Smtp,
		email: &'a OutgoingEmail,
	) -> BoxFuture<'a, coach_providers::Result<()>> {
		Box::pin(mailer::send(cfg, email))
	}

	fn check<'a>(&'a self, cfg: &'a Smtp) -> BoxFuture<'a, coach_providers::Result<bool>> {
		Box::pin(mailer::check(cfg))
	}
}

/// `%query%` for ILIKE, with the pattern metacharacters escaped.
pub(crate) fn like_pattern(query: &str) -> String {
	let mut out = String::with_capacity(query.len() + 2);

	out.push('%');

	for c in query.trim().chars() {
		if matches!(c, '%' | '_' | '\\') {
			out.push('\\');
		}

		out.push(c);
	}

	out.push('%');

	out
}

pub(crate) fn require_text<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str> {
	match value.map(str::trim) {
		Some(value) if !value.is_empty() => Ok(value),
		_ => Err(Error::invalid(format!("{field} is required."))),
	}
}

/// Empty strings count as absent so optional text inputs can be cleared from forms.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
	value.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn like_patterns_escape_metacharacters() {
		assert_eq!(like_pattern(" Léa "), "%Léa%");
		assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
	}

	#[test]
	fn required_text_rejects_blank_values() {
		assert_eq!(require_text("title", Some(" Atelier ")).expect("Must accept text."), "Atelier");
		assert!(require_text("title", Some("  ")).is_err());
		assert!(require_text("title", None).is_err());
		assert_eq!(non_blank(Some("")), None);
	}
}
