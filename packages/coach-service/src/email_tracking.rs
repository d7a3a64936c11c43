use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use sqlx::PgPool;

use crate::{CoachService, Outcome, Result, SuccessResponse, campaigns::CampaignScopedRequest};
use coach_config::Config;
use coach_domain::template;
use coach_providers::{mailer::OutgoingEmail, tokens};
use coach_storage::{
	campaigns, counters,
	models::{BlacklistEntry, EmailQueueItem},
};

pub const UNSUBSCRIBE_REASON: &str = "Unsubscribed via email link";

const TRACKING_ID_BYTES: usize = 32;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTrackingRequest {
	#[serde(default)]
	pub email_queue_id: Option<i64>,
	#[serde(default)]
	pub lead_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTrackingResponse {
	pub tracking_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackEventRequest {
	pub tracking_id: String,
	#[serde(default)]
	pub user_agent: Option<String>,
	#[serde(default)]
	pub ip_address: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignStats {
	pub total_sent: i64,
	pub total_opened: i64,
	pub total_clicked: i64,
	pub open_rate: f64,
	pub click_rate: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlacklistRequest {
	pub email: String,
	#[serde(default)]
	pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailRequest {
	pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnsubscribeRequest {
	pub email: String,
	pub token: String,
}

#[derive(Clone, Copy)]
enum TrackedEvent {
	Open,
	Click,
}

impl CoachService {
	pub async fn email_tracking_create(
		&self,
		req: CreateTrackingRequest,
	) -> Result<CreateTrackingResponse> {
		let tracking_id = tokens::random_hex(TRACKING_ID_BYTES);

		campaigns::insert_tracking(
			&self.db.pool,
			req.email_queue_id,
			req.lead_id,
			&tracking_id,
			OffsetDateTime::now_utc(),
		)
		.await?;

		Ok(CreateTrackingResponse { tracking_id })
	}

	pub async fn email_tracking_track_open(&self, req: TrackEventRequest) -> Result<Outcome> {
		self.record_tracked_event(req, TrackedEvent::Open).await
	}

	pub async fn email_tracking_track_click(&self, req: TrackEventRequest) -> Result<Outcome> {
		self.record_tracked_event(req, TrackedEvent::Click).await
	}

	pub async fn email_tracking_campaign_stats(
		&self,
		req: CampaignScopedRequest,
	) -> Result<CampaignStats> {
		let (total_sent, total_opened, total_clicked): (i64, i64, i64) = sqlx::query_as(
			"\
SELECT
	count(*) FILTER (WHERE q.status = 'sent'),
	count(*) FILTER (WHERE q.status = 'sent' AND t.opened),
	count(*) FILTER (WHERE q.status = 'sent' AND t.clicked)
FROM email_queue q
LEFT JOIN email_tracking t ON t.email_queue_id = q.id
WHERE q.campaign_id = $1",
		)
		.bind(req.campaign_id)
		.fetch_one(&self.db.pool)
		.await?;

		Ok(campaign_stats(total_sent, total_opened, total_clicked))
	}

	pub async fn email_tracking_add_to_blacklist(&self, req: BlacklistRequest) -> Result<Outcome> {
		let email = crate::require_text("email", Some(req.email.as_str()))?;

		if campaigns::is_blacklisted(&self.db.pool, email).await? {
			return Ok(Outcome::failed("Email already blacklisted"));
		}

		self.insert_blacklist(email, crate::non_blank(req.reason.as_deref())).await?;

		Ok(Outcome::ok())
	}

	pub async fn email_tracking_remove_from_blacklist(
		&self,
		req: EmailRequest,
	) -> Result<SuccessResponse> {
		sqlx::query("DELETE FROM email_blacklist WHERE email = $1")
			.bind(req.email.trim().to_lowercase())
			.execute(&self.db.pool)
			.await?;

		Ok(SuccessResponse::OK)
	}

	pub async fn email_tracking_list_blacklist(&self) -> Result<Vec<BlacklistEntry>> {
		let entries = sqlx::query_as::<_, BlacklistEntry>(
			"SELECT * FROM email_blacklist ORDER BY created_at DESC, id DESC",
		)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(entries)
	}

	pub async fn email_tracking_is_blacklisted(&self, req: EmailRequest) -> Result<bool> {
		Ok(campaigns::is_blacklisted(&self.db.pool, &req.email).await?)
	}

	/// Honors a signed unsubscribe link. An address that is already blacklisted still succeeds.
	pub async fn email_tracking_unsubscribe(&self, req: UnsubscribeRequest) -> Result<Outcome> {
		if !tokens::verify_unsubscribe_token(
			&self.cfg.security.unsubscribe_secret,
			&req.email,
			&req.token,
		) {
			return Ok(Outcome::failed("Invalid token"));
		}
		if !campaigns::is_blacklisted(&self.db.pool, &req.email).await? {
			self.insert_blacklist(req.email.trim(), Some(UNSUBSCRIBE_REASON)).await?;

			tracing::info!("Address unsubscribed.");
		}

		Ok(Outcome::ok())
	}

	async fn insert_blacklist(&self, email: &str, reason: Option<&str>) -> Result<()> {
		let now = OffsetDateTime::now_utc();
		let id = counters::next_id(&self.db.pool, "email_blacklist").await?;

		sqlx::query(
			"\
INSERT INTO email_blacklist (id, email, reason, unsubscribed_at, created_at)
VALUES ($1, $2, $3, $4, $4)
ON CONFLICT (email) DO NOTHING",
		)
		.bind(id)
		.bind(email.to_lowercase())
		.bind(reason)
		.bind(now)
		.execute(&self.db.pool)
		.await?;

		Ok(())
	}

	async fn record_tracked_event(&self, req: TrackEventRequest, event: TrackedEvent) -> Result<Outcome> {
		let sql = match event {
			TrackedEvent::Open => {
				"\
UPDATE email_tracking
SET
	opened = TRUE,
	opened_at = COALESCE(opened_at, $2),
	open_count = open_count + 1,
	user_agent = COALESCE($3, user_agent),
	ip_address = COALESCE($4, ip_address),
	updated_at = $2
WHERE tracking_id = $1"
			},
			TrackedEvent::Click => {
				"\
UPDATE email_tracking
SET
	clicked = TRUE,
	clicked_at = COALESCE(clicked_at, $2),
	click_count = click_count + 1,
	user_agent = COALESCE($3, user_agent),
	ip_address = COALESCE($4, ip_address),
	updated_at = $2
WHERE tracking_id = $1"
			},
		};
		let result = sqlx::query(sql)
			.bind(&req.tracking_id)
			.bind(OffsetDateTime::now_utc())
			.bind(crate::non_blank(req.user_agent.as_deref()))
			.bind(crate::non_blank(req.ip_address.as_deref()))
			.execute(&self.db.pool)
			.await?;

		if result.rows_affected() == 0 {
			return Ok(Outcome::failed("Tracking not found"));
		}

		Ok(Outcome::ok())
	}
}

/// Open and click rates are percentages of the sent items, zero when nothing was sent.
pub fn campaign_stats(total_sent: i64, total_opened: i64, total_clicked: i64) -> CampaignStats {
	let rate = |count: i64| {
		if total_sent == 0 { 0.0 } else { count as f64 / total_sent as f64 * 100.0 }
	};

	CampaignStats {
		total_sent,
		total_opened,
		total_clicked,
		open_rate: rate(total_opened),
		click_rate: rate(total_clicked),
	}
}

/// Public unsubscribe URL embedded in campaign footers. The address is percent-encoded so
/// local parts holding `/`, `?`, `#` or `%` stay in their path segment.
pub fn unsubscribe_url(public_url: &str, secret: &str, email: &str) -> coach_providers::Result<String> {
	let token = tokens::unsubscribe_token(secret, email)?;

	Ok(format!("{public_url}/unsubscribe/{}/{token}", urlencoding::encode(email)))
}

/// Builds the message for one campaign queue item addressed to `to`: registers a tracking row,
/// then appends the open pixel and the unsubscribe footer to the queued body.
pub async fn campaign_email(
	pool: &PgPool,
	cfg: &Config,
	item: &EmailQueueItem,
	to: &str,
) -> Result<OutgoingEmail> {
	let tracking_id = tokens::random_hex(TRACKING_ID_BYTES);

	campaigns::insert_tracking(
		pool,
		Some(item.id),
		Some(item.lead_id),
		&tracking_id,
		OffsetDateTime::now_utc(),
	)
	.await?;

	let unsubscribe_url =
		unsubscribe_url(&cfg.app.public_url, &cfg.security.unsubscribe_secret, to)?;

	Ok(OutgoingEmail {
		to: to.to_string(),
		subject: item.subject.clone(),
		html: template::campaign_html(&item.body, &cfg.app.public_url, &tracking_id, &unsubscribe_url),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rates_are_percentages_of_sent() {
		let stats = campaign_stats(8, 2, 1);

		assert_eq!(stats.open_rate, 25.0);
		assert_eq!(stats.click_rate, 12.5);
		assert_eq!(campaign_stats(0, 0, 0).open_rate, 0.0);
	}

	#[test]
	fn unsubscribe_links_carry_a_verifiable_token() {
		let url = unsubscribe_url("https://coach.test", "s3cret", "lea@example.com")
			.expect("Token must be computed.");
		let token = url.rsplit('/').next().expect("URL must have segments.");

		assert!(url.starts_with("https://coach.test/unsubscribe/lea%40example.com/"));
		assert!(tokens::verify_unsubscribe_token("s3cret", "lea@example.com", token));
	}

	#[test]
	fn unsubscribe_links_keep_awkward_local_parts_in_one_segment() {
		let url = unsubscribe_url("https://coach.test", "s3cret", "a/b?c#d%e@example.com")
			.expect("Token must be computed.");
		let path = url.trim_start_matches("https://coach.test/");

		assert!(path.starts_with("unsubscribe/a%2Fb%3Fc%23d%25e%40example.com/"));
		assert_eq!(path.split('/').count(), 3);
		assert!(!path.contains(['?', '#']));
	}
}
