use std::{collections::HashSet, time::Duration as StdDuration};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
	ADMIN_USER_ID, CoachService, Error, IdRequest, Result, SuccessResponse, email_tracking,
};
use coach_domain::{
	status::{CampaignStatus, LeadStatus, QueueStatus},
	template::{self, Recipient},
};
use coach_storage::{
	campaigns, counters,
	models::{EmailCampaign, EmailQueueItem, Lead},
};

const BLACKLISTED: &str = "Email blacklisted";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCampaignRequest {
	pub name: String,
	#[serde(default)]
	pub template_id: Option<i64>,
	pub subject: String,
	pub body: String,
	#[serde(default)]
	pub lead_ids: Option<Vec<i64>>,
	#[serde(default)]
	pub audience: Option<String>,
	#[serde(default)]
	pub statuses: Option<Vec<LeadStatus>>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignScopedRequest {
	pub campaign_id: i64,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCampaignResponse {
	pub success: bool,
	pub campaign_id: i64,
	pub total_recipients: i32,
}

/// A campaign with its queue counts taken live from the queue.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignSummary {
	#[serde(flatten)]
	pub campaign: EmailCampaign,
	pub pending_count: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RetryReport {
	pub total: i64,
	pub success: i64,
	pub failed: i64,
}

impl CoachService {
	pub async fn campaigns_list(&self) -> Result<Vec<CampaignSummary>> {
		let list = sqlx::query_as::<_, EmailCampaign>(
			"SELECT * FROM email_campaigns ORDER BY created_at DESC, id DESC",
		)
		.fetch_all(&self.db.pool)
		.await?;
		let counts: Vec<(i64, String, i64)> = sqlx::query_as(
			"SELECT campaign_id, status, count(*) FROM email_queue GROUP BY campaign_id, status",
		)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(list.into_iter().map(|campaign| summarize(campaign, &counts)).collect())
	}

	pub async fn campaigns_get(&self, req: IdRequest) -> Result<EmailCampaign> {
		self.find_campaign(req.id).await?.ok_or_else(|| Error::not_found("Campaign not found"))
	}

	/// Resolves recipients and queues one personalised message each. Leads without an address and
	/// blacklisted addresses are skipped.
	pub async fn campaigns_create(&self, req: CreateCampaignRequest) -> Result<CreateCampaignResponse> {
		let name = crate::require_text("name", Some(req.name.as_str()))?;
		let subject = crate::require_text("subject", Some(req.subject.as_str()))?;
		let body = crate::require_text("body", Some(req.body.as_str()))?;
		let leads = self.campaign_recipients(&req).await?;
		let blacklist: HashSet<String> =
			sqlx::query_scalar::<_, String>("SELECT email FROM email_blacklist")
				.fetch_all(&self.db.pool)
				.await?
				.into_iter()
				.collect();
		let recipients = leads
			.iter()
			.filter_map(|lead| {
				let email = crate::non_blank(lead.email.as_deref())?;

				(!blacklist.contains(&email.to_lowercase())).then_some((lead, email))
			})
			.collect::<Vec<_>>();
		let now = OffsetDateTime::now_utc();
		let total_recipients = recipients.len() as i32;
		let mut tx = self.db.pool.begin().await?;
		let campaign_id = counters::next_id(&mut *tx, "email_campaigns").await?;

		sqlx::query(
			"\
INSERT INTO email_campaigns (
	id,
	name,
	template_id,
	subject,
	body,
	status,
	total_recipients,
	sent_count,
	failed_count,
	created_by,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, 0, 0, $8, $9, $9)",
		)
		.bind(campaign_id)
		.bind(name)
		.bind(req.template_id)
		.bind(subject)
		.bind(body)
		.bind(CampaignStatus::Draft.as_str())
		.bind(total_recipients)
		.bind(ADMIN_USER_ID)
		.bind(now)
		.execute(&mut *tx)
		.await?;

		for (lead, email) in recipients {
			let recipient = Recipient {
				first_name: &lead.first_name,
				last_name: &lead.last_name,
				company: lead.company.as_deref(),
			};
			let item_id = counters::next_id(&mut *tx, "email_queue").await?;

			sqlx::query(
				"\
INSERT INTO email_queue (
	id,
	campaign_id,
	lead_id,
	to_email,
	subject,
	body,
	status,
	attempts,
	scheduled_at,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, $8, $8)",
			)
			.bind(item_id)
			.bind(campaign_id)
			.bind(lead.id)
			.bind(email)
			.bind(template::render(subject, recipient))
			.bind(template::html_body(&template::render_html(body, recipient)))
			.bind(QueueStatus::Pending.as_str())
			.bind(now)
			.execute(&mut *tx)
			.await?;
		}

		if let Some(template_id) = req.template_id {
			sqlx::query(
				"UPDATE email_templates SET usage_count = usage_count + 1, updated_at = $2 WHERE id = $1",
			)
			.bind(template_id)
			.bind(now)
			.execute(&mut *tx)
			.await?;
		}

		tx.commit().await?;

		tracing::info!(campaign_id, total_recipients, "Campaign queued.");

		Ok(CreateCampaignResponse { success: true, campaign_id, total_recipients })
	}

	pub async fn campaigns_start(&self, req: IdRequest) -> Result<EmailCampaign> {
		self.set_campaign_status(req.id, CampaignStatus::Sending).await
	}

	pub async fn campaigns_pause(&self, req: IdRequest) -> Result<EmailCampaign> {
		self.set_campaign_status(req.id, CampaignStatus::Paused).await
	}

	pub async fn campaigns_delete(&self, req: IdRequest) -> Result<SuccessResponse> {
		sqlx::query("DELETE FROM email_campaigns WHERE id = $1")
			.bind(req.id)
			.execute(&self.db.pool)
			.await?;

		Ok(SuccessResponse::OK)
	}

	/// Resends every failed item of a campaign, one at a time with the configured delay. Items
	/// whose address is now blacklisted stay failed.
	pub async fn campaigns_retry_failed(&self, req: CampaignScopedRequest) -> Result<RetryReport> {
		let failed = sqlx::query_as::<_, EmailQueueItem>(
			"SELECT * FROM email_queue WHERE campaign_id = $1 AND status = 'failed' ORDER BY id ASC",
		)
		.bind(req.campaign_id)
		.fetch_all(&self.db.pool)
		.await?;

		if failed.is_empty() {
			return Err(Error::invalid("Aucun email échoué à relancer"));
		}

		let delay = StdDuration::from_millis(self.cfg.campaigns.send_delay_ms);
		let mut report = RetryReport { total: failed.len() as i64, ..RetryReport::default() };

		for (idx, item) in failed.iter().enumerate() {
			if idx > 0 {
				tokio::time::sleep(delay).await;
			}

			let email: Option<Option<String>> =
				sqlx::query_scalar("SELECT email FROM leads WHERE id = $1")
					.bind(item.lead_id)
					.fetch_optional(&self.db.pool)
					.await?;
			let Some(email) = email.flatten().filter(|email| !email.trim().is_empty()) else {
				report.failed += 1;

				continue;
			};

			if campaigns::is_blacklisted(&self.db.pool, &email).await? {
				campaigns::mark_failed(
					&self.db.pool,
					item.id,
					BLACKLISTED,
					OffsetDateTime::now_utc(),
				)
				.await?;

				report.failed += 1;

				continue;
			}

			let message =
				email_tracking::campaign_email(&self.db.pool, &self.cfg, item, &email).await?;

			match self.providers.mailer.send(&self.cfg.smtp, &message).await.map_err(Error::from) {
				Ok(()) => {
					campaigns::mark_sent(&self.db.pool, item.id, OffsetDateTime::now_utc()).await?;

					report.success += 1;
				},
				Err(err) => {
					campaigns::mark_failed(
						&self.db.pool,
						item.id,
						err.message(),
						OffsetDateTime::now_utc(),
					)
					.await?;

					report.failed += 1;
				},
			}
		}

		campaigns::refresh_counts(&self.db.pool, req.campaign_id, OffsetDateTime::now_utc()).await?;

		tracing::info!(
			campaign_id = req.campaign_id,
			success = report.success,
			failed = report.failed,
			"Failed campaign emails retried."
		);

		Ok(report)
	}

	pub(crate) async fn find_campaign(&self, id: i64) -> Result<Option<EmailCampaign>> {
		let campaign = sqlx::query_as::<_, EmailCampaign>("SELECT * FROM email_campaigns WHERE id = $1")
			.bind(id)
			.fetch_optional(&self.db.pool)
			.await?;

		Ok(campaign)
	}

	async fn set_campaign_status(&self, id: i64, status: CampaignStatus) -> Result<EmailCampaign> {
		let campaign = sqlx::query_as::<_, EmailCampaign>(
			"UPDATE email_campaigns SET status = $2, updated_at = $3 WHERE id = $1 RETURNING *",
		)
		.bind(id)
		.bind(status.as_str())
		.bind(OffsetDateTime::now_utc())
		.fetch_optional(&self.db.pool)
		.await?
		.ok_or_else(|| Error::not_found("Campaign not found"))?;

		tracing::info!(campaign_id = id, status = %status, "Campaign status changed.");

		Ok(campaign)
	}

	async fn campaign_recipients(&self, req: &CreateCampaignRequest) -> Result<Vec<Lead>> {
		if let Some(ids) = req.lead_ids.as_ref().filter(|ids| !ids.is_empty()) {
			let leads = sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE id = ANY($1) ORDER BY id")
				.bind(ids)
				.fetch_all(&self.db.pool)
				.await?;

			return Ok(leads);
		}

		let statuses = req
			.statuses
			.as_ref()
			.filter(|statuses| !statuses.is_empty())
			.map(|statuses| statuses.iter().map(|status| status.as_str().to_string()).collect::<Vec<_>>());
		let leads = sqlx::query_as::<_, Lead>(
			"\
SELECT *
FROM leads
WHERE is_activated
	AND ($1::text IS NULL OR audience = $1)
	AND ($2::text[] IS NULL OR status = ANY($2))
ORDER BY id",
		)
		.bind(crate::non_blank(req.audience.as_deref()))
		.bind(statuses)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(leads)
	}
}

fn summarize(mut campaign: EmailCampaign, counts: &[(i64, String, i64)]) -> CampaignSummary {
	let count = |wanted: &[QueueStatus]| {
		counts
			.iter()
			.filter(|(campaign_id, status, _)| {
				*campaign_id == campaign.id
					&& QueueStatus::parse(status).map(|s| wanted.contains(&s)).unwrap_or(false)
			})
			.map(|(_, _, count)| *count)
			.sum::<i64>()
	};
	let sent = count(&[QueueStatus::Sent]);
	let failed = count(&[QueueStatus::Failed]);
	let pending_count = count(&[QueueStatus::Pending, QueueStatus::Sending]);

	campaign.sent_count = sent as i32;
	campaign.failed_count = failed as i32;

	CampaignSummary { campaign, pending_count }
}

#[cfg(test)]
mod tests {
	use super::*;

	fn campaign(id: i64) -> EmailCampaign {
		let now = OffsetDateTime::UNIX_EPOCH;

		EmailCampaign {
			id,
			name: "Voeux".to_string(),
			template_id: None,
			subject: "Bonne année".to_string(),
			body: "Corps".to_string(),
			status: "sending".to_string(),
			total_recipients: 5,
			sent_count: 0,
			failed_count: 0,
			created_by: ADMIN_USER_ID,
			completed_at: None,
			created_at: now,
			updated_at: now,
		}
	}

	#[test]
	fn summaries_count_the_queue_of_their_own_campaign() {
		let counts = vec![
			(1, "sent".to_string(), 2),
			(1, "failed".to_string(), 1),
			(1, "pending".to_string(), 1),
			(1, "sending".to_string(), 1),
			(2, "sent".to_string(), 7),
		];
		let summary = summarize(campaign(1), &counts);

		assert_eq!(summary.campaign.sent_count, 2);
		assert_eq!(summary.campaign.failed_count, 1);
		assert_eq!(summary.pending_count, 2);
	}
}
