use std::{collections::BTreeSet, time::Duration as StdDuration};

use time::{Duration, OffsetDateTime, Time};
use tokio::time as tokio_time;

use crate::{Error, Result};
use coach_config::{Config, QUEUE_LEASE_SECONDS};
use coach_service::{Providers, email_tracking};
use coach_storage::{campaigns, db::Db, models::EmailQueueItem};

const MAX_ERROR_CHARS: usize = 1_024;

pub struct WorkerState {
	pub db: Db,
	pub cfg: Config,
	pub providers: Providers,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
	pub sent: u32,
	pub failed: u32,
	pub completed: Vec<i64>,
}
impl DispatchReport {
	fn is_idle(&self) -> bool {
		self.sent == 0 && self.failed == 0 && self.completed.is_empty()
	}
}

pub async fn run_worker(state: WorkerState) {
	let poll_interval = StdDuration::from_millis(state.cfg.campaigns.poll_interval_ms);

	loop {
		match dispatch_once(&state).await {
			Ok(report) if !report.is_idle() => {
				tracing::info!(
					sent = report.sent,
					failed = report.failed,
					completed = ?report.completed,
					"Campaign dispatch cycle finished."
				);
			},
			Ok(_) => {},
			Err(err) => tracing::error!(error = %err, "Campaign dispatch failed."),
		}

		tokio_time::sleep(poll_interval).await;
	}
}

/// One dispatch cycle: claim within the daily quota, send sequentially, then close drained
/// campaigns.
pub async fn dispatch_once(state: &WorkerState) -> Result<DispatchReport> {
	let pool = &state.db.pool;
	let now = OffsetDateTime::now_utc();
	let released =
		campaigns::release_stale(pool, now - Duration::seconds(QUEUE_LEASE_SECONDS as i64)).await?;

	if released > 0 {
		tracing::warn!(released, "Released stale campaign queue items.");
	}

	let mut report = DispatchReport::default();
	let sent_today = campaigns::sent_since(pool, start_of_day(now)).await?;
	let Some(limit) =
		claim_limit(state.cfg.campaigns.batch_size, state.cfg.campaigns.daily_limit, sent_today)
	else {
		tracing::debug!(sent_today, "Daily campaign quota reached.");

		return Ok(report);
	};
	let items = campaigns::claim_pending(pool, limit, now).await?;
	let delay = StdDuration::from_millis(state.cfg.campaigns.send_delay_ms);
	let mut touched = BTreeSet::new();

	for (idx, item) in items.iter().enumerate() {
		if idx > 0 {
			tokio_time::sleep(delay).await;
		}

		touched.insert(item.campaign_id);

		if !campaigns::renew_lease(pool, item.id, OffsetDateTime::now_utc()).await? {
			tracing::warn!(queue_item_id = item.id, "Campaign queue item lease lost; skipping.");

			continue;
		}

		match deliver(state, item).await {
			Ok(()) => {
				campaigns::mark_sent(pool, item.id, OffsetDateTime::now_utc()).await?;

				report.sent += 1;
			},
			Err(err) => {
				tracing::error!(
					error = %err,
					queue_item_id = item.id,
					campaign_id = item.campaign_id,
					"Campaign email failed."
				);

				campaigns::mark_failed(
					pool,
					item.id,
					&truncate_error(&err.to_string()),
					OffsetDateTime::now_utc(),
				)
				.await?;

				report.failed += 1;
			},
		}
	}

	let now = OffsetDateTime::now_utc();

	for campaign_id in touched {
		campaigns::refresh_counts(pool, campaign_id, now).await?;
	}

	report.completed = campaigns::complete_drained(pool, now).await?;

	for campaign_id in &report.completed {
		tracing::info!(campaign_id, "Campaign completed.");
	}

	Ok(report)
}

async fn deliver(state: &WorkerState, item: &EmailQueueItem) -> Result<()> {
	let pool = &state.db.pool;

	// Addresses can unsubscribe between queueing and sending.
	if campaigns::is_blacklisted(pool, &item.to_email).await? {
		return Err(Error::Message("Email blacklisted".to_string()));
	}

	let email = email_tracking::campaign_email(pool, &state.cfg, item, &item.to_email).await?;

	state.providers.mailer.send(&state.cfg.smtp, &email).await?;

	Ok(())
}

/// Items to claim this cycle, or `None` once the daily quota is used up.
fn claim_limit(batch_size: u32, daily_limit: u32, sent_today: i64) -> Option<i64> {
	let remaining = i64::from(daily_limit) - sent_today;

	(remaining > 0).then(|| remaining.min(i64::from(batch_size)))
}

fn start_of_day(now: OffsetDateTime) -> OffsetDateTime {
	now.replace_time(Time::MIDNIGHT)
}

fn truncate_error(message: &str) -> String {
	message.chars().take(MAX_ERROR_CHARS).collect()
}
