use sqlx::PgExecutor;
use time::OffsetDateTime;

use crate::{Result, counters, models::EmailQueueItem};

/// Moves up to `limit` due items of campaigns in `sending` state to `sending` and returns them in
/// queue order. Rows locked by another dispatcher are skipped.
pub async fn claim_pending<'e, E>(
	executor: E,
	limit: i64,
	now: OffsetDateTime,
) -> Result<Vec<EmailQueueItem>>
where
	E: PgExecutor<'e>,
{
	let mut items = sqlx::query_as::<_, EmailQueueItem>(
		"\
UPDATE email_queue
SET status = 'sending', updated_at = $2
WHERE id IN (
	SELECT q.id
	FROM email_queue q
	JOIN email_campaigns c ON c.id = q.campaign_id
	WHERE q.status = 'pending'
		AND c.status = 'sending'
		AND q.scheduled_at <= $2
	ORDER BY q.scheduled_at ASC, q.id ASC
	LIMIT $1
	FOR UPDATE OF q SKIP LOCKED
)
RETURNING *",
	)
	.bind(limit)
	.bind(now)
	.fetch_all(executor)
	.await?;

	items.sort_by_key(|item| item.id);

	Ok(items)
}

/// Returns items stuck in `sending` since before `stale_before` to `pending`.
pub async fn release_stale<'e, E>(executor: E, stale_before: OffsetDateTime) -> Result<u64>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
UPDATE email_queue
SET status = 'pending', updated_at = now()
WHERE status = 'sending' AND updated_at < $1",
	)
	.bind(stale_before)
	.execute(executor)
	.await?;

	Ok(result.rows_affected())
}

/// Pushes the lease of a claimed item forward. Returns false when the item is no longer in
/// `sending`, i.e. it was released or finished elsewhere.
pub async fn renew_lease<'e, E>(executor: E, item_id: i64, now: OffsetDateTime) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result =
		sqlx::query("UPDATE email_queue SET updated_at = $2 WHERE id = $1 AND status = 'sending'")
			.bind(item_id)
			.bind(now)
			.execute(executor)
			.await?;

	Ok(result.rows_affected() == 1)
}

pub async fn mark_sent<'e, E>(executor: E, item_id: i64, now: OffsetDateTime) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
UPDATE email_queue
SET
	status = 'sent',
	sent_at = $2,
	error_message = NULL,
	attempts = attempts + 1,
	updated_at = $2
WHERE id = $1",
	)
	.bind(item_id)
	.bind(now)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn mark_failed<'e, E>(
	executor: E,
	item_id: i64,
	error: &str,
	now: OffsetDateTime,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
UPDATE email_queue
SET
	status = 'failed',
	error_message = $2,
	attempts = attempts + 1,
	updated_at = $3
WHERE id = $1",
	)
	.bind(item_id)
	.bind(error)
	.bind(now)
	.execute(executor)
	.await?;

	Ok(())
}

/// Number of queue items delivered since `since`, the basis of the daily quota.
pub async fn sent_since<'e, E>(executor: E, since: OffsetDateTime) -> Result<i64>
where
	E: PgExecutor<'e>,
{
	let count: i64 = sqlx::query_scalar(
		"SELECT count(*) FROM email_queue WHERE status = 'sent' AND sent_at >= $1",
	)
	.bind(since)
	.fetch_one(executor)
	.await?;

	Ok(count)
}

pub async fn refresh_counts<'e, E>(executor: E, campaign_id: i64, now: OffsetDateTime) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
UPDATE email_campaigns c
SET
	sent_count = (
		SELECT count(*) FROM email_queue q WHERE q.campaign_id = c.id AND q.status = 'sent'
	),
	failed_count = (
		SELECT count(*) FROM email_queue q WHERE q.campaign_id = c.id AND q.status = 'failed'
	),
	updated_at = $2
WHERE c.id = $1",
	)
	.bind(campaign_id)
	.bind(now)
	.execute(executor)
	.await?;

	Ok(())
}

/// Completes every `sending` campaign whose queue has drained and returns their ids.
pub async fn complete_drained<'e, E>(executor: E, now: OffsetDateTime) -> Result<Vec<i64>>
where
	E: PgExecutor<'e>,
{
	let ids: Vec<i64> = sqlx::query_scalar(
		"\
UPDATE email_campaigns c
SET
	status = 'completed',
	completed_at = $1,
	sent_count = (
		SELECT count(*) FROM email_queue q WHERE q.campaign_id = c.id AND q.status = 'sent'
	),
	failed_count = (
		SELECT count(*) FROM email_queue q WHERE q.campaign_id = c.id AND q.status = 'failed'
	),
	updated_at = $1
WHERE c.status = 'sending'
	AND NOT EXISTS (
		SELECT 1
		FROM email_queue q
		WHERE q.campaign_id = c.id AND q.status IN ('pending', 'sending')
	)
RETURNING c.id",
	)
	.bind(now)
	.fetch_all(executor)
	.await?;

	Ok(ids)
}

pub async fn insert_tracking<'e, E>(
	executor: E,
	email_queue_id: Option<i64>,
	lead_id: Option<i64>,
	tracking_id: &str,
	now: OffsetDateTime,
) -> Result<i64>
where
	E: PgExecutor<'e> + Copy,
{
	let id = counters::next_id(executor, "email_tracking").await?;

	sqlx::query(
		"\
INSERT INTO email_tracking (
	id,
	email_queue_id,
	lead_id,
	tracking_id,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $5)",
	)
	.bind(id)
	.bind(email_queue_id)
	.bind(lead_id)
	.bind(tracking_id)
	.bind(now)
	.execute(executor)
	.await?;

	Ok(id)
}

pub async fn is_blacklisted<'e, E>(executor: E, email: &str) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let exists: bool =
		sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM email_blacklist WHERE email = $1)")
			.bind(email.trim().to_lowercase())
			.fetch_one(executor)
			.await?;

	Ok(exists)
}
