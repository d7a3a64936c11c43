use serde::Serialize;
use time::OffsetDateTime;

use crate::{ADMIN_USER_ID, CoachService, IdRequest, Result, SuccessResponse};
use coach_storage::models::Notification;

const FEED_SIZE: i64 = 50;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct UnreadCount {
	pub count: i64,
}

impl CoachService {
	pub async fn notifications_list(&self) -> Result<Vec<Notification>> {
		let notifications = sqlx::query_as::<_, Notification>(
			"\
SELECT *
FROM notifications
WHERE user_id = $1
ORDER BY created_at DESC, id DESC
LIMIT $2",
		)
		.bind(ADMIN_USER_ID)
		.bind(FEED_SIZE)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(notifications)
	}

	pub async fn notifications_unread_count(&self) -> Result<UnreadCount> {
		let count: i64 = sqlx::query_scalar(
			"SELECT count(*) FROM notifications WHERE user_id = $1 AND NOT is_read",
		)
		.bind(ADMIN_USER_ID)
		.fetch_one(&self.db.pool)
		.await?;

		Ok(UnreadCount { count })
	}

	pub async fn notifications_mark_as_read(&self, req: IdRequest) -> Result<SuccessResponse> {
		sqlx::query("UPDATE notifications SET is_read = TRUE, updated_at = $2 WHERE id = $1")
			.bind(req.id)
			.bind(OffsetDateTime::now_utc())
			.execute(&self.db.pool)
			.await?;

		Ok(SuccessResponse::OK)
	}

	pub async fn notifications_mark_all_as_read(&self) -> Result<SuccessResponse> {
		sqlx::query(
			"UPDATE notifications SET is_read = TRUE, updated_at = $2 WHERE user_id = $1 AND NOT is_read",
		)
		.bind(ADMIN_USER_ID)
		.bind(OffsetDateTime::now_utc())
		.execute(&self.db.pool)
		.await?;

		Ok(SuccessResponse::OK)
	}

	pub async fn notifications_delete(&self, req: IdRequest) -> Result<SuccessResponse> {
		sqlx::query("DELETE FROM notifications WHERE id = $1")
			.bind(req.id)
			.execute(&self.db.pool)
			.await?;

		Ok(SuccessResponse::OK)
	}
}
