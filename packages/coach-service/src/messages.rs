use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{ADMIN_USER_ID, CoachService, Error, IdRequest, Result, SuccessResponse};
use coach_domain::status::UserType;
use coach_storage::{counters, models::Message};

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientUserScopedRequest {
	pub client_user_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendFromAdminRequest {
	pub recipient_id: i64,
	#[serde(default)]
	pub subject: Option<String>,
	pub content: String,
	#[serde(default)]
	pub client_id: Option<i64>,
	#[serde(default)]
	pub project_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendFromClientRequest {
	pub content: String,
	#[serde(default)]
	pub subject: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkConversationRequest {
	pub client_user_id: i64,
	pub user_type: UserType,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountUnreadRequest {
	pub user_id: i64,
	pub user_type: UserType,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
	pub success: bool,
	pub message_id: i64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CountResponse {
	pub count: i64,
}

/// One end of a message.
#[derive(Debug, Clone, Copy)]
struct Party {
	id: i64,
	kind: UserType,
}
impl Party {
	const ADMIN: Self = Self { id: ADMIN_USER_ID, kind: UserType::Admin };

	fn client(id: i64) -> Self {
		Self { id, kind: UserType::Client }
	}
}

struct NewMessage<'a> {
	sender: Party,
	recipient: Party,
	subject: Option<&'a str>,
	content: &'a str,
	client_id: Option<i64>,
	project_id: Option<i64>,
}

impl CoachService {
	pub async fn messages_list_for_admin(&self) -> Result<Vec<Message>> {
		self.messages_involving(Party::ADMIN).await
	}

	pub async fn messages_list_for_client(
		&self,
		req: ClientUserScopedRequest,
	) -> Result<Vec<Message>> {
		self.messages_involving(Party::client(req.client_user_id)).await
	}

	/// Messages between the admin and one portal user, oldest first.
	pub async fn messages_conversation(&self, req: ClientUserScopedRequest) -> Result<Vec<Message>> {
		let messages = sqlx::query_as::<_, Message>(
			"\
SELECT *
FROM messages
WHERE (
		sender_type = 'admin' AND sender_id = $1
		AND recipient_type = 'client' AND recipient_id = $2
	)
	OR (
		sender_type = 'client' AND sender_id = $2
		AND recipient_type = 'admin' AND recipient_id = $1
	)
ORDER BY created_at ASC, id ASC",
		)
		.bind(ADMIN_USER_ID)
		.bind(req.client_user_id)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(messages)
	}

	pub async fn messages_send_from_admin(
		&self,
		req: SendFromAdminRequest,
	) -> Result<SendMessageResponse> {
		let content = crate::require_text("content", Some(req.content.as_str()))?;

		self.insert_message(NewMessage {
			sender: Party::ADMIN,
			recipient: Party::client(req.recipient_id),
			subject: crate::non_blank(req.subject.as_deref()),
			content,
			client_id: req.client_id,
			project_id: req.project_id,
		})
		.await
	}

	/// Sends as the portal user identified by the session.
	pub async fn messages_send_from_client(
		&self,
		client_user_id: i64,
		client_id: i64,
		req: SendFromClientRequest,
	) -> Result<SendMessageResponse> {
		let content = crate::require_text("content", Some(req.content.as_str()))?;

		self.insert_message(NewMessage {
			sender: Party::client(client_user_id),
			recipient: Party::ADMIN,
			subject: crate::non_blank(req.subject.as_deref()),
			content,
			client_id: Some(client_id),
			project_id: None,
		})
		.await
	}

	pub async fn messages_mark_as_read(&self, req: IdRequest) -> Result<SuccessResponse> {
		self.mark_message_read(req.id, None).await
	}

	/// Marks a message as read on behalf of a portal user. Only messages they received qualify.
	pub async fn messages_mark_received_as_read(
		&self,
		client_user_id: i64,
		req: IdRequest,
	) -> Result<SuccessResponse> {
		self.mark_message_read(req.id, Some(Party::client(client_user_id))).await
	}

	/// Marks as read the messages `user_type` received in the conversation with that client user.
	pub async fn messages_mark_conversation_as_read(
		&self,
		req: MarkConversationRequest,
	) -> Result<SuccessResponse> {
		let (reader, writer) = match req.user_type {
			UserType::Admin => (Party::ADMIN, Party::client(req.client_user_id)),
			UserType::Client => (Party::client(req.client_user_id), Party::ADMIN),
		};
		let now = OffsetDateTime::now_utc();

		sqlx::query(
			"\
UPDATE messages
SET is_read = TRUE, read_at = $5, updated_at = $5
WHERE recipient_id = $1
	AND recipient_type = $2
	AND sender_id = $3
	AND sender_type = $4
	AND NOT is_read",
		)
		.bind(reader.id)
		.bind(reader.kind.as_str())
		.bind(writer.id)
		.bind(writer.kind.as_str())
		.bind(now)
		.execute(&self.db.pool)
		.await?;

		Ok(SuccessResponse::OK)
	}

	pub async fn messages_count_unread(&self, req: CountUnreadRequest) -> Result<CountResponse> {
		let count: i64 = sqlx::query_scalar(
			"\
SELECT count(*)
FROM messages
WHERE recipient_id = $1 AND recipient_type = $2 AND NOT is_read",
		)
		.bind(req.user_id)
		.bind(req.user_type.as_str())
		.fetch_one(&self.db.pool)
		.await?;

		Ok(CountResponse { count })
	}

	async fn mark_message_read(&self, id: i64, reader: Option<Party>) -> Result<SuccessResponse> {
		let now = OffsetDateTime::now_utc();
		let updated = sqlx::query(
			"\
UPDATE messages
SET is_read = TRUE, read_at = COALESCE(read_at, $2), updated_at = $2
WHERE id = $1 AND ($3::bigint IS NULL OR (recipient_id = $3 AND recipient_type = $4))",
		)
		.bind(id)
		.bind(now)
		.bind(reader.map(|party| party.id))
		.bind(reader.map(|party| party.kind.as_str()))
		.execute(&self.db.pool)
		.await?
		.rows_affected();

		if updated == 0 {
			return Err(Error::not_found("Message not found"));
		}

		Ok(SuccessResponse::OK)
	}

	async fn messages_involving(&self, party: Party) -> Result<Vec<Message>> {
		let messages = sqlx::query_as::<_, Message>(
			"\
SELECT *
FROM messages
WHERE (sender_id = $1 AND sender_type = $2) OR (recipient_id = $1 AND recipient_type = $2)
ORDER BY created_at DESC, id DESC",
		)
		.bind(party.id)
		.bind(party.kind.as_str())
		.fetch_all(&self.db.pool)
		.await?;

		Ok(messages)
	}

	async fn insert_message(&self, message: NewMessage<'_>) -> Result<SendMessageResponse> {
		let now = OffsetDateTime::now_utc();
		let message_id = counters::next_id(&self.db.pool, "messages").await?;

		sqlx::query(
			"\
INSERT INTO messages (
	id,
	sender_id,
	sender_type,
	recipient_id,
	recipient_type,
	subject,
	content,
	client_id,
	project_id,
	is_read,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, FALSE, $10, $10)",
		)
		.bind(message_id)
		.bind(message.sender.id)
		.bind(message.sender.kind.as_str())
		.bind(message.recipient.id)
		.bind(message.recipient.kind.as_str())
		.bind(message.subject)
		.bind(message.content)
		.bind(message.client_id)
		.bind(message.project_id)
		.bind(now)
		.execute(&self.db.pool)
		.await?;

		Ok(SendMessageResponse { success: true, message_id })
	}
}
