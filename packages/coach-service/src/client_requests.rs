use serde::Deserialize;
use time::{Date, OffsetDateTime};

use crate::{CoachService, Error, IdRequest, Result, SuccessResponse, projects::ClientScopedRequest};
use coach_domain::status::{NotificationType, RequestPriority, RequestStatus};
use coach_storage::{counters, models::ClientRequest};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientRequestRequest {
	pub request_type: String,
	pub title: String,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub budget: Option<f64>,
	#[serde(default, with = "coach_storage::date_serde::option")]
	pub deadline: Option<Date>,
	#[serde(default)]
	pub priority: Option<RequestPriority>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClientRequestStatusRequest {
	pub id: i64,
	pub status: RequestStatus,
	#[serde(default)]
	pub admin_notes: Option<String>,
}

impl CoachService {
	pub async fn client_requests_list(&self) -> Result<Vec<ClientRequest>> {
		let requests = sqlx::query_as::<_, ClientRequest>(
			"SELECT * FROM client_requests ORDER BY created_at DESC, id DESC",
		)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(requests)
	}

	pub async fn client_requests_list_by_client(
		&self,
		req: ClientScopedRequest,
	) -> Result<Vec<ClientRequest>> {
		let requests = sqlx::query_as::<_, ClientRequest>(
			"SELECT * FROM client_requests WHERE client_id = $1 ORDER BY created_at DESC, id DESC",
		)
		.bind(req.client_id)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(requests)
	}

	/// Files a request on behalf of a portal client. New requests always start `pending`.
	pub async fn client_requests_create(
		&self,
		client_id: i64,
		req: CreateClientRequestRequest,
	) -> Result<ClientRequest> {
		let request_type = crate::require_text("requestType", Some(req.request_type.as_str()))?;
		let title = crate::require_text("title", Some(req.title.as_str()))?;
		let now = OffsetDateTime::now_utc();
		let id = counters::next_id(&self.db.pool, "client_requests").await?;
		let request = sqlx::query_as::<_, ClientRequest>(
			"\
INSERT INTO client_requests (
	id,
	client_id,
	request_type,
	title,
	description,
	budget,
	deadline,
	priority,
	status,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
RETURNING *",
		)
		.bind(id)
		.bind(client_id)
		.bind(request_type)
		.bind(title)
		.bind(req.description.as_deref())
		.bind(req.budget)
		.bind(req.deadline)
		.bind(req.priority.unwrap_or(RequestPriority::Medium).as_str())
		.bind(RequestStatus::Pending.as_str())
		.bind(now)
		.fetch_one(&self.db.pool)
		.await?;

		self.push_notification(
			"Nouvelle demande client",
			&format!("Nouvelle demande : {}", request.title),
			NotificationType::Info,
			Some("/requests"),
		)
		.await;

		Ok(request)
	}

	pub async fn client_requests_update_status(
		&self,
		req: UpdateClientRequestStatusRequest,
	) -> Result<ClientRequest> {
		let request = sqlx::query_as::<_, ClientRequest>(
			"\
UPDATE client_requests
SET status = $2, admin_notes = COALESCE($3, admin_notes), updated_at = $4
WHERE id = $1
RETURNING *",
		)
		.bind(req.id)
		.bind(req.status.as_str())
		.bind(req.admin_notes.as_deref())
		.bind(OffsetDateTime::now_utc())
		.fetch_optional(&self.db.pool)
		.await?
		.ok_or_else(|| Error::not_found("Request not found"))?;

		Ok(request)
	}

	pub async fn client_requests_delete(&self, req: IdRequest) -> Result<SuccessResponse> {
		sqlx::query("DELETE FROM client_requests WHERE id = $1")
			.bind(req.id)
			.execute(&self.db.pool)
			.await?;

		Ok(SuccessResponse::OK)
	}
}
