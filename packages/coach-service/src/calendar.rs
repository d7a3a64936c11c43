use serde::Deserialize;
use time::{Duration, OffsetDateTime};

use crate::{
	ADMIN_USER_ID, CoachService, Error, IdRequest, Result, SuccessResponse,
	projects::ClientScopedRequest, tasks::ProjectScopedRequest,
};
use coach_domain::{reminders::DEADLINE_HORIZON_DAYS, status::EventType};
use coach_storage::{counters, models::CalendarEvent};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEventFields {
	pub client_id: Option<i64>,
	pub project_id: Option<i64>,
	pub title: Option<String>,
	pub description: Option<String>,
	#[serde(default, with = "coach_storage::time_serde::option")]
	pub start_date: Option<OffsetDateTime>,
	#[serde(default, with = "coach_storage::time_serde::option")]
	pub end_date: Option<OffsetDateTime>,
	pub all_day: Option<bool>,
	#[serde(rename = "type")]
	pub event_type: Option<EventType>,
	pub location: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCalendarEventRequest {
	pub id: i64,
	#[serde(flatten)]
	pub fields: CalendarEventFields,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DateRangeRequest {
	#[serde(with = "coach_storage::time_serde")]
	pub start: OffsetDateTime,
	#[serde(with = "coach_storage::time_serde")]
	pub end: OffsetDateTime,
}

impl CoachService {
	pub async fn calendar_list(&self) -> Result<Vec<CalendarEvent>> {
		let events = sqlx::query_as::<_, CalendarEvent>(
			"SELECT * FROM calendar_events ORDER BY start_date ASC, id ASC",
		)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(events)
	}

	/// Events starting inside `[start, end]`.
	pub async fn calendar_get_by_date_range(
		&self,
		req: DateRangeRequest,
	) -> Result<Vec<CalendarEvent>> {
		self.events_starting_between(req.start, req.end, None).await
	}

	pub async fn calendar_get_by_client(
		&self,
		req: ClientScopedRequest,
	) -> Result<Vec<CalendarEvent>> {
		let events = sqlx::query_as::<_, CalendarEvent>(
			"SELECT * FROM calendar_events WHERE client_id = $1 ORDER BY start_date ASC, id ASC",
		)
		.bind(req.client_id)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(events)
	}

	pub async fn calendar_get_by_project(
		&self,
		req: ProjectScopedRequest,
	) -> Result<Vec<CalendarEvent>> {
		let events = sqlx::query_as::<_, CalendarEvent>(
			"SELECT * FROM calendar_events WHERE project_id = $1 ORDER BY start_date ASC, id ASC",
		)
		.bind(req.project_id)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(events)
	}

	pub async fn calendar_get(&self, req: IdRequest) -> Result<CalendarEvent> {
		let event = sqlx::query_as::<_, CalendarEvent>("SELECT * FROM calendar_events WHERE id = $1")
			.bind(req.id)
			.fetch_optional(&self.db.pool)
			.await?
			.ok_or_else(|| Error::not_found("Event not found"))?;

		Ok(event)
	}

	pub async fn calendar_create(&self, req: CalendarEventFields) -> Result<CalendarEvent> {
		let title = crate::require_text("title", req.title.as_deref())?;
		let Some(start_date) = req.start_date else {
			return Err(Error::invalid("startDate is required."));
		};
		let now = OffsetDateTime::now_utc();
		let id = counters::next_id(&self.db.pool, "calendar_events").await?;
		let event = sqlx::query_as::<_, CalendarEvent>(
			"\
INSERT INTO calendar_events (
	id,
	client_id,
	project_id,
	title,
	description,
	start_date,
	end_date,
	all_day,
	type,
	location,
	created_by_id,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
RETURNING *",
		)
		.bind(id)
		.bind(req.client_id)
		.bind(req.project_id)
		.bind(title)
		.bind(req.description.as_deref())
		.bind(start_date)
		.bind(req.end_date)
		.bind(req.all_day.unwrap_or(false))
		.bind(req.event_type.unwrap_or(EventType::Event).as_str())
		.bind(crate::non_blank(req.location.as_deref()))
		.bind(ADMIN_USER_ID)
		.bind(now)
		.fetch_one(&self.db.pool)
		.await?;

		Ok(event)
	}

	pub async fn calendar_update(&self, req: UpdateCalendarEventRequest) -> Result<CalendarEvent> {
		let fields = req.fields;
		let event = sqlx::query_as::<_, CalendarEvent>(
			"\
UPDATE calendar_events
SET
	client_id = COALESCE($2, client_id),
	project_id = COALESCE($3, project_id),
	title = COALESCE($4, title),
	description = COALESCE($5, description),
	start_date = COALESCE($6, start_date),
	end_date = COALESCE($7, end_date),
	all_day = COALESCE($8, all_day),
	type = COALESCE($9, type),
	location = COALESCE($10, location),
	updated_at = $11
WHERE id = $1
RETURNING *",
		)
		.bind(req.id)
		.bind(fields.client_id)
		.bind(fields.project_id)
		.bind(crate::non_blank(fields.title.as_deref()))
		.bind(fields.description.as_deref())
		.bind(fields.start_date)
		.bind(fields.end_date)
		.bind(fields.all_day)
		.bind(fields.event_type.map(EventType::as_str))
		.bind(fields.location.as_deref())
		.bind(OffsetDateTime::now_utc())
		.fetch_optional(&self.db.pool)
		.await?
		.ok_or_else(|| Error::not_found("Event not found"))?;

		Ok(event)
	}

	pub async fn calendar_delete(&self, req: IdRequest) -> Result<SuccessResponse> {
		sqlx::query("DELETE FROM calendar_events WHERE id = $1")
			.bind(req.id)
			.execute(&self.db.pool)
			.await?;

		Ok(SuccessResponse::OK)
	}

	pub async fn calendar_upcoming_deadlines(&self) -> Result<Vec<CalendarEvent>> {
		let now = OffsetDateTime::now_utc();

		self.events_starting_between(
			now,
			now + Duration::days(DEADLINE_HORIZON_DAYS),
			Some(EventType::Deadline),
		)
		.await
	}

	async fn events_starting_between(
		&self,
		start: OffsetDateTime,
		end: OffsetDateTime,
		kind: Option<EventType>,
	) -> Result<Vec<CalendarEvent>> {
		let events = sqlx::query_as::<_, CalendarEvent>(
			"\
SELECT *
FROM calendar_events
WHERE start_date >= $1 AND start_date <= $2 AND ($3::text IS NULL OR type = $3)
ORDER BY start_date ASC, id ASC",
		)
		.bind(start)
		.bind(end)
		.bind(kind.map(EventType::as_str))
		.fetch_all(&self.db.pool)
		.await?;

		Ok(events)
	}
}
