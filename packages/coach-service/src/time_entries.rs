use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{ADMIN_USER_ID, CoachService, Error, IdRequest, Result, SuccessResponse};
use coach_domain::{
	status::{DayPeriod, Priority, TimeEntryStatus},
	timesheet::{self, ClientTimeStats, TimeFigures},
};
use coach_storage::{counters, models::TimeEntry};

const BILLABLE: &str = "billable";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntryFields {
	pub client_id: Option<i64>,
	pub project_id: Option<i64>,
	pub task_id: Option<i64>,
	pub title: Option<String>,
	pub description: Option<String>,
	#[serde(default, with = "coach_storage::date_serde::option")]
	pub date: Option<Date>,
	pub period: Option<DayPeriod>,
	/// `billable` or `non_billable`; sets `is_billable` when that field is absent.
	#[serde(rename = "type")]
	pub entry_type: Option<String>,
	pub duration: Option<i64>,
	pub hourly_rate: Option<f64>,
	pub priority: Option<Priority>,
	pub status: Option<TimeEntryStatus>,
	pub is_billable: Option<bool>,
}
impl TimeEntryFields {
	fn billable(&self) -> Option<bool> {
		self.is_billable.or_else(|| self.entry_type.as_deref().map(|kind| kind == BILLABLE))
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTimeEntryRequest {
	pub id: i64,
	#[serde(flatten)]
	pub fields: TimeEntryFields,
	#[serde(default, with = "coach_storage::time_serde::option")]
	pub start_time: Option<OffsetDateTime>,
	#[serde(default, with = "coach_storage::time_serde::option")]
	pub end_time: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DateRequest {
	#[serde(with = "coach_storage::date_serde")]
	pub date: Date,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeRequest {
	#[serde(with = "coach_storage::date_serde")]
	pub start_date: Date,
	#[serde(with = "coach_storage::date_serde")]
	pub end_date: Date,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CreateTimeEntryResponse {
	pub success: bool,
	pub id: i64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct StopTimerResponse {
	pub success: bool,
	pub duration: i64,
}

impl CoachService {
	pub async fn time_entries_list_by_date(&self, req: DateRequest) -> Result<Vec<TimeEntry>> {
		let entries = sqlx::query_as::<_, TimeEntry>(
			"SELECT * FROM time_entries WHERE user_id = $1 AND date = $2",
		)
		.bind(ADMIN_USER_ID)
		.bind(req.date)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(day_ordered(entries))
	}

	pub async fn time_entries_list_by_period(&self, req: DateRangeRequest) -> Result<Vec<TimeEntry>> {
		let entries = self.entries_between(req.start_date, req.end_date).await?;

		Ok(day_ordered(entries))
	}

	pub async fn time_entries_create(&self, req: TimeEntryFields) -> Result<CreateTimeEntryResponse> {
		let title = crate::require_text("title", req.title.as_deref())?;
		let Some(date) = req.date else {
			return Err(Error::invalid("date is required."));
		};
		let Some(period) = req.period else {
			return Err(Error::invalid("period is required."));
		};
		let now = OffsetDateTime::now_utc();
		let id = counters::next_id(&self.db.pool, "time_entries").await?;

		sqlx::query(
			"\
INSERT INTO time_entries (
	id,
	user_id,
	task_id,
	project_id,
	client_id,
	title,
	description,
	date,
	period,
	type,
	duration,
	hourly_rate,
	priority,
	status,
	is_billable,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $16)",
		)
		.bind(id)
		.bind(ADMIN_USER_ID)
		.bind(req.task_id)
		.bind(req.project_id)
		.bind(req.client_id)
		.bind(title)
		.bind(req.description.as_deref())
		.bind(date)
		.bind(period.as_str())
		.bind(crate::non_blank(req.entry_type.as_deref()))
		.bind(req.duration)
		.bind(req.hourly_rate)
		.bind(req.priority.map(Priority::as_str))
		.bind(req.status.unwrap_or(TimeEntryStatus::Planned).as_str())
		.bind(req.billable().unwrap_or(true))
		.bind(now)
		.execute(&self.db.pool)
		.await?;

		Ok(CreateTimeEntryResponse { success: true, id })
	}

	pub async fn time_entries_update(&self, req: UpdateTimeEntryRequest) -> Result<TimeEntry> {
		let fields = req.fields;

		if fields.title.as_deref().is_some_and(|title| title.trim().is_empty()) {
			return Err(Error::invalid("title is required."));
		}

		let entry = sqlx::query_as::<_, TimeEntry>(
			"\
UPDATE time_entries
SET
	client_id = COALESCE($3, client_id),
	project_id = COALESCE($4, project_id),
	task_id = COALESCE($5, task_id),
	title = COALESCE($6, title),
	description = COALESCE($7, description),
	date = COALESCE($8, date),
	period = COALESCE($9, period),
	type = COALESCE($10, type),
	duration = COALESCE($11, duration),
	hourly_rate = COALESCE($12, hourly_rate),
	priority = COALESCE($13, priority),
	status = COALESCE($14, status),
	is_billable = COALESCE($15, is_billable),
	start_time = COALESCE($16, start_time),
	end_time = COALESCE($17, end_time),
	updated_at = $18
WHERE id = $1 AND user_id = $2
RETURNING *",
		)
		.bind(req.id)
		.bind(ADMIN_USER_ID)
		.bind(fields.client_id)
		.bind(fields.project_id)
		.bind(fields.task_id)
		.bind(crate::non_blank(fields.title.as_deref()))
		.bind(fields.description.as_deref())
		.bind(fields.date)
		.bind(fields.period.map(DayPeriod::as_str))
		.bind(crate::non_blank(fields.entry_type.as_deref()))
		.bind(fields.duration)
		.bind(fields.hourly_rate)
		.bind(fields.priority.map(Priority::as_str))
		.bind(fields.status.map(TimeEntryStatus::as_str))
		.bind(fields.billable())
		.bind(req.start_time)
		.bind(req.end_time)
		.bind(OffsetDateTime::now_utc())
		.fetch_optional(&self.db.pool)
		.await?
		.ok_or_else(|| Error::not_found("Entry not found"))?;

		Ok(entry)
	}

	pub async fn time_entries_delete(&self, req: IdRequest) -> Result<SuccessResponse> {
		sqlx::query("DELETE FROM time_entries WHERE id = $1 AND user_id = $2")
			.bind(req.id)
			.bind(ADMIN_USER_ID)
			.execute(&self.db.pool)
			.await?;

		Ok(SuccessResponse::OK)
	}

	pub async fn time_entries_start_timer(&self, req: IdRequest) -> Result<TimeEntry> {
		let now = OffsetDateTime::now_utc();
		let entry = sqlx::query_as::<_, TimeEntry>(
			"\
UPDATE time_entries
SET start_time = $3, end_time = NULL, status = $4, updated_at = $3
WHERE id = $1 AND user_id = $2
RETURNING *",
		)
		.bind(req.id)
		.bind(ADMIN_USER_ID)
		.bind(now)
		.bind(TimeEntryStatus::InProgress.as_str())
		.fetch_optional(&self.db.pool)
		.await?
		.ok_or_else(|| Error::not_found("Entry not found"))?;

		Ok(entry)
	}

	/// Stops a running timer and stores the elapsed time in whole minutes.
	pub async fn time_entries_stop_timer(&self, req: IdRequest) -> Result<StopTimerResponse> {
		let start: Option<Option<OffsetDateTime>> =
			sqlx::query_scalar("SELECT start_time FROM time_entries WHERE id = $1 AND user_id = $2")
				.bind(req.id)
				.bind(ADMIN_USER_ID)
				.fetch_optional(&self.db.pool)
				.await?;
		let Some(start) = start.flatten() else {
			return Err(Error::invalid("Entry not found or timer not started"));
		};
		let now = OffsetDateTime::now_utc();
		let duration = timesheet::elapsed_minutes(start, now);

		sqlx::query(
			"\
UPDATE time_entries
SET end_time = $2, duration = $3, status = $4, updated_at = $2
WHERE id = $1",
		)
		.bind(req.id)
		.bind(now)
		.bind(duration)
		.bind(TimeEntryStatus::Completed.as_str())
		.execute(&self.db.pool)
		.await?;

		Ok(StopTimerResponse { success: true, duration })
	}

	pub async fn time_entries_stats_by_client(
		&self,
		req: DateRangeRequest,
	) -> Result<Vec<ClientTimeStats>> {
		let entries = self.entries_between(req.start_date, req.end_date).await?;
		let figures = entries.iter().map(figures).collect::<Vec<_>>();

		Ok(timesheet::stats_by_client(&figures))
	}

	pub(crate) async fn entries_between(&self, start: Date, end: Date) -> Result<Vec<TimeEntry>> {
		let entries = sqlx::query_as::<_, TimeEntry>(
			"SELECT * FROM time_entries WHERE user_id = $1 AND date BETWEEN $2 AND $3",
		)
		.bind(ADMIN_USER_ID)
		.bind(start)
		.bind(end)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(entries)
	}
}

pub(crate) fn figures(entry: &TimeEntry) -> TimeFigures {
	TimeFigures {
		client_id: entry.client_id,
		date: entry.date,
		period: DayPeriod::parse(&entry.period),
		title: entry.title.clone(),
		duration_minutes: entry.duration.unwrap_or(0),
		hourly_rate: entry.hourly_rate,
		is_billable: entry.is_billable,
		created_at: entry.created_at,
	}
}

/// Date, then morning, afternoon, evening and whole-day entries, then creation time.
fn day_ordered(mut entries: Vec<TimeEntry>) -> Vec<TimeEntry> {
	entries.sort_by(|a, b| {
		a.date
			.cmp(&b.date)
			.then_with(|| {
				timesheet::period_rank(DayPeriod::parse(&a.period))
					.cmp(&timesheet::period_rank(DayPeriod::parse(&b.period)))
			})
			.then_with(|| a.created_at.cmp(&b.created_at))
	});

	entries
}
