use serde::Deserialize;
use time::{Date, OffsetDateTime};

use crate::{CoachService, Error, IdRequest, Result, SuccessResponse};
use coach_domain::status::{DayPeriod, Priority, TaskStatus};
use coach_storage::{counters, models::Task};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFields {
	pub project_id: Option<i64>,
	pub client_id: Option<i64>,
	pub title: Option<String>,
	pub description: Option<String>,
	pub status: Option<TaskStatus>,
	pub priority: Option<Priority>,
	#[serde(default, with = "coach_storage::date_serde::option")]
	pub due_date: Option<Date>,
	pub period: Option<DayPeriod>,
	pub estimated_hours: Option<f64>,
	pub is_billable: Option<bool>,
	pub hourly_rate: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
	pub id: i64,
	#[serde(flatten)]
	pub fields: TaskFields,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectScopedRequest {
	pub project_id: i64,
}

impl CoachService {
	pub async fn tasks_list(&self) -> Result<Vec<Task>> {
		let tasks =
			sqlx::query_as::<_, Task>("SELECT * FROM tasks ORDER BY created_at DESC, id DESC")
				.fetch_all(&self.db.pool)
				.await?;

		Ok(tasks)
	}

	pub async fn tasks_list_by_project(&self, req: ProjectScopedRequest) -> Result<Vec<Task>> {
		let tasks = sqlx::query_as::<_, Task>(
			"SELECT * FROM tasks WHERE project_id = $1 ORDER BY created_at DESC, id DESC",
		)
		.bind(req.project_id)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(tasks)
	}

	pub async fn tasks_create(&self, req: TaskFields) -> Result<Task> {
		let title = crate::require_text("title", req.title.as_deref())?;
		let status = req.status.unwrap_or(TaskStatus::Todo);
		let now = OffsetDateTime::now_utc();
		let completed_at = (status == TaskStatus::Done).then_some(now);
		let id = counters::next_id(&self.db.pool, "tasks").await?;
		let task = sqlx::query_as::<_, Task>(
			"\
INSERT INTO tasks (
	id,
	project_id,
	client_id,
	title,
	description,
	status,
	priority,
	due_date,
	period,
	completed_at,
	estimated_hours,
	is_billable,
	hourly_rate,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $14)
RETURNING *",
		)
		.bind(id)
		.bind(req.project_id)
		.bind(req.client_id)
		.bind(title)
		.bind(req.description.as_deref())
		.bind(status.as_str())
		.bind(req.priority.unwrap_or(Priority::Normal).as_str())
		.bind(req.due_date)
		.bind(req.period.unwrap_or(DayPeriod::AllDay).as_str())
		.bind(completed_at)
		.bind(req.estimated_hours)
		.bind(req.is_billable.unwrap_or(true))
		.bind(req.hourly_rate)
		.bind(now)
		.fetch_one(&self.db.pool)
		.await?;

		Ok(task)
	}

	pub async fn tasks_update(&self, req: UpdateTaskRequest) -> Result<Task> {
		let now = OffsetDateTime::now_utc();
		let mut tx = self.db.pool.begin().await?;
		let current = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1 FOR UPDATE")
			.bind(req.id)
			.fetch_optional(&mut *tx)
			.await?
			.ok_or_else(|| Error::not_found("Task not found"))?;
		let fields = req.fields;
		let completed_at = match fields.status {
			Some(TaskStatus::Done) => current.completed_at.or(Some(now)),
			Some(_) => None,
			None => current.completed_at,
		};
		let task = sqlx::query_as::<_, Task>(
			"\
UPDATE tasks
SET
	project_id = COALESCE($2, project_id),
	client_id = COALESCE($3, client_id),
	title = COALESCE($4, title),
	description = COALESCE($5, description),
	status = COALESCE($6, status),
	priority = COALESCE($7, priority),
	due_date = COALESCE($8, due_date),
	period = COALESCE($9, period),
	completed_at = $10,
	estimated_hours = COALESCE($11, estimated_hours),
	is_billable = COALESCE($12, is_billable),
	hourly_rate = COALESCE($13, hourly_rate),
	updated_at = $14
WHERE id = $1
RETURNING *",
		)
		.bind(req.id)
		.bind(fields.project_id)
		.bind(fields.client_id)
		.bind(crate::non_blank(fields.title.as_deref()))
		.bind(fields.description.as_deref())
		.bind(fields.status.map(TaskStatus::as_str))
		.bind(fields.priority.map(Priority::as_str))
		.bind(fields.due_date)
		.bind(fields.period.map(DayPeriod::as_str))
		.bind(completed_at)
		.bind(fields.estimated_hours)
		.bind(fields.is_billable)
		.bind(fields.hourly_rate)
		.bind(now)
		.fetch_one(&mut *tx)
		.await?;

		tx.commit().await?;

		Ok(task)
	}

	pub async fn tasks_delete(&self, req: IdRequest) -> Result<SuccessResponse> {
		sqlx::query("DELETE FROM tasks WHERE id = $1").bind(req.id).execute(&self.db.pool).await?;

		Ok(SuccessResponse::OK)
	}
}
