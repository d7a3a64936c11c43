use serde::Deserialize;
use time::{Date, OffsetDateTime};

use crate::{CoachService, Error, IdRequest, Result, SuccessResponse};
use coach_domain::status::{Priority, ProjectStatus, ProjectType};
use coach_storage::{counters, models::Project};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFields {
	pub client_id: Option<i64>,
	pub name: Option<String>,
	pub description: Option<String>,
	#[serde(rename = "type")]
	pub project_type: Option<ProjectType>,
	pub status: Option<ProjectStatus>,
	pub priority: Option<Priority>,
	#[serde(default, with = "coach_storage::date_serde::option")]
	pub start_date: Option<Date>,
	#[serde(default, with = "coach_storage::date_serde::option")]
	pub end_date: Option<Date>,
	pub estimated_hours: Option<f64>,
	pub budget_estimate: Option<f64>,
	pub client_budget: Option<f64>,
	pub project_cost: Option<f64>,
	pub progress_percentage: Option<i32>,
	pub notes: Option<String>,
	pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
	pub id: i64,
	#[serde(flatten)]
	pub fields: ProjectFields,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientScopedRequest {
	pub client_id: i64,
}

impl CoachService {
	pub async fn projects_list(&self) -> Result<Vec<Project>> {
		let projects =
			sqlx::query_as::<_, Project>("SELECT * FROM projects ORDER BY created_at DESC, id DESC")
				.fetch_all(&self.db.pool)
				.await?;

		Ok(projects)
	}

	pub async fn projects_list_by_client(&self, req: ClientScopedRequest) -> Result<Vec<Project>> {
		let projects = sqlx::query_as::<_, Project>(
			"SELECT * FROM projects WHERE client_id = $1 ORDER BY created_at DESC, id DESC",
		)
		.bind(req.client_id)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(projects)
	}

	pub async fn projects_get(&self, req: IdRequest) -> Result<Project> {
		self.find_project(req.id).await?.ok_or_else(|| Error::not_found("Project not found"))
	}

	pub async fn projects_create(&self, req: ProjectFields) -> Result<Project> {
		let Some(client_id) = req.client_id else {
			return Err(Error::invalid("clientId is required."));
		};
		let name = crate::require_text("name", req.name.as_deref())?;
		let progress = req.progress_percentage.unwrap_or(0);

		validate_progress(progress)?;

		let now = OffsetDateTime::now_utc();
		let id = counters::next_id(&self.db.pool, "projects").await?;
		let project = sqlx::query_as::<_, Project>(
			"\
INSERT INTO projects (
	id,
	client_id,
	name,
	description,
	type,
	status,
	priority,
	start_date,
	end_date,
	estimated_hours,
	budget_estimate,
	client_budget,
	project_cost,
	progress_percentage,
	notes,
	logo_url,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $17)
RETURNING *",
		)
		.bind(id)
		.bind(client_id)
		.bind(name)
		.bind(req.description.as_deref())
		.bind(req.project_type.unwrap_or(ProjectType::Other).as_str())
		.bind(req.status.unwrap_or(ProjectStatus::Draft).as_str())
		.bind(req.priority.unwrap_or(Priority::Normal).as_str())
		.bind(req.start_date)
		.bind(req.end_date)
		.bind(req.estimated_hours)
		.bind(req.budget_estimate)
		.bind(req.client_budget)
		.bind(req.project_cost)
		.bind(progress)
		.bind(req.notes.as_deref())
		.bind(req.logo_url.as_deref())
		.bind(now)
		.fetch_one(&self.db.pool)
		.await?;

		Ok(project)
	}

	pub async fn projects_update(&self, req: UpdateProjectRequest) -> Result<Project> {
		let fields = req.fields;

		if let Some(progress) = fields.progress_percentage {
			validate_progress(progress)?;
		}

		let project = sqlx::query_as::<_, Project>(
			"\
UPDATE projects
SET
	client_id = COALESCE($2, client_id),
	name = COALESCE($3, name),
	description = COALESCE($4, description),
	type = COALESCE($5, type),
	status = COALESCE($6, status),
	priority = COALESCE($7, priority),
	start_date = COALESCE($8, start_date),
	end_date = COALESCE($9, end_date),
	estimated_hours = COALESCE($10, estimated_hours),
	budget_estimate = COALESCE($11, budget_estimate),
	client_budget = COALESCE($12, client_budget),
	project_cost = COALESCE($13, project_cost),
	progress_percentage = COALESCE($14, progress_percentage),
	notes = COALESCE($15, notes),
	logo_url = COALESCE($16, logo_url),
	updated_at = $17
WHERE id = $1
RETURNING *",
		)
		.bind(req.id)
		.bind(fields.client_id)
		.bind(crate::non_blank(fields.name.as_deref()))
		.bind(fields.description.as_deref())
		.bind(fields.project_type.map(ProjectType::as_str))
		.bind(fields.status.map(ProjectStatus::as_str))
		.bind(fields.priority.map(Priority::as_str))
		.bind(fields.start_date)
		.bind(fields.end_date)
		.bind(fields.estimated_hours)
		.bind(fields.budget_estimate)
		.bind(fields.client_budget)
		.bind(fields.project_cost)
		.bind(fields.progress_percentage)
		.bind(fields.notes.as_deref())
		.bind(fields.logo_url.as_deref())
		.bind(OffsetDateTime::now_utc())
		.fetch_optional(&self.db.pool)
		.await?
		.ok_or_else(|| Error::not_found("Project not found"))?;

		Ok(project)
	}

	pub async fn projects_delete(&self, req: IdRequest) -> Result<SuccessResponse> {
		sqlx::query("DELETE FROM projects WHERE id = $1").bind(req.id).execute(&self.db.pool).await?;

		Ok(SuccessResponse::OK)
	}

	pub(crate) async fn find_project(&self, id: i64) -> Result<Option<Project>> {
		let project = sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
			.bind(id)
			.fetch_optional(&self.db.pool)
			.await?;

		Ok(project)
	}
}

fn validate_progress(progress: i32) -> Result<()> {
	if (0..=100).contains(&progress) {
		Ok(())
	} else {
		Err(Error::invalid("progressPercentage must be between 0 and 100."))
	}
}
