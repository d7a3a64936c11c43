//! Per-project settings such as hosting credentials, API keys or domain names.

use serde::Deserialize;
use time::OffsetDateTime;

use crate::{CoachService, Error, IdRequest, Result, SuccessResponse, tasks::ProjectScopedRequest};
use coach_storage::{counters, models::ProjectVariable};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectVariableRequest {
	pub project_id: i64,
	pub name: String,
	pub value: String,
	#[serde(rename = "type")]
	pub var_type: String,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default = "secret_by_default")]
	pub is_secret: bool,
}

/// Absent fields are kept. An empty `description` clears it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectVariableRequest {
	pub id: i64,
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub value: Option<String>,
	#[serde(default, rename = "type")]
	pub var_type: Option<String>,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub is_secret: Option<bool>,
}

impl CoachService {
	pub async fn project_variables_list(
		&self,
		req: ProjectScopedRequest,
	) -> Result<Vec<ProjectVariable>> {
		let variables = sqlx::query_as::<_, ProjectVariable>(
			"SELECT * FROM project_variables WHERE project_id = $1 ORDER BY name ASC, id ASC",
		)
		.bind(req.project_id)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(variables)
	}

	pub async fn project_variables_create(
		&self,
		req: CreateProjectVariableRequest,
	) -> Result<ProjectVariable> {
		let name = crate::require_text("name", Some(req.name.as_str()))?;
		let var_type = crate::require_text("type", Some(req.var_type.as_str()))?;
		let now = OffsetDateTime::now_utc();
		let id = counters::next_id(&self.db.pool, "project_variables").await?;
		let variable = sqlx::query_as::<_, ProjectVariable>(
			"\
INSERT INTO project_variables (
	id,
	project_id,
	name,
	value,
	type,
	description,
	is_secret,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
RETURNING *",
		)
		.bind(id)
		.bind(req.project_id)
		.bind(name)
		.bind(req.value.as_str())
		.bind(var_type)
		.bind(crate::non_blank(req.description.as_deref()))
		.bind(req.is_secret)
		.bind(now)
		.fetch_one(&self.db.pool)
		.await?;

		Ok(variable)
	}

	pub async fn project_variables_update(
		&self,
		req: UpdateProjectVariableRequest,
	) -> Result<ProjectVariable> {
		let variable = sqlx::query_as::<_, ProjectVariable>(
			"\
UPDATE project_variables
SET
	name = COALESCE($2, name),
	value = COALESCE($3, value),
	type = COALESCE($4, type),
	description = CASE WHEN $5::text IS NULL THEN description ELSE NULLIF(btrim($5), '') END,
	is_secret = COALESCE($6, is_secret),
	updated_at = $7
WHERE id = $1
RETURNING *",
		)
		.bind(req.id)
		.bind(crate::non_blank(req.name.as_deref()))
		.bind(req.value.as_deref())
		.bind(crate::non_blank(req.var_type.as_deref()))
		.bind(req.description.as_deref())
		.bind(req.is_secret)
		.bind(OffsetDateTime::now_utc())
		.fetch_optional(&self.db.pool)
		.await?
		.ok_or_else(|| Error::not_found("Variable not found"))?;

		Ok(variable)
	}

	pub async fn project_variables_delete(&self, req: IdRequest) -> Result<SuccessResponse> {
		sqlx::query("DELETE FROM project_variables WHERE id = $1")
			.bind(req.id)
			.execute(&self.db.pool)
			.await?;

		Ok(SuccessResponse::OK)
	}
}

fn secret_by_default() -> bool {
	true
}
