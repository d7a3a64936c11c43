use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
	ADMIN_USER_ID, CoachService, Error, IdRequest, Result, SuccessResponse,
	tasks::ProjectScopedRequest,
};
use coach_storage::{counters, models::ProjectNote};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectNoteRequest {
	pub project_id: i64,
	pub title: String,
	pub content: String,
	#[serde(default)]
	pub tags: Option<String>,
	#[serde(default)]
	pub is_pinned: bool,
}

/// Absent fields are kept. An empty `tags` clears them.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectNoteRequest {
	pub id: i64,
	#[serde(default)]
	pub title: Option<String>,
	#[serde(default)]
	pub content: Option<String>,
	#[serde(default)]
	pub tags: Option<String>,
	#[serde(default)]
	pub is_pinned: Option<bool>,
}

impl CoachService {
	pub async fn project_notes_list(&self, req: ProjectScopedRequest) -> Result<Vec<ProjectNote>> {
		let notes = sqlx::query_as::<_, ProjectNote>(
			"SELECT * FROM project_notes WHERE project_id = $1 ORDER BY created_at DESC, id DESC",
		)
		.bind(req.project_id)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(notes)
	}

	pub async fn project_notes_create(&self, req: CreateProjectNoteRequest) -> Result<ProjectNote> {
		let title = crate::require_text("title", Some(req.title.as_str()))?;
		let now = OffsetDateTime::now_utc();
		let id = counters::next_id(&self.db.pool, "project_notes").await?;
		let note = sqlx::query_as::<_, ProjectNote>(
			"\
INSERT INTO project_notes (
	id,
	project_id,
	title,
	content,
	tags,
	is_pinned,
	created_by,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
RETURNING *",
		)
		.bind(id)
		.bind(req.project_id)
		.bind(title)
		.bind(req.content.as_str())
		.bind(crate::non_blank(req.tags.as_deref()))
		.bind(req.is_pinned)
		.bind(ADMIN_USER_ID)
		.bind(now)
		.fetch_one(&self.db.pool)
		.await?;

		Ok(note)
	}

	pub async fn project_notes_update(&self, req: UpdateProjectNoteRequest) -> Result<ProjectNote> {
		let note = sqlx::query_as::<_, ProjectNote>(
			"\
UPDATE project_notes
SET
	title = COALESCE($2, title),
	content = COALESCE($3, content),
	tags = CASE WHEN $4::text IS NULL THEN tags ELSE NULLIF(btrim($4), '') END,
	is_pinned = COALESCE($5, is_pinned),
	updated_at = $6
WHERE id = $1
RETURNING *",
		)
		.bind(req.id)
		.bind(crate::non_blank(req.title.as_deref()))
		.bind(req.content.as_deref())
		.bind(req.tags.as_deref())
		.bind(req.is_pinned)
		.bind(OffsetDateTime::now_utc())
		.fetch_optional(&self.db.pool)
		.await?
		.ok_or_else(|| Error::not_found("Note not found"))?;

		Ok(note)
	}

	pub async fn project_notes_delete(&self, req: IdRequest) -> Result<SuccessResponse> {
		sqlx::query("DELETE FROM project_notes WHERE id = $1")
			.bind(req.id)
			.execute(&self.db.pool)
			.await?;

		Ok(SuccessResponse::OK)
	}
}
