use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
	CoachService, Error, IdRequest, Result, SuccessResponse, projects::ClientScopedRequest,
	tasks::ProjectScopedRequest,
};
use coach_domain::status::NoteColor;
use coach_storage::{counters, models::Note};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteFields {
	pub title: Option<String>,
	pub content: Option<String>,
	pub client_id: Option<i64>,
	pub project_id: Option<i64>,
	pub task_id: Option<i64>,
	pub color: Option<NoteColor>,
	pub pinned: Option<bool>,
	pub is_client_visible: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateNoteRequest {
	pub id: i64,
	#[serde(flatten)]
	pub fields: NoteFields,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TogglePinRequest {
	pub id: i64,
	pub pinned: bool,
}

impl CoachService {
	pub async fn notes_list(&self) -> Result<Vec<Note>> {
		let notes = sqlx::query_as::<_, Note>(
			"SELECT * FROM notes ORDER BY pinned DESC, created_at DESC, id DESC",
		)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(notes)
	}

	pub async fn notes_list_by_client(&self, req: ClientScopedRequest) -> Result<Vec<Note>> {
		let notes = sqlx::query_as::<_, Note>(
			"SELECT * FROM notes WHERE client_id = $1 ORDER BY pinned DESC, created_at DESC, id DESC",
		)
		.bind(req.client_id)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(notes)
	}

	pub async fn notes_list_by_project(&self, req: ProjectScopedRequest) -> Result<Vec<Note>> {
		let notes = sqlx::query_as::<_, Note>(
			"SELECT * FROM notes WHERE project_id = $1 ORDER BY pinned DESC, created_at DESC, id DESC",
		)
		.bind(req.project_id)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(notes)
	}

	pub async fn notes_create(&self, req: NoteFields) -> Result<Note> {
		let title = crate::require_text("title", req.title.as_deref())?;
		let now = OffsetDateTime::now_utc();
		let id = counters::next_id(&self.db.pool, "notes").await?;
		let note = sqlx::query_as::<_, Note>(
			"\
INSERT INTO notes (
	id,
	title,
	content,
	client_id,
	project_id,
	task_id,
	color,
	pinned,
	is_client_visible,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
RETURNING *",
		)
		.bind(id)
		.bind(title)
		.bind(req.content.as_deref())
		.bind(req.client_id)
		.bind(req.project_id)
		.bind(req.task_id)
		.bind(req.color.unwrap_or(NoteColor::Yellow).as_str())
		.bind(req.pinned.unwrap_or(false))
		.bind(req.is_client_visible.unwrap_or(false))
		.bind(now)
		.fetch_one(&self.db.pool)
		.await?;

		Ok(note)
	}

	pub async fn notes_update(&self, req: UpdateNoteRequest) -> Result<Note> {
		let fields = req.fields;
		let note = sqlx::query_as::<_, Note>(
			"\
UPDATE notes
SET
	title = COALESCE($2, title),
	content = COALESCE($3, content),
	client_id = COALESCE($4, client_id),
	project_id = COALESCE($5, project_id),
	task_id = COALESCE($6, task_id),
	color = COALESCE($7, color),
	pinned = COALESCE($8, pinned),
	is_client_visible = COALESCE($9, is_client_visible),
	updated_at = $10
WHERE id = $1
RETURNING *",
		)
		.bind(req.id)
		.bind(crate::non_blank(fields.title.as_deref()))
		.bind(fields.content.as_deref())
		.bind(fields.client_id)
		.bind(fields.project_id)
		.bind(fields.task_id)
		.bind(fields.color.map(NoteColor::as_str))
		.bind(fields.pinned)
		.bind(fields.is_client_visible)
		.bind(OffsetDateTime::now_utc())
		.fetch_optional(&self.db.pool)
		.await?
		.ok_or_else(|| Error::not_found("Note not found"))?;

		Ok(note)
	}

	pub async fn notes_delete(&self, req: IdRequest) -> Result<SuccessResponse> {
		sqlx::query("DELETE FROM notes WHERE id = $1").bind(req.id).execute(&self.db.pool).await?;

		Ok(SuccessResponse::OK)
	}

	pub async fn notes_toggle_pin(&self, req: TogglePinRequest) -> Result<Note> {
		let note = sqlx::query_as::<_, Note>(
			"UPDATE notes SET pinned = $2, updated_at = $3 WHERE id = $1 RETURNING *",
		)
		.bind(req.id)
		.bind(req.pinned)
		.bind(OffsetDateTime::now_utc())
		.fetch_optional(&self.db.pool)
		.await?
		.ok_or_else(|| Error::not_found("Note not found"))?;

		Ok(note)
	}
}
