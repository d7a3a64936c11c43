use serde::Deserialize;
use time::OffsetDateTime;

use crate::{CoachService, Error, IdRequest, Result, SuccessResponse};
use coach_domain::status::TemplateCategory;
use coach_storage::{counters, models::EmailTemplate};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailTemplateFields {
	pub name: Option<String>,
	pub subject: Option<String>,
	pub body: Option<String>,
	pub category: Option<TemplateCategory>,
	pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEmailTemplateRequest {
	pub id: i64,
	#[serde(flatten)]
	pub fields: EmailTemplateFields,
}

impl CoachService {
	pub async fn email_templates_list(&self) -> Result<Vec<EmailTemplate>> {
		let templates = sqlx::query_as::<_, EmailTemplate>(
			"SELECT * FROM email_templates WHERE is_active ORDER BY category ASC, name ASC",
		)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(templates)
	}

	pub async fn email_templates_get(&self, req: IdRequest) -> Result<EmailTemplate> {
		self.find_email_template(req.id)
			.await?
			.ok_or_else(|| Error::not_found("Template not found"))
	}

	pub async fn email_templates_create(&self, req: EmailTemplateFields) -> Result<EmailTemplate> {
		let name = crate::require_text("name", req.name.as_deref())?;
		let subject = crate::require_text("subject", req.subject.as_deref())?;
		let body = crate::require_text("body", req.body.as_deref())?;
		let now = OffsetDateTime::now_utc();
		let id = counters::next_id(&self.db.pool, "email_templates").await?;
		let template = sqlx::query_as::<_, EmailTemplate>(
			"\
INSERT INTO email_templates (
	id,
	name,
	subject,
	body,
	category,
	is_active,
	usage_count,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, 0, $7, $7)
RETURNING *",
		)
		.bind(id)
		.bind(name)
		.bind(subject)
		.bind(body)
		.bind(req.category.unwrap_or(TemplateCategory::Autre).as_str())
		.bind(req.is_active.unwrap_or(true))
		.bind(now)
		.fetch_one(&self.db.pool)
		.await?;

		Ok(template)
	}

	pub async fn email_templates_update(
		&self,
		req: UpdateEmailTemplateRequest,
	) -> Result<EmailTemplate> {
		let fields = req.fields;
		let template = sqlx::query_as::<_, EmailTemplate>(
			"\
UPDATE email_templates
SET
	name = COALESCE($2, name),
	subject = COALESCE($3, subject),
	body = COALESCE($4, body),
	category = COALESCE($5, category),
	is_active = COALESCE($6, is_active),
	updated_at = $7
WHERE id = $1
RETURNING *",
		)
		.bind(req.id)
		.bind(crate::non_blank(fields.name.as_deref()))
		.bind(crate::non_blank(fields.subject.as_deref()))
		.bind(crate::non_blank(fields.body.as_deref()))
		.bind(fields.category.map(TemplateCategory::as_str))
		.bind(fields.is_active)
		.bind(OffsetDateTime::now_utc())
		.fetch_optional(&self.db.pool)
		.await?
		.ok_or_else(|| Error::not_found("Template not found"))?;

		Ok(template)
	}

	pub async fn email_templates_delete(&self, req: IdRequest) -> Result<SuccessResponse> {
		sqlx::query("DELETE FROM email_templates WHERE id = $1")
			.bind(req.id)
			.execute(&self.db.pool)
			.await?;

		Ok(SuccessResponse::OK)
	}

	pub(crate) async fn find_email_template(&self, id: i64) -> Result<Option<EmailTemplate>> {
		let template = sqlx::query_as::<_, EmailTemplate>("SELECT * FROM email_templates WHERE id = $1")
			.bind(id)
			.fetch_optional(&self.db.pool)
			.await?;

		Ok(template)
	}
}
