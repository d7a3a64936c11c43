//! Layout presets for quotes and invoices: branding, company block and legal footer. At most one
//! template per document type is the default.

use serde::Deserialize;
use sqlx::PgConnection;
use time::OffsetDateTime;

use crate::{ADMIN_USER_ID, CoachService, Error, IdRequest, Result, SuccessResponse};
use coach_domain::{pipeline, status::TemplateDocumentType};
use coach_storage::{counters, models::DocumentTemplate};

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TemplateTypeRequest {
	#[serde(rename = "type")]
	pub doc_type: TemplateDocumentType,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TemplateFilterRequest {
	#[serde(default, rename = "type")]
	pub doc_type: Option<TemplateDocumentType>,
}

/// Branding and company fields shared by create and update. On update, absent fields are kept and
/// empty strings clear them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateFields {
	pub logo_url: Option<String>,
	pub primary_color: Option<String>,
	pub secondary_color: Option<String>,
	pub company_name: Option<String>,
	pub company_address: Option<String>,
	pub company_phone: Option<String>,
	pub company_email: Option<String>,
	pub company_siret: Option<String>,
	pub company_tva: Option<String>,
	pub legal_mentions: Option<String>,
	pub terms_and_conditions: Option<String>,
	pub footer_text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplateRequest {
	#[serde(rename = "type")]
	pub doc_type: TemplateDocumentType,
	pub name: String,
	#[serde(flatten)]
	pub fields: TemplateFields,
	#[serde(default)]
	pub is_default: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTemplateRequest {
	pub id: i64,
	#[serde(default)]
	pub name: Option<String>,
	#[serde(flatten)]
	pub fields: TemplateFields,
	#[serde(default)]
	pub is_default: Option<bool>,
}

impl CoachService {
	pub async fn document_templates_get_default(
		&self,
		req: TemplateTypeRequest,
	) -> Result<Option<DocumentTemplate>> {
		let template = sqlx::query_as::<_, DocumentTemplate>(
			"\
SELECT *
FROM document_templates
WHERE user_id = $1 AND type = $2 AND is_default
LIMIT 1",
		)
		.bind(ADMIN_USER_ID)
		.bind(req.doc_type.as_str())
		.fetch_optional(&self.db.pool)
		.await?;

		Ok(template)
	}

	pub async fn document_templates_list(
		&self,
		req: TemplateFilterRequest,
	) -> Result<Vec<DocumentTemplate>> {
		let templates = sqlx::query_as::<_, DocumentTemplate>(
			"\
SELECT *
FROM document_templates
WHERE user_id = $1 AND ($2::text IS NULL OR type = $2)
ORDER BY is_default DESC, name ASC, id ASC",
		)
		.bind(ADMIN_USER_ID)
		.bind(req.doc_type.map(TemplateDocumentType::as_str))
		.fetch_all(&self.db.pool)
		.await?;

		Ok(templates)
	}

	pub async fn document_templates_get(&self, req: IdRequest) -> Result<Option<DocumentTemplate>> {
		let template = sqlx::query_as::<_, DocumentTemplate>(
			"SELECT * FROM document_templates WHERE id = $1 AND user_id = $2",
		)
		.bind(req.id)
		.bind(ADMIN_USER_ID)
		.fetch_optional(&self.db.pool)
		.await?;

		Ok(template)
	}

	/// A new default template demotes the previous default of the same type.
	pub async fn document_templates_create(
		&self,
		req: CreateTemplateRequest,
	) -> Result<DocumentTemplate> {
		let name = crate::require_text("name", Some(req.name.as_str()))?;

		validate_fields(&req.fields)?;

		let now = OffsetDateTime::now_utc();
		let fields = req.fields;
		let mut tx = self.db.pool.begin().await?;

		if req.is_default {
			clear_default(&mut tx, req.doc_type, None, now).await?;
		}

		let id = counters::next_id(&mut *tx, "document_templates").await?;
		let template = sqlx::query_as::<_, DocumentTemplate>(
			"\
INSERT INTO document_templates (
	id,
	user_id,
	type,
	name,
	logo_url,
	primary_color,
	secondary_color,
	company_name,
	company_address,
	company_phone,
	company_email,
	company_siret,
	company_tva,
	legal_mentions,
	terms_and_conditions,
	footer_text,
	is_default,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $18)
RETURNING *",
		)
		.bind(id)
		.bind(ADMIN_USER_ID)
		.bind(req.doc_type.as_str())
		.bind(name)
		.bind(crate::non_blank(fields.logo_url.as_deref()))
		.bind(crate::non_blank(fields.primary_color.as_deref()))
		.bind(crate::non_blank(fields.secondary_color.as_deref()))
		.bind(crate::non_blank(fields.company_name.as_deref()))
		.bind(crate::non_blank(fields.company_address.as_deref()))
		.bind(crate::non_blank(fields.company_phone.as_deref()))
		.bind(crate::non_blank(fields.company_email.as_deref()))
		.bind(crate::non_blank(fields.company_siret.as_deref()))
		.bind(crate::non_blank(fields.company_tva.as_deref()))
		.bind(crate::non_blank(fields.legal_mentions.as_deref()))
		.bind(crate::non_blank(fields.terms_and_conditions.as_deref()))
		.bind(crate::non_blank(fields.footer_text.as_deref()))
		.bind(req.is_default)
		.bind(now)
		.fetch_one(&mut *tx)
		.await?;

		tx.commit().await?;

		tracing::info!(template_id = id, doc_type = %req.doc_type, "Document template created.");

		Ok(template)
	}

	pub async fn document_templates_update(
		&self,
		req: UpdateTemplateRequest,
	) -> Result<DocumentTemplate> {
		validate_fields(&req.fields)?;

		let now = OffsetDateTime::now_utc();
		let fields = req.fields;
		let mut tx = self.db.pool.begin().await?;
		let current = sqlx::query_as::<_, DocumentTemplate>(
			"SELECT * FROM document_templates WHERE id = $1 AND user_id = $2 FOR UPDATE",
		)
		.bind(req.id)
		.bind(ADMIN_USER_ID)
		.fetch_optional(&mut *tx)
		.await?
		.ok_or_else(|| Error::not_found("Template not found"))?;

		if req.is_default == Some(true) {
			let doc_type = TemplateDocumentType::parse(&current.doc_type)
				.ok_or_else(|| Error::invalid("Unknown template type."))?;

			clear_default(&mut tx, doc_type, Some(current.id), now).await?;
		}

		let template = sqlx::query_as::<_, DocumentTemplate>(
			"\
UPDATE document_templates
SET
	name = COALESCE($2, name),
	logo_url = CASE WHEN $3::text IS NULL THEN logo_url ELSE NULLIF(btrim($3), '') END,
	primary_color =
		CASE WHEN $4::text IS NULL THEN primary_color ELSE NULLIF(btrim($4), '') END,
	secondary_color =
		CASE WHEN $5::text IS NULL THEN secondary_color ELSE NULLIF(btrim($5), '') END,
	company_name = CASE WHEN $6::text IS NULL THEN company_name ELSE NULLIF(btrim($6), '') END,
	company_address =
		CASE WHEN $7::text IS NULL THEN company_address ELSE NULLIF(btrim($7), '') END,
	company_phone =
		CASE WHEN $8::text IS NULL THEN company_phone ELSE NULLIF(btrim($8), '') END,
	company_email =
		CASE WHEN $9::text IS NULL THEN company_email ELSE NULLIF(btrim($9), '') END,
	company_siret =
		CASE WHEN $10::text IS NULL THEN company_siret ELSE NULLIF(btrim($10), '') END,
	company_tva = CASE WHEN $11::text IS NULL THEN company_tva ELSE NULLIF(btrim($11), '') END,
	legal_mentions =
		CASE WHEN $12::text IS NULL THEN legal_mentions ELSE NULLIF(btrim($12), '') END,
	terms_and_conditions =
		CASE WHEN $13::text IS NULL THEN terms_and_conditions ELSE NULLIF(btrim($13), '') END,
	footer_text = CASE WHEN $14::text IS NULL THEN footer_text ELSE NULLIF(btrim($14), '') END,
	is_default = COALESCE($15, is_default),
	updated_at = $16
WHERE id = $1
RETURNING *",
		)
		.bind(current.id)
		.bind(crate::non_blank(req.name.as_deref()))
		.bind(fields.logo_url.as_deref())
		.bind(fields.primary_color.as_deref())
		.bind(fields.secondary_color.as_deref())
		.bind(fields.company_name.as_deref())
		.bind(fields.company_address.as_deref())
		.bind(fields.company_phone.as_deref())
		.bind(fields.company_email.as_deref())
		.bind(fields.company_siret.as_deref())
		.bind(fields.company_tva.as_deref())
		.bind(fields.legal_mentions.as_deref())
		.bind(fields.terms_and_conditions.as_deref())
		.bind(fields.footer_text.as_deref())
		.bind(req.is_default)
		.bind(now)
		.fetch_one(&mut *tx)
		.await?;

		tx.commit().await?;

		Ok(template)
	}

	/// Deleting a missing template succeeds.
	pub async fn document_templates_delete(&self, req: IdRequest) -> Result<SuccessResponse> {
		sqlx::query("DELETE FROM document_templates WHERE id = $1 AND user_id = $2")
			.bind(req.id)
			.bind(ADMIN_USER_ID)
			.execute(&self.db.pool)
			.await?;

		Ok(SuccessResponse::OK)
	}
}

async fn clear_default(
	conn: &mut PgConnection,
	doc_type: TemplateDocumentType,
	keep: Option<i64>,
	now: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
UPDATE document_templates
SET is_default = FALSE, updated_at = $4
WHERE user_id = $1 AND type = $2 AND is_default AND ($3::bigint IS NULL OR id <> $3)",
	)
	.bind(ADMIN_USER_ID)
	.bind(doc_type.as_str())
	.bind(keep)
	.bind(now)
	.execute(conn)
	.await?;

	Ok(())
}

fn validate_fields(fields: &TemplateFields) -> Result<()> {
	for (label, color) in
		[("primaryColor", &fields.primary_color), ("secondaryColor", &fields.secondary_color)]
	{
		if let Some(color) = crate::non_blank(color.as_deref()) {
			if !pipeline::is_hex_color(color) {
				return Err(Error::invalid(format!("{label} must be a #RRGGBB color.")));
			}
		}
	}

	if let Some(email) = crate::non_blank(fields.company_email.as_deref()) {
		if !looks_like_email(email) {
			return Err(Error::invalid("companyEmail must be an email address."));
		}
	}

	Ok(())
}

fn looks_like_email(value: &str) -> bool {
	match value.split_once('@') {
		Some((local, domain)) =>
			!local.is_empty()
				&& domain.contains('.')
				&& !domain.starts_with('.')
				&& !domain.ends_with('.')
				&& !value.contains(char::is_whitespace),
		None => false,
	}
}
