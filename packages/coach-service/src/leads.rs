use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{ADMIN_USER_ID, CoachService, Error, IdRequest, Result, SuccessResponse};
use coach_domain::{
	pipeline::{self, DEFAULT_COUNTRY, DEFAULT_PROBABILITY, LeadFigures, LeadStats},
	status::{ActiveStatus, ClientCategory, LeadEmailStatus, LeadStatus},
	template::{self, Recipient},
};
use coach_storage::{
	counters,
	models::{Lead, LeadEmail},
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadFields {
	pub first_name: Option<String>,
	pub last_name: Option<String>,
	pub email: Option<String>,
	pub phone: Option<String>,
	pub company: Option<String>,
	pub position: Option<String>,
	pub address: Option<String>,
	pub postal_code: Option<String>,
	pub city: Option<String>,
	pub country: Option<String>,
	pub status: Option<LeadStatus>,
	pub potential_amount: Option<f64>,
	pub probability: Option<i32>,
	pub source: Option<String>,
	pub notes: Option<String>,
	#[serde(default, with = "coach_storage::time_serde::option")]
	pub last_contact_date: Option<OffsetDateTime>,
	#[serde(default, with = "coach_storage::time_serde::option")]
	pub next_follow_up_date: Option<OffsetDateTime>,
	pub score: Option<i32>,
	pub audience: Option<String>,
	pub is_activated: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLeadRequest {
	pub id: i64,
	#[serde(flatten)]
	pub fields: LeadFields,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LeadStatusRequest {
	pub status: LeadStatus,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct UpdateLeadStatusRequest {
	pub id: i64,
	pub status: LeadStatus,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadScopedRequest {
	pub lead_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendLeadEmailRequest {
	pub lead_id: i64,
	#[serde(default)]
	pub template_id: Option<i64>,
	pub subject: String,
	pub body: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeadResponse {
	pub success: bool,
	pub lead_id: i64,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertLeadResponse {
	pub success: bool,
	pub client_id: i64,
}

impl CoachService {
	pub async fn leads_list(&self) -> Result<Vec<Lead>> {
		let leads = sqlx::query_as::<_, Lead>("SELECT * FROM leads ORDER BY created_at DESC, id DESC")
			.fetch_all(&self.db.pool)
			.await?;

		Ok(leads)
	}

	pub async fn leads_list_by_status(&self, req: LeadStatusRequest) -> Result<Vec<Lead>> {
		let leads = sqlx::query_as::<_, Lead>(
			"SELECT * FROM leads WHERE status = $1 ORDER BY created_at DESC, id DESC",
		)
		.bind(req.status.as_str())
		.fetch_all(&self.db.pool)
		.await?;

		Ok(leads)
	}

	pub async fn leads_get(&self, req: IdRequest) -> Result<Lead> {
		self.find_lead(req.id).await?.ok_or_else(|| Error::not_found("Lead not found"))
	}

	pub async fn leads_create(&self, req: LeadFields) -> Result<CreateLeadResponse> {
		let first_name = crate::require_text("firstName", req.first_name.as_deref())?;
		let last_name = crate::require_text("lastName", req.last_name.as_deref())?;
		let probability = req.probability.unwrap_or(DEFAULT_PROBABILITY);

		validate_probability(probability)?;

		let now = OffsetDateTime::now_utc();
		let id = counters::next_id(&self.db.pool, "leads").await?;

		sqlx::query(
			"\
INSERT INTO leads (
	id,
	first_name,
	last_name,
	email,
	phone,
	company,
	position,
	address,
	postal_code,
	city,
	country,
	status,
	potential_amount,
	probability,
	source,
	notes,
	last_contact_date,
	next_follow_up_date,
	score,
	audience,
	is_activated,
	created_at,
	updated_at
)
VALUES (
	$1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20,
	$21, $22, $22
)",
		)
		.bind(id)
		.bind(first_name)
		.bind(last_name)
		.bind(crate::non_blank(req.email.as_deref()))
		.bind(req.phone.as_deref())
		.bind(req.company.as_deref())
		.bind(req.position.as_deref())
		.bind(req.address.as_deref())
		.bind(req.postal_code.as_deref())
		.bind(req.city.as_deref())
		.bind(crate::non_blank(req.country.as_deref()).unwrap_or(DEFAULT_COUNTRY))
		.bind(req.status.unwrap_or(LeadStatus::Suspect).as_str())
		.bind(req.potential_amount)
		.bind(probability)
		.bind(req.source.as_deref())
		.bind(req.notes.as_deref())
		.bind(req.last_contact_date)
		.bind(req.next_follow_up_date)
		.bind(req.score)
		.bind(crate::non_blank(req.audience.as_deref()))
		.bind(req.is_activated.unwrap_or(true))
		.bind(now)
		.execute(&self.db.pool)
		.await?;

		Ok(CreateLeadResponse { success: true, lead_id: id })
	}

	pub async fn leads_update(&self, req: UpdateLeadRequest) -> Result<Lead> {
		let fields = req.fields;

		if let Some(probability) = fields.probability {
			validate_probability(probability)?;
		}

		let lead = sqlx::query_as::<_, Lead>(
			"\
UPDATE leads
SET
	first_name = COALESCE($2, first_name),
	last_name = COALESCE($3, last_name),
	email = COALESCE($4, email),
	phone = COALESCE($5, phone),
	company = COALESCE($6, company),
	position = COALESCE($7, position),
	address = COALESCE($8, address),
	postal_code = COALESCE($9, postal_code),
	city = COALESCE($10, city),
	country = COALESCE($11, country),
	status = COALESCE($12, status),
	potential_amount = COALESCE($13, potential_amount),
	probability = COALESCE($14, probability),
	source = COALESCE($15, source),
	notes = COALESCE($16, notes),
	last_contact_date = COALESCE($17, last_contact_date),
	next_follow_up_date = COALESCE($18, next_follow_up_date),
	score = COALESCE($19, score),
	audience = COALESCE($20, audience),
	is_activated = COALESCE($21, is_activated),
	updated_at = $22
WHERE id = $1
RETURNING *",
		)
		.bind(req.id)
		.bind(crate::non_blank(fields.first_name.as_deref()))
		.bind(crate::non_blank(fields.last_name.as_deref()))
		.bind(fields.email.as_deref())
		.bind(fields.phone.as_deref())
		.bind(fields.company.as_deref())
		.bind(fields.position.as_deref())
		.bind(fields.address.as_deref())
		.bind(fields.postal_code.as_deref())
		.bind(fields.city.as_deref())
		.bind(fields.country.as_deref())
		.bind(fields.status.map(LeadStatus::as_str))
		.bind(fields.potential_amount)
		.bind(fields.probability)
		.bind(fields.source.as_deref())
		.bind(fields.notes.as_deref())
		.bind(fields.last_contact_date)
		.bind(fields.next_follow_up_date)
		.bind(fields.score)
		.bind(fields.audience.as_deref())
		.bind(fields.is_activated)
		.bind(OffsetDateTime::now_utc())
		.fetch_optional(&self.db.pool)
		.await?
		.ok_or_else(|| Error::not_found("Lead not found"))?;

		Ok(lead)
	}

	pub async fn leads_update_status(&self, req: UpdateLeadStatusRequest) -> Result<Lead> {
		let lead = sqlx::query_as::<_, Lead>(
			"UPDATE leads SET status = $2, updated_at = $3 WHERE id = $1 RETURNING *",
		)
		.bind(req.id)
		.bind(req.status.as_str())
		.bind(OffsetDateTime::now_utc())
		.fetch_optional(&self.db.pool)
		.await?
		.ok_or_else(|| Error::not_found("Lead not found"))?;

		Ok(lead)
	}

	pub async fn leads_convert_to_client(&self, req: LeadScopedRequest) -> Result<ConvertLeadResponse> {
		let now = OffsetDateTime::now_utc();
		let mut tx = self.db.pool.begin().await?;
		let lead = sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE id = $1 FOR UPDATE")
			.bind(req.lead_id)
			.fetch_optional(&mut *tx)
			.await?
			.ok_or_else(|| Error::not_found("Lead not found"))?;
		let client_id = counters::next_id(&mut *tx, "clients").await?;

		sqlx::query(
			"\
INSERT INTO clients (
	id,
	first_name,
	last_name,
	email,
	phone,
	company,
	position,
	address,
	postal_code,
	city,
	country,
	category,
	status,
	notes,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $15)",
		)
		.bind(client_id)
		.bind(lead.first_name.as_str())
		.bind(lead.last_name.as_str())
		.bind(lead.email.as_deref())
		.bind(lead.phone.as_deref())
		.bind(lead.company.as_deref())
		.bind(lead.position.as_deref())
		.bind(lead.address.as_deref())
		.bind(lead.postal_code.as_deref())
		.bind(lead.city.as_deref())
		.bind(crate::non_blank(lead.country.as_deref()).unwrap_or(DEFAULT_COUNTRY))
		.bind(ClientCategory::Active.as_str())
		.bind(ActiveStatus::Active.as_str())
		.bind(lead.notes.as_deref())
		.bind(now)
		.execute(&mut *tx)
		.await?;
		sqlx::query(
			"\
UPDATE leads
SET converted_to_client_id = $2, converted_at = $3, updated_at = $3
WHERE id = $1",
		)
		.bind(lead.id)
		.bind(client_id)
		.bind(now)
		.execute(&mut *tx)
		.await?;

		tx.commit().await?;

		tracing::info!(lead_id = lead.id, client_id, "Lead converted to client.");

		Ok(ConvertLeadResponse { success: true, client_id })
	}

	pub async fn leads_delete(&self, req: IdRequest) -> Result<SuccessResponse> {
		sqlx::query("DELETE FROM leads WHERE id = $1").bind(req.id).execute(&self.db.pool).await?;

		Ok(SuccessResponse::OK)
	}

	pub async fn leads_send_email(&self, req: SendLeadEmailRequest) -> Result<SuccessResponse> {
		let lead = self.find_lead(req.lead_id).await?.ok_or_else(|| Error::not_found("Lead not found"))?;
		let Some(email) = crate::non_blank(lead.email.as_deref()) else {
			return Err(Error::invalid("Lead has no email address"));
		};
		let recipient = Recipient {
			first_name: &lead.first_name,
			last_name: &lead.last_name,
			company: lead.company.as_deref(),
		};
		let subject = template::render(&req.subject, recipient);
		let body = template::render_html(&req.body, recipient);

		if let Err(err) = self.send_email(email, subject.as_str(), template::html_body(&body)).await {
			tracing::warn!(error = %err, lead_id = lead.id, "Lead email failed.");

			return Err(Error::Provider { message: "Failed to send email".to_string() });
		}

		let now = OffsetDateTime::now_utc();
		let mut tx = self.db.pool.begin().await?;
		let id = counters::next_id(&mut *tx, "lead_emails").await?;

		sqlx::query(
			"\
INSERT INTO lead_emails (
	id,
	lead_id,
	template_id,
	subject,
	body,
	sent_at,
	sent_by,
	status,
	created_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $6)",
		)
		.bind(id)
		.bind(lead.id)
		.bind(req.template_id)
		.bind(subject.as_str())
		.bind(body.as_str())
		.bind(now)
		.bind(ADMIN_USER_ID)
		.bind(LeadEmailStatus::Sent.as_str())
		.execute(&mut *tx)
		.await?;
		sqlx::query("UPDATE leads SET last_contact_date = $2, updated_at = $2 WHERE id = $1")
			.bind(lead.id)
			.bind(now)
			.execute(&mut *tx)
			.await?;

		if let Some(template_id) = req.template_id {
			sqlx::query(
				"UPDATE email_templates SET usage_count = usage_count + 1, updated_at = $2 WHERE id = $1",
			)
			.bind(template_id)
			.bind(now)
			.execute(&mut *tx)
			.await?;
		}

		tx.commit().await?;

		Ok(SuccessResponse::OK)
	}

	pub async fn leads_email_history(&self, req: LeadScopedRequest) -> Result<Vec<LeadEmail>> {
		let emails = sqlx::query_as::<_, LeadEmail>(
			"SELECT * FROM lead_emails WHERE lead_id = $1 ORDER BY sent_at DESC, id DESC",
		)
		.bind(req.lead_id)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(emails)
	}

	pub async fn leads_stats(&self) -> Result<LeadStats> {
		let rows: Vec<(String, Option<f64>, i32, Option<i64>)> = sqlx::query_as(
			"SELECT status, potential_amount, probability, converted_to_client_id FROM leads",
		)
		.fetch_all(&self.db.pool)
		.await?;
		let figures = rows
			.into_iter()
			.map(|(status, potential_amount, probability, converted)| LeadFigures {
				status: LeadStatus::parse(&status),
				potential_amount,
				probability: Some(probability),
				converted: converted.is_some(),
			})
			.collect::<Vec<_>>();

		Ok(pipeline::lead_stats(&figures))
	}

	pub(crate) async fn find_lead(&self, id: i64) -> Result<Option<Lead>> {
		let lead = sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE id = $1")
			.bind(id)
			.fetch_optional(&self.db.pool)
			.await?;

		Ok(lead)
	}
}

fn validate_probability(probability: i32) -> Result<()> {
	if pipeline::probability_in_range(probability) {
		Ok(())
	} else {
		Err(Error::invalid("probability must be between 0 and 100."))
	}
}
