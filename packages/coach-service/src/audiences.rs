use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{CoachService, Error, IdRequest, Result, SuccessResponse};
use coach_domain::{pipeline, status::LeadStatus};
use coach_storage::{counters, models::Audience};

const MAX_NAME_CHARS: usize = 100;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudienceFields {
	pub name: Option<String>,
	pub description: Option<String>,
	pub color: Option<String>,
	pub icon: Option<String>,
	pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateAudienceRequest {
	pub id: i64,
	#[serde(flatten)]
	pub fields: AudienceFields,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignAudienceRequest {
	pub audience_name: String,
	pub lead_ids: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePhaseRequest {
	pub status: LeadStatus,
	pub lead_ids: Vec<i64>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct BulkResponse {
	pub success: bool,
	pub count: u64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AudienceStats {
	pub id: i64,
	pub name: String,
	pub color: String,
	pub leads_count: i64,
	pub total_potential: f64,
	pub converted_count: i64,
}

impl CoachService {
	pub async fn audiences_list(&self) -> Result<Vec<Audience>> {
		let audiences =
			sqlx::query_as::<_, Audience>("SELECT * FROM audiences WHERE is_active ORDER BY name ASC")
				.fetch_all(&self.db.pool)
				.await?;

		Ok(audiences)
	}

	pub async fn audiences_get(&self, req: IdRequest) -> Result<Audience> {
		self.find_audience(req.id).await?.ok_or_else(|| Error::not_found("Audience not found"))
	}

	pub async fn audiences_create(&self, req: AudienceFields) -> Result<Audience> {
		let name = validate_name(req.name.as_deref())?;
		let color = validate_color(req.color.as_deref())?.unwrap_or(pipeline::DEFAULT_AUDIENCE_COLOR);
		let now = OffsetDateTime::now_utc();
		let id = counters::next_id(&self.db.pool, "audiences").await?;
		let audience = sqlx::query_as::<_, Audience>(
			"\
INSERT INTO audiences (id, name, description, color, icon, is_active, created_at, updated_at)
VALUES ($1, $2, $3, $4, $5, TRUE, $6, $6)
RETURNING *",
		)
		.bind(id)
		.bind(name)
		.bind(crate::non_blank(req.description.as_deref()))
		.bind(color)
		.bind(crate::non_blank(req.icon.as_deref()))
		.bind(now)
		.fetch_one(&self.db.pool)
		.await?;

		Ok(audience)
	}

	pub async fn audiences_update(&self, req: UpdateAudienceRequest) -> Result<Audience> {
		let fields = req.fields;
		let name = match fields.name.as_deref() {
			Some(name) => Some(validate_name(Some(name))?),
			None => None,
		};
		let color = validate_color(fields.color.as_deref())?;
		let audience = sqlx::query_as::<_, Audience>(
			"\
UPDATE audiences
SET
	name = COALESCE($2, name),
	description = COALESCE($3, description),
	color = COALESCE($4, color),
	icon = COALESCE($5, icon),
	is_active = COALESCE($6, is_active),
	updated_at = $7
WHERE id = $1
RETURNING *",
		)
		.bind(req.id)
		.bind(name)
		.bind(fields.description.as_deref())
		.bind(color)
		.bind(fields.icon.as_deref())
		.bind(fields.is_active)
		.bind(OffsetDateTime::now_utc())
		.fetch_optional(&self.db.pool)
		.await?
		.ok_or_else(|| Error::not_found("Audience not found"))?;

		Ok(audience)
	}

	/// Deactivates an audience. Its leads move to the fallback audience when one exists.
	pub async fn audiences_delete(&self, req: IdRequest) -> Result<SuccessResponse> {
		let audience =
			self.find_audience(req.id).await?.ok_or_else(|| Error::not_found("Audience not found"))?;
		let now = OffsetDateTime::now_utc();
		let mut tx = self.db.pool.begin().await?;
		let fallback: Option<i64> = sqlx::query_scalar(
			"SELECT id FROM audiences WHERE name = $1 AND id <> $2 ORDER BY id LIMIT 1",
		)
		.bind(pipeline::FALLBACK_AUDIENCE)
		.bind(audience.id)
		.fetch_optional(&mut *tx)
		.await?;

		if fallback.is_some() {
			let moved = sqlx::query("UPDATE leads SET audience = $2, updated_at = $3 WHERE audience = $1")
				.bind(&audience.name)
				.bind(pipeline::FALLBACK_AUDIENCE)
				.bind(now)
				.execute(&mut *tx)
				.await?
				.rows_affected();

			tracing::info!(audience_id = audience.id, moved, "Leads moved to the fallback audience.");
		}

		sqlx::query("UPDATE audiences SET is_active = FALSE, updated_at = $2 WHERE id = $1")
			.bind(audience.id)
			.bind(now)
			.execute(&mut *tx)
			.await?;

		tx.commit().await?;

		Ok(SuccessResponse::OK)
	}

	pub async fn audiences_stats(&self) -> Result<Vec<AudienceStats>> {
		let stats = sqlx::query_as::<_, AudienceStats>(
			"\
SELECT
	a.id,
	a.name,
	a.color,
	count(l.id) AS leads_count,
	COALESCE(sum(l.potential_amount), 0)::double precision AS total_potential,
	count(l.converted_to_client_id) AS converted_count
FROM audiences a
LEFT JOIN leads l ON l.audience = a.name
WHERE a.is_active
GROUP BY a.id, a.name, a.color
ORDER BY a.name ASC",
		)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(stats)
	}

	pub async fn audiences_assign_to_leads(&self, req: AssignAudienceRequest) -> Result<BulkResponse> {
		let name = crate::require_text("audienceName", Some(req.audience_name.as_str()))?;
		let count = sqlx::query("UPDATE leads SET audience = $2, updated_at = $3 WHERE id = ANY($1)")
			.bind(&req.lead_ids)
			.bind(name)
			.bind(OffsetDateTime::now_utc())
			.execute(&self.db.pool)
			.await?
			.rows_affected();

		Ok(BulkResponse { success: true, count })
	}

	pub async fn audiences_change_phase_for_leads(
		&self,
		req: ChangePhaseRequest,
	) -> Result<BulkResponse> {
		let count = sqlx::query("UPDATE leads SET status = $2, updated_at = $3 WHERE id = ANY($1)")
			.bind(&req.lead_ids)
			.bind(req.status.as_str())
			.bind(OffsetDateTime::now_utc())
			.execute(&self.db.pool)
			.await?
			.rows_affected();

		Ok(BulkResponse { success: true, count })
	}

	async fn find_audience(&self, id: i64) -> Result<Option<Audience>> {
		let audience = sqlx::query_as::<_, Audience>("SELECT * FROM audiences WHERE id = $1")
			.bind(id)
			.fetch_optional(&self.db.pool)
			.await?;

		Ok(audience)
	}
}

fn validate_name(name: Option<&str>) -> Result<&str> {
	let name = crate::require_text("name", name)?;

	if name.chars().count() > MAX_NAME_CHARS {
		return Err(Error::invalid("name must be at most 100 characters."));
	}

	Ok(name)
}

fn validate_color(color: Option<&str>) -> Result<Option<&str>> {
	match crate::non_blank(color) {
		Some(color) if !pipeline::is_hex_color(color) => {
			Err(Error::invalid("color must look like #RRGGBB."))
		},
		color => Ok(color),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn colors_must_be_six_hex_digits() {
		assert_eq!(validate_color(Some("#a1B2c3")).expect("Color must pass."), Some("#a1B2c3"));
		assert_eq!(validate_color(None).expect("Absent color must pass."), None);
		assert!(validate_color(Some("#fff")).is_err());
	}

	#[test]
	fn names_are_capped() {
		assert!(validate_name(Some(&"a".repeat(100))).is_ok());
		assert!(validate_name(Some(&"a".repeat(101))).is_err());
		assert!(validate_name(Some(" ")).is_err());
	}
}
