use serde::Deserialize;
use sqlx::PgConnection;
use time::OffsetDateTime;

use crate::{CoachService, Result};
use coach_storage::{counters, models::Company};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyFields {
	pub name: Option<String>,
	pub legal_name: Option<String>,
	pub siret: Option<String>,
	pub tva_number: Option<String>,
	pub address: Option<String>,
	pub postal_code: Option<String>,
	pub city: Option<String>,
	pub country: Option<String>,
	pub email: Option<String>,
	pub phone: Option<String>,
	pub website: Option<String>,
	pub bank_name: Option<String>,
	pub iban: Option<String>,
	pub bic: Option<String>,
	pub default_tva_rate: Option<f64>,
	pub default_payment_terms: Option<i32>,
	pub legal_mentions: Option<String>,
}

impl CoachService {
	pub async fn company_get(&self) -> Result<Option<Company>> {
		let company = sqlx::query_as::<_, Company>("SELECT * FROM company ORDER BY id ASC LIMIT 1")
			.fetch_optional(&self.db.pool)
			.await?;

		Ok(company)
	}

	/// Writes the single company row, creating it on first use.
	pub async fn company_upsert(&self, req: CompanyFields) -> Result<Company> {
		let now = OffsetDateTime::now_utc();
		let mut tx = self.db.pool.begin().await?;
		let existing: Option<i64> =
			sqlx::query_scalar("SELECT id FROM company ORDER BY id ASC LIMIT 1 FOR UPDATE")
				.fetch_optional(&mut *tx)
				.await?;
		let company = match existing {
			Some(id) => update_company(&mut tx, id, &req, now).await?,
			None => {
				let name = crate::require_text("name", req.name.as_deref())?;
				let id = counters::next_id(&mut *tx, "company").await?;

				sqlx::query(
					"\
INSERT INTO company (id, name, default_tva_rate, default_payment_terms, created_at, updated_at)
VALUES ($1, $2, 20, 30, $3, $3)",
				)
				.bind(id)
				.bind(name)
				.bind(now)
				.execute(&mut *tx)
				.await?;

				update_company(&mut tx, id, &req, now).await?
			},
		};

		tx.commit().await?;

		Ok(company)
	}
}

async fn update_company(
	conn: &mut PgConnection,
	id: i64,
	req: &CompanyFields,
	now: OffsetDateTime,
) -> Result<Company> {
	let company = sqlx::query_as::<_, Company>(
		"\
UPDATE company
SET
	name = COALESCE($2, name),
	legal_name = COALESCE($3, legal_name),
	siret = COALESCE($4, siret),
	tva_number = COALESCE($5, tva_number),
	address = COALESCE($6, address),
	postal_code = COALESCE($7, postal_code),
	city = COALESCE($8, city),
	country = COALESCE($9, country),
	email = COALESCE($10, email),
	phone = COALESCE($11, phone),
	website = COALESCE($12, website),
	bank_name = COALESCE($13, bank_name),
	iban = COALESCE($14, iban),
	bic = COALESCE($15, bic),
	default_tva_rate = COALESCE($16, default_tva_rate),
	default_payment_terms = COALESCE($17, default_payment_terms),
	legal_mentions = COALESCE($18, legal_mentions),
	updated_at = $19
WHERE id = $1
RETURNING *",
	)
	.bind(id)
	.bind(crate::non_blank(req.name.as_deref()))
	.bind(req.legal_name.as_deref())
	.bind(req.siret.as_deref())
	.bind(req.tva_number.as_deref())
	.bind(req.address.as_deref())
	.bind(req.postal_code.as_deref())
	.bind(req.city.as_deref())
	.bind(req.country.as_deref())
	.bind(req.email.as_deref())
	.bind(req.phone.as_deref())
	.bind(req.website.as_deref())
	.bind(req.bank_name.as_deref())
	.bind(req.iban.as_deref())
	.bind(req.bic.as_deref())
	.bind(req.default_tva_rate)
	.bind(req.default_payment_terms)
	.bind(req.legal_mentions.as_deref())
	.bind(now)
	.fetch_one(conn)
	.await?;

	Ok(company)
}
