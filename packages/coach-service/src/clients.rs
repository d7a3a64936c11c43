use serde::Deserialize;
use time::OffsetDateTime;

use crate::{CoachService, Error, IdRequest, Result, SuccessResponse};
use coach_domain::{
	pipeline::DEFAULT_COUNTRY,
	status::{ActiveStatus, ClientCategory},
};
use coach_storage::{counters, models::Client};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientFields {
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
	pub category: Option<ClientCategory>,
	pub status: Option<ActiveStatus>,
	pub notes: Option<String>,
	pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClientRequest {
	pub id: i64,
	#[serde(flatten)]
	pub fields: ClientFields,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchClientsRequest {
	pub query: String,
}

impl CoachService {
	pub async fn clients_list(&self) -> Result<Vec<Client>> {
		let clients =
			sqlx::query_as::<_, Client>("SELECT * FROM clients ORDER BY created_at DESC, id DESC")
				.fetch_all(&self.db.pool)
				.await?;

		Ok(clients)
	}

	pub async fn clients_get(&self, req: IdRequest) -> Result<Client> {
		self.find_client(req.id).await?.ok_or_else(|| Error::not_found("Client not found"))
	}

	pub async fn clients_search(&self, req: SearchClientsRequest) -> Result<Vec<Client>> {
		let clients = sqlx::query_as::<_, Client>(
			"\
SELECT *
FROM clients
WHERE first_name ILIKE $1
	OR last_name ILIKE $1
	OR email ILIKE $1
	OR company ILIKE $1
ORDER BY created_at DESC, id DESC",
		)
		.bind(crate::like_pattern(&req.query))
		.fetch_all(&self.db.pool)
		.await?;

		Ok(clients)
	}

	pub async fn clients_create(&self, req: ClientFields) -> Result<Client> {
		let first_name = crate::require_text("firstName", req.first_name.as_deref())?;
		let last_name = crate::require_text("lastName", req.last_name.as_deref())?;
		let now = OffsetDateTime::now_utc();
		let id = counters::next_id(&self.db.pool, "clients").await?;
		let client = sqlx::query_as::<_, Client>(
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
	avatar_url,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $16)
RETURNING *",
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
		.bind(req.category.unwrap_or(ClientCategory::Prospect).as_str())
		.bind(req.status.unwrap_or(ActiveStatus::Active).as_str())
		.bind(req.notes.as_deref())
		.bind(req.avatar_url.as_deref())
		.bind(now)
		.fetch_one(&self.db.pool)
		.await?;

		tracing::info!(client_id = client.id, "Client created.");

		Ok(client)
	}

	pub async fn clients_update(&self, req: UpdateClientRequest) -> Result<Client> {
		let fields = req.fields;
		let client = sqlx::query_as::<_, Client>(
			"\
UPDATE clients
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
	category = COALESCE($12, category),
	status = COALESCE($13, status),
	notes = COALESCE($14, notes),
	avatar_url = COALESCE($15, avatar_url),
	updated_at = $16
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
		.bind(fields.category.map(ClientCategory::as_str))
		.bind(fields.status.map(ActiveStatus::as_str))
		.bind(fields.notes.as_deref())
		.bind(fields.avatar_url.as_deref())
		.bind(OffsetDateTime::now_utc())
		.fetch_optional(&self.db.pool)
		.await?
		.ok_or_else(|| Error::not_found("Client not found"))?;

		Ok(client)
	}

	pub async fn clients_delete(&self, req: IdRequest) -> Result<SuccessResponse> {
		sqlx::query("DELETE FROM clients WHERE id = $1").bind(req.id).execute(&self.db.pool).await?;

		Ok(SuccessResponse::OK)
	}

	pub(crate) async fn find_client(&self, id: i64) -> Result<Option<Client>> {
		let client = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = $1")
			.bind(id)
			.fetch_optional(&self.db.pool)
			.await?;

		Ok(client)
	}
}
