//! Portal accounts: password login, session tokens and email invitations.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{CoachService, Error, Result};
use coach_providers::tokens::{self, SessionClaims};
use coach_storage::{counters, models::ClientUser};

const INVITATION_TOKEN_LEN: usize = 32;
const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientUserRequest {
	pub client_id: i64,
	pub email: String,
	pub password: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CreateClientUserResponse {
	pub success: bool,
	pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthenticateRequest {
	pub email: String,
	pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
	pub id: i64,
	pub client_id: i64,
	pub email: String,
	pub session_token: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationRequest {
	pub client_id: i64,
	pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
	pub token: String,
	pub invitation_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AcceptInvitationRequest {
	pub token: String,
	pub password: String,
}

impl CoachService {
	pub async fn client_auth_create_client_user(
		&self,
		req: CreateClientUserRequest,
	) -> Result<CreateClientUserResponse> {
		let email = normalize_email(&req.email)?;
		let password = crate::require_text("password", Some(req.password.as_str()))?;

		if self.find_client(req.client_id).await?.is_none() {
			return Err(Error::not_found("Client not found"));
		}
		if self.find_client_user_by_email(&email).await?.is_some() {
			return Err(Error::conflict("Email already exists"));
		}

		let password_hash = tokens::hash_password(password)?;
		let now = OffsetDateTime::now_utc();
		let id = counters::next_id(&self.db.pool, "client_users").await?;

		sqlx::query(
			"\
INSERT INTO client_users (id, client_id, email, password_hash, is_active, created_at, updated_at)
VALUES ($1, $2, $3, $4, TRUE, $5, $5)",
		)
		.bind(id)
		.bind(req.client_id)
		.bind(&email)
		.bind(password_hash)
		.bind(now)
		.execute(&self.db.pool)
		.await?;

		tracing::info!(client_user_id = id, client_id = req.client_id, "Portal account created.");

		Ok(CreateClientUserResponse { success: true, id })
	}

	/// Checks the password before the account state so unknown addresses and inactive ones are
	/// indistinguishable to a caller without the password.
	pub async fn client_auth_authenticate(
		&self,
		req: AuthenticateRequest,
	) -> Result<AuthenticatedUser> {
		let email = req.email.trim().to_lowercase();
		let Some(user) = self.find_client_user_by_email(&email).await? else {
			return Err(Error::unauthorized(INVALID_CREDENTIALS));
		};

		if !tokens::verify_password(&req.password, &user.password_hash) {
			return Err(Error::unauthorized(INVALID_CREDENTIALS));
		}
		if !user.is_active {
			return Err(Error::unauthorized("Account is inactive"));
		}

		let now = OffsetDateTime::now_utc();

		sqlx::query("UPDATE client_users SET last_login = $2, updated_at = $2 WHERE id = $1")
			.bind(user.id)
			.bind(now)
			.execute(&self.db.pool)
			.await?;

		let expires_at = now + Duration::hours(self.cfg.security.session_ttl_hours);
		let session_token = tokens::sign_session(
			&self.cfg.security.session_secret,
			SessionClaims {
				client_user_id: user.id,
				client_id: user.client_id,
				expires_at: expires_at.unix_timestamp(),
			},
		)?;

		Ok(AuthenticatedUser {
			id: user.id,
			client_id: user.client_id,
			email: user.email,
			session_token,
		})
	}

	/// Refreshes the token of an existing account, or opens an inactive one without a password.
	pub async fn client_auth_generate_invitation_token(
		&self,
		req: InvitationRequest,
	) -> Result<Invitation> {
		let email = normalize_email(&req.email)?;
		let token = tokens::random_alphanumeric(INVITATION_TOKEN_LEN);
		let now = OffsetDateTime::now_utc();

		if let Some(user) = self.find_client_user_by_email(&email).await? {
			sqlx::query(
				"\
UPDATE client_users
SET invitation_token = $2, invitation_sent_at = $3, updated_at = $3
WHERE id = $1",
			)
			.bind(user.id)
			.bind(&token)
			.bind(now)
			.execute(&self.db.pool)
			.await?;
		} else {
			let id = counters::next_id(&self.db.pool, "client_users").await?;

			sqlx::query(
				"\
INSERT INTO client_users (
	id,
	client_id,
	email,
	password_hash,
	is_active,
	invitation_token,
	invitation_sent_at,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, '', FALSE, $4, $5, $5, $5)",
			)
			.bind(id)
			.bind(req.client_id)
			.bind(&email)
			.bind(&token)
			.bind(now)
			.execute(&self.db.pool)
			.await?;
		}

		let invitation_url =
			format!("{}/invitation/{token}", self.cfg.app.public_url.trim_end_matches('/'));

		Ok(Invitation { token, invitation_url })
	}

	pub async fn client_auth_accept_invitation(
		&self,
		req: AcceptInvitationRequest,
	) -> Result<crate::SuccessResponse> {
		let password = crate::require_text("password", Some(req.password.as_str()))?;
		let token = req.token.trim();
		let user = sqlx::query_as::<_, ClientUser>(
			"SELECT * FROM client_users WHERE invitation_token = $1",
		)
		.bind(token)
		.fetch_optional(&self.db.pool)
		.await?
		.ok_or_else(|| Error::not_found("Invalid invitation token"))?;
		let password_hash = tokens::hash_password(password)?;

		sqlx::query(
			"\
UPDATE client_users
SET password_hash = $2, is_active = TRUE, invitation_token = NULL, updated_at = $3
WHERE id = $1",
		)
		.bind(user.id)
		.bind(password_hash)
		.bind(OffsetDateTime::now_utc())
		.execute(&self.db.pool)
		.await?;

		tracing::info!(client_user_id = user.id, "Portal invitation accepted.");

		Ok(crate::SuccessResponse::OK)
	}

	pub(crate) async fn find_client_user(&self, id: i64) -> Result<Option<ClientUser>> {
		let user = sqlx::query_as::<_, ClientUser>("SELECT * FROM client_users WHERE id = $1")
			.bind(id)
			.fetch_optional(&self.db.pool)
			.await?;

		Ok(user)
	}

	async fn find_client_user_by_email(&self, email: &str) -> Result<Option<ClientUser>> {
		let user =
			sqlx::query_as::<_, ClientUser>("SELECT * FROM client_users WHERE lower(email) = $1")
				.bind(email)
				.fetch_optional(&self.db.pool)
				.await?;

		Ok(user)
	}
}

fn normalize_email(raw: &str) -> Result<String> {
	let email = crate::require_text("email", Some(raw))?.to_lowercase();

	if !email.contains('@') {
		return Err(Error::invalid("email must be a valid address."));
	}

	Ok(email)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn emails_are_trimmed_and_lowercased() {
		assert_eq!(normalize_email(" Lea@Example.FR ").expect("Must accept email."), "lea@example.fr");
		assert!(normalize_email("lea.example.fr").is_err());
		assert!(normalize_email("  ").is_err());
	}
}
