use argon2::{
	Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
	password_hash::{SaltString, rand_core::OsRng},
};
use hmac::{Hmac, Mac};
use rand::{Rng, RngCore, distributions::Alphanumeric};
use sha2::Sha256;

use crate::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Claims carried by a portal session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionClaims {
	pub client_user_id: i64,
	pub client_id: i64,
	pub expires_at: i64,
}

/// Hex encoding of `bytes` random bytes.
pub fn random_hex(bytes: usize) -> String {
	let mut buf = vec![0_u8; bytes];

	rand::thread_rng().fill_bytes(&mut buf);

	hex::encode(buf)
}

pub fn random_alphanumeric(len: usize) -> String {
	rand::thread_rng().sample_iter(&Alphanumeric).take(len).map(char::from).collect()
}

/// Unsubscribe links carry this token so an address can only be blacklisted by its owner.
pub fn unsubscribe_token(secret: &str, email: &str) -> Result<String> {
	let mut mac = keyed(secret)?;

	mac.update(email.trim().to_lowercase().as_bytes());

	Ok(hex::encode(mac.finalize().into_bytes()))
}

pub fn verify_unsubscribe_token(secret: &str, email: &str, token: &str) -> bool {
	let Ok(expected) = hex::decode(token.trim()) else {
		return false;
	};
	let Ok(mut mac) = keyed(secret) else {
		return false;
	};

	mac.update(email.trim().to_lowercase().as_bytes());

	mac.verify_slice(&expected).is_ok()
}

pub fn sign_session(secret: &str, claims: SessionClaims) -> Result<String> {
	let payload = format!("{}.{}.{}", claims.client_user_id, claims.client_id, claims.expires_at);
	let mut mac = keyed(secret)?;

	mac.update(payload.as_bytes());

	Ok(format!("{payload}.{}", hex::encode(mac.finalize().into_bytes())))
}

pub fn verify_session(secret: &str, token: &str, now_unix: i64) -> Result<SessionClaims> {
	let (payload, signature) = token
		.trim()
		.rsplit_once('.')
		.ok_or_else(|| token_error("Session token is malformed."))?;
	let expected =
		hex::decode(signature).map_err(|_| token_error("Session token is malformed."))?;
	let mut mac = keyed(secret)?;

	mac.update(payload.as_bytes());
	mac.verify_slice(&expected).map_err(|_| token_error("Session token signature mismatch."))?;

	let mut parts = payload.split('.').map(str::parse::<i64>);
	let (Some(Ok(client_user_id)), Some(Ok(client_id)), Some(Ok(expires_at)), None) =
		(parts.next(), parts.next(), parts.next(), parts.next())
	else {
		return Err(token_error("Session token is malformed."));
	};

	if expires_at <= now_unix {
		return Err(token_error("Session expired."));
	}

	Ok(SessionClaims { client_user_id, client_id, expires_at })
}

/// Compares two secrets without leaking the position of the first mismatch.
pub fn secrets_match(expected: &str, presented: &str) -> bool {
	let Ok(mut reference) = keyed(expected) else {
		return false;
	};

	reference.update(expected.as_bytes());

	let tag = reference.finalize().into_bytes();
	let Ok(mut candidate) = keyed(expected) else {
		return false;
	};

	candidate.update(presented.as_bytes());

	candidate.verify_slice(&tag).is_ok()
}

pub fn hash_password(password: &str) -> Result<String> {
	let salt = SaltString::generate(&mut OsRng);
	let hash = Argon2::default()
		.hash_password(password.as_bytes(), &salt)
		.map_err(|err| Error::Password { message: err.to_string() })?;

	Ok(hash.to_string())
}

/// False for a wrong password and for accounts that never set one.
pub fn verify_password(password: &str, phc: &str) -> bool {
	let Ok(parsed) = PasswordHash::new(phc) else {
		return false;
	};

	Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
}

fn keyed(secret: &str) -> Result<HmacSha256> {
	HmacSha256::new_from_slice(secret.as_bytes())
		.map_err(|err| Error::Token { message: err.to_string() })
}

fn token_error(message: &str) -> Error {
	Error::Token { message: message.to_string() }
}
