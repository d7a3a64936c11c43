//! Caller identity from the `Authorization` header.

use axum::http::{HeaderMap, header::AUTHORIZATION};

use coach_config::Security;
use coach_providers::tokens::{self, SessionClaims};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
	Anonymous,
	Admin,
	Client(SessionClaims),
}

/// Admin token first, then a portal session. Anything else, including an expired or forged
/// session, is anonymous.
pub fn identify(security: &Security, headers: &HeaderMap, now_unix: i64) -> Caller {
	let Some(token) = bearer_token(headers) else {
		return Caller::Anonymous;
	};

	if tokens::secrets_match(&security.admin_token, token) {
		return Caller::Admin;
	}

	match tokens::verify_session(&security.session_secret, token, now_unix) {
		Ok(claims) => Caller::Client(claims),
		Err(err) => {
			tracing::debug!(error = %err, "Rejected bearer token.");

			Caller::Anonymous
		},
	}
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
	let raw = headers.get(AUTHORIZATION)?.to_str().ok()?;
	let (scheme, token) = raw.trim().split_once(' ')?;

	if !scheme.eq_ignore_ascii_case("bearer") {
		return None;
	}

	let token = token.trim();

	(!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
	use axum::http::HeaderValue;

	use super::*;

	fn security() -> Security {
		Security {
			bind_localhost_only: true,
			admin_token: "admin-token".to_string(),
			session_secret: "session-secret".to_string(),
			unsubscribe_secret: "unsubscribe-secret".to_string(),
			session_ttl_hours: 24,
		}
	}

	fn headers(value: &str) -> HeaderMap {
		let mut headers = HeaderMap::new();

		headers.insert(AUTHORIZATION, HeaderValue::from_str(value).expect("Valid header value."));

		headers
	}

	#[test]
	fn admin_token_wins() {
		assert_eq!(identify(&security(), &headers("Bearer admin-token"), 0), Caller::Admin);
		assert_eq!(identify(&security(), &headers("bearer admin-token"), 0), Caller::Admin);
	}

	#[test]
	fn valid_sessions_identify_portal_clients() {
		let claims = SessionClaims { client_user_id: 4, client_id: 9, expires_at: 2_000 };
		let token = tokens::sign_session("session-secret", claims).expect("Must sign.");

		assert_eq!(
			identify(&security(), &headers(&format!("Bearer {token}")), 1_000),
			Caller::Client(claims)
		);
		assert_eq!(
			identify(&security(), &headers(&format!("Bearer {token}")), 3_000),
			Caller::Anonymous
		);
	}

	#[test]
	fn missing_or_foreign_schemes_are_anonymous() {
		assert_eq!(identify(&security(), &HeaderMap::new(), 0), Caller::Anonymous);
		assert_eq!(identify(&security(), &headers("Basic admin-token"), 0), Caller::Anonymous);
		assert_eq!(identify(&security(), &headers("Bearer wrong"), 0), Caller::Anonymous);
	}
}
