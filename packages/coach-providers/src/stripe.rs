use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Verifies a `stripe-signature` header (`t=<unix>,v1=<hex>[,v1=...]`) against the raw payload.
pub fn verify_signature(
	payload: &[u8],
	header: &str,
	secret: &str,
	tolerance_seconds: i64,
	now_unix: i64,
) -> Result<()> {
	let mut timestamp = None;
	let mut signatures = Vec::new();

	for part in header.split(',') {
		let Some((key, value)) = part.trim().split_once('=') else {
			continue;
		};

		match key {
			"t" => timestamp = value.parse::<i64>().ok(),
			"v1" => signatures.push(value),
			_ => {},
		}
	}

	let Some(timestamp) = timestamp else {
		return Err(signature_error("Unable to extract timestamp and signatures from header"));
	};

	if signatures.is_empty() {
		return Err(signature_error("No signatures found with expected scheme"));
	}

	let matched = signatures.iter().any(|signature| {
		let Ok(expected) = hex::decode(signature) else {
			return false;
		};
		let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
			return false;
		};

		mac.update(format!("{timestamp}.").as_bytes());
		mac.update(payload);

		mac.verify_slice(&expected).is_ok()
	});

	if !matched {
		return Err(signature_error(
			"No signatures found matching the expected signature for payload",
		));
	}
	if (now_unix - timestamp).abs() > tolerance_seconds {
		return Err(signature_error("Timestamp outside the tolerance zone"));
	}

	Ok(())
}

/// Builds a header the way Stripe signs test deliveries.
pub fn signature_header(payload: &[u8], secret: &str, timestamp: i64) -> Result<String> {
	let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
		.map_err(|err| signature_error(&err.to_string()))?;

	mac.update(format!("{timestamp}.").as_bytes());
	mac.update(payload);

	Ok(format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes())))
}

fn signature_error(message: &str) -> Error {
	Error::Signature { message: message.to_string() }
}

#[cfg(test)]
mod tests {
	use super::*;

	const SECRET: &str = "whsec_test";
	const PAYLOAD: &[u8] = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;

	#[test]
	fn accepts_a_fresh_valid_signature() {
		let header = signature_header(PAYLOAD, SECRET, 1_700_000_000).expect("Failed to sign.");

		assert!(verify_signature(PAYLOAD, &header, SECRET, 300, 1_700_000_100).is_ok());
	}

	#[test]
	fn accepts_any_matching_v1_entry() {
		let header = signature_header(PAYLOAD, SECRET, 1_700_000_000).expect("Failed to sign.");
		let rotated = header.replacen("v1=", "v1=00ff,v1=", 1);

		assert!(verify_signature(PAYLOAD, &rotated, SECRET, 300, 1_700_000_000).is_ok());
	}

	#[test]
	fn rejects_a_tampered_payload() {
		let header = signature_header(PAYLOAD, SECRET, 1_700_000_000).expect("Failed to sign.");
		let err = verify_signature(b"{}", &header, SECRET, 300, 1_700_000_000)
			.expect_err("Tampered payload must fail.");

		assert!(err.to_string().contains("expected signature"));
	}

	#[test]
	fn rejects_stale_timestamps() {
		let header = signature_header(PAYLOAD, SECRET, 1_700_000_000).expect("Failed to sign.");
		let err = verify_signature(PAYLOAD, &header, SECRET, 300, 1_700_000_301)
			.expect_err("Stale signature must fail.");

		assert_eq!(err.to_string(), "Timestamp outside the tolerance zone");
	}

	#[test]
	fn rejects_headers_without_a_timestamp() {
		let err = verify_signature(PAYLOAD, "v1=abcd", SECRET, 300, 0)
			.expect_err("Header without timestamp must fail.");

		assert!(err.to_string().starts_with("Unable to extract timestamp"));
	}
}
