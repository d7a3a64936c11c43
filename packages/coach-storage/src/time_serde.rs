//! RFC 3339 timestamps on the wire.
//!
//! Inputs may also be a bare `YYYY-MM-DD`, read as midnight UTC, which is what date pickers send.

pub mod option;

use serde::{Deserialize, Deserializer, Serializer};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub fn serialize<S>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	let formatted = value.format(&Rfc3339).map_err(serde::ser::Error::custom)?;

	serializer.serialize_str(&formatted)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = String::deserialize(deserializer)?;

	parse(&raw).map_err(serde::de::Error::custom)
}

pub fn parse(raw: &str) -> Result<OffsetDateTime, String> {
	let raw = raw.trim();

	if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
		return Ok(value);
	}

	crate::date_serde::parse(raw)
		.map(|date| date.midnight().assume_utc())
		.map_err(|_| format!("Invalid timestamp {raw:?}; expected RFC 3339 or YYYY-MM-DD."))
}
