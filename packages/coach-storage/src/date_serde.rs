//! Calendar dates as `YYYY-MM-DD`. A full RFC 3339 timestamp is accepted and truncated to its
//! date.

pub mod option;

use serde::{Deserialize, Deserializer, Serializer};
use time::{
	Date, OffsetDateTime, format_description::well_known::Rfc3339, macros::format_description,
};

pub fn serialize<S>(value: &Date, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	serializer.serialize_str(&format(*value))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Date, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = String::deserialize(deserializer)?;

	parse(&raw).map_err(serde::de::Error::custom)
}

pub fn format(value: Date) -> String {
	format!("{:04}-{:02}-{:02}", value.year(), u8::from(value.month()), value.day())
}

/// `dd/mm/yyyy`, the format used in exports and printed documents.
pub fn format_fr(value: Date) -> String {
	format!("{:02}/{:02}/{:04}", value.day(), u8::from(value.month()), value.year())
}

pub fn parse(raw: &str) -> Result<Date, String> {
	let raw = raw.trim();

	if let Ok(date) = Date::parse(raw, format_description!("[year]-[month]-[day]")) {
		return Ok(date);
	}

	OffsetDateTime::parse(raw, &Rfc3339)
		.map(OffsetDateTime::date)
		.map_err(|_| format!("Invalid date {raw:?}; expected YYYY-MM-DD."))
}

#[cfg(test)]
mod tests {
	use time::macros::date;

	use super::*;

	#[test]
	fn accepts_dates_and_timestamps() {
		assert_eq!(parse("2026-03-02"), Ok(date!(2026 - 03 - 02)));
		assert_eq!(parse("2026-03-02T18:30:00Z"), Ok(date!(2026 - 03 - 02)));
		assert!(parse("02/03/2026").is_err());
	}

	#[test]
	fn formats_both_layouts() {
		assert_eq!(format(date!(2026 - 03 - 02)), "2026-03-02");
		assert_eq!(format_fr(date!(2026 - 03 - 02)), "02/03/2026");
	}
}
