use serde::{Deserialize as _, Deserializer, Serializer};
use time::Date;

pub fn serialize<S>(value: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	match value {
		Some(value) => crate::date_serde::serialize(value, serializer),
		None => serializer.serialize_none(),
	}
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Date>, D::Error>
where
	D: Deserializer<'de>,
{
	match Option::<String>::deserialize(deserializer)? {
		Some(raw) if raw.trim().is_empty() => Ok(None),
		Some(raw) => crate::date_serde::parse(&raw).map(Some).map_err(serde::de::Error::custom),
		None => Ok(None),
	}
}
