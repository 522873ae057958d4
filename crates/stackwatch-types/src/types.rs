//! Common types used throughout Stackwatch.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Unix timestamp in seconds
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
	pub fn now() -> Timestamp {
		let res = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
		Timestamp(res.as_secs().cast_signed())
	}

	pub fn from_now(delta: i64) -> Timestamp {
		let now = Timestamp::now();
		Timestamp(now.0 + delta)
	}

	pub fn add_seconds(self, seconds: i64) -> Timestamp {
		Timestamp(self.0 + seconds)
	}

	pub fn to_iso_string(&self) -> String {
		chrono::DateTime::from_timestamp(self.0, 0)
			.map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
			.unwrap_or_default()
	}
}

impl fmt::Display for Timestamp {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Serialize a timestamp as an ISO-8601 string
pub fn serialize_timestamp_iso<S>(ts: &Timestamp, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	serializer.serialize_str(&ts.to_iso_string())
}

/// Serialize an optional timestamp as an ISO-8601 string
pub fn serialize_timestamp_iso_opt<S>(
	ts: &Option<Timestamp>,
	serializer: S,
) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	match ts {
		Some(ts) => serializer.serialize_str(&ts.to_iso_string()),
		None => serializer.serialize_none(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_iso_format() {
		assert_eq!(Timestamp(0).to_iso_string(), "1970-01-01T00:00:00Z");
		assert_eq!(Timestamp(1_700_000_000).to_iso_string(), "2023-11-14T22:13:20Z");
	}

	#[test]
	fn test_add_seconds() {
		assert_eq!(Timestamp(100).add_seconds(50), Timestamp(150));
	}
}

// vim: ts=4
