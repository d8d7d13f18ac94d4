use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use super::null_as_empty;

/// A Personal Access Token as the backend lists it.
///
/// The collection of these is owned by `TokenRegistry` and replaced wholesale
/// on every fetch; tokens are never mutated locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    #[serde(rename = "application_id")]
    pub owner_application_id: String,
    // Associations that never had a token minted come back as null
    #[serde(rename = "assoc_api_token", deserialize_with = "null_as_empty", default)]
    pub secret: String,
    pub role_id: String,
    #[serde(deserialize_with = "null_as_empty", default)]
    pub application_name: String,
    #[serde(deserialize_with = "null_as_empty", default)]
    pub component_name: String,
    #[serde(rename = "assoc_expiry_date", with = "wire_timestamp")]
    pub expires_at: DateTime<Utc>,
}

/// Response body of the generate call
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedPat {
    pub pat: String,
    #[serde(with = "wire_timestamp")]
    pub expires_at: DateTime<Utc>,
}

/// Parse a timestamp in any of the shapes the backend emits.
///
/// Accepts RFC 3339, HTTP dates (`Tue, 31 Dec 2024 00:00:00 GMT`), naive
/// ISO date-times (read as UTC) and bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

mod wire_timestamp {
    use super::*;

    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&ts.to_rfc3339())
    }

    /// A missing expiry reads as the epoch, so the token shows as expired.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(DateTime::<Utc>::UNIX_EPOCH),
            Some(raw) => parse_timestamp(&raw)
                .ok_or_else(|| de::Error::custom(format!("unrecognized timestamp: {}", raw))),
        }
    }
}
