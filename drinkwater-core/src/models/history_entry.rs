use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One consumption event. Entries are immutable once written.
///
/// Serialized as `{"value": <ml>, "date": "<ISO-8601>"}`, the record shape
/// stored under the per-user history key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "value")]
    pub amount: u32,
    #[serde(rename = "date", with = "iso8601_millis")]
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    /// Timestamps are kept at millisecond precision, the resolution they
    /// are stored at.
    pub fn new(amount: u32, timestamp: DateTime<Utc>) -> Self {
        Self {
            amount,
            timestamp: timestamp.trunc_subsecs(3),
        }
    }
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>6}ml  {}",
            self.amount,
            self.timestamp.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// UTC timestamps with millisecond precision and a `Z` suffix on write;
/// any RFC 3339 timestamp on read.
mod iso8601_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_serializes_with_stored_field_names() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 8, 15, 30).unwrap();
        let entry = HistoryEntry::new(300, ts);

        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"value":300,"date":"2025-03-01T08:15:30.000Z"}"#);
    }

    #[test]
    fn test_parses_offset_timestamps() {
        let entry: HistoryEntry =
            serde_json::from_str(r#"{"value":250,"date":"2025-03-01T10:15:30.5+02:00"}"#).unwrap();

        assert_eq!(entry.amount, 250);
        assert_eq!(
            entry.timestamp,
            Utc.with_ymd_and_hms(2025, 3, 1, 8, 15, 30).unwrap()
                + chrono::Duration::milliseconds(500)
        );
    }

    #[test]
    fn test_new_entry_equals_its_stored_form() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 8, 15, 30).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        let entry = HistoryEntry::new(300, ts);

        let json = serde_json::to_string(&entry).unwrap();
        let stored: HistoryEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(stored, entry);
        assert_eq!(entry.timestamp.timestamp_subsec_millis(), 123);
    }

    #[test]
    fn test_rejects_malformed_date() {
        let result = serde_json::from_str::<HistoryEntry>(r#"{"value":250,"date":"yesterday"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_display() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 8, 15, 30).unwrap();
        let output = HistoryEntry::new(500, ts).to_string();
        assert!(output.contains("500ml"));
        assert!(output.contains("2025-03-01 08:15:30"));
    }
}
