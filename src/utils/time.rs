use crate::core::errors::ExchangeError;
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock time in milliseconds since the Unix epoch
pub fn timestamp_millis() -> Result<u64, ExchangeError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .map_err(|e| ExchangeError::SigningFailure(format!("System clock before Unix epoch: {}", e)))
}

/// Render exchange millis as RFC 3339, truncated to whole seconds
pub fn format_millis(millis: u64) -> String {
    i64::try_from(millis / 1000)
        .ok()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .map_or_else(
            || millis.to_string(),
            |time: DateTime<Utc>| time.to_rfc3339_opts(SecondsFormat::Secs, true),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_millis_is_recent() {
        let millis = timestamp_millis().unwrap();
        // 2023-11-14T22:13:20Z
        assert!(millis > 1_700_000_000_000);
    }

    #[test]
    fn test_format_millis_drops_sub_second_part() {
        assert_eq!(format_millis(1_499_827_319_559), "2017-07-12T02:41:59Z");
        assert_eq!(format_millis(0), "1970-01-01T00:00:00Z");
    }
}
