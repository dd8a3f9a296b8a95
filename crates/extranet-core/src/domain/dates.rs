//! Date parsing and formatting shared by the API and exports.

use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::errors::{ExtranetError, ExtranetResult};

/// Parses an expiration date sent by the frontend.
///
/// Accepts `YYYY-MM-DD` (midnight UTC) and RFC 3339 timestamps. An empty or
/// blank value means "no expiration".
pub fn parse_expiration(raw: Option<&str>) -> ExtranetResult<Option<DateTime<Utc>>> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty() && *s != "null") else {
        return Ok(None);
    };

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Some(dt.and_utc()))
        .ok_or_else(|| ExtranetError::validation(format!("Date d'expiration invalide : {raw}")))
}

/// `dd/MM/yyyy HH:mm:ss`, the format used in CSV exports.
pub fn format_export(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%d/%m/%Y %H:%M:%S").to_string())
        .unwrap_or_default()
}

pub(crate) fn to_unix(ts: DateTime<Utc>) -> i64 {
    ts.timestamp()
}

pub(crate) fn from_unix(secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_plain_date_is_midnight_utc() {
        let parsed = parse_expiration(Some("2025-06-30")).unwrap().unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 6, 30, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let parsed = parse_expiration(Some("2025-06-30T10:00:00+02:00"))
            .unwrap()
            .unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 6, 30, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_blank_means_none_and_garbage_is_rejected() {
        assert_eq!(parse_expiration(None).unwrap(), None);
        assert_eq!(parse_expiration(Some("  ")).unwrap(), None);
        assert_eq!(parse_expiration(Some("null")).unwrap(), None);
        assert!(parse_expiration(Some("30/06/2025")).is_err());
    }

    #[test]
    fn test_format_export() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 5, 9, 3, 7).unwrap();
        assert_eq!(format_export(Some(ts)), "05/01/2024 09:03:07");
        assert_eq!(format_export(None), "");
    }

    #[test]
    fn test_unix_round_trip() {
        let ts = Utc.with_ymd_and_hms(2030, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(from_unix(to_unix(ts)), ts);
    }
}
