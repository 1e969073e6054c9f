//! Text parsers for the semi-structured values shown on a listing page
//!
//! Listing pages render prices as `"$1,234.56 USD"` and closing times as
//! `"Dec 18, 2024 07:45 AM MST"`. These helpers turn both into plain values
//! and normalize the free-form labels of the description table into column
//! names.

use chrono::{FixedOffset, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

/// Format of the closing time once the zone abbreviation is removed.
pub const CLOSING_TIME_FORMAT: &str = "%b %d, %Y %I:%M %p";

/// Format of the normalized closing time written to the table.
pub const UTC_OUTPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("cannot parse currency amount from `{0}`")]
    Currency(String),

    #[error("cannot parse closing time from `{0}`")]
    Timestamp(String),

    #[error("unknown time zone abbreviation `{0}`")]
    UnknownZone(String),

    #[error("cannot parse result count from `{0}`")]
    Count(String),
}

/// A time zone abbreviation as rendered after the closing time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneAbbreviation {
    pub name: &'static str,
    pub utc_offset_hours: i32,
}

const ZONES: &[ZoneAbbreviation] = &[
    zone("UTC", 0),
    zone("GMT", 0),
    zone("AST", -4),
    zone("ADT", -3),
    zone("EST", -5),
    zone("EDT", -4),
    zone("CST", -6),
    zone("CDT", -5),
    zone("MST", -7),
    zone("MDT", -6),
    zone("PST", -8),
    zone("PDT", -7),
    zone("AKST", -9),
    zone("AKDT", -8),
    zone("HST", -10),
    zone("HDT", -9),
];

const fn zone(name: &'static str, utc_offset_hours: i32) -> ZoneAbbreviation {
    ZoneAbbreviation {
        name,
        utc_offset_hours,
    }
}

impl ZoneAbbreviation {
    /// Looks up an abbreviation such as `MST` or `pdt`.
    pub fn lookup(abbreviation: &str) -> Result<Self, ParseError> {
        ZONES
            .iter()
            .find(|z| z.name.eq_ignore_ascii_case(abbreviation))
            .copied()
            .ok_or_else(|| ParseError::UnknownZone(abbreviation.to_string()))
    }

    pub fn offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600)
    }
}

/// Parses a bid such as `"$1,234.56 USD"` into `1234.56`.
///
/// Only the first whitespace-separated token is considered, so the trailing
/// currency unit is discarded.
pub fn parse_current_bid(text: &str) -> Result<f64, ParseError> {
    let amount = text
        .split_whitespace()
        .next()
        .ok_or_else(|| ParseError::Currency(text.to_string()))?
        .replace([',', '$'], "");

    amount
        .parse::<f64>()
        .map_err(|_| ParseError::Currency(text.to_string()))
}

/// Reads the leading number of a header such as `"37 Results"`.
pub fn parse_result_count(text: &str) -> Result<usize, ParseError> {
    text.split_whitespace()
        .next()
        .map(|token| token.replace(',', ""))
        .and_then(|token| token.parse::<usize>().ok())
        .ok_or_else(|| ParseError::Count(text.to_string()))
}

/// Converts a localized closing time into a UTC ISO-8601 timestamp.
///
/// `"Dec 18, 2024 07:45 AM MST"` becomes `"2024-12-18T14:45:00Z"`. The
/// enclosing parentheses the listing page puts around the time are accepted.
/// Each abbreviation names a fixed offset, daylight variants included, so the
/// local time always maps to exactly one instant.
pub fn parse_closing_time(text: &str) -> Result<String, ParseError> {
    let trimmed = text
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .trim();

    let (local, abbreviation) = trimmed
        .rsplit_once(char::is_whitespace)
        .ok_or_else(|| ParseError::Timestamp(text.to_string()))?;

    let zone = ZoneAbbreviation::lookup(abbreviation)?;
    let naive = NaiveDateTime::parse_from_str(local.trim(), CLOSING_TIME_FORMAT)
        .map_err(|_| ParseError::Timestamp(text.to_string()))?;

    let aware = zone
        .offset()
        .ok_or_else(|| ParseError::UnknownZone(abbreviation.to_string()))?
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| ParseError::Timestamp(text.to_string()))?;

    Ok(aware.with_timezone(&Utc).format(UTC_OUTPUT_FORMAT).to_string())
}

/// Turns a description label such as `"Odometer Reading:"` into
/// `"ODOMETER_READING"`. Returns `None` when nothing usable is left.
pub fn normalize_field_key(label: &str) -> Option<String> {
    let key = label
        .trim()
        .trim_end_matches(':')
        .trim()
        .replace(' ', "_")
        .to_uppercase();

    if key.is_empty() { None } else { Some(key) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_current_bid() {
        assert_eq!(parse_current_bid("$1,234.56 USD"), Ok(1234.56));
        assert_eq!(parse_current_bid("$0 USD"), Ok(0.0));
        assert_eq!(parse_current_bid("  $12,000 USD "), Ok(12000.0));
    }

    #[test]
    fn test_parse_current_bid_rejects_garbage() {
        assert!(matches!(parse_current_bid(""), Err(ParseError::Currency(_))));
        assert!(matches!(
            parse_current_bid("Make an offer"),
            Err(ParseError::Currency(_))
        ));
    }

    #[test]
    fn test_parse_result_count() {
        assert_eq!(parse_result_count("37 Results Found"), Ok(37));
        assert_eq!(parse_result_count(" 1,204 results"), Ok(1204));
        assert!(matches!(parse_result_count("No results"), Err(ParseError::Count(_))));
    }

    #[test]
    fn test_parse_closing_time_mountain_standard() {
        assert_eq!(
            parse_closing_time("Dec 18, 2024 07:45 AM MST").unwrap(),
            "2024-12-18T14:45:00Z"
        );
    }

    #[test]
    fn test_parse_closing_time_strips_parentheses() {
        assert_eq!(
            parse_closing_time("(Dec 18, 2024 07:45 AM MST)").unwrap(),
            "2024-12-18T14:45:00Z"
        );
    }

    #[test]
    fn test_parse_closing_time_daylight_rolls_over_midnight() {
        assert_eq!(
            parse_closing_time("Jul 4, 2025 09:30 PM PDT").unwrap(),
            "2025-07-05T04:30:00Z"
        );
        assert_eq!(
            parse_closing_time("Mar 1, 2025 12:00 PM est").unwrap(),
            "2025-03-01T17:00:00Z"
        );
    }

    #[test]
    fn test_parse_closing_time_errors() {
        assert_eq!(
            parse_closing_time("Dec 18, 2024 07:45 AM XYZ"),
            Err(ParseError::UnknownZone("XYZ".to_string()))
        );
        assert!(matches!(
            parse_closing_time("tomorrow MST"),
            Err(ParseError::Timestamp(_))
        ));
        assert!(matches!(parse_closing_time("MST"), Err(ParseError::Timestamp(_))));
    }

    #[test]
    fn test_zone_lookup_is_case_insensitive() {
        let mdt = ZoneAbbreviation::lookup("MDT").unwrap();
        assert_eq!(mdt.offset().unwrap().local_minus_utc(), -6 * 3600);
        assert_eq!(ZoneAbbreviation::lookup("mst").unwrap().utc_offset_hours, -7);
        assert_eq!(ZoneAbbreviation::lookup("CET"), Err(ParseError::UnknownZone("CET".to_string())));
    }

    #[test]
    fn test_normalize_field_key() {
        assert_eq!(normalize_field_key("Odometer Reading:"), Some("ODOMETER_READING".to_string()));
        assert_eq!(normalize_field_key(" Vin: "), Some("VIN".to_string()));
        assert_eq!(normalize_field_key(" : "), None);
    }
}
