//! `MM/YY` expiry descriptors (card-style "valid until" dates).

use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use event_store::Event;
use serde::{Deserialize, Serialize};

use crate::{ProjectionError, Result};

/// A month/year expiry such as `"09/25"`.
///
/// The descriptor is valid through the last calendar day of its month, so
/// `"09/25"` expires on 2025-09-30 and `"02/24"` on 2024-02-29.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExpiryDescriptor {
    expires_on: NaiveDate,
}

impl ExpiryDescriptor {
    /// Two-digit years are read as 20YY.
    const CENTURY: i32 = 2000;

    /// Parses an `"MM/YY"` string.
    ///
    /// The month may be one or two digits, the year must be exactly two.
    /// Surrounding whitespace is ignored.
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = |reason: &str| ProjectionError::InvalidExpiryFormat {
            value: value.to_string(),
            reason: reason.to_string(),
        };

        let (month, year) = value
            .trim()
            .split_once('/')
            .ok_or_else(|| invalid("expected MM/YY"))?;

        if month.is_empty() || month.len() > 2 || !month.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("month must be one or two digits"));
        }
        if year.len() != 2 || !year.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("year must be two digits"));
        }

        let month: u32 = month.parse().map_err(|_| invalid("month is not a number"))?;
        let year: i32 = year.parse().map_err(|_| invalid("year is not a number"))?;

        Self::new(month, Self::CENTURY + year).ok_or_else(|| invalid("month must be between 1 and 12"))
    }

    /// Builds a descriptor for `month` of the full `year`.
    ///
    /// Returns `None` if the month is outside 1–12.
    pub fn new(month: u32, year: i32) -> Option<Self> {
        if !(1..=12).contains(&month) {
            return None;
        }
        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
        let expires_on = NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()?;
        Some(Self { expires_on })
    }

    /// Reads and parses the descriptor stored under `field` in an event's
    /// metadata.
    pub fn from_metadata(event: &Event, field: &str) -> Result<Self> {
        match event.metadata_value(field) {
            Some(serde_json::Value::String(value)) => Self::parse(value),
            Some(other) => Err(ProjectionError::InvalidExpiryFormat {
                value: other.to_string(),
                reason: format!("metadata field `{field}` is not a string"),
            }),
            None => Err(ProjectionError::InvalidExpiryFormat {
                value: String::new(),
                reason: format!("metadata field `{field}` is missing"),
            }),
        }
    }

    /// Month, 1–12.
    pub fn month(&self) -> u32 {
        self.expires_on.month()
    }

    /// Full year, e.g. 2025.
    pub fn year(&self) -> i32 {
        self.expires_on.year()
    }

    /// The last calendar day on which the descriptor is still valid.
    pub fn end_of_month(&self) -> NaiveDate {
        self.expires_on
    }
}

impl FromStr for ExpiryDescriptor {
    type Err = ProjectionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Display for ExpiryDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}/{:02}", self.month(), self.year().rem_euclid(100))
    }
}

impl TryFrom<String> for ExpiryDescriptor {
    type Error = ProjectionError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ExpiryDescriptor> for String {
    fn from(descriptor: ExpiryDescriptor) -> Self {
        descriptor.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use event_store::EventRecord;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_to_last_day_of_month() {
        let descriptor = ExpiryDescriptor::parse("09/25").unwrap();
        assert_eq!(descriptor.end_of_month(), date(2025, 9, 30));
        assert_eq!(descriptor.month(), 9);
        assert_eq!(descriptor.year(), 2025);
    }

    #[test]
    fn formats_back_to_original() {
        assert_eq!(ExpiryDescriptor::parse("09/25").unwrap().to_string(), "09/25");
        assert_eq!(ExpiryDescriptor::parse("12/30").unwrap().to_string(), "12/30");
    }

    #[test]
    fn single_digit_month_normalizes() {
        let descriptor: ExpiryDescriptor = " 2/25 ".parse().unwrap();
        assert_eq!(descriptor.to_string(), "02/25");
        assert_eq!(descriptor.end_of_month(), date(2025, 2, 28));
    }

    #[test]
    fn handles_leap_years_and_december() {
        assert_eq!(
            ExpiryDescriptor::parse("02/24").unwrap().end_of_month(),
            date(2024, 2, 29)
        );
        assert_eq!(
            ExpiryDescriptor::parse("12/25").unwrap().end_of_month(),
            date(2025, 12, 31)
        );
        assert_eq!(
            ExpiryDescriptor::parse("04/00").unwrap().end_of_month(),
            date(2000, 4, 30)
        );
    }

    #[test]
    fn rejects_month_out_of_range() {
        for value in ["13/25", "00/25"] {
            let err = ExpiryDescriptor::parse(value).unwrap_err();
            match err {
                ProjectionError::InvalidExpiryFormat { value: v, reason } => {
                    assert_eq!(v, value);
                    assert!(reason.contains("between 1 and 12"));
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn rejects_malformed_strings() {
        for value in ["", "0925", "09-25", "ab/25", "09/2025", "09/2", "9/x5", "/25", "09/", "-1/25"] {
            assert!(
                matches!(
                    ExpiryDescriptor::parse(value),
                    Err(ProjectionError::InvalidExpiryFormat { .. })
                ),
                "{value:?} should be rejected"
            );
        }
    }

    #[test]
    fn serde_uses_string_form() {
        let descriptor = ExpiryDescriptor::parse("09/25").unwrap();
        assert_eq!(serde_json::to_string(&descriptor).unwrap(), "\"09/25\"");
        let back: ExpiryDescriptor = serde_json::from_str("\"09/25\"").unwrap();
        assert_eq!(back, descriptor);
        assert!(serde_json::from_str::<ExpiryDescriptor>("\"13/25\"").is_err());
    }

    #[test]
    fn from_metadata_reads_field() {
        let builder = EventRecord::builder()
            .entity_id("U1")
            .event_type("add-payment-method")
            .occurred_at(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());

        let event = Event::try_from_record(
            builder.metadata("valid_until", serde_json::json!("02/25")).build(),
            0,
        )
        .unwrap();
        let descriptor = ExpiryDescriptor::from_metadata(&event, "valid_until").unwrap();
        assert_eq!(descriptor.end_of_month(), date(2025, 2, 28));

        assert!(matches!(
            ExpiryDescriptor::from_metadata(&event, "card_expiry"),
            Err(ProjectionError::InvalidExpiryFormat { .. })
        ));
    }

    #[test]
    fn from_metadata_rejects_non_string() {
        let event = Event::try_from_record(
            EventRecord::builder()
                .entity_id("U1")
                .event_type("add-payment-method")
                .occurred_at(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
                .metadata("valid_until", serde_json::json!(225))
                .build(),
            0,
        )
        .unwrap();
        let err = ExpiryDescriptor::from_metadata(&event, "valid_until").unwrap_err();
        assert!(err.to_string().contains("not a string"));
    }
}
