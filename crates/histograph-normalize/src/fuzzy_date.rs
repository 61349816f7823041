//! Fuzzy date conversion.
//!
//! Historical sources rarely know an exact instant. A fuzzy date names a
//! period (a year, a month, a day) or a range of two such periods, and is
//! converted to the earliest and latest instant it can denote.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use histograph_types::FieldValue;

/// Earliest and latest instant a fuzzy date can denote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzyRange {
    /// First instant of the period
    pub earliest: DateTime<Utc>,
    /// Last instant of the period
    pub latest: DateTime<Utc>,
}

impl FuzzyRange {
    /// Payload form: a two element array of RFC 3339 strings.
    pub fn to_field(&self) -> FieldValue {
        FieldValue::Array(vec![
            FieldValue::String(self.earliest.to_rfc3339()),
            FieldValue::String(self.latest.to_rfc3339()),
        ])
    }
}

/// Converts a fuzzy date value into an instant range.
pub trait FuzzyDateConverter: Send + Sync {
    /// Convert `value`. The error string describes why it is not a date.
    fn convert(&self, value: &FieldValue) -> Result<FuzzyRange, String>;
}

/// Default converter.
///
/// Accepts `1990`, `"1990"`, `"1990-05"`, `"1990-05-17"`, RFC 3339 instants,
/// and `[from, to]` pairs of those.
#[derive(Debug, Clone, Copy, Default)]
pub struct FuzzyDates;

impl FuzzyDates {
    /// Create the default converter.
    pub fn new() -> Self {
        Self
    }
}

impl FuzzyDateConverter for FuzzyDates {
    fn convert(&self, value: &FieldValue) -> Result<FuzzyRange, String> {
        match value {
            FieldValue::Array(items) => match items.as_slice() {
                [from, to] => {
                    let earliest = period(from)?.earliest;
                    let latest = period(to)?.latest;
                    if earliest > latest {
                        return Err(format!("range starts after it ends: {value}"));
                    }
                    Ok(FuzzyRange { earliest, latest })
                }
                _ => Err(format!("expected a [from, to] pair, got {value}")),
            },
            other => period(other),
        }
    }
}

fn period(value: &FieldValue) -> Result<FuzzyRange, String> {
    match value {
        FieldValue::Number(n) => match n.as_i64().and_then(|y| i32::try_from(y).ok()) {
            Some(year) => year_range(year),
            None => Err(format!("not a year: {n}")),
        },
        FieldValue::String(s) => parse_period(s.trim()),
        other => Err(format!("unsupported date value: {other}")),
    }
}

fn parse_period(s: &str) -> Result<FuzzyRange, String> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(s) {
        let instant = instant.with_timezone(&Utc);
        return Ok(FuzzyRange {
            earliest: instant,
            latest: instant,
        });
    }

    if let Ok(day) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(FuzzyRange {
            earliest: start_of(day)?,
            latest: end_of(day)?,
        });
    }

    if let Ok(first) = NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d") {
        return month_range(first);
    }

    match s.parse::<i32>() {
        Ok(year) => year_range(year),
        Err(_) => Err(format!("unrecognized date: {s}")),
    }
}

fn start_of(day: NaiveDate) -> Result<DateTime<Utc>, String> {
    day.and_hms_opt(0, 0, 0)
        .map(|t| Utc.from_utc_datetime(&t))
        .ok_or_else(|| format!("invalid day: {day}"))
}

fn end_of(day: NaiveDate) -> Result<DateTime<Utc>, String> {
    day.and_hms_opt(23, 59, 59)
        .map(|t| Utc.from_utc_datetime(&t))
        .ok_or_else(|| format!("invalid day: {day}"))
}

fn month_range(first: NaiveDate) -> Result<FuzzyRange, String> {
    use chrono::Datelike;

    let (year, month) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    let last = NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|next| next.pred_opt())
        .ok_or_else(|| format!("month out of range: {first}"))?;

    Ok(FuzzyRange {
        earliest: start_of(first)?,
        latest: end_of(last)?,
    })
}

fn year_range(year: i32) -> Result<FuzzyRange, String> {
    let first = NaiveDate::from_ymd_opt(year, 1, 1);
    let last = NaiveDate::from_ymd_opt(year, 12, 31);
    match (first, last) {
        (Some(first), Some(last)) => Ok(FuzzyRange {
            earliest: start_of(first)?,
            latest: end_of(last)?,
        }),
        _ => Err(format!("year out of range: {year}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_year_string_and_number() {
        let converter = FuzzyDates::new();
        let expected = FuzzyRange {
            earliest: utc("1990-01-01T00:00:00Z"),
            latest: utc("1990-12-31T23:59:59Z"),
        };
        assert_eq!(converter.convert(&FieldValue::from("1990")).unwrap(), expected);
        assert_eq!(converter.convert(&FieldValue::integer(1990)).unwrap(), expected);
    }

    #[test]
    fn test_month() {
        let range = FuzzyDates::new().convert(&FieldValue::from("1990-02")).unwrap();
        assert_eq!(range.earliest, utc("1990-02-01T00:00:00Z"));
        assert_eq!(range.latest, utc("1990-02-28T23:59:59Z"));

        let december = FuzzyDates::new().convert(&FieldValue::from("1999-12")).unwrap();
        assert_eq!(december.latest, utc("1999-12-31T23:59:59Z"));
    }

    #[test]
    fn test_day() {
        let range = FuzzyDates::new().convert(&FieldValue::from("1672-06-12")).unwrap();
        assert_eq!(range.earliest, utc("1672-06-12T00:00:00Z"));
        assert_eq!(range.latest, utc("1672-06-12T23:59:59Z"));
    }

    #[test]
    fn test_instant() {
        let range = FuzzyDates::new()
            .convert(&FieldValue::from("2001-09-09T01:46:40Z"))
            .unwrap();
        assert_eq!(range.earliest, range.latest);
        assert_eq!(range.earliest.timestamp(), 1_000_000_000);
    }

    #[test]
    fn test_range_pair() {
        let value = FieldValue::Array(vec![FieldValue::from("1800"), FieldValue::from("1850-06")]);
        let range = FuzzyDates::new().convert(&value).unwrap();
        assert_eq!(range.earliest, utc("1800-01-01T00:00:00Z"));
        assert_eq!(range.latest, utc("1850-06-30T23:59:59Z"));
    }

    #[test]
    fn test_rejects_garbage() {
        let converter = FuzzyDates::new();
        assert!(converter.convert(&FieldValue::from("sometime")).is_err());
        assert!(converter.convert(&FieldValue::Bool(true)).is_err());
        assert!(converter
            .convert(&FieldValue::Array(vec![FieldValue::from("1900")]))
            .is_err());
        assert!(converter
            .convert(&FieldValue::Array(vec![
                FieldValue::from("1900"),
                FieldValue::from("1800")
            ]))
            .is_err());
    }

    #[test]
    fn test_to_field() {
        let range = FuzzyDates::new().convert(&FieldValue::from("1990")).unwrap();
        let FieldValue::Array(items) = range.to_field() else {
            panic!("expected array");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_str(), Some("1990-01-01T00:00:00+00:00"));
    }
}
