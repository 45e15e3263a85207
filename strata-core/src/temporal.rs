//! Temporal parsing and formatting
//!
//! Datetime values arrive as ISO-8601 strings, broken-down `{_year, ...}`
//! objects, or epoch numbers. They are normalized to a UTC broken-down
//! tuple; the ISO rendering of that tuple is what gets stored back into
//! documents so values round-trip exactly.

use crate::accuracy::UnitTime;
use crate::error::{Error, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use serde_json::Value;

/// UTC broken-down time with sub-second fraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tm {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    /// Fractional seconds in `[0, 1)`.
    pub fraction: f64,
}

impl Default for Tm {
    fn default() -> Self {
        Tm {
            year: 1970,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
            fraction: 0.0,
        }
    }
}

impl Tm {
    fn from_naive(ndt: NaiveDateTime) -> Self {
        Tm {
            year: ndt.year(),
            month: ndt.month(),
            day: ndt.day(),
            hour: ndt.hour(),
            minute: ndt.minute(),
            second: ndt.second(),
            fraction: f64::from(ndt.nanosecond()) / 1e9,
        }
    }

    /// Seconds since the epoch, UTC.
    pub fn timestamp(&self) -> Result<f64> {
        let date = NaiveDate::from_ymd_opt(self.year, self.month.max(1), self.day.max(1))
            .ok_or_else(|| {
                Error::serialisation(format!(
                    "Invalid date {:04}-{:02}-{:02}",
                    self.year, self.month, self.day
                ))
            })?;
        let time = NaiveTime::from_hms_opt(self.hour, self.minute, self.second).ok_or_else(|| {
            Error::serialisation(format!(
                "Invalid time {:02}:{:02}:{:02}",
                self.hour, self.minute, self.second
            ))
        })?;
        let secs = date.and_time(time).and_utc().timestamp();
        Ok(secs as f64 + self.fraction)
    }

    /// Broken-down UTC tuple for an epoch value.
    pub fn from_timestamp(epoch: f64) -> Result<Tm> {
        let secs = epoch.floor() as i64;
        let fraction = epoch - secs as f64;
        let dt = Utc
            .timestamp_opt(secs, 0)
            .single()
            .ok_or_else(|| Error::serialisation(format!("Epoch {epoch} out of range")))?;
        let mut tm = Tm::from_naive(dt.naive_utc());
        tm.fraction = fraction;
        Ok(tm)
    }

    /// Copy truncated to the coarsest field of `unit`.
    ///
    /// Year-or-coarser units floor the year with euclidean division so
    /// pre-epoch dates land in the right bucket.
    pub fn truncate(&self, unit: UnitTime) -> Tm {
        let mut tm = Tm {
            year: self.year,
            ..Tm::default()
        };
        match unit {
            UnitTime::Millennium => tm.year = self.year.div_euclid(1000) * 1000,
            UnitTime::Century => tm.year = self.year.div_euclid(100) * 100,
            UnitTime::Decade => tm.year = self.year.div_euclid(10) * 10,
            UnitTime::Year => {}
            UnitTime::Month => {
                tm.month = self.month;
            }
            UnitTime::Day => {
                tm.month = self.month;
                tm.day = self.day;
            }
            UnitTime::Hour => {
                tm.month = self.month;
                tm.day = self.day;
                tm.hour = self.hour;
            }
            UnitTime::Minute => {
                tm.month = self.month;
                tm.day = self.day;
                tm.hour = self.hour;
                tm.minute = self.minute;
            }
            UnitTime::Second => {
                tm.month = self.month;
                tm.day = self.day;
                tm.hour = self.hour;
                tm.minute = self.minute;
                tm.second = self.second;
            }
        }
        tm
    }

    /// ISO-8601 rendering, fraction trimmed of trailing zeros.
    pub fn to_iso(&self) -> String {
        let mut out = format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            self.year, self.month.max(1), self.day.max(1), self.hour, self.minute, self.second
        );
        if self.fraction > 0.0 {
            let frac = format!("{:.6}", self.fraction);
            let frac = frac.trim_start_matches('0').trim_end_matches('0');
            if frac.starts_with('.') && frac.len() > 1 {
                out.push_str(frac);
            }
        }
        out
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d", "%Y/%m/%d"];

/// Parse a datetime string: RFC3339 (offset normalized to UTC), the naive
/// ISO forms, or a bare date at midnight.
pub fn parse_datetime_str(s: &str) -> Result<Tm> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Ok(Tm::from_naive(dt.with_timezone(&Utc).naive_utc()));
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Tm::from_naive(ndt));
        }
    }
    if let Ok(tm) = parse_date_str(s) {
        return Ok(tm);
    }
    Err(Error::serialisation(format!("Invalid datetime {s:?}")))
}

/// Parse a bare date string at midnight UTC.
pub fn parse_date_str(s: &str) -> Result<Tm> {
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(Tm {
                year: date.year(),
                month: date.month(),
                day: date.day(),
                ..Tm::default()
            });
        }
    }
    Err(Error::serialisation(format!("Invalid date {s:?}")))
}

fn field_u32(map: &serde_json::Map<String, Value>, key: &str, default: u32) -> Result<u32> {
    match map.get(key) {
        None => Ok(default),
        Some(v) => v
            .as_u64()
            .map(|n| n as u32)
            .ok_or_else(|| Error::serialisation(format!("Invalid {key} in datetime object"))),
    }
}

/// Parse any accepted datetime shape: string, `{_year, _month, ...}`
/// object, or epoch number.
pub fn parse_datetime(value: &Value) -> Result<Tm> {
    match value {
        Value::String(s) => parse_datetime_str(s),
        Value::Number(n) => {
            let epoch = n
                .as_f64()
                .ok_or_else(|| Error::serialisation("Invalid epoch number"))?;
            Tm::from_timestamp(epoch)
        }
        Value::Object(map) => {
            let year = map
                .get("_year")
                .and_then(Value::as_i64)
                .ok_or_else(|| Error::serialisation("Datetime object requires _year"))?;
            let mut tm = Tm {
                year: year as i32,
                month: field_u32(map, "_month", 1)?,
                day: field_u32(map, "_day", 1)?,
                hour: field_u32(map, "_hour", 0)?,
                minute: field_u32(map, "_minute", 0)?,
                second: field_u32(map, "_second", 0)?,
                ..Tm::default()
            };
            if let Some(f) = map.get("_fraction") {
                tm.fraction = f
                    .as_f64()
                    .filter(|f| (0.0..1.0).contains(f))
                    .ok_or_else(|| Error::serialisation("Invalid _fraction in datetime object"))?;
            }
            // Validate by converting once.
            tm.timestamp()?;
            Ok(tm)
        }
        other => Err(Error::serialisation(format!(
            "Invalid datetime {other}"
        ))),
    }
}

/// Parse a date shape; strings must be bare dates.
pub fn parse_date(value: &Value) -> Result<Tm> {
    match value {
        Value::String(s) => parse_date_str(s),
        _ => parse_datetime(value),
    }
}

fn split_hms(s: &str) -> Option<(u64, u64, f64)> {
    let mut parts = s.split(':');
    let h: u64 = parts.next()?.parse().ok()?;
    let m: u64 = parts.next()?.parse().ok()?;
    let sec: f64 = match parts.next() {
        Some(sec) => sec.parse().ok()?,
        None => 0.0,
    };
    if parts.next().is_some() || m >= 60 || !(0.0..60.0).contains(&sec) {
        return None;
    }
    Some((h, m, sec))
}

/// Parse `HH:MM[:SS[.fff]]` into seconds.
pub fn parse_time_str(s: &str) -> Result<f64> {
    split_hms(s)
        .filter(|(h, _, _)| *h < 24)
        .map(|(h, m, sec)| (h * 3600 + m * 60) as f64 + sec)
        .ok_or_else(|| Error::serialisation(format!("Invalid time {s:?}")))
}

/// Parse a signed `[+-]HH:MM[:SS[.fff]]` offset into seconds.
pub fn parse_timedelta_str(s: &str) -> Result<f64> {
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'+') => (1.0, &s[1..]),
        Some(b'-') => (-1.0, &s[1..]),
        _ => (1.0, s),
    };
    split_hms(rest)
        .map(|(h, m, sec)| sign * ((h * 3600 + m * 60) as f64 + sec))
        .ok_or_else(|| Error::serialisation(format!("Invalid timedelta {s:?}")))
}

/// Parse any accepted time shape into seconds.
pub fn parse_time(value: &Value) -> Result<f64> {
    match value {
        Value::String(s) => parse_time_str(s),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| Error::serialisation("Invalid time number")),
        other => Err(Error::serialisation(format!("Invalid time {other}"))),
    }
}

/// Parse any accepted timedelta shape into signed seconds.
pub fn parse_timedelta(value: &Value) -> Result<f64> {
    match value {
        Value::String(s) => parse_timedelta_str(s),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| Error::serialisation("Invalid timedelta number")),
        other => Err(Error::serialisation(format!("Invalid timedelta {other}"))),
    }
}

/// Canonical `HH:MM:SS[.fff]` rendering of seconds-of-day.
pub fn format_time(mut seconds: f64) -> String {
    let sign = if seconds < 0.0 {
        seconds = -seconds;
        "-"
    } else {
        ""
    };
    let whole = seconds.floor() as u64;
    let fraction = seconds - whole as f64;
    let mut out = format!(
        "{sign}{:02}:{:02}:{:02}",
        whole / 3600,
        (whole % 3600) / 60,
        whole % 60
    );
    if fraction > 0.0 {
        let frac = format!("{:.6}", fraction);
        let frac = frac.trim_start_matches('0').trim_end_matches('0');
        if frac.starts_with('.') && frac.len() > 1 {
            out.push_str(frac);
        }
    }
    out
}

/// Detection predicate: full datetime (date with a time component).
pub fn looks_like_datetime(s: &str) -> bool {
    (s.contains('T') || s.matches(':').count() >= 2 && s.contains('-') && s.len() > 10)
        && parse_datetime_str(s).is_ok()
        && parse_date_str(s).is_err()
}

/// Detection predicate: bare date.
pub fn looks_like_date(s: &str) -> bool {
    parse_date_str(s).is_ok()
}

/// Detection predicate: time of day.
pub fn looks_like_time(s: &str) -> bool {
    s.contains(':') && !s.starts_with('+') && !s.starts_with('-') && parse_time_str(s).is_ok()
}

/// Detection predicate: signed offset.
pub fn looks_like_timedelta(s: &str) -> bool {
    (s.starts_with('+') || s.starts_with('-'))
        && s.contains(':')
        && parse_timedelta_str(s).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_roundtrip() {
        let tm = parse_datetime_str("2015-04-10T12:34:56").unwrap();
        assert_eq!(tm.to_iso(), "2015-04-10T12:34:56");
        let tm = parse_datetime_str("2015-04-10").unwrap();
        assert_eq!(tm.to_iso(), "2015-04-10T00:00:00");
    }

    #[test]
    fn rfc3339_normalizes_to_utc() {
        let tm = parse_datetime_str("2024-01-01T05:00:00-05:00").unwrap();
        assert_eq!((tm.hour, tm.day), (10, 1));
    }

    #[test]
    fn object_form() {
        let v = serde_json::json!({"_year": 2015, "_month": 4, "_day": 10, "_hour": 12});
        let tm = parse_datetime(&v).unwrap();
        assert_eq!(tm.to_iso(), "2015-04-10T12:00:00");
    }

    #[test]
    fn epoch_roundtrip() {
        let tm = parse_datetime(&serde_json::json!(0)).unwrap();
        assert_eq!(tm.to_iso(), "1970-01-01T00:00:00");
        assert_eq!(tm.timestamp().unwrap(), 0.0);
    }

    #[test]
    fn truncation() {
        let tm = parse_datetime_str("1987-06-05T12:34:56").unwrap();
        assert_eq!(tm.truncate(UnitTime::Century).year, 1900);
        assert_eq!(tm.truncate(UnitTime::Decade).year, 1980);
        let month = tm.truncate(UnitTime::Month);
        assert_eq!((month.year, month.month, month.day), (1987, 6, 1));
        let hour = tm.truncate(UnitTime::Hour);
        assert_eq!((hour.hour, hour.minute), (12, 0));
    }

    #[test]
    fn time_and_timedelta() {
        assert_eq!(parse_time_str("01:02:03").unwrap(), 3723.0);
        assert_eq!(parse_timedelta_str("-01:00").unwrap(), -3600.0);
        assert_eq!(format_time(3723.5), "01:02:03.5");
        assert!(parse_time_str("25:00").is_err());
    }

    #[test]
    fn detection_predicates() {
        assert!(looks_like_datetime("2015-04-10T12:00:00"));
        assert!(!looks_like_datetime("2015-04-10"));
        assert!(looks_like_date("2015-04-10"));
        assert!(looks_like_time("12:00:01"));
        assert!(looks_like_timedelta("+05:30"));
        assert!(!looks_like_time("hello:world"));
    }
}
