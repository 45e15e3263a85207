//! Accuracy-bucket tables
//!
//! Accuracies widen a value into progressively coarser buckets so range
//! queries can skip to the right granularity. The default tables are global
//! constants and never mutate.

use crate::error::{Error, Result};
use crate::field_type::FieldType;

/// Calendar units usable as date/datetime accuracies, valued in seconds.
///
/// Month and year use the fixed 30-day / 365-day convention so the bucket
/// boundaries stay stable across documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u64)]
pub enum UnitTime {
    Second = 1,
    Minute = 60,
    Hour = 3_600,
    Day = 86_400,
    Month = 2_592_000,
    Year = 31_536_000,
    Decade = 315_360_000,
    Century = 3_153_600_000,
    Millennium = 31_536_000_000,
}

impl UnitTime {
    /// Parse a unit name.
    pub fn parse(name: &str) -> Result<UnitTime> {
        Ok(match name {
            "second" => UnitTime::Second,
            "minute" => UnitTime::Minute,
            "hour" => UnitTime::Hour,
            "day" => UnitTime::Day,
            "month" => UnitTime::Month,
            "year" => UnitTime::Year,
            "decade" => UnitTime::Decade,
            "century" => UnitTime::Century,
            "millennium" => UnitTime::Millennium,
            _ => {
                return Err(Error::client(format!(
                    "Invalid accuracy unit {name:?}"
                )))
            }
        })
    }

    /// Map a raw seconds value back to its unit, if it is one.
    pub fn from_seconds(secs: u64) -> Option<UnitTime> {
        Some(match secs {
            1 => UnitTime::Second,
            60 => UnitTime::Minute,
            3_600 => UnitTime::Hour,
            86_400 => UnitTime::Day,
            2_592_000 => UnitTime::Month,
            31_536_000 => UnitTime::Year,
            315_360_000 => UnitTime::Decade,
            3_153_600_000 => UnitTime::Century,
            31_536_000_000 => UnitTime::Millennium,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UnitTime::Second => "second",
            UnitTime::Minute => "minute",
            UnitTime::Hour => "hour",
            UnitTime::Day => "day",
            UnitTime::Month => "month",
            UnitTime::Year => "year",
            UnitTime::Decade => "decade",
            UnitTime::Century => "century",
            UnitTime::Millennium => "millennium",
        }
    }

    pub fn seconds(self) -> u64 {
        self as u64
    }
}

/// True when `secs` is a recognized date/datetime accuracy.
pub fn validate_acc_date(secs: u64) -> bool {
    UnitTime::from_seconds(secs).is_some()
}

/// Default buckets for integer, positive and floating fields.
pub const DEF_ACCURACY_NUM: &[u64] = &[100, 1_000, 10_000, 100_000, 1_000_000, 100_000_000];

/// Default buckets for datetime fields, in seconds.
pub const DEF_ACCURACY_DATETIME: &[u64] = &[
    UnitTime::Hour as u64,
    UnitTime::Day as u64,
    UnitTime::Month as u64,
    UnitTime::Year as u64,
    UnitTime::Decade as u64,
    UnitTime::Century as u64,
];

/// Default buckets for date fields, in seconds.
pub const DEF_ACCURACY_DATE: &[u64] = &[
    UnitTime::Day as u64,
    UnitTime::Month as u64,
    UnitTime::Year as u64,
    UnitTime::Decade as u64,
    UnitTime::Century as u64,
];

/// Default buckets for time and timedelta fields, in seconds.
pub const DEF_ACCURACY_TIME: &[u64] = &[UnitTime::Minute as u64, UnitTime::Hour as u64];

/// Default trixel refinement levels for geospatial fields.
pub const DEF_ACCURACY_GEO: &[u64] = &[3, 5, 8, 10, 12, 15];

/// The default accuracy table for a concrete type, or `None` when the type
/// takes no accuracies.
pub fn default_accuracy(t: FieldType) -> Option<&'static [u64]> {
    match t {
        FieldType::Integer | FieldType::Positive | FieldType::Floating => Some(DEF_ACCURACY_NUM),
        FieldType::Datetime => Some(DEF_ACCURACY_DATETIME),
        FieldType::Date => Some(DEF_ACCURACY_DATE),
        FieldType::Time | FieldType::Timedelta => Some(DEF_ACCURACY_TIME),
        FieldType::Geo => Some(DEF_ACCURACY_GEO),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_roundtrip() {
        for name in [
            "second",
            "minute",
            "hour",
            "day",
            "month",
            "year",
            "decade",
            "century",
            "millennium",
        ] {
            let unit = UnitTime::parse(name).unwrap();
            assert_eq!(unit.as_str(), name);
            assert_eq!(UnitTime::from_seconds(unit.seconds()), Some(unit));
        }
    }

    #[test]
    fn bad_unit_rejected() {
        assert!(UnitTime::parse("fortnight").is_err());
        assert!(!validate_acc_date(1234));
        assert!(validate_acc_date(3_600));
    }

    #[test]
    fn defaults_are_sorted() {
        for table in [
            DEF_ACCURACY_NUM,
            DEF_ACCURACY_DATETIME,
            DEF_ACCURACY_DATE,
            DEF_ACCURACY_TIME,
            DEF_ACCURACY_GEO,
        ] {
            assert!(table.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
