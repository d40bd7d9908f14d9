//! Interval granularities and the calendar fields they group by

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Calendar fields an aggregation can group on, coarsest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CalendarField {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl CalendarField {
    /// Every field in grouping order. Each interval groups on a prefix of this.
    pub const ALL: [CalendarField; 6] = [
        CalendarField::Year,
        CalendarField::Month,
        CalendarField::Day,
        CalendarField::Hour,
        CalendarField::Minute,
        CalendarField::Second,
    ];

    /// Column alias used for this field in aggregation output
    pub fn column(self) -> &'static str {
        match self {
            CalendarField::Year => "bucket_year",
            CalendarField::Month => "bucket_month",
            CalendarField::Day => "bucket_day",
            CalendarField::Hour => "bucket_hour",
            CalendarField::Minute => "bucket_minute",
            CalendarField::Second => "bucket_second",
        }
    }
}

/// Granularity at which events are grouped into buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalType {
    /// One bucket per second, i.e. per-event data. Called `none` on the wire.
    #[serde(rename = "none")]
    Raw,
    Hour,
    Day,
    Month,
    Year,
}

impl IntervalType {
    /// Calendar fields the aggregation groups by for this granularity
    pub fn grouping(self) -> &'static [CalendarField] {
        let len = match self {
            IntervalType::Year => 1,
            IntervalType::Month => 2,
            IntervalType::Day => 3,
            IntervalType::Hour => 4,
            IntervalType::Raw => 6,
        };
        &CalendarField::ALL[..len]
    }

    /// Axis value format handed to the charting front end
    pub fn value_format(self) -> &'static str {
        match self {
            IntervalType::Raw | IntervalType::Hour => "DD-MM-YYYY HH:mm:ss",
            IntervalType::Day => "DD-MM-YYYY",
            IntervalType::Month => "MM-YYYY",
            IntervalType::Year => "YYYY",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IntervalType::Raw => "none",
            IntervalType::Hour => "hour",
            IntervalType::Day => "day",
            IntervalType::Month => "month",
            IntervalType::Year => "year",
        }
    }
}

impl fmt::Display for IntervalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntervalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(IntervalType::Raw),
            "hour" => Ok(IntervalType::Hour),
            "day" => Ok(IntervalType::Day),
            "month" => Ok(IntervalType::Month),
            "year" => Ok(IntervalType::Year),
            other => Err(format!("unknown interval type '{other}'")),
        }
    }
}
