//! Bucket keys produced by aggregation and their display labels

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use std::fmt;

use super::error::{StatsError, StatsResult};
use super::interval::{CalendarField, IntervalType};

/// Partially populated calendar tuple identifying one bucket
///
/// Only the fields in the interval's grouping are set; finer fields are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BucketKey {
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
    pub second: Option<u32>,
}

impl BucketKey {
    /// Project a UTC instant onto the given calendar fields
    pub fn project(instant: NaiveDateTime, fields: &[CalendarField]) -> Self {
        let mut key = BucketKey {
            year: instant.year(),
            ..Default::default()
        };

        for field in fields {
            match field {
                CalendarField::Year => {}
                CalendarField::Month => key.month = Some(instant.month()),
                CalendarField::Day => key.day = Some(instant.day()),
                CalendarField::Hour => key.hour = Some(instant.hour()),
                CalendarField::Minute => key.minute = Some(instant.minute()),
                CalendarField::Second => key.second = Some(instant.second()),
            }
        }

        key
    }

    /// Set a single field from a decoded column value
    pub fn set(&mut self, field: CalendarField, value: i64) -> StatsResult<()> {
        let invalid = || StatsError::TimeConversion {
            key: format!("{} = {value}", field.column()),
        };

        let narrow = |v: i64| u32::try_from(v).map(Some).map_err(|_| invalid());

        match field {
            CalendarField::Year => self.year = i32::try_from(value).map_err(|_| invalid())?,
            CalendarField::Month => self.month = narrow(value)?,
            CalendarField::Day => self.day = narrow(value)?,
            CalendarField::Hour => self.hour = narrow(value)?,
            CalendarField::Minute => self.minute = narrow(value)?,
            CalendarField::Second => self.second = narrow(value)?,
        }

        Ok(())
    }

    /// Assemble the bucket start as a UTC calendar instant
    ///
    /// Missing fields default to their minimum. A finer field present while a
    /// coarser one is absent, or any out-of-range value, is rejected.
    pub fn to_instant(&self) -> StatsResult<NaiveDateTime> {
        let present = [
            self.month.is_some(),
            self.day.is_some(),
            self.hour.is_some(),
            self.minute.is_some(),
            self.second.is_some(),
        ];
        if present.windows(2).any(|w| !w[0] && w[1]) {
            return Err(self.conversion_error());
        }

        NaiveDate::from_ymd_opt(self.year, self.month.unwrap_or(1), self.day.unwrap_or(1))
            .and_then(|date| {
                date.and_hms_opt(
                    self.hour.unwrap_or(0),
                    self.minute.unwrap_or(0),
                    self.second.unwrap_or(0),
                )
            })
            .ok_or_else(|| self.conversion_error())
    }

    fn conversion_error(&self) -> StatsError {
        StatsError::TimeConversion {
            key: self.to_string(),
        }
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{year: {}", self.year)?;
        let fields = [
            ("month", self.month),
            ("day", self.day),
            ("hour", self.hour),
            ("minute", self.minute),
            ("second", self.second),
        ];
        for (name, value) in fields {
            if let Some(v) = value {
                write!(f, ", {name}: {v}")?;
            }
        }
        f.write_str("}")
    }
}

/// Aggregated value of one bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketValue {
    /// Gate buckets: crossings classified per direction
    Crossings { entered: u64, exited: u64 },
    /// Space buckets: highest occupancy, never negative
    Occupancy { max_count: u64 },
}

/// One decoded row of aggregation output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawBucketRow {
    pub key: BucketKey,
    pub value: BucketValue,
}

/// Clamp an aggregated maximum to zero
///
/// Applied to the maximum after grouping, not to individual readings.
pub fn clamp_max_count(max_raw: i64) -> u64 {
    u64::try_from(max_raw).unwrap_or(0)
}

/// Render the display label of a bucket in the viewer's local time
pub fn bucket_label(
    key: &BucketKey,
    timezone_offset_hours: i32,
    interval: IntervalType,
) -> StatsResult<String> {
    let local = key.to_instant()? + Duration::hours(i64::from(timezone_offset_hours));

    let label = match interval {
        IntervalType::Raw => local.format("%Y-%m-%d %H:%M:%S").to_string(),
        IntervalType::Hour => format!("{}59", local.format("%Y-%m-%d %H:00 - %H:")),
        IntervalType::Day => local.format("%Y-%m-%d").to_string(),
        IntervalType::Month => local.format("%Y-%m").to_string(),
        IntervalType::Year => local.format("%Y").to_string(),
    };

    Ok(label)
}
