//! Decoding of `/stats` query parameters into a [`StatsRequest`]

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::stats::{ChartType, IntervalType, Location, LocationKind, StatsRequest};

const MAX_TIMEZONE_OFFSET: i32 = 12;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamError {
    #[error("The current request is missing one or more query parameters")]
    Missing,

    #[error("The current request has an invalid or empty date query parameter")]
    InvalidDateTime,

    #[error("The current request has an invalid or empty timezone query parameter")]
    InvalidTimezone,

    #[error("The current request has an invalid or empty location query parameter")]
    InvalidLocation,

    #[error("The current request has an invalid or empty chartType query parameter")]
    InvalidChartType,

    #[error("The current request has an invalid or empty intervalType query parameter")]
    InvalidIntervalType,

    #[error("The current request has an invalid or empty isInside query parameter")]
    InvalidIsInside,
}

/// Raw query string of a stats request; every field is optional so that
/// validation errors map to our own messages instead of axum's rejection
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQueryParams {
    pub id: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub timezone: Option<String>,
    pub location: Option<String>,
    pub chart_type: Option<String>,
    pub interval_type: Option<String>,
    pub is_inside: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_instant(value: &Option<String>) -> Result<DateTime<Utc>, ParamError> {
    let raw = present(value).ok_or(ParamError::InvalidDateTime)?;
    DateTime::parse_from_rfc3339(raw)
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|_| ParamError::InvalidDateTime)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

impl StatsQueryParams {
    /// Validate the parameters and build the request they describe
    ///
    /// `start` and `end` are moved from the viewer's local time to UTC using the
    /// timezone offset. A raw interval on a space is served hourly.
    pub fn into_request(self) -> Result<StatsRequest, ParamError> {
        let subject_id = present(&self.id).ok_or(ParamError::Missing)?.to_string();

        let start = parse_instant(&self.start)?;
        let end = parse_instant(&self.end)?;

        let timezone_offset_hours = present(&self.timezone)
            .and_then(|raw| raw.parse::<i32>().ok())
            .filter(|offset| offset.abs() <= MAX_TIMEZONE_OFFSET)
            .ok_or(ParamError::InvalidTimezone)?;

        let kind: LocationKind = present(&self.location)
            .and_then(|raw| raw.parse().ok())
            .ok_or(ParamError::InvalidLocation)?;

        let chart_type: ChartType = present(&self.chart_type)
            .and_then(|raw| raw.parse().ok())
            .ok_or(ParamError::InvalidChartType)?;

        let mut interval: IntervalType = present(&self.interval_type)
            .and_then(|raw| raw.parse().ok())
            .ok_or(ParamError::InvalidIntervalType)?;

        let location = match kind {
            LocationKind::Gate => Location::Gate {
                direction_reference: present(&self.is_inside)
                    .and_then(parse_bool)
                    .ok_or(ParamError::InvalidIsInside)?,
            },
            LocationKind::Space => {
                if interval == IntervalType::Raw {
                    interval = IntervalType::Hour;
                }
                Location::Space
            }
        };

        if start > end {
            return Err(ParamError::InvalidDateTime);
        }

        let shift = Duration::hours(i64::from(-timezone_offset_hours));

        Ok(StatsRequest {
            subject_id,
            location,
            chart_type,
            start: start + shift,
            end: end + shift,
            timezone_offset_hours,
            interval,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn params() -> StatsQueryParams {
        StatsQueryParams {
            id: Some("G1".to_string()),
            start: Some("2023-06-01T00:00:00Z".to_string()),
            end: Some("2023-06-01T23:59:59Z".to_string()),
            timezone: Some("2".to_string()),
            location: Some("gate".to_string()),
            chart_type: Some("stackedColumn".to_string()),
            interval_type: Some("hour".to_string()),
            is_inside: Some("true".to_string()),
        }
    }

    #[test]
    fn test_window_is_shifted_to_utc() {
        let request = params().into_request().unwrap();

        assert_eq!(request.start, Utc.with_ymd_and_hms(2023, 5, 31, 22, 0, 0).unwrap());
        assert_eq!(request.end, Utc.with_ymd_and_hms(2023, 6, 1, 21, 59, 59).unwrap());
        assert_eq!(request.timezone_offset_hours, 2);
        assert_eq!(request.chart_type, ChartType::StackedColumn);
        assert_eq!(
            request.location,
            Location::Gate {
                direction_reference: true
            }
        );
    }

    #[test]
    fn test_missing_id() {
        let mut p = params();
        p.id = None;
        assert_eq!(p.into_request().unwrap_err(), ParamError::Missing);
    }

    #[test]
    fn test_timezone_bounds() {
        for (raw, ok) in [("12", true), ("-12", true), ("13", false), ("x", false), ("", false)] {
            let mut p = params();
            p.timezone = Some(raw.to_string());
            assert_eq!(p.into_request().is_ok(), ok, "timezone {raw}");
        }
    }

    #[test]
    fn test_invalid_dates() {
        let mut p = params();
        p.start = Some("yesterday".to_string());
        assert_eq!(p.into_request().unwrap_err(), ParamError::InvalidDateTime);

        let mut p = params();
        p.start = Some("2023-06-02T00:00:00Z".to_string());
        assert_eq!(p.into_request().unwrap_err(), ParamError::InvalidDateTime);
    }

    #[test]
    fn test_gate_requires_is_inside() {
        let mut p = params();
        p.is_inside = None;
        assert_eq!(p.into_request().unwrap_err(), ParamError::InvalidIsInside);

        let mut p = params();
        p.is_inside = Some("maybe".to_string());
        assert_eq!(p.into_request().unwrap_err(), ParamError::InvalidIsInside);
    }

    #[test]
    fn test_space_ignores_is_inside_and_serves_raw_hourly() {
        let mut p = params();
        p.location = Some("space".to_string());
        p.is_inside = None;
        p.interval_type = Some("none".to_string());

        let request = p.into_request().unwrap();
        assert_eq!(request.location, Location::Space);
        assert_eq!(request.interval, IntervalType::Hour);
    }

    #[test]
    fn test_raw_gate_passes_decoding() {
        let mut p = params();
        p.interval_type = Some("none".to_string());

        let request = p.into_request().unwrap();
        assert_eq!(request.interval, IntervalType::Raw);
    }

    #[test]
    fn test_unknown_enum_values() {
        let mut p = params();
        p.location = Some("door".to_string());
        assert_eq!(p.into_request().unwrap_err(), ParamError::InvalidLocation);

        let mut p = params();
        p.chart_type = Some("pie".to_string());
        assert_eq!(p.into_request().unwrap_err(), ParamError::InvalidChartType);

        let mut p = params();
        p.interval_type = Some("week".to_string());
        assert_eq!(p.into_request().unwrap_err(), ParamError::InvalidIntervalType);
    }
}
