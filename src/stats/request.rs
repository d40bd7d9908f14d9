//! Statistics request and response models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::error::{StatsError, StatsResult};
use super::interval::IntervalType;
use super::series::ChartSeries;

/// Where the statistics are collected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// A gate counting crossings. `direction_reference` selects which crossing
    /// sign counts as entering.
    Gate { direction_reference: bool },
    /// A space reporting occupancy snapshots
    Space,
}

impl Location {
    pub fn kind(self) -> LocationKind {
        match self {
            Location::Gate { .. } => LocationKind::Gate,
            Location::Space => LocationKind::Space,
        }
    }
}

/// Location kind without gate-specific data, as echoed back to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    Gate,
    Space,
}

impl FromStr for LocationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gate" => Ok(LocationKind::Gate),
            "space" => Ok(LocationKind::Space),
            other => Err(format!("unknown location '{other}'")),
        }
    }
}

/// Chart rendering hint, passed through to the front end untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChartType {
    Area,
    Line,
    Spline,
    Column,
    StackedColumn,
    Bar,
}

impl FromStr for ChartType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "area" => Ok(ChartType::Area),
            "line" => Ok(ChartType::Line),
            "spline" => Ok(ChartType::Spline),
            "column" => Ok(ChartType::Column),
            "stackedColumn" => Ok(ChartType::StackedColumn),
            "bar" => Ok(ChartType::Bar),
            other => Err(format!("unknown chart type '{other}'")),
        }
    }
}

/// A validated statistics query
///
/// `start` and `end` are already shifted into UTC by the caller's timezone
/// offset; `timezone_offset_hours` is re-applied when labels are rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsRequest {
    pub subject_id: String,
    pub location: Location,
    pub chart_type: ChartType,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub timezone_offset_hours: i32,
    pub interval: IntervalType,
}

impl StatsRequest {
    /// Check the preconditions the engine relies on
    pub fn validate(&self) -> StatsResult<()> {
        match (self.location, self.interval) {
            (Location::Gate { .. }, IntervalType::Raw) => {
                Err(StatsError::InvalidIntervalCombination)
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisX {
    #[serde(rename = "valueFormatString")]
    pub value_format: String,
    pub interval_type: IntervalType,
}

/// Chart-ready statistics, echoing the request metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub id: String,
    pub location: LocationKind,
    pub chart_type: ChartType,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub timezone: i32,
    pub axis_x: AxisX,
    #[serde(rename = "data")]
    pub series: Vec<ChartSeries>,
}

impl StatsResponse {
    pub fn new(request: &StatsRequest, series: Vec<ChartSeries>) -> Self {
        Self {
            id: request.subject_id.clone(),
            location: request.location.kind(),
            chart_type: request.chart_type,
            start: request.start,
            end: request.end,
            timezone: request.timezone_offset_hours,
            axis_x: AxisX {
                value_format: request.interval.value_format().to_string(),
                interval_type: request.interval,
            },
            series,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request(location: Location, interval: IntervalType) -> StatsRequest {
        StatsRequest {
            subject_id: "G1".to_string(),
            location,
            chart_type: ChartType::Line,
            start: Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2023, 6, 1, 23, 59, 59).unwrap(),
            timezone_offset_hours: 0,
            interval,
        }
    }

    #[test]
    fn test_raw_rejected_for_gates_only() {
        let gate = Location::Gate {
            direction_reference: false,
        };
        assert!(matches!(
            request(gate, IntervalType::Raw).validate(),
            Err(StatsError::InvalidIntervalCombination)
        ));
        assert!(request(gate, IntervalType::Hour).validate().is_ok());
        assert!(request(Location::Space, IntervalType::Raw).validate().is_ok());
    }

    #[test]
    fn test_chart_type_wire_names() {
        assert_eq!("stackedColumn".parse::<ChartType>().unwrap(), ChartType::StackedColumn);
        assert!("pie".parse::<ChartType>().is_err());
        assert_eq!(
            serde_json::to_string(&ChartType::StackedColumn).unwrap(),
            "\"stackedColumn\""
        );
    }

    #[test]
    fn test_response_echoes_request() {
        let req = request(Location::Space, IntervalType::Month);
        let response = StatsResponse::new(&req, Vec::new());
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["id"], "G1");
        assert_eq!(json["location"], "space");
        assert_eq!(json["chartType"], "line");
        assert_eq!(json["timezone"], 0);
        assert_eq!(json["axisX"]["valueFormatString"], "MM-YYYY");
        assert_eq!(json["axisX"]["intervalType"], "month");
        assert!(json["data"].as_array().unwrap().is_empty());
    }
}
