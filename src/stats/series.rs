//! Chart series assembly from decoded bucket rows

use anyhow::anyhow;
use serde::Serialize;

use super::bucket::{bucket_label, BucketValue, RawBucketRow};
use super::error::{StatsError, StatsResult};
use super::request::{ChartType, Location, StatsRequest};

pub const ENTERED_SERIES: &str = "Entered";
pub const EXITED_SERIES: &str = "Exited";
pub const MAX_COUNT_SERIES: &str = "Max count";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataPoint {
    pub label: String,
    pub x: String,
    pub y: u64,
}

/// One named, ordered series of chart points
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartSeries {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub name: String,
    #[serde(rename = "showInLegend")]
    pub show_legend: bool,
    #[serde(rename = "xValueFormatString")]
    pub x_value_format: String,
    #[serde(rename = "dataPoints")]
    pub points: Vec<DataPoint>,
}

impl ChartSeries {
    fn new(name: &str, request: &StatsRequest, capacity: usize) -> Self {
        Self {
            chart_type: request.chart_type,
            name: name.to_string(),
            show_legend: true,
            x_value_format: request.interval.value_format().to_string(),
            points: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, label: &str, y: u64) {
        self.points.push(DataPoint {
            label: label.to_string(),
            x: label.to_string(),
            y,
        });
    }

    /// Order points chronologically; labels are zero-padded so string order works
    fn sort(&mut self) {
        self.points.sort_by(|a, b| a.x.cmp(&b.x));
    }
}

/// Build the chart series for a location from its bucket rows
pub fn assemble(rows: &[RawBucketRow], request: &StatsRequest) -> StatsResult<Vec<ChartSeries>> {
    let series = match request.location {
        Location::Gate { .. } => {
            let mut entered = ChartSeries::new(ENTERED_SERIES, request, rows.len());
            let mut exited = ChartSeries::new(EXITED_SERIES, request, rows.len());

            for row in rows {
                let BucketValue::Crossings {
                    entered: entered_count,
                    exited: exited_count,
                } = row.value
                else {
                    return Err(mismatched(row, "gate"));
                };

                let label = label_for(row, request)?;
                entered.push(&label, entered_count);
                exited.push(&label, exited_count);
            }

            vec![entered, exited]
        }
        Location::Space => {
            let mut max_count = ChartSeries::new(MAX_COUNT_SERIES, request, rows.len());

            for row in rows {
                let BucketValue::Occupancy { max_count: value } = row.value else {
                    return Err(mismatched(row, "space"));
                };

                let label = label_for(row, request)?;
                max_count.push(&label, value);
            }

            vec![max_count]
        }
    };

    Ok(series
        .into_iter()
        .map(|mut s| {
            s.sort();
            s
        })
        .collect())
}

fn label_for(row: &RawBucketRow, request: &StatsRequest) -> StatsResult<String> {
    bucket_label(&row.key, request.timezone_offset_hours, request.interval)
}

fn mismatched(row: &RawBucketRow, location: &str) -> StatsError {
    StatsError::Decode(anyhow!(
        "bucket {} carries {:?}, which is not a {location} value",
        row.key,
        row.value
    ))
}
