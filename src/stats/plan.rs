//! Typed aggregation plans
//!
//! A plan describes one bucketed aggregation independently of the storage
//! engine: which collection to read, which subject and window to match, which
//! calendar fields to group on and how to accumulate each group. Storage
//! backends either render it to SQL or evaluate it directly.

use chrono::{DateTime, Utc};

use super::direction::{entering_sign, exiting_sign};
use super::error::StatsResult;
use super::interval::{CalendarField, IntervalType};
use super::request::{Location, StatsRequest};

/// Event collection a plan reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSource {
    /// Individual gate crossings
    Crossings,
    /// Space occupancy snapshots
    Occupancy,
}

/// Per-bucket accumulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accumulator {
    /// Two independent conditional counts over the crossing value
    DirectionalCount { entering: i64, exiting: i64 },
    /// Highest occupancy in the bucket, clamped to zero after aggregation
    ClampedMax,
}

/// Inclusive time window, `start <= t <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationPlan {
    pub source: EventSource,
    pub subject_id: String,
    pub window: TimeWindow,
    pub interval: IntervalType,
    pub accumulator: Accumulator,
}

impl AggregationPlan {
    /// Plan the aggregation for a request
    pub fn for_request(request: &StatsRequest) -> StatsResult<Self> {
        request.validate()?;

        let window = TimeWindow {
            start: request.start,
            end: request.end,
        };

        let plan = match request.location {
            Location::Gate {
                direction_reference,
            } => PlanBuilder::new(EventSource::Crossings, &request.subject_id)
                .window(window)
                .group_by(request.interval)
                .count_crossings(direction_reference),
            Location::Space => PlanBuilder::new(EventSource::Occupancy, &request.subject_id)
                .window(window)
                .group_by(request.interval)
                .clamped_max(),
        };

        Ok(plan)
    }

    /// Calendar fields the plan groups on
    pub fn grouping(&self) -> &'static [CalendarField] {
        self.interval.grouping()
    }
}

/// Stage-by-stage construction of an [`AggregationPlan`]
#[derive(Debug, Clone)]
pub struct PlanBuilder {
    source: EventSource,
    subject_id: String,
    window: Option<TimeWindow>,
    interval: IntervalType,
}

impl PlanBuilder {
    pub fn new(source: EventSource, subject_id: &str) -> Self {
        Self {
            source,
            subject_id: subject_id.to_string(),
            window: None,
            interval: IntervalType::Hour,
        }
    }

    pub fn window(mut self, window: TimeWindow) -> Self {
        self.window = Some(window);
        self
    }

    pub fn group_by(mut self, interval: IntervalType) -> Self {
        self.interval = interval;
        self
    }

    pub fn count_crossings(self, direction_reference: bool) -> AggregationPlan {
        self.finish(Accumulator::DirectionalCount {
            entering: entering_sign(direction_reference),
            exiting: exiting_sign(direction_reference),
        })
    }

    pub fn clamped_max(self) -> AggregationPlan {
        self.finish(Accumulator::ClampedMax)
    }

    fn finish(self, accumulator: Accumulator) -> AggregationPlan {
        let window = self.window.unwrap_or(TimeWindow {
            start: DateTime::<Utc>::MIN_UTC,
            end: DateTime::<Utc>::MAX_UTC,
        });

        AggregationPlan {
            source: self.source,
            subject_id: self.subject_id,
            window,
            interval: self.interval,
            accumulator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::error::StatsError;
    use crate::stats::request::ChartType;
    use chrono::TimeZone;

    fn request(location: Location, interval: IntervalType) -> StatsRequest {
        StatsRequest {
            subject_id: "G1".to_string(),
            location,
            chart_type: ChartType::Area,
            start: Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2023, 6, 1, 23, 59, 59).unwrap(),
            timezone_offset_hours: 0,
            interval,
        }
    }

    #[test]
    fn test_gate_plan_counts_by_reference() {
        let plan = AggregationPlan::for_request(&request(
            Location::Gate {
                direction_reference: false,
            },
            IntervalType::Hour,
        ))
        .unwrap();

        assert_eq!(plan.source, EventSource::Crossings);
        assert_eq!(
            plan.accumulator,
            Accumulator::DirectionalCount {
                entering: 1,
                exiting: -1
            }
        );
        assert_eq!(plan.grouping().len(), 4);

        let flipped = AggregationPlan::for_request(&request(
            Location::Gate {
                direction_reference: true,
            },
            IntervalType::Hour,
        ))
        .unwrap();
        assert_eq!(
            flipped.accumulator,
            Accumulator::DirectionalCount {
                entering: -1,
                exiting: 1
            }
        );
    }

    #[test]
    fn test_space_plan_uses_clamped_max() {
        let plan =
            AggregationPlan::for_request(&request(Location::Space, IntervalType::Year)).unwrap();
        assert_eq!(plan.source, EventSource::Occupancy);
        assert_eq!(plan.accumulator, Accumulator::ClampedMax);
        assert_eq!(plan.grouping(), &[CalendarField::Year]);
    }

    #[test]
    fn test_gate_raw_is_rejected_before_planning() {
        let result = AggregationPlan::for_request(&request(
            Location::Gate {
                direction_reference: false,
            },
            IntervalType::Raw,
        ));
        assert!(matches!(result, Err(StatsError::InvalidIntervalCombination)));
    }

    #[test]
    fn test_window_is_inclusive() {
        let window = TimeWindow {
            start: Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2023, 6, 1, 23, 59, 59).unwrap(),
        };
        assert!(window.contains(window.start));
        assert!(window.contains(window.end));
        assert!(!window.contains(Utc.with_ymd_and_hms(2023, 6, 2, 0, 0, 0).unwrap()));
    }
}
