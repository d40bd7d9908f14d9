//! Time-bucketed statistics for gates and spaces

pub mod bucket;
pub mod direction;
pub mod error;
pub mod interval;
pub mod plan;
pub mod request;
pub mod series;
pub mod service;

pub use bucket::{bucket_label, clamp_max_count, BucketKey, BucketValue, RawBucketRow};
pub use direction::{classify, Crossing};
pub use error::{StatsError, StatsResult};
pub use interval::{CalendarField, IntervalType};
pub use plan::{Accumulator, AggregationPlan, EventSource, PlanBuilder, TimeWindow};
pub use request::{AxisX, ChartType, Location, LocationKind, StatsRequest, StatsResponse};
pub use series::{assemble, ChartSeries, DataPoint};
pub use service::StatsService;
