//! SQL rendering of aggregation plans for the relational backends

use anyhow::anyhow;
use sqlx::query::Query;
use sqlx::{ColumnIndex, Database, Row};

use crate::stats::{
    Accumulator, AggregationPlan, BucketKey, BucketValue, CalendarField, EventSource,
    RawBucketRow, StatsError, StatsResult,
};

pub const CROSSINGS_TABLE: &str = "crossing_events";
pub const OCCUPANCY_TABLE: &str = "space_results";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindValue {
    Text(String),
    Int(i64),
}

/// A rendered statement with its bind values in placeholder order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedQuery {
    pub sql: String,
    pub binds: Vec<BindValue>,
}

struct Placeholders {
    dialect: Dialect,
    binds: Vec<BindValue>,
}

impl Placeholders {
    fn push(&mut self, value: BindValue) -> String {
        self.binds.push(value);
        match self.dialect {
            Dialect::Sqlite => "?".to_string(),
            Dialect::Postgres => format!("${}", self.binds.len()),
        }
    }
}

impl Dialect {
    /// Expression extracting a UTC calendar field from a Unix-seconds column
    fn calendar_field(self, field: CalendarField, column: &str) -> String {
        match self {
            Dialect::Sqlite => {
                let format = match field {
                    CalendarField::Year => "%Y",
                    CalendarField::Month => "%m",
                    CalendarField::Day => "%d",
                    CalendarField::Hour => "%H",
                    CalendarField::Minute => "%M",
                    CalendarField::Second => "%S",
                };
                format!("CAST(strftime('{format}', {column}, 'unixepoch') AS INTEGER)")
            }
            Dialect::Postgres => {
                let unit = match field {
                    CalendarField::Year => "YEAR",
                    CalendarField::Month => "MONTH",
                    CalendarField::Day => "DAY",
                    CalendarField::Hour => "HOUR",
                    CalendarField::Minute => "MINUTE",
                    CalendarField::Second => "SECOND",
                };
                format!(
                    "CAST(EXTRACT({unit} FROM to_timestamp({column}) AT TIME ZONE 'UTC') AS BIGINT)"
                )
            }
        }
    }
}

/// Render a plan as a single grouped SELECT
pub fn render(plan: &AggregationPlan, dialect: Dialect) -> RenderedQuery {
    let mut params = Placeholders {
        dialect,
        binds: Vec::new(),
    };

    let mut select: Vec<String> = plan
        .grouping()
        .iter()
        .map(|field| {
            format!(
                "{} AS {}",
                dialect.calendar_field(*field, "occurred_at"),
                field.column()
            )
        })
        .collect();

    match plan.accumulator {
        Accumulator::DirectionalCount { entering, exiting } => {
            let entering = params.push(BindValue::Int(entering));
            let exiting = params.push(BindValue::Int(exiting));
            select.push(format!(
                "SUM(CASE WHEN crossed = {entering} THEN 1 ELSE 0 END) AS entered"
            ));
            select.push(format!(
                "SUM(CASE WHEN crossed = {exiting} THEN 1 ELSE 0 END) AS exited"
            ));
        }
        Accumulator::ClampedMax => {
            select.push(
                "CASE WHEN MAX(occupancy) < 0 THEN 0 ELSE MAX(occupancy) END AS max_count"
                    .to_string(),
            );
        }
    }

    let (table, subject_column) = match plan.source {
        EventSource::Crossings => (CROSSINGS_TABLE, "gate_id"),
        EventSource::Occupancy => (OCCUPANCY_TABLE, "space_id"),
    };

    let subject = params.push(BindValue::Text(plan.subject_id.clone()));
    let start = params.push(BindValue::Int(plan.window.start.timestamp()));
    let end = params.push(BindValue::Int(plan.window.end.timestamp()));

    let group_by = plan
        .grouping()
        .iter()
        .map(|field| field.column())
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "SELECT {} FROM {table} WHERE {subject_column} = {subject} \
         AND occurred_at >= {start} AND occurred_at <= {end} \
         GROUP BY {group_by}",
        select.join(", ")
    );

    RenderedQuery {
        sql,
        binds: params.binds,
    }
}

/// Decode one aggregation row produced by a query from [`render`]
pub fn decode_row<R>(
    row: &R,
    grouping: &[CalendarField],
    accumulator: Accumulator,
) -> StatsResult<RawBucketRow>
where
    R: Row,
    &'static str: ColumnIndex<R>,
    for<'r> i64: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
{
    let column = |name: &'static str| -> StatsResult<i64> {
        row.try_get::<i64, _>(name)
            .map_err(|e| StatsError::Decode(anyhow::Error::new(e).context(name)))
    };
    let count = |name: &'static str| -> StatsResult<u64> {
        let value = column(name)?;
        u64::try_from(value)
            .map_err(|_| StatsError::Decode(anyhow!("{name} is negative: {value}")))
    };

    let mut key = BucketKey::default();
    for field in grouping {
        key.set(*field, column(field.column())?)?;
    }

    let value = match accumulator {
        Accumulator::DirectionalCount { .. } => BucketValue::Crossings {
            entered: count("entered")?,
            exited: count("exited")?,
        },
        Accumulator::ClampedMax => BucketValue::Occupancy {
            max_count: count("max_count")?,
        },
    };

    Ok(RawBucketRow { key, value })
}

/// Bind rendered values onto a query in placeholder order
pub fn bind_all<'q, DB>(
    mut query: Query<'q, DB, <DB as Database>::Arguments<'q>>,
    binds: &[BindValue],
) -> Query<'q, DB, <DB as Database>::Arguments<'q>>
where
    DB: Database,
    String: sqlx::Encode<'q, DB> + sqlx::Type<DB>,
    i64: sqlx::Encode<'q, DB> + sqlx::Type<DB>,
{
    for bind in binds {
        query = match bind {
            BindValue::Text(value) => query.bind(value.clone()),
            BindValue::Int(value) => query.bind(*value),
        };
    }
    query
}
