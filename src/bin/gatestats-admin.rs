use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use gatestats::config::Config;
use gatestats::stats::{ChartType, IntervalType, Location, StatsRequest, StatsService};
use gatestats::storage::{self, CrossingEvent, OccupancySnapshot};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gatestats-admin")]
#[command(about = "Gate and space statistics management CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the event tables
    Init,
    /// Store a single gate crossing
    RecordCrossing {
        gate_id: String,
        /// Crossing direction as reported by the sensor (+1 or -1)
        #[arg(allow_hyphen_values = true)]
        crossed: i64,
        /// RFC 3339 timestamp, defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// Store a single space occupancy reading
    RecordOccupancy {
        space_id: String,
        #[arg(allow_hyphen_values = true)]
        count: i64,
        /// RFC 3339 timestamp, defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
        #[arg(long)]
        stale: bool,
    },
    /// Print the statistics of a gate or space as JSON
    Stats {
        id: String,
        /// gate or space
        location: String,
        /// UTC start of the window (RFC 3339)
        start: DateTime<Utc>,
        /// UTC end of the window (RFC 3339)
        end: DateTime<Utc>,
        /// none, hour, day, month or year; none is only valid for spaces
        #[arg(long, default_value = "hour")]
        interval: IntervalType,
        /// Count negative crossings as entering (gates only)
        #[arg(long)]
        inside: bool,
        /// Hours east of UTC used for labels
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        timezone: i32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let store = storage::connect(&config.database)
        .await
        .context("failed to initialize storage")?;

    match cli.command {
        Commands::Init => {
            println!("✓ Storage initialized ({:?})", config.database.backend);
        }
        Commands::RecordCrossing {
            gate_id,
            crossed,
            at,
        } => {
            let event = CrossingEvent {
                gate_id,
                timestamp: at.unwrap_or_else(Utc::now),
                crossed,
            };
            store.record_crossing(&event).await?;
            println!(
                "✓ Recorded crossing {} on gate '{}' at {}",
                event.crossed, event.gate_id, event.timestamp
            );
        }
        Commands::RecordOccupancy {
            space_id,
            count,
            at,
            stale,
        } => {
            let snapshot = OccupancySnapshot {
                space_id,
                timestamp: at.unwrap_or_else(Utc::now),
                count,
                stale,
            };
            store.record_occupancy(&snapshot).await?;
            println!(
                "✓ Recorded occupancy {} on space '{}' at {}",
                snapshot.count, snapshot.space_id, snapshot.timestamp
            );
        }
        Commands::Stats {
            id,
            location,
            start,
            end,
            interval,
            inside,
            timezone,
        } => {
            let location = match location.as_str() {
                "gate" => Location::Gate {
                    direction_reference: inside,
                },
                "space" => Location::Space,
                other => bail!("unknown location '{other}', expected gate or space"),
            };

            let request = StatsRequest {
                subject_id: id,
                location,
                chart_type: ChartType::Line,
                start,
                end,
                timezone_offset_hours: timezone,
                interval,
            };

            let response = StatsService::new(store).fetch(&request).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
