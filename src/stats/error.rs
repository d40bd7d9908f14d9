use thiserror::Error;

/// Failures of the statistics engine
///
/// Storage-side variants carry the underlying cause so the transport layer can
/// log it while mapping the kind to a status code.
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("raw interval data is not available for gate locations")]
    InvalidIntervalCombination,

    #[error("bucket key {key} cannot be converted into a calendar instant")]
    TimeConversion { key: String },

    #[error("aggregation query failed")]
    Query(#[source] anyhow::Error),

    #[error("failed to decode aggregation row")]
    Decode(#[source] anyhow::Error),

    #[error("failed while iterating over aggregation results")]
    CursorIteration(#[source] anyhow::Error),

    #[error("failed to close aggregation cursor")]
    CursorClose(#[source] anyhow::Error),

    #[error("no data found for the requested statistics")]
    NoData,
}

impl StatsError {
    /// Whether the failure was caused by the request rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            StatsError::InvalidIntervalCombination | StatsError::NoData
        )
    }
}

pub type StatsResult<T> = Result<T, StatsError>;
