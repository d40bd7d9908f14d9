use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::error::Error as _;

use super::params::ParamError;
use crate::stats::StatsError;

pub const SUCCESS_MESSAGE: &str = "Action completed successfully";

/// Uniform response body for every endpoint
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub error: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn success(data: T) -> Json<Self> {
        Json(Self {
            error: false,
            message: SUCCESS_MESSAGE.to_string(),
            data: Some(data),
        })
    }
}

#[derive(Debug)]
pub enum ApiError {
    Param(ParamError),
    Stats(StatsError),
}

impl From<ParamError> for ApiError {
    fn from(err: ParamError) -> Self {
        Self::Param(err)
    }
}

impl From<StatsError> for ApiError {
    fn from(err: StatsError) -> Self {
        Self::Stats(err)
    }
}

/// Message shown to clients; storage details stay in the logs
fn public_message(err: &StatsError) -> &'static str {
    match err {
        StatsError::InvalidIntervalCombination => {
            "The current request is trying to retrieve non-existing raw data on gates"
        }
        StatsError::TimeConversion { .. } => "Error occurred while converting a time field",
        StatsError::Query(_) => "Error occurred while querying statistics",
        StatsError::Decode(_) => "Error occurred while decoding statistics rows",
        StatsError::CursorIteration(_) => "Error occurred while iterating over statistics rows",
        StatsError::CursorClose(_) => "Error occurred while closing the statistics cursor",
        StatsError::NoData => "No data found for the requested statistics",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Param(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Self::Stats(err @ StatsError::InvalidIntervalCombination) => {
                (StatusCode::BAD_REQUEST, public_message(err).to_string())
            }
            Self::Stats(err @ StatsError::NoData) => {
                (StatusCode::NOT_FOUND, public_message(err).to_string())
            }
            Self::Stats(err) => {
                tracing::error!(error = %err, cause = ?err.source(), "statistics request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    public_message(err).to_string(),
                )
            }
        };

        let body: Envelope<()> = Envelope {
            error: true,
            message,
            data: None,
        };
        (status, Json(body)).into_response()
    }
}
