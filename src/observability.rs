//! HTTP request metrics exported in Prometheus text format
//!
//! The recorder is owned by [`HttpMetrics`] rather than installed globally, so
//! each router (and each test) gets its own registry.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use std::time::Duration;

pub const ENDPOINT_RESPONSE_TIMES: &str = "gatestats_endpoint_response_times";
pub const RESPONSE_CODES: &str = "gatestats_response_codes";

pub struct HttpMetrics {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

impl HttpMetrics {
    pub fn new() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            metrics::describe_histogram!(
                ENDPOINT_RESPONSE_TIMES,
                metrics::Unit::Seconds,
                "Response time per endpoint"
            );
            metrics::describe_counter!(RESPONSE_CODES, "Responses by HTTP status code");
        });

        Self { recorder, handle }
    }

    /// Record one finished request
    pub fn observe(&self, endpoint: &str, status: u16, elapsed: Duration) {
        metrics::with_local_recorder(&self.recorder, || {
            metrics::histogram!(ENDPOINT_RESPONSE_TIMES, "endpoint" => endpoint.to_string())
                .record(elapsed.as_secs_f64());
            metrics::counter!(RESPONSE_CODES, "code" => status.to_string()).increment(1);
        });
    }

    /// Render every recorded metric in Prometheus exposition format
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

impl Default for HttpMetrics {
    fn default() -> Self {
        Self::new()
    }
}
