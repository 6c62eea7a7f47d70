//! Dispatch metrics.
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `hermes_dispatch_total` | Counter | `outcome`, `status` | Completed dispatches |
//! | `hermes_dispatch_duration_seconds` | Histogram | `outcome` | Dispatch latency |
//! | `hermes_dispatch_in_flight` | Gauge | - | Dispatches in progress |
//! | `hermes_interceptor_aborts_total` | Counter | `interceptor` | Pre-call aborts |
//!
//! `outcome` is `success`, `aborted`, or the failure category (`routing`,
//! `business`, `interceptor`, `unmapped`).
//!
//! Recording goes through the `metrics` facade and is a no-op until a
//! recorder is installed, e.g. with [`init_metrics`].

use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Counter of completed dispatches.
pub const DISPATCH_TOTAL: &str = "hermes_dispatch_total";
/// Histogram of dispatch latency in seconds.
pub const DISPATCH_DURATION: &str = "hermes_dispatch_duration_seconds";
/// Gauge of dispatches in progress.
pub const DISPATCH_IN_FLIGHT: &str = "hermes_dispatch_in_flight";
/// Counter of pre-call aborts per interceptor.
pub const INTERCEPTOR_ABORTS: &str = "hermes_interceptor_aborts_total";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsConfig {
    /// Whether to install the Prometheus recorder.
    pub enabled: bool,

    /// Address for the scrape endpoint; `None` installs the recorder only,
    /// leaving exposure to the host through [`render_metrics`].
    pub listen_addr: Option<String>,

    /// Buckets for the dispatch duration histogram.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: None,
            // 1ms .. 10s
            duration_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        }
    }
}

/// Installs the Prometheus recorder.
///
/// With a listen address the scrape endpoint is served on the current Tokio
/// runtime, so this must be called from within one.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(DISPATCH_DURATION.to_string()),
            &config.duration_buckets,
        )
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let handle = match &config.listen_addr {
        None => builder
            .install_recorder()
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?,
        Some(addr) => {
            let addr: SocketAddr = addr
                .parse()
                .map_err(|e| TelemetryError::InvalidAddress(format!("{addr}: {e}")))?;
            let runtime = tokio::runtime::Handle::try_current()
                .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

            let (recorder, exporter) = {
                let _entered = runtime.enter();
                builder
                    .with_http_listener(addr)
                    .build()
                    .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?
            };
            let handle = recorder.handle();
            metrics::set_global_recorder(recorder)
                .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
            runtime.spawn(exporter);
            tracing::info!(%addr, "serving Prometheus metrics");
            handle
        }
    };

    let _ = METRICS_HANDLE.set(handle);
    describe_metrics();
    Ok(())
}

/// Renders all metrics in Prometheus text format, if [`init_metrics`] ran.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

/// Registers help text for the dispatch metrics.
pub fn describe_metrics() {
    describe_counter!(DISPATCH_TOTAL, "Completed dispatches by outcome and status");
    describe_histogram!(DISPATCH_DURATION, "Dispatch duration in seconds");
    describe_gauge!(DISPATCH_IN_FLIGHT, "Dispatches currently in progress");
    describe_counter!(INTERCEPTOR_ABORTS, "Dispatches aborted by a pre-call interceptor");
}

/// Records one completed dispatch.
pub fn record_dispatch(outcome: &'static str, status: u16, duration: Duration) {
    counter!(DISPATCH_TOTAL, "outcome" => outcome, "status" => status.to_string()).increment(1);
    histogram!(DISPATCH_DURATION, "outcome" => outcome).record(duration.as_secs_f64());
}

/// Records a pre-call abort by `interceptor`.
pub fn record_interceptor_abort(interceptor: &str) {
    counter!(INTERCEPTOR_ABORTS, "interceptor" => interceptor.to_string()).increment(1);
}

/// Tracks one in-flight dispatch; the gauge is decremented on drop, including
/// during unwinding.
#[derive(Debug)]
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Increments the in-flight gauge.
    #[must_use]
    pub fn new() -> Self {
        gauge!(DISPATCH_IN_FLIGHT).increment(1.0);
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!(DISPATCH_IN_FLIGHT).decrement(1.0);
    }
}
