//! Prometheus metrics for the ledger runtime.
//!
//! Metric names:
//! - `ledger.commands.total{command}` - commands submitted
//! - `ledger.commands.rejected{command,kind}` - commands rejected, by error kind
//! - `ledger.command.duration_seconds{command}` - reducer latency under the write lock
//! - `ledger.events.published{event_type}` - committed events
//! - `ledger.payouts.total` / `ledger.payouts.failed` - refund payouts
//!
//! # Example
//!
//! ```rust,no_run
//! use fairdraw_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//! println!("{}", server.render().unwrap_or_default());
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use thiserror::Error;

/// Submitted commands
pub const COMMANDS_TOTAL: &str = "ledger.commands.total";
/// Rejected commands
pub const COMMANDS_REJECTED: &str = "ledger.commands.rejected";
/// Reducer latency
pub const COMMAND_DURATION: &str = "ledger.command.duration_seconds";
/// Committed events
pub const EVENTS_PUBLISHED: &str = "ledger.events.published";
/// Payouts attempted
pub const PAYOUTS_TOTAL: &str = "ledger.payouts.total";
/// Payouts that failed and were compensated
pub const PAYOUTS_FAILED: &str = "ledger.payouts.failed";

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics exporter.
///
/// Installs the global recorder and renders the scrape payload on demand.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server for `addr`.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Configured scrape address
    ///
    /// Only the in-process recorder is installed; nothing listens here.
    /// Exposition goes through [`MetricsServer::render`].
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Register metric descriptions and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError`] if the exporter cannot be built or installed.
    /// A recorder that is already installed (e.g. in tests) is not an error.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05, 0.1,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!(addr = %self.addr, "Metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if the recorder was not installed by this server.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    describe_counter!(COMMANDS_TOTAL, "Total number of commands submitted to the ledger");
    describe_counter!(
        COMMANDS_REJECTED,
        "Total number of commands rejected, labelled by error kind"
    );
    describe_histogram!(
        COMMAND_DURATION,
        "Time spent reducing a command under the write lock"
    );
    describe_counter!(EVENTS_PUBLISHED, "Total number of committed events published");
    describe_counter!(PAYOUTS_TOTAL, "Total number of refund payouts attempted");
    describe_counter!(
        PAYOUTS_FAILED,
        "Total number of refund payouts that failed and were reinstated"
    );
}
