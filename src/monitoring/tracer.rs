/*!
 * Structured Tracing
 * Subscriber setup and the span wrapping one probe run
 *
 * Diagnostics go to stderr so stdout only carries the probe banners.
 */

use crate::core::types::{BackendKind, Role};
use std::time::Instant;
use tracing::{debug, span, Level};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable switching the subscriber to JSON lines
pub const TRACE_JSON_ENV: &str = "PROBE_TRACE_JSON";

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: warn)
/// - PROBE_TRACE_JSON: Enable JSON output (default: false)
///
/// Calling it again once a global subscriber is set is a no-op.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let use_json = std::env::var(TRACE_JSON_ENV)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_line_number(true)
                    .with_file(true)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
    };

    if result.is_ok() {
        debug!(json = use_json, "Structured tracing initialized");
    }
}

/// Span covering one probe invocation with role and outcome fields
pub struct ProbeSpan {
    span: tracing::Span,
    start: Instant,
    backend: BackendKind,
}

impl ProbeSpan {
    pub fn new(backend: BackendKind, name: &str) -> Self {
        let span = span!(
            Level::INFO,
            "probe",
            backend = backend.as_str(),
            object = name,
            pid = std::process::id(),
            role = tracing::field::Empty,
            result = tracing::field::Empty,
            duration_ms = tracing::field::Empty,
        );
        Self {
            span,
            start: Instant::now(),
            backend,
        }
    }

    /// Enter the span for the rest of the run
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }

    pub fn record_role(&self, role: Role) {
        self.span.record("role", role.as_str());
    }

    pub fn record_result(&self, success: bool) {
        self.span
            .record("result", if success { "success" } else { "error" });
    }
}

impl Drop for ProbeSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        self.span.record("duration_ms", duration.as_millis() as u64);
        let _entered = self.span.enter();
        debug!(
            backend = self.backend.as_str(),
            duration_ms = duration.as_millis() as u64,
            "probe finished"
        );
    }
}
