/*!
 * Monitoring
 * Structured logging setup and probe spans
 */

mod tracer;

pub use tracer::{init_tracing, ProbeSpan, TRACE_JSON_ENV};
