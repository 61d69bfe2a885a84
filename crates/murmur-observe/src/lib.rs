//! Observability for Murmur: subscriber setup and optional OpenTelemetry export.

pub mod tracing_setup;
